//! Fixed-period poll scheduler
//!
//! One named background thread fires the tick callback every period. The
//! thread outlives any single failing tick: a panic inside the callback is
//! caught and logged, and the next tick fires as usual.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, TryRecvError, bounded, select, tick};
use tracing::{debug, error};

/// Name of the scheduler thread
pub const THREAD_NAME: &str = "dev-artifacts-loader";

/// Handle to the background poll thread.
///
/// Cancelling (or dropping) the handle stops the thread before its next
/// tick. A tick already running is allowed to finish; `cancel` waits for it.
#[derive(Debug)]
pub struct PollScheduler {
    cancel_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    period: Duration,
}

impl PollScheduler {
    /// Spawn the scheduler. The first tick fires one `period` after spawn.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                let ticker = tick(period);
                loop {
                    select! {
                        recv(cancel_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            if matches!(cancel_rx.try_recv(), Err(TryRecvError::Disconnected)) {
                                break;
                            }
                            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(&mut on_tick)) {
                                error!("Poll tick panicked: {}", panic_message(payload.as_ref()));
                            }
                        }
                    }
                }
                debug!("Poll scheduler stopped");
            })?;

        debug!("Poll scheduler started (every {:?})", period);
        Ok(Self {
            cancel_tx: Some(cancel_tx),
            handle: Some(handle),
            period,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether the background thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the scheduler, waiting for an in-flight tick to complete
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Disconnecting the channel is the cancellation signal.
        drop(self.cancel_tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                error!("Poll scheduler thread terminated abnormally");
            }
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
