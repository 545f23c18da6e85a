//! Reload event fan-out

use crossbeam_channel::{Receiver, Sender, unbounded};
use devreload_kernel::ReloadEvent;
use parking_lot::Mutex;

/// Delivers [`ReloadEvent`]s to every live subscriber.
///
/// Channels are unbounded so a slow subscriber never stalls a reload;
/// subscribers whose receiver was dropped are pruned on the next emit.
#[derive(Debug, Default)]
pub(crate) struct EventHub {
    subscribers: Mutex<Vec<Sender<ReloadEvent>>>,
}

impl EventHub {
    pub(crate) fn subscribe(&self) -> Receiver<ReloadEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub(crate) fn emit(&self, event: ReloadEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
