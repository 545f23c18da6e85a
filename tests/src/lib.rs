//! devreload Testing Framework
//!
//! Recording collaborators for driving the reload orchestrator
//! deterministically: every loading-context, host and invoker call lands in
//! one shared [`CallLog`], in the order the orchestrator made it.

pub mod context;
pub mod host;

pub use context::RecordingContext;
pub use host::{RecordingInvoker, StubHost};
pub use journal::{Call, CallLog};
pub use manifest::ManifestFixture;

/// Assert how many logged calls match a pattern
#[macro_export]
macro_rules! assert_called {
    ($log:expr, $pattern:pat, $expected:expr) => {
        let count = $log
            .calls()
            .iter()
            .filter(|call| matches!(call, $pattern))
            .count();
        assert_eq!(
            count,
            $expected,
            "Expected {} to be called {} times, but was called {} times",
            stringify!($pattern),
            $expected,
            count
        );
    };
}
