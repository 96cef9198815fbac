//! Node-level error type.

use thiserror::Error;

/// Errors returned by a node's `execute` method.
///
/// There is no retryable variant: the run's failure semantics make any
/// error here fatal to the node and terminates the execution. The
/// scheduler still needs to tell a few causes apart (driver errors racing
/// cancellation, an expired or cancelled user-input rendezvous), so those
/// get their own variants instead of collapsing into `Fatal`.
#[derive(Debug, Error, Clone)]
pub enum NodeError {
    /// Anything not covered by a more specific variant.
    #[error("fatal node error: {0}")]
    Fatal(String),

    /// Surfaced verbatim from the browser driver. The scheduler reclassifies
    /// this as cancellation when a stop is already in flight and
    /// `BrowserDriver::is_target_closed` matches.
    #[error("driver error: {0}")]
    Driver(#[from] browser::DriverError),

    /// The hybrid locator exhausted every strategy.
    #[error("location error: {0}")]
    Location(#[from] browser::LocationError),

    /// `request_user_input` was not answered before its timeout.
    #[error("user input timed out")]
    UserInputTimeout,

    /// The user explicitly answered `cancel`, or a `stop_execution` raced
    /// the rendezvous open.
    #[error("user cancelled")]
    UserCancelled,
}

impl NodeError {
    /// True for the cause the scheduler treats as run cancellation rather
    /// than run failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, NodeError::UserCancelled)
    }
}
