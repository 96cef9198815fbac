//! `nodes` crate — the `ExecutableNode` trait, `ExecutionContext`, the
//! streaming protocol types, and every built-in action implementation.
//!
//! Sits directly above `browser` in the workspace so both `engine`
//! (scheduler, recorder) and `persistence` (serializes `ExecutionRecord`)
//! can depend on it without a cycle back into `engine`.

pub mod actions;
pub mod channel;
pub mod context;
pub mod error;
pub mod mock;
pub mod protocol;
pub mod records;
pub mod traits;

pub use actions::{builtin_actions, ActionSpec};
pub use channel::{ExecutionChannel, NullChannel};
pub use context::{ExecutionContext, ExecutionStatus};
pub use error::NodeError;
pub use records::{ExecutionRecord, NodeRecord, NodeStatus, RunStatus, ScreenshotEntry};
pub use traits::ExecutableNode;
