//! `engine` crate — workflow document model, DAG validation, variable
//! interpolation, the action registry, and the scheduler that ties them
//! together into a run.

pub mod dag;
pub mod error;
pub mod executor;
pub mod interpolate;
pub mod models;
pub mod recorder;
pub mod registry;

pub use dag::validate_dag;
pub use error::EngineError;
pub use executor::{Engine, ExecuteParams, ExecutionOutcome};
pub use interpolate::{interpolate, interpolate_str};
pub use models::{Edge, NodeDefinition, Workflow};
pub use recorder::ExecutionRecorder;
pub use registry::{ActionDefinition, ActionRegistry};
