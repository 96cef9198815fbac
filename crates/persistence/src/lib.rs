//! Persistence of terminal execution records.
//!
//! Deliberately minimal: there is no workflow CRUD store here, only the
//! write-once-per-run `ExecutionRecord` archive.

mod error;
mod repository;

pub use error::PersistenceError;
pub use repository::{ExecutionRepository, JsonFileExecutionRepository};
