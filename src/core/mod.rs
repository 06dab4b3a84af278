//! Core orchestration logic.
//!
//! - Orchestrator: drives each detected file through the pipeline
//! - Supervisor: owns the watcher lifecycle and cooperative shutdown

pub mod orchestrator;
pub mod supervisor;

pub use orchestrator::{Orchestrator, StageError};
pub use supervisor::Supervisor;
