//! autoscribe - watch-folder video transcription daemon
//!
//! A single-machine, single-user pipeline: new video files saved into a
//! watched folder are confirmed with the operator, run through an ordered
//! processing pipeline (extract audio → detect language → transcribe →
//! persist output), and relocated. A durable ledger guarantees at most one
//! processing attempt per file, even across restarts and duplicate watcher
//! notifications.
//!
//! # Modules
//!
//! - `adapters`: External collaborators (dialogs, engine, file placement)
//! - `core`: Orchestration logic (Orchestrator, Supervisor)
//! - `domain`: Data structures (SourceFile, PipelineState, segments)
//! - `ingest`: File watcher and the processing ledger
//! - `maintain`: Weekly package/model maintenance job
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run the daemon
//! autoscribe serve
//!
//! # Inspect what has been processed
//! autoscribe status
//!
//! # Weekly maintenance (from a scheduler)
//! autoscribe update
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod ingest;
pub mod maintain;

// Re-export main types at crate root for convenience
pub use adapters::{
    DialogNotifier, FilePlacement, FunAsrEngine, NotificationGateway, TranscriptionEngine,
    WorkspacePlacement,
};
pub use core::{Orchestrator, StageError, Supervisor};
pub use domain::{PipelineOutcome, PipelineState, SourceFile, TranscriptSegment};
pub use ingest::{
    LedgerDecision, ProcessingLedger, VideoFileEvent, VideoWatcher, WatcherConfig,
};
