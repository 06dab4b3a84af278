//! File ingestion: watching for stabilized videos and the durable ledger
//! that guarantees at-most-one processing attempt per path.

pub mod ledger;
pub mod watcher;

pub use ledger::{LedgerDecision, LedgerEntry, ProcessingLedger};
pub use watcher::{VideoFileEvent, VideoWatcher, WatchHandle, WatcherConfig};
