//! Source file identity and per-file pipeline state.
//!
//! A SourceFile is immutable once observed; its identity is the path string.
//! Each file moves through the PipelineState machine exactly once.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stabilized video file reported by the watcher.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute path to the video
    pub path: PathBuf,

    /// Size in bytes at detection time
    pub size: u64,

    /// When the file was judged stable
    pub detected_at: DateTime<Utc>,
}

impl SourceFile {
    /// File name component, for dialogs and logs
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// Size in megabytes, for the confirmation dialog
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / 1024.0 / 1024.0
    }
}

/// State of one file's trip through the pipeline.
///
/// Discarded, Rejected, Succeeded, and Failed are terminal. A ledger hit
/// short-circuits to Discarded; everything else flows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum PipelineState {
    /// Seen by the watcher, not yet checked against the ledger
    Detected,

    /// Already marked in the ledger; nothing to do
    Discarded,

    /// Waiting on the operator's confirmation dialog
    PendingConfirmation,

    /// Operator declined; ledger marked, no further action
    Rejected,

    /// Operator accepted; ledger marked, stages about to run
    Confirmed,

    ExtractingAudio,
    DetectingLanguage,
    Transcribing,
    Persisting,

    /// All four stages completed
    Succeeded,

    /// A stage fault ended the run
    Failed { error: String },
}

impl PipelineState {
    /// Whether this state ends the run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Discarded | Self::Rejected | Self::Succeeded | Self::Failed { .. }
        )
    }
}

/// Final summary pushed through the notification gateway.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Success {
        /// Canonical name assigned during persistence
        name: String,
        language_label: String,
        duration_label: String,
        elapsed_label: String,
        segment_count: usize,
        speaker_count: usize,
        /// Transcript artifact file name
        output_file: String,
    },
    Failure {
        /// Original file name (no canonical name may exist)
        name: String,
        elapsed_label: String,
        error: String,
    },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_size_mb() {
        let source = SourceFile {
            path: PathBuf::from("/tmp/clip.mp4"),
            size: 50 * 1024 * 1024,
            detected_at: Utc::now(),
        };
        assert!((source.size_mb() - 50.0).abs() < f64::EPSILON);
        assert_eq!(source.file_name(), "clip.mp4");
    }

    #[test]
    fn test_terminal_states() {
        assert!(PipelineState::Discarded.is_terminal());
        assert!(PipelineState::Rejected.is_terminal());
        assert!(PipelineState::Succeeded.is_terminal());
        assert!(PipelineState::Failed {
            error: "boom".to_string()
        }
        .is_terminal());
        assert!(!PipelineState::Confirmed.is_terminal());
        assert!(!PipelineState::Transcribing.is_terminal());
    }
}
