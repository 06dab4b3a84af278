//! Adapter interfaces for the orchestrator's external collaborators.
//!
//! The orchestrator only ever talks to these three narrow traits; the
//! production implementations shell out to osascript, ffmpeg/ffprobe, and a
//! FunASR runner, and move files on the local disk.

pub mod engine;
pub mod notifier;
pub mod placement;

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{PipelineOutcome, TranscriptSegment};

pub use engine::FunAsrEngine;
pub use notifier::DialogNotifier;
pub use placement::WorkspacePlacement;

/// Delivers confirmation prompts, progress updates, and result dialogs.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Blocking confirmation dialog; returns the operator's answer.
    async fn ask_confirm(&self, name: &str, size_mb: f64) -> Result<bool>;

    /// Announce that processing of a file has begun.
    async fn notify_start(&self, name: &str, size_mb: f64) -> Result<()>;

    /// Progress update for one pipeline stage ("1/4 extracting audio", ...).
    async fn notify_stage(&self, name: &str, label: &str, detail: Option<&str>) -> Result<()>;

    /// Final result dialog, success or failure.
    async fn show_result(&self, outcome: &PipelineOutcome) -> Result<()>;
}

/// Audio extraction, duration probing, language detection, and recognition.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Extract the audio track to a transient artifact owned by the caller.
    async fn extract_audio(&self, video: &Path) -> Result<PathBuf>;

    /// Probe the duration of an audio artifact, in seconds.
    async fn audio_duration(&self, audio: &Path) -> Result<f64>;

    /// Detect the dominant language; returns a raw code such as "zh".
    async fn detect_language(&self, audio: &Path) -> Result<String>;

    /// Run recognition and return ordered segments.
    ///
    /// Implementations load the model once per process and reuse it across
    /// calls (load → generate → parse).
    async fn transcribe(&self, audio: &Path) -> Result<Vec<TranscriptSegment>>;
}

/// Canonical naming, transcript persistence, and source relocation.
#[async_trait]
pub trait FilePlacement: Send + Sync {
    /// Generate the canonical output name for a detected language.
    fn canonical_name(&self, language: &str) -> String;

    /// Write the transcript artifact; returns its path.
    async fn save_transcript(
        &self,
        name: &str,
        language: &str,
        duration_secs: f64,
        segments: &[TranscriptSegment],
    ) -> Result<PathBuf>;

    /// Relocate the source video into the success or failure bucket.
    async fn move_video(&self, source: &Path, name: &str, success: bool) -> Result<PathBuf>;
}
