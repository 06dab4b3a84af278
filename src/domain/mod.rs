//! Domain types for the autoscribe pipeline.
//!
//! - SourceFile: a stabilized video file observed by the watcher
//! - PipelineState: the per-file state machine
//! - PipelineOutcome: the summary shown to the operator when a run ends
//! - TranscriptSegment: one speaker-attributed utterance

pub mod source;
pub mod transcript;

// Re-export commonly used types
pub use source::{PipelineOutcome, PipelineState, SourceFile};
pub use transcript::{
    format_duration, format_elapsed, format_timestamp, language_label, speaker_count,
    TranscriptSegment, FALLBACK_LANGUAGE,
};
