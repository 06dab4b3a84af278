//! Pipeline orchestrator.
//!
//! Receives stabilized-file events, gates each through the ledger and the
//! operator's confirmation, then drives the four processing stages:
//! extract audio → detect language → transcribe → persist output. Stage
//! faults become a terminal Failed state that still relocates the source
//! into the failure bucket and reports an error dialog; they never escape
//! to the supervisor.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{FilePlacement, NotificationGateway, TranscriptionEngine};
use crate::domain::{
    format_duration, format_elapsed, language_label, speaker_count, PipelineOutcome,
    PipelineState, SourceFile, FALLBACK_LANGUAGE,
};
use crate::ingest::{LedgerDecision, ProcessingLedger};

/// A fault raised inside one pipeline stage
#[derive(Debug, Error)]
pub enum StageError {
    #[error("audio extraction failed: {0}")]
    ExtractAudio(String),

    #[error("language detection failed: {0}")]
    DetectLanguage(String),

    #[error("transcription failed: {0}")]
    Transcribe(String),

    #[error("saving output failed: {0}")]
    Persist(String),
}

/// What a successful run reports
struct SuccessReport {
    name: String,
    language_label: String,
    duration_label: String,
    segment_count: usize,
    speaker_count: usize,
    output_file: String,
}

/// Pipeline orchestrator
pub struct Orchestrator {
    gateway: Arc<dyn NotificationGateway>,
    engine: Arc<dyn TranscriptionEngine>,
    placement: Arc<dyn FilePlacement>,
    ledger: Arc<ProcessingLedger>,

    /// Bounds simultaneous model invocations across files
    transcribe_gate: Semaphore,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn NotificationGateway>,
        engine: Arc<dyn TranscriptionEngine>,
        placement: Arc<dyn FilePlacement>,
        ledger: Arc<ProcessingLedger>,
        max_concurrent_transcriptions: usize,
    ) -> Self {
        Self {
            gateway,
            engine,
            placement,
            ledger,
            transcribe_gate: Semaphore::new(max_concurrent_transcriptions.max(1)),
        }
    }

    /// Entry point for a stabilized file event.
    ///
    /// Duplicate-tolerant: a path already in the ledger returns Discarded
    /// with no side effects, and concurrent invocations for the same
    /// unmarked path resolve to a single winner at the mark.
    #[instrument(skip(self, source), fields(run_id = %Uuid::new_v4(), file = %source.file_name()))]
    pub async fn on_new_file(&self, source: &SourceFile) -> Result<PipelineState> {
        debug!(state = ?PipelineState::Detected, "stabilized file event");
        if self.ledger.is_marked(&source.path).await {
            debug!("already in ledger, discarding");
            return Ok(PipelineState::Discarded);
        }

        let name = source.file_name();
        let size_mb = source.size_mb();

        info!(state = ?PipelineState::PendingConfirmation, size_mb, "awaiting confirmation");
        let confirmed = self
            .gateway
            .ask_confirm(&name, size_mb)
            .await
            .context("confirmation dialog failed")?;

        if !confirmed {
            self.ledger
                .mark(&source.path, LedgerDecision::Rejected)
                .await
                .context("failed to record rejection in ledger")?;
            info!("transcription declined");
            return Ok(PipelineState::Rejected);
        }

        let won = self
            .ledger
            .mark_if_absent(&source.path, LedgerDecision::Confirmed)
            .await
            .context("failed to mark ledger")?;
        if !won {
            debug!("duplicate notification lost the mark race, discarding");
            return Ok(PipelineState::Discarded);
        }

        if let Err(e) = self.gateway.notify_start(&name, size_mb).await {
            warn!(error = %e, "start notification failed");
        }
        info!(size_mb, "confirmed, starting pipeline");

        let started = Instant::now();
        let mut canonical: Option<String> = None;

        match self.run_stages(source, &mut canonical).await {
            Ok(report) => {
                let elapsed_label = format_elapsed(started.elapsed().as_secs_f64());
                info!(
                    name = %report.name,
                    segments = report.segment_count,
                    speakers = report.speaker_count,
                    elapsed = %elapsed_label,
                    "transcription succeeded"
                );

                let outcome = PipelineOutcome::Success {
                    name: report.name,
                    language_label: report.language_label,
                    duration_label: report.duration_label,
                    elapsed_label,
                    segment_count: report.segment_count,
                    speaker_count: report.speaker_count,
                    output_file: report.output_file,
                };
                if let Err(e) = self.gateway.show_result(&outcome).await {
                    warn!(error = %e, "result dialog failed");
                }

                Ok(PipelineState::Succeeded)
            }
            Err(fault) => {
                let elapsed_label = format_elapsed(started.elapsed().as_secs_f64());
                let error_msg = fault.to_string();
                error!(error = %error_msg, elapsed = %elapsed_label, "transcription failed");

                // Relocate the source into the failure bucket, synthesizing
                // a name when the fault predates naming. Best-effort only.
                let fallback = match canonical {
                    Some(assigned) => assigned,
                    None => self.placement.canonical_name(FALLBACK_LANGUAGE),
                };
                match self.placement.move_video(&source.path, &fallback, false).await {
                    Ok(moved) => info!(video = %moved.display(), "moved to failure bucket"),
                    Err(e) => warn!(error = %e, "failed to relocate source after fault"),
                }

                let outcome = PipelineOutcome::Failure {
                    name,
                    elapsed_label,
                    error: error_msg.clone(),
                };
                if let Err(e) = self.gateway.show_result(&outcome).await {
                    warn!(error = %e, "result dialog failed");
                }

                Ok(PipelineState::Failed { error: error_msg })
            }
        }
    }

    /// The four stages. Writes the canonical name through `canonical` as
    /// soon as it is assigned so the failure path can reuse it.
    async fn run_stages(
        &self,
        source: &SourceFile,
        canonical: &mut Option<String>,
    ) -> Result<SuccessReport, StageError> {
        let name = source.file_name();

        // ── stage 1/4: extract audio ─────────────────────────────────
        self.stage(&name, &PipelineState::ExtractingAudio, "1/4 extracting audio", None)
            .await;
        let audio_path = self
            .engine
            .extract_audio(&source.path)
            .await
            .map_err(|e| StageError::ExtractAudio(e.to_string()))?;
        let duration_secs = self
            .engine
            .audio_duration(&audio_path)
            .await
            .map_err(|e| StageError::ExtractAudio(e.to_string()))?;
        let duration_label = format_duration(duration_secs);
        info!(duration_secs, "audio extracted");

        let result = self
            .recognize_and_persist(source, &name, &audio_path, duration_secs, &duration_label, canonical)
            .await;

        // The transient audio is done with, whether or not a later stage faulted
        if let Err(e) = tokio::fs::remove_file(&audio_path).await {
            warn!(error = %e, audio = %audio_path.display(), "failed to delete transient audio");
        }

        result
    }

    /// Stages 2 through 4; the caller owns the audio artifact's cleanup.
    async fn recognize_and_persist(
        &self,
        source: &SourceFile,
        name: &str,
        audio_path: &Path,
        duration_secs: f64,
        duration_label: &str,
        canonical: &mut Option<String>,
    ) -> Result<SuccessReport, StageError> {
        // ── stage 2/4: detect language ───────────────────────────────
        self.stage(
            name,
            &PipelineState::DetectingLanguage,
            "2/4 detecting language",
            Some(&format!("audio length: {}", duration_label)),
        )
        .await;
        let language = self
            .engine
            .detect_language(audio_path)
            .await
            .map_err(|e| StageError::DetectLanguage(e.to_string()))?;
        let lang_label = language_label(&language);
        info!(%language, "language detected");

        // ── stage 3/4: transcribe ────────────────────────────────────
        self.stage(
            name,
            &PipelineState::Transcribing,
            "3/4 transcribing",
            Some(&format!("language: {} | length: {}", lang_label, duration_label)),
        )
        .await;
        let segments = {
            let _permit = self
                .transcribe_gate
                .acquire()
                .await
                .map_err(|e| StageError::Transcribe(e.to_string()))?;
            self.engine
                .transcribe(audio_path)
                .await
                .map_err(|e| StageError::Transcribe(e.to_string()))?
        };
        info!(segments = segments.len(), "transcription complete");

        // ── stage 4/4: persist output ────────────────────────────────
        self.stage(name, &PipelineState::Persisting, "4/4 saving output", None)
            .await;
        let assigned = self.placement.canonical_name(&language);
        *canonical = Some(assigned.clone());

        let output_path = self
            .placement
            .save_transcript(&assigned, &language, duration_secs, &segments)
            .await
            .map_err(|e| StageError::Persist(e.to_string()))?;
        let moved = self
            .placement
            .move_video(&source.path, &assigned, true)
            .await
            .map_err(|e| StageError::Persist(e.to_string()))?;
        info!(
            transcript = %output_path.display(),
            video = %moved.display(),
            "artifacts persisted"
        );

        let output_file = output_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Ok(SuccessReport {
            name: assigned,
            language_label: lang_label,
            duration_label: duration_label.to_string(),
            segment_count: segments.len(),
            speaker_count: speaker_count(&segments),
            output_file,
        })
    }

    /// Log a stage transition and push the progress notification
    async fn stage(&self, name: &str, state: &PipelineState, label: &str, detail: Option<&str>) {
        info!(state = ?state, label, "stage transition");
        if let Err(e) = self.gateway.notify_stage(name, label, detail).await {
            warn!(error = %e, label, "stage notification failed");
        }
    }
}
