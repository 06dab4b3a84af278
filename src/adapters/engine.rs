//! FunASR transcription engine adapter.
//!
//! Audio handling shells out to ffmpeg/ffprobe; recognition shells out to a
//! FunASR runner CLI that emits JSON on stdout. The recognition model is
//! warmed up once per process and reused by every subsequent call.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::TranscriptionEngine;
use crate::config::EngineSettings;
use crate::domain::TranscriptSegment;

/// Errors raised by the engine adapter
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("video not found: {0}")]
    VideoNotFound(PathBuf),

    #[error("audio extraction failed: {0}")]
    Extract(String),

    #[error("duration probe failed: {0}")]
    Probe(String),

    #[error("language detection failed: {0}")]
    Detect(String),

    #[error("recognition failed: {0}")]
    Recognize(String),

    #[error("unreadable engine output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// FunASR-backed engine (extraction, detection, recognition)
pub struct FunAsrEngine {
    settings: EngineSettings,

    /// Transient audio artifacts land here
    work_dir: PathBuf,

    /// Completed once the recognition model has been loaded
    model_warm: OnceCell<()>,
}

#[derive(Debug, Deserialize)]
struct DetectOutput {
    language: String,
}

/// One recognition result from the runner (FunASR shape)
#[derive(Debug, Deserialize)]
struct RawResult {
    #[serde(default)]
    text: String,
    #[serde(default)]
    sentence_info: Vec<RawSentence>,
}

#[derive(Debug, Deserialize)]
struct RawSentence {
    /// Start offset in milliseconds
    #[serde(default)]
    start: f64,
    /// End offset in milliseconds
    #[serde(default)]
    end: f64,
    #[serde(default)]
    text: String,
    /// Speaker id; FunASR emits an integer, some runners a string
    #[serde(default)]
    spk: Option<serde_json::Value>,
}

impl FunAsrEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            work_dir: std::env::temp_dir(),
            model_warm: OnceCell::new(),
        }
    }

    pub fn with_work_dir(settings: EngineSettings, work_dir: PathBuf) -> Self {
        Self {
            settings,
            work_dir,
            model_warm: OnceCell::new(),
        }
    }

    /// Run a command, surfacing stderr on failure
    async fn run(mut command: Command, map_err: fn(String) -> EngineError) -> Result<Vec<u8>, EngineError> {
        let output = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| map_err(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            return Err(map_err(format!(
                "exit code {}: {}",
                exit_code,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }

    /// Load the recognition model once per process (idempotent).
    ///
    /// The runner's warmup subcommand downloads and initializes the model;
    /// later transcribe calls hit the warm cache.
    async fn ensure_model(&self) -> Result<(), EngineError> {
        self.model_warm
            .get_or_try_init(|| async {
                tracing::info!(model = %self.settings.asr_model, "loading recognition model");
                let mut command = Command::new(&self.settings.runner_path);
                command.args(["warmup", "--model", &self.settings.asr_model]);
                Self::run(command, EngineError::Recognize).await?;
                Ok::<(), EngineError>(())
            })
            .await?;
        Ok(())
    }
}

/// Parse the runner's JSON output into ordered segments.
///
/// Timestamps arrive in milliseconds. When the result carries text but no
/// sentence breakdown, the whole text becomes a single unattributed segment.
pub fn parse_result(raw: &str) -> Result<Vec<TranscriptSegment>, EngineError> {
    let results: Vec<RawResult> = serde_json::from_str(raw)?;

    let mut segments = Vec::new();
    for result in &results {
        for sentence in &result.sentence_info {
            let speaker = sentence.spk.as_ref().and_then(|v| match v {
                serde_json::Value::Number(n) => Some(format!("spk{}", n)),
                serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
                _ => None,
            });
            segments.push(TranscriptSegment {
                start_secs: sentence.start / 1000.0,
                end_secs: sentence.end / 1000.0,
                text: sentence.text.trim().to_string(),
                speaker,
            });
        }
    }

    if segments.is_empty() {
        if let Some(result) = results.iter().find(|r| !r.text.trim().is_empty()) {
            segments.push(TranscriptSegment {
                start_secs: 0.0,
                end_secs: 0.0,
                text: result.text.trim().to_string(),
                speaker: None,
            });
        }
    }

    Ok(segments)
}

#[async_trait]
impl TranscriptionEngine for FunAsrEngine {
    async fn extract_audio(&self, video: &Path) -> Result<PathBuf> {
        if !video.exists() {
            return Err(EngineError::VideoNotFound(video.to_path_buf()).into());
        }

        // Mono 16 kHz PCM, the rate the recognition models expect
        let audio_path = self.work_dir.join(format!("{}.wav", Uuid::new_v4()));
        let mut command = Command::new(&self.settings.ffmpeg_path);
        command
            .args(["-y", "-i"])
            .arg(video)
            .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
            .arg(&audio_path);

        Self::run(command, EngineError::Extract).await?;

        if !audio_path.exists() {
            return Err(EngineError::Extract("output file was not created".to_string()).into());
        }

        tracing::debug!(audio = %audio_path.display(), "audio extracted");
        Ok(audio_path)
    }

    async fn audio_duration(&self, audio: &Path) -> Result<f64> {
        let mut command = Command::new(&self.settings.ffprobe_path);
        command
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(audio);

        let stdout = Self::run(command, EngineError::Probe).await?;
        let text = String::from_utf8_lossy(&stdout);
        let seconds: f64 = text
            .trim()
            .parse()
            .map_err(|e| EngineError::Probe(format!("bad duration '{}': {}", text.trim(), e)))?;

        Ok(seconds)
    }

    async fn detect_language(&self, audio: &Path) -> Result<String> {
        let mut command = Command::new(&self.settings.runner_path);
        command
            .args(["detect", "--model", &self.settings.detect_model, "--input"])
            .arg(audio);

        let stdout = Self::run(command, EngineError::Detect).await?;
        let output: DetectOutput = serde_json::from_str(String::from_utf8_lossy(&stdout).trim())
            .map_err(EngineError::Parse)?;

        Ok(output.language)
    }

    async fn transcribe(&self, audio: &Path) -> Result<Vec<TranscriptSegment>> {
        self.ensure_model().await?;

        let mut command = Command::new(&self.settings.runner_path);
        command
            .args(["transcribe", "--model", &self.settings.asr_model, "--input"])
            .arg(audio);

        let stdout = Self::run(command, EngineError::Recognize).await?;
        let segments = parse_result(&String::from_utf8_lossy(&stdout))?;

        Ok(segments)
    }
}
