//! Desktop notification gateway backed by osascript.
//!
//! Dialogs block until the operator answers; banners are fire-and-forget
//! with a short timeout so a wedged notification daemon cannot stall a run.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use super::NotificationGateway;
use crate::domain::PipelineOutcome;

const BANNER_TIMEOUT: Duration = Duration::from_secs(10);
const DIALOG_TITLE: &str = "Autoscribe";

/// osascript-backed dialogs and notifications
pub struct DialogNotifier {
    /// Path to the osascript binary (default: "osascript")
    binary_path: String,
}

impl Default for DialogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogNotifier {
    pub fn new() -> Self {
        Self {
            binary_path: "osascript".to_string(),
        }
    }

    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Escape a string for embedding in an AppleScript literal
    fn escape(text: &str) -> String {
        text.replace('\\', "\\\\").replace('"', "\\\"")
    }

    /// Run a script and return stdout
    async fn run_script(&self, script: &str) -> Result<String> {
        let output = Command::new(&self.binary_path)
            .args(["-e", script])
            .output()
            .await
            .context("Failed to run osascript")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("osascript failed: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Transient banner notification; bounded so it can never block a run
    pub async fn banner(&self, title: &str, message: &str) -> Result<()> {
        let script = format!(
            r#"display notification "{}" with title "{}""#,
            Self::escape(message),
            Self::escape(title)
        );

        timeout(BANNER_TIMEOUT, self.run_script(&script))
            .await
            .context("notification timed out")??;

        Ok(())
    }

    /// Modal dialog with a single OK button
    async fn dialog(&self, message: &str) -> Result<()> {
        let script = format!(
            r#"display dialog "{}" with title "{}" buttons {{"OK"}} default button "OK""#,
            Self::escape(message),
            DIALOG_TITLE
        );
        self.run_script(&script).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for DialogNotifier {
    async fn ask_confirm(&self, name: &str, size_mb: f64) -> Result<bool> {
        let message = format!("New video detected:\n\n{} ({:.1} MB)\n\nTranscribe it?", name, size_mb);
        let script = format!(
            r#"display dialog "{}" with title "{}" buttons {{"Skip", "Transcribe"}} default button "Transcribe""#,
            Self::escape(&message),
            DIALOG_TITLE
        );

        // No timeout: the dialog blocks this file's pipeline until answered
        let stdout = self.run_script(&script).await?;
        Ok(stdout.contains("button returned:Transcribe"))
    }

    async fn notify_start(&self, name: &str, size_mb: f64) -> Result<()> {
        self.banner(
            DIALOG_TITLE,
            &format!("Transcribing {} ({:.1} MB)", name, size_mb),
        )
        .await
    }

    async fn notify_stage(&self, name: &str, label: &str, detail: Option<&str>) -> Result<()> {
        let message = match detail {
            Some(detail) => format!("{}\n{}", label, detail),
            None => label.to_string(),
        };
        self.banner(&format!("{} — {}", DIALOG_TITLE, name), &message).await
    }

    async fn show_result(&self, outcome: &PipelineOutcome) -> Result<()> {
        let message = match outcome {
            PipelineOutcome::Success {
                name,
                language_label,
                duration_label,
                elapsed_label,
                segment_count,
                speaker_count,
                output_file,
            } => format!(
                "✅ Transcription complete\n\n{}\nLanguage: {}\nAudio length: {}\nTook: {}\nSegments: {} | Speakers: {}\nOutput: {}",
                name, language_label, duration_label, elapsed_label, segment_count, speaker_count, output_file
            ),
            PipelineOutcome::Failure {
                name,
                elapsed_label,
                error,
            } => format!(
                "❌ Transcription failed\n\n{}\nAfter: {}\n\n{}",
                name, elapsed_label, error
            ),
        };
        self.dialog(&message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_quotes() {
        assert_eq!(DialogNotifier::escape(r#"a "b" c"#), r#"a \"b\" c"#);
        assert_eq!(DialogNotifier::escape(r"back\slash"), r"back\\slash");
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let notifier = DialogNotifier::with_binary_path("/nonexistent/osascript");
        let result = notifier.banner("t", "m").await;
        assert!(result.is_err());
    }
}
