//! File placement: canonical names, transcript artifacts, relocation.
//!
//! Canonical names are `YYYYMMDD_HHMMSS_<language>` in local time, with a
//! numeric suffix on collision. Transcripts render as markdown; processed
//! videos move into the success bucket under their canonical name, failed
//! ones into the failure bucket.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use tokio::fs;

use super::FilePlacement;
use crate::domain::{format_duration, format_timestamp, language_label, TranscriptSegment};

/// Disk-backed placement with separate transcript, success, and failure roots
pub struct WorkspacePlacement {
    transcript_dir: PathBuf,
    video_dir: PathBuf,
    failed_dir: PathBuf,
}

impl WorkspacePlacement {
    pub fn new(transcript_dir: PathBuf, video_dir: PathBuf, failed_dir: PathBuf) -> Self {
        Self {
            transcript_dir,
            video_dir,
            failed_dir,
        }
    }

    fn transcript_path(&self, name: &str) -> PathBuf {
        self.transcript_dir.join(format!("{}.md", name))
    }
}

#[async_trait]
impl FilePlacement for WorkspacePlacement {
    fn canonical_name(&self, language: &str) -> String {
        let base = format!("{}_{}", Local::now().format("%Y%m%d_%H%M%S"), language);

        // Suffix on collision with an existing transcript
        let mut name = base.clone();
        let mut counter = 2;
        while self.transcript_path(&name).exists() {
            name = format!("{}-{}", base, counter);
            counter += 1;
        }
        name
    }

    async fn save_transcript(
        &self,
        name: &str,
        language: &str,
        duration_secs: f64,
        segments: &[TranscriptSegment],
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.transcript_dir)
            .await
            .context("Failed to create transcript directory")?;

        let mut body = String::new();
        body.push_str(&format!("# {}\n\n", name));
        body.push_str(&format!("- Language: {}\n", language_label(language)));
        body.push_str(&format!("- Duration: {}\n", format_duration(duration_secs)));
        body.push_str(&format!("- Segments: {}\n\n", segments.len()));
        body.push_str("## Transcript\n\n");

        for segment in segments {
            let span = format!(
                "[{} → {}]",
                format_timestamp(segment.start_secs),
                format_timestamp(segment.end_secs)
            );
            match segment.speaker.as_deref().filter(|s| !s.is_empty()) {
                Some(speaker) => {
                    body.push_str(&format!("**{} {}:** {}\n\n", span, speaker, segment.text))
                }
                None => body.push_str(&format!("**{}** {}\n\n", span, segment.text)),
            }
        }

        let path = self.transcript_path(name);
        fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write transcript: {}", path.display()))?;

        Ok(path)
    }

    async fn move_video(&self, source: &Path, name: &str, success: bool) -> Result<PathBuf> {
        let dest_dir = if success {
            &self.video_dir
        } else {
            &self.failed_dir
        };
        fs::create_dir_all(dest_dir)
            .await
            .context("Failed to create destination directory")?;

        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let dest = dest_dir.join(format!("{}.{}", name, extension));

        // rename fails across filesystems; fall back to copy + remove
        match fs::rename(source, &dest).await {
            Ok(()) => {}
            Err(_) => {
                fs::copy(source, &dest)
                    .await
                    .with_context(|| format!("Failed to copy video to {}", dest.display()))?;
                fs::remove_file(source)
                    .await
                    .with_context(|| format!("Failed to remove source {}", source.display()))?;
            }
        }

        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn placement(temp: &TempDir) -> WorkspacePlacement {
        WorkspacePlacement::new(
            temp.path().join("transcripts"),
            temp.path().join("videos"),
            temp.path().join("failed"),
        )
    }

    fn seg(start: f64, end: f64, text: &str, speaker: Option<&str>) -> TranscriptSegment {
        TranscriptSegment {
            start_secs: start,
            end_secs: end,
            text: text.to_string(),
            speaker: speaker.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_canonical_name_shape() {
        let temp = TempDir::new().unwrap();
        let placement = placement(&temp);

        let name = placement.canonical_name("zh");
        assert!(name.ends_with("_zh"), "unexpected name: {}", name);
        // YYYYMMDD_HHMMSS_zh
        assert_eq!(name.len(), "20260830_120000_zh".len());
    }

    #[tokio::test]
    async fn test_canonical_name_collision_suffix() {
        let temp = TempDir::new().unwrap();
        let placement = placement(&temp);

        let first = placement.canonical_name("en");
        placement
            .save_transcript(&first, "en", 10.0, &[])
            .await
            .unwrap();

        let second = placement.canonical_name("en");
        assert_ne!(first, second);
        assert!(second.ends_with("-2"), "unexpected name: {}", second);
    }

    #[tokio::test]
    async fn test_save_transcript_contents() {
        let temp = TempDir::new().unwrap();
        let placement = placement(&temp);

        let segments = vec![
            seg(0.0, 12.0, "hello", Some("spk0")),
            seg(12.0, 75.0, "world", None),
        ];
        let path = placement
            .save_transcript("20260830_120000_zh", "zh", 125.0, &segments)
            .await
            .unwrap();

        let content = fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("# 20260830_120000_zh"));
        assert!(content.contains("- Language: Chinese"));
        assert!(content.contains("- Duration: 2.1 min"));
        assert!(content.contains("- Segments: 2"));
        assert!(content.contains("**[00:00 → 00:12] spk0:** hello"));
        assert!(content.contains("**[00:12 → 01:15]** world"));
    }

    #[tokio::test]
    async fn test_move_video_buckets() {
        let temp = TempDir::new().unwrap();
        let placement = placement(&temp);

        let source = temp.path().join("clip.mp4");
        fs::write(&source, b"video bytes").await.unwrap();

        let dest = placement.move_video(&source, "name_zh", true).await.unwrap();
        assert_eq!(dest, temp.path().join("videos").join("name_zh.mp4"));
        assert!(dest.exists());
        assert!(!source.exists());

        let source2 = temp.path().join("bad.mov");
        fs::write(&source2, b"video bytes").await.unwrap();

        let dest2 = placement
            .move_video(&source2, "name_unknown", false)
            .await
            .unwrap();
        assert_eq!(dest2, temp.path().join("failed").join("name_unknown.mov"));
        assert!(dest2.exists());
    }

    #[tokio::test]
    async fn test_move_missing_video_is_an_error() {
        let temp = TempDir::new().unwrap();
        let placement = placement(&temp);

        let result = placement
            .move_video(Path::new("/nonexistent/clip.mp4"), "n", true)
            .await;
        assert!(result.is_err());
    }
}
