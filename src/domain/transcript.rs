//! Transcript segments and human-facing formatting rules.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Language label substituted when a run fails before detection succeeds
pub const FALLBACK_LANGUAGE: &str = "unknown";

/// A single transcribed utterance, in playback order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start offset in seconds
    pub start_secs: f64,

    /// End offset in seconds
    pub end_secs: f64,

    /// Recognized text
    pub text: String,

    /// Speaker label, when diarization produced one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

/// Count distinct non-empty speaker labels, floored at 1.
///
/// The floor applies even when no segment carries a label (or there are no
/// segments at all): a transcript always has at least one speaker.
pub fn speaker_count(segments: &[TranscriptSegment]) -> usize {
    let speakers: HashSet<&str> = segments
        .iter()
        .filter_map(|s| s.speaker.as_deref())
        .filter(|s| !s.is_empty())
        .collect();
    speakers.len().max(1)
}

/// Map a detected language code to a display label.
///
/// Closed table; unknown codes pass through verbatim.
pub fn language_label(code: &str) -> String {
    match code {
        "zh" => "Chinese".to_string(),
        "en" => "English".to_string(),
        "en_cn" => "Chinese/English".to_string(),
        other => other.to_string(),
    }
}

/// Elapsed-time label: "45s" under a minute, "2m5s" at or above.
pub fn format_elapsed(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.0}s", seconds)
    } else {
        let total = seconds as u64;
        format!("{}m{}s", total / 60, total % 60)
    }
}

/// Audio-duration label: "2.1 min" at or above a minute, "45 sec" under.
pub fn format_duration(seconds: f64) -> String {
    if seconds >= 60.0 {
        format!("{:.1} min", seconds / 60.0)
    } else {
        format!("{:.0} sec", seconds)
    }
}

/// mm:ss offset label for transcript rendering
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(speaker: Option<&str>) -> TranscriptSegment {
        TranscriptSegment {
            start_secs: 0.0,
            end_secs: 1.0,
            text: "hello".to_string(),
            speaker: speaker.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_elapsed_under_a_minute() {
        assert_eq!(format_elapsed(45.0), "45s");
        assert_eq!(format_elapsed(0.4), "0s");
    }

    #[test]
    fn test_elapsed_minutes_and_seconds() {
        assert_eq!(format_elapsed(125.0), "2m5s");
        assert_eq!(format_elapsed(60.0), "1m0s");
        assert_eq!(format_elapsed(3599.0), "59m59s");
    }

    #[test]
    fn test_duration_label() {
        assert_eq!(format_duration(125.0), "2.1 min");
        assert_eq!(format_duration(45.0), "45 sec");
        assert_eq!(format_duration(60.0), "1.0 min");
    }

    #[test]
    fn test_speaker_count_distinct() {
        let segments = vec![seg(Some("spk1")), seg(Some("spk1")), seg(Some("spk2"))];
        assert_eq!(speaker_count(&segments), 2);
    }

    #[test]
    fn test_speaker_count_floor() {
        // Unlabeled segments still report one speaker
        let segments = vec![seg(None), seg(Some(""))];
        assert_eq!(speaker_count(&segments), 1);

        // So does an empty transcript
        assert_eq!(speaker_count(&[]), 1);
    }

    #[test]
    fn test_language_labels() {
        assert_eq!(language_label("zh"), "Chinese");
        assert_eq!(language_label("en"), "English");
        assert_eq!(language_label("en_cn"), "Chinese/English");
        assert_eq!(language_label("ja"), "ja");
    }

    #[test]
    fn test_timestamp_label() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(75.3), "01:15");
    }
}
