//! Defines the `TrackMetadata` struct, a unified representation of track
//! information coming back from the remote resolver.

use crate::commands::music::utils::music_manager::MusicError;
use serde::{Deserialize, Serialize};
use std::process::Output;
use std::time::Duration;

/// Unified representation of metadata for a playable remote track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackMetadata {
    /// The title of the track.
    pub title: String,
    /// The direct URL to the track, if available.
    pub url: Option<String>,
    /// The duration of the track, if available.
    #[serde(with = "humantime_serde")]
    pub duration: Option<Duration>,
    /// URL to a thumbnail image for the track, if available.
    pub thumbnail: Option<String>,
    /// The name of the user who requested the track.
    pub requested_by: Option<String>,
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self {
            title: "Unknown Track".to_string(),
            url: None,
            duration: None,
            thumbnail: None,
            requested_by: None,
        }
    }
}

impl TrackMetadata {
    pub fn with_requestor(mut self, requested_by: &str) -> Self {
        self.requested_by = Some(requested_by.to_string());
        self
    }

    /// Parses a single JSON object (one line of `yt-dlp -j` output) into
    /// metadata. Missing fields get defaults rather than failing the track.
    pub fn from_json_value(value: &serde_json::Value) -> Self {
        let title = value["title"]
            .as_str()
            .unwrap_or("Unknown Title")
            .to_string();

        let duration = value["duration"].as_f64().map(Duration::from_secs_f64);
        let thumbnail = value["thumbnail"].as_str().map(|s| s.to_string());
        let url = value["webpage_url"]
            .as_str()
            .or_else(|| value["url"].as_str())
            .map(|s| s.to_string());

        TrackMetadata {
            title,
            url,
            duration,
            thumbnail,
            requested_by: None,
        }
    }
}

/// Converts the output of `yt-dlp --dump-json` into `TrackMetadata`.
impl TryFrom<Output> for TrackMetadata {
    type Error = MusicError;

    fn try_from(value: Output) -> Result<Self, Self::Error> {
        if !value.status.success() {
            let stderr = String::from_utf8_lossy(&value.stderr);
            return Err(MusicError::AudioSourceError(format!(
                "yt-dlp exited with an error: {}",
                stderr.trim()
            )));
        }

        let metadata_str = String::from_utf8_lossy(&value.stdout);
        let metadata_json: serde_json::Value =
            serde_json::from_str(metadata_str.trim()).map_err(|e| {
                MusicError::AudioSourceError(format!("Failed to parse video metadata: {}", e))
            })?;

        Ok(Self::from_json_value(&metadata_json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_value_with_defaults() {
        let value: serde_json::Value = serde_json::from_str(
            r#"{"title": "Sample Song", "webpage_url": "https://example.com/v/1", "duration": 212.0}"#,
        )
        .unwrap();

        let meta = TrackMetadata::from_json_value(&value);
        assert_eq!(meta.title, "Sample Song");
        assert_eq!(meta.url.as_deref(), Some("https://example.com/v/1"));
        assert_eq!(meta.duration, Some(Duration::from_secs(212)));
        assert!(meta.thumbnail.is_none());
    }

    #[test]
    fn missing_title_gets_placeholder() {
        let value: serde_json::Value = serde_json::from_str(r#"{"duration": 1.0}"#).unwrap();
        let meta = TrackMetadata::from_json_value(&value);
        assert_eq!(meta.title, "Unknown Title");
    }
}
