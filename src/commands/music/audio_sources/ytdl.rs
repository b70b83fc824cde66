//! Wraps the `yt-dlp` command line tool for resolving queries and URLs
//! into `SearchOutcome`s. This is the only place that shells out for
//! metadata; audio streaming itself goes through songbird's `YoutubeDl`
//! input.

use std::process::Command;

use tracing::{debug, info};

use super::{AudioSourceResult, SearchOutcome, TrackMetadata, is_http_url};
use crate::commands::music::utils::music_manager::MusicError;

/// Resolver over `yt-dlp` for URLs, playlists, and free-text searches.
#[derive(Default)]
pub struct YtDlpResolver;

impl YtDlpResolver {
    /// Resolves an arbitrary query string into a `SearchOutcome`.
    ///
    /// URLs carrying a `list=` parameter are treated as playlists; other
    /// URLs resolve to a single track; everything else becomes a
    /// `ytsearch:` free-text search. Errors are folded into
    /// `SearchOutcome::LoadFailed` so callers get a tagged outcome either
    /// way.
    pub fn resolve(&self, query: &str, requested_by: &str) -> SearchOutcome {
        let result = if is_http_url(query) {
            if query.contains("list=") {
                self.fetch_playlist(query, requested_by)
            } else {
                self.fetch_single(query, requested_by)
            }
        } else {
            self.fetch_search(query, requested_by)
        };

        match result {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!("yt-dlp resolution failed for '{}': {}", query, err);
                SearchOutcome::LoadFailed(err.to_string())
            }
        }
    }

    /// Fetches metadata for a single video URL.
    fn fetch_single(&self, url: &str, requested_by: &str) -> AudioSourceResult<SearchOutcome> {
        info!("Probing URL for metadata: {}", url);

        let output = Command::new("yt-dlp")
            .args([
                "-j",            // Output as JSON
                "--no-playlist", // Don't process playlists
                url,
            ])
            .output()
            .map_err(|e| {
                MusicError::AudioSourceError(format!("Failed to get video metadata: {}", e))
            })?;

        let metadata = TrackMetadata::try_from(output)?.with_requestor(requested_by);
        Ok(SearchOutcome::SingleTrack(metadata))
    }

    /// Fetches metadata for the first search result of a free-text query.
    fn fetch_search(&self, term: &str, requested_by: &str) -> AudioSourceResult<SearchOutcome> {
        info!("Searching for term: {}", term);
        let search_param = format!("ytsearch:{}", term);

        let output = Command::new("yt-dlp")
            .args(["-j", "--no-playlist", &search_param])
            .output()
            .map_err(|e| {
                MusicError::AudioSourceError(format!("Failed to get video metadata: {}", e))
            })?;

        if output.status.success() && output.stdout.is_empty() {
            return Ok(SearchOutcome::NoMatches);
        }

        let metadata = TrackMetadata::try_from(output)?.with_requestor(requested_by);
        Ok(SearchOutcome::SingleTrack(metadata))
    }

    /// Fetches a playlist's entries without resolving each video fully.
    fn fetch_playlist(&self, url: &str, requested_by: &str) -> AudioSourceResult<SearchOutcome> {
        info!("Fetching playlist metadata: {}", url);

        let output = Command::new("yt-dlp")
            .args([
                "-J", // Single JSON document for the whole playlist
                "--flat-playlist",
                url,
            ])
            .output()
            .map_err(|e| {
                MusicError::AudioSourceError(format!("Failed to get playlist metadata: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MusicError::AudioSourceError(format!(
                "yt-dlp exited with an error: {}",
                stderr.trim()
            )));
        }

        let json: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(|e| {
                MusicError::AudioSourceError(format!("Failed to parse playlist metadata: {}", e))
            })?;

        let name = json["title"].as_str().unwrap_or("Unnamed Playlist").to_string();
        let tracks: Vec<TrackMetadata> = json["entries"]
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| {
                        TrackMetadata::from_json_value(entry).with_requestor(requested_by)
                    })
                    .collect()
            })
            .unwrap_or_default();

        if tracks.is_empty() {
            return Ok(SearchOutcome::NoMatches);
        }

        Ok(SearchOutcome::Playlist(tracks, name))
    }
}
