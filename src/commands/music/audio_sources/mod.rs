//! Types shared by everything that resolves audio from the network:
//! track metadata, the tagged outcome of a remote search, and the
//! yt-dlp-backed resolution helpers.

/// Submodule defining the `TrackMetadata` struct used across audio sources.
pub mod track_metadata;
/// Submodule wrapping the `yt-dlp` command line tool for search and probing.
pub mod ytdl;

use crate::commands::music::utils::music_manager::MusicError;

pub use track_metadata::TrackMetadata;

/// A specialized `Result` type for operations within the `audio_sources` module.
pub type AudioSourceResult<T> = Result<T, MusicError>;

/// Tagged result of a single remote search call.
///
/// Consumed exactly once per playback request and never persisted; the
/// `LoadFailed` variant carries the upstream error text so the decision
/// engine can report it in the attempt log.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// The search completed but produced nothing playable.
    NoMatches,
    /// The search itself failed (network error, resolver crash, ...).
    LoadFailed(String),
    /// Exactly one playable track was resolved.
    SingleTrack(TrackMetadata),
    /// A list of candidate tracks, best match first.
    SearchResults(Vec<TrackMetadata>),
    /// A whole playlist, with its human-readable name.
    Playlist(Vec<TrackMetadata>, String),
}

impl SearchOutcome {
    /// Whether this outcome carries at least one playable track.
    pub fn is_usable(&self) -> bool {
        match self {
            SearchOutcome::NoMatches | SearchOutcome::LoadFailed(_) => false,
            SearchOutcome::SingleTrack(_) => true,
            SearchOutcome::SearchResults(tracks) | SearchOutcome::Playlist(tracks, _) => {
                !tracks.is_empty()
            }
        }
    }

    /// Short human-readable tag for attempt logs and feedback strings.
    pub fn describe(&self) -> String {
        match self {
            SearchOutcome::NoMatches => "no matches".to_string(),
            SearchOutcome::LoadFailed(reason) => format!("load failed: {}", reason),
            SearchOutcome::SingleTrack(track) => format!("track '{}'", track.title),
            SearchOutcome::SearchResults(tracks) => format!("{} result(s)", tracks.len()),
            SearchOutcome::Playlist(tracks, name) => {
                format!("playlist '{}' ({} tracks)", name, tracks.len())
            }
        }
    }
}

/// Performs a basic check if the input string should be treated as a URL
/// rather than a free-text search.
pub fn is_http_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_classification() {
        assert!(is_http_url("https://example.com/video123"));
        assert!(is_http_url("http://example.com"));
        assert!(!is_http_url("never gonna give you up"));
        // A bare domain without a scheme is a search, not a URL.
        assert!(!is_http_url("example.com/video123"));
    }

    #[test]
    fn outcome_usability() {
        assert!(!SearchOutcome::NoMatches.is_usable());
        assert!(!SearchOutcome::LoadFailed("boom".into()).is_usable());
        assert!(!SearchOutcome::SearchResults(vec![]).is_usable());
        assert!(SearchOutcome::SingleTrack(TrackMetadata::default()).is_usable());
    }
}
