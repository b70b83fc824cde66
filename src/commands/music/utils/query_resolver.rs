//! Classifies an incoming text query, probes URLs for a human-readable
//! title, and prepares the string used against the local file index.
//!
//! Probe failures degrade to fallback strings and are recorded in the
//! attempt log; nothing here is fatal to the overall request.

use std::sync::Arc;

use serenity::model::id::GuildId;
use tracing::{debug, info};

use crate::commands::music::audio_sources::{SearchOutcome, is_http_url};

use super::remote_node::RemoteBackend;

/// How the raw query was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOrigin {
    Url,
    FreeText,
}

/// One remote search call made on behalf of a request, kept for the
/// all-strategies-failed report.
#[derive(Debug, Clone)]
pub struct SearchAttempt {
    pub strategy: &'static str,
    pub detail: String,
    pub success: bool,
}

impl SearchAttempt {
    fn from_outcome(strategy: &'static str, outcome: &SearchOutcome) -> Self {
        Self {
            strategy,
            detail: outcome.describe(),
            success: outcome.is_usable(),
        }
    }
}

/// The resolver's verdict on a single query.
#[derive(Debug, Clone)]
pub struct ResolvedQuery {
    pub origin: QueryOrigin,
    /// String to run against the local file index.
    pub local_search: String,
    /// A search outcome already fetched while resolving, retained so the
    /// remote path never repeats a network round trip.
    pub prefetched: Option<SearchOutcome>,
    /// Playlists are never eligible for local substitution.
    pub skip_local: bool,
    pub attempts: Vec<SearchAttempt>,
}

pub struct QueryResolver {
    remote: Arc<dyn RemoteBackend>,
}

impl QueryResolver {
    pub fn new(remote: Arc<dyn RemoteBackend>) -> Self {
        Self { remote }
    }

    pub async fn resolve(
        &self,
        guild_id: GuildId,
        raw_query: &str,
        requested_by: &str,
    ) -> ResolvedQuery {
        let query = normalize_whitespace(raw_query);

        if is_http_url(&query) {
            self.resolve_url(guild_id, &query, requested_by).await
        } else {
            self.resolve_free_text(guild_id, &query, requested_by).await
        }
    }

    /// Probes the URL for a title to match local files against. The probe
    /// does not commit to anything; its track object is retained so a later
    /// remote commit can reuse it.
    async fn resolve_url(
        &self,
        guild_id: GuildId,
        url: &str,
        requested_by: &str,
    ) -> ResolvedQuery {
        info!("Probing URL for local-match title: {}", url);
        let outcome = self.remote.search(guild_id, url, requested_by).await;
        let attempt = SearchAttempt::from_outcome("url probe", &outcome);

        let (local_search, prefetched, skip_local) = match &outcome {
            SearchOutcome::SingleTrack(track) => {
                debug!("URL probe resolved title '{}'", track.title);
                (track.title.clone(), Some(outcome.clone()), false)
            }
            SearchOutcome::Playlist(_, name) => {
                debug!("URL probe resolved playlist '{}', skipping local match", name);
                (url.to_string(), Some(outcome.clone()), true)
            }
            SearchOutcome::SearchResults(tracks) if !tracks.is_empty() => {
                // No single usable title; fall back to the raw URL for local
                // matching but keep the results for the remote path.
                (url.to_string(), Some(outcome.clone()), false)
            }
            _ => {
                debug!("URL probe yielded nothing usable, falling back to raw URL");
                (url.to_string(), None, false)
            }
        };

        ResolvedQuery {
            origin: QueryOrigin::Url,
            local_search,
            prefetched,
            skip_local,
            attempts: vec![attempt],
        }
    }

    /// Free-text path: a preliminary search detects playlists early and
    /// doubles as the remote candidate, so a both-match prompt that falls
    /// through to the online path needs no second search.
    async fn resolve_free_text(
        &self,
        guild_id: GuildId,
        query: &str,
        requested_by: &str,
    ) -> ResolvedQuery {
        let outcome = self.remote.search(guild_id, query, requested_by).await;
        let attempt = SearchAttempt::from_outcome("pre-search", &outcome);

        let (prefetched, skip_local) = match &outcome {
            SearchOutcome::Playlist(_, name) => {
                debug!("Query resolved to playlist '{}', skipping local match", name);
                (Some(outcome.clone()), true)
            }
            o if o.is_usable() => (Some(outcome.clone()), false),
            _ => (None, false),
        };

        ResolvedQuery {
            origin: QueryOrigin::FreeText,
            local_search: query.to_string(),
            prefetched,
            skip_local,
            attempts: vec![attempt],
        }
    }
}

/// Collapses runs of whitespace and trims the ends.
pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn whitespace_is_collapsed_and_trimmed() {
        assert_eq!(normalize_whitespace("  never   gonna \t give  "), "never gonna give");
        assert_eq!(normalize_whitespace("one"), "one");
        assert_eq!(normalize_whitespace("   "), "");
    }
}
