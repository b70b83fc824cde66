//! The playback decision engine.
//!
//! Per request: resolve the query, look for a local file, settle on one of
//! `{LocalOnlyMatch, RemoteOnlyMatch, BothMatch, NoMatch}`, raise the timed
//! disambiguation prompt when both sides match, clear the way through the
//! connection arbiter, and commit to exactly one backend. Every terminal
//! branch produces exactly one feedback string; sending it is the caller's
//! job.

use std::sync::Arc;

use serenity::model::id::{ChannelId, GuildId, UserId};
use tracing::{error, info, warn};

use crate::commands::music::audio_sources::{SearchOutcome, TrackMetadata};

use super::connection_arbiter::{BackendTarget, ConnectionArbiter};
use super::disambiguation::{DisambiguationPrompt, PROMPT_TIMEOUT, PromptChoice, PromptGate};
use super::local_index::{LocalFileEntry, LocalFileIndex};
use super::local_player::LocalBackend;
use super::music_manager::{MusicError, MusicResult};
use super::format_duration;
use super::query_resolver::{QueryOrigin, QueryResolver, ResolvedQuery, SearchAttempt};
use super::remote_node::RemoteBackend;

/// Marker in upstream play errors that means the track itself is unplayable
/// and the next queued one should be tried.
const UNPLAYABLE_MARKER: &str = "no supported audio streams";

/// One incoming query. Immutable; discarded after resolution.
#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    pub guild_id: GuildId,
    pub raw_query: String,
    pub requester_id: UserId,
    pub requester_name: String,
    pub voice_channel: ChannelId,
    pub text_channel: ChannelId,
}

/// The single reply owed to every request.
#[derive(Debug, Clone)]
pub struct PlaybackFeedback {
    pub message: String,
    pub success: bool,
}

impl PlaybackFeedback {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

pub struct PlaybackEngine {
    resolver: QueryResolver,
    index: Arc<LocalFileIndex>,
    arbiter: Arc<ConnectionArbiter>,
    local: Arc<dyn LocalBackend>,
    remote: Arc<dyn RemoteBackend>,
}

impl PlaybackEngine {
    pub fn new(
        index: Arc<LocalFileIndex>,
        arbiter: Arc<ConnectionArbiter>,
        local: Arc<dyn LocalBackend>,
        remote: Arc<dyn RemoteBackend>,
    ) -> Self {
        Self {
            resolver: QueryResolver::new(remote.clone()),
            index,
            arbiter,
            local,
            remote,
        }
    }

    /// Runs a request to completion. Never lets an error escape: anything
    /// unexpected is logged with guild context and converted into one
    /// generic failure reply.
    pub async fn handle_request(
        &self,
        request: &PlaybackRequest,
        prompt_gate: &dyn PromptGate,
    ) -> PlaybackFeedback {
        match self.run(request, prompt_gate).await {
            Ok(feedback) => feedback,
            Err(e) => {
                error!(
                    "Playback request failed for guild {}: {}",
                    request.guild_id, e
                );
                PlaybackFeedback::failed(format!("Something went wrong handling your request: {}", e))
            }
        }
    }

    async fn run(
        &self,
        request: &PlaybackRequest,
        prompt_gate: &dyn PromptGate,
    ) -> MusicResult<PlaybackFeedback> {
        let resolved = self
            .resolver
            .resolve(request.guild_id, &request.raw_query, &request.requester_name)
            .await;
        let mut attempts = resolved.attempts.clone();

        let local_match = if resolved.skip_local {
            None
        } else {
            self.index
                .find_match(&resolved.local_search, request.guild_id)
        };

        let remote_outcome = self
            .remote_candidate(request, &resolved, &mut attempts)
            .await;

        match (local_match, remote_outcome) {
            (Some(entry), Some(outcome)) => {
                info!(
                    "Both local file '{}' and remote candidate available for guild {}",
                    entry.title, request.guild_id
                );
                let prompt = DisambiguationPrompt {
                    local_title: entry.title.clone(),
                    remote_title: first_title(&outcome),
                    from_url: resolved.origin == QueryOrigin::Url,
                    requester_id: request.requester_id,
                    text_channel: request.text_channel,
                    timeout: PROMPT_TIMEOUT,
                };

                match prompt_gate.ask(&prompt).await {
                    PromptChoice::LocalFile => Ok(self.commit_local(request, &entry).await),
                    // Timeout degrades to the online path, reusing the
                    // already-resolved tracks so no second search happens.
                    PromptChoice::Online | PromptChoice::TimedOut => {
                        Ok(self.commit_remote(request, outcome).await)
                    }
                }
            }
            (Some(entry), None) => Ok(self.commit_local(request, &entry).await),
            (None, Some(outcome)) => Ok(self.commit_remote(request, outcome).await),
            (None, None) => Ok(no_match_feedback(&request.raw_query, &attempts)),
        }
    }

    /// Picks the remote candidate: the resolver's prefetched outcome when it
    /// has one, otherwise a direct search recorded in the attempt log.
    async fn remote_candidate(
        &self,
        request: &PlaybackRequest,
        resolved: &ResolvedQuery,
        attempts: &mut Vec<SearchAttempt>,
    ) -> Option<SearchOutcome> {
        if let Some(outcome) = &resolved.prefetched {
            if outcome.is_usable() {
                return Some(outcome.clone());
            }
        }

        let outcome = self
            .remote
            .search(request.guild_id, &resolved.local_search, &request.requester_name)
            .await;
        attempts.push(SearchAttempt {
            strategy: "direct search",
            detail: outcome.describe(),
            success: outcome.is_usable(),
        });

        outcome.is_usable().then_some(outcome)
    }

    /// Commits to the local backend. The grant keeps the guild's slot locked
    /// until the file is actually rolling, so a concurrent request cannot
    /// retag the guild between the switch and the first audio.
    async fn commit_local(
        &self,
        request: &PlaybackRequest,
        entry: &LocalFileEntry,
    ) -> PlaybackFeedback {
        let grant = match self
            .arbiter
            .switch_to(
                BackendTarget::Local,
                request.guild_id,
                request.voice_channel,
                request.text_channel,
            )
            .await
        {
            Ok(grant) => grant,
            Err(e) => {
                return PlaybackFeedback::failed(format!(
                    "Could not take over the voice channel: {}",
                    e
                ));
            }
        };

        match self
            .local
            .play_file(request.guild_id, request.voice_channel, entry)
            .await
        {
            Ok(()) => PlaybackFeedback::ok(format!("🎵 Playing local file: **{}**", entry.title)),
            Err(e) => {
                grant.release();
                PlaybackFeedback::failed(format!("Failed to play local file: {}", e))
            }
        }
    }

    /// Commits to the remote backend: switch, enqueue, and kick playback off
    /// only if the player is not already mid-playback. The grant holds the
    /// guild's slot until the commit finishes either way.
    async fn commit_remote(
        &self,
        request: &PlaybackRequest,
        outcome: SearchOutcome,
    ) -> PlaybackFeedback {
        let _grant = match self
            .arbiter
            .switch_to(
                BackendTarget::Remote,
                request.guild_id,
                request.voice_channel,
                request.text_channel,
            )
            .await
        {
            Ok(grant) => grant,
            Err(e) => {
                return PlaybackFeedback::failed(format!("Could not connect the player: {}", e));
            }
        };

        let (tracks, summary) = match outcome {
            SearchOutcome::SingleTrack(track) => {
                let summary = format!("🎵 Queued **{}**{}", track.title, duration_suffix(&track));
                (vec![track], summary)
            }
            SearchOutcome::SearchResults(tracks) => {
                // Unranked results: take the best (first) match.
                let track = tracks.into_iter().next();
                match track {
                    Some(track) => {
                        let summary =
                            format!("🎵 Queued **{}**{}", track.title, duration_suffix(&track));
                        (vec![track], summary)
                    }
                    None => return PlaybackFeedback::failed("Search returned no playable tracks."),
                }
            }
            SearchOutcome::Playlist(tracks, name) => {
                let summary = format!("🎵 Queued playlist **{}** ({} tracks)", name, tracks.len());
                (tracks, summary)
            }
            SearchOutcome::NoMatches | SearchOutcome::LoadFailed(_) => {
                return PlaybackFeedback::failed("Nothing playable came back from the search.");
            }
        };

        self.remote.enqueue(request.guild_id, tracks).await;

        // Don't double-trigger play on a queue that is already running.
        if self.remote.is_playing(request.guild_id).await
            || self.remote.queue_len(request.guild_id).await == 0
        {
            return PlaybackFeedback::ok(summary);
        }

        match self.remote.play(request.guild_id).await {
            Ok(()) => PlaybackFeedback::ok(summary),
            Err(e) if is_unplayable(&e) => {
                // The track itself has no usable stream; try the next one.
                warn!(
                    "Track unplayable for guild {}, skipping to next: {}",
                    request.guild_id, e
                );
                match self.remote.skip(request.guild_id).await {
                    Ok(()) => PlaybackFeedback::ok(format!(
                        "{}\n⚠️ The first track had no supported audio stream; skipped to the next one.",
                        summary
                    )),
                    Err(skip_err) => PlaybackFeedback::failed(format!(
                        "Track had no supported audio stream and skipping failed: {}",
                        skip_err
                    )),
                }
            }
            Err(e) => PlaybackFeedback::failed(format!("Failed to start playback: {}", e)),
        }
    }
}

fn is_unplayable(err: &MusicError) -> bool {
    err.to_string().to_lowercase().contains(UNPLAYABLE_MARKER)
}

/// " (3:32)" when the track's duration is known, empty otherwise.
fn duration_suffix(track: &TrackMetadata) -> String {
    track
        .duration
        .map(|d| format!(" ({})", format_duration(d)))
        .unwrap_or_default()
}

fn first_title(outcome: &SearchOutcome) -> Option<String> {
    match outcome {
        SearchOutcome::SingleTrack(track) => Some(track.title.clone()),
        SearchOutcome::SearchResults(tracks) => tracks.first().map(|t| t.title.clone()),
        SearchOutcome::Playlist(_, name) => Some(name.clone()),
        _ => None,
    }
}

/// Builds the all-strategies-failed report: one reply listing every attempt
/// made and how it went, so silently-broken upstream providers show up in
/// user-visible output.
fn no_match_feedback(raw_query: &str, attempts: &[SearchAttempt]) -> PlaybackFeedback {
    let mut message = format!(
        "❌ No playable result found for `{}`. Attempts made:",
        raw_query
    );
    for (i, attempt) in attempts.iter().enumerate() {
        let tag = if attempt.success { "ok" } else { "failed" };
        message.push_str(&format!(
            "\n{}. {} — {} ({})",
            i + 1,
            attempt.strategy,
            tag,
            attempt.detail
        ));
    }
    if attempts.is_empty() {
        message.push_str("\n(no search strategies were applicable)");
    }
    PlaybackFeedback::failed(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unplayable_marker_is_case_insensitive() {
        let err = MusicError::AudioSourceError("No Supported Audio Streams for this URL".into());
        assert!(is_unplayable(&err));
        let other = MusicError::AudioSourceError("connection reset".into());
        assert!(!is_unplayable(&other));
    }

    #[test]
    fn duration_suffix_only_renders_known_durations() {
        let mut track = TrackMetadata::default();
        assert_eq!(duration_suffix(&track), "");
        track.duration = Some(std::time::Duration::from_secs(212));
        assert_eq!(duration_suffix(&track), " (3:32)");
    }

    #[test]
    fn no_match_report_lists_every_attempt() {
        let attempts = vec![
            SearchAttempt {
                strategy: "pre-search",
                detail: "no matches".into(),
                success: false,
            },
            SearchAttempt {
                strategy: "direct search",
                detail: "load failed: timeout".into(),
                success: false,
            },
        ];
        let feedback = no_match_feedback("some song", &attempts);
        assert!(!feedback.success);
        assert!(feedback.message.contains("1. pre-search — failed"));
        assert!(feedback.message.contains("2. direct search — failed"));
    }
}
