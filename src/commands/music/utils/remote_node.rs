//! The remote playback backend.
//!
//! `RemoteBackend` is the capability surface the core consumes: search,
//! connect, queue, play, skip, stop, destroy, plus the observers needed to
//! reconcile connection state. The production implementation
//! (`StreamingNode`) resolves tracks through yt-dlp and streams them over a
//! songbird voice connection; tests substitute their own implementations.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::input::{Compose, YoutubeDl};
use songbird::tracks::TrackHandle;
use songbird::{Event, EventContext, EventHandler, Songbird, TrackEvent};
use tracing::{debug, info, warn};

use crate::commands::music::audio_sources::ytdl::YtDlpResolver;
use crate::commands::music::audio_sources::{SearchOutcome, TrackMetadata};

use super::music_manager::{MusicError, MusicResult};

/// Capability surface of the remote audio node, one logical player per guild.
///
/// All methods are asynchronous because a backend may sit on an external
/// server; the decision engine and connection arbiter only ever talk to this
/// trait, never to a concrete player.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Resolves a query (URL or free text) into a tagged outcome. Failures
    /// are folded into `SearchOutcome::LoadFailed`, never an `Err`.
    async fn search(&self, guild_id: GuildId, query: &str, requested_by: &str) -> SearchOutcome;

    /// Connects (or moves) the guild's player to a voice channel, creating
    /// the player if it was destroyed or never existed.
    async fn connect(
        &self,
        guild_id: GuildId,
        voice_channel: ChannelId,
        text_channel: ChannelId,
    ) -> MusicResult<()>;

    /// Appends tracks to the guild's queue.
    async fn enqueue(&self, guild_id: GuildId, tracks: Vec<TrackMetadata>);

    /// Starts playback of the front of the queue.
    async fn play(&self, guild_id: GuildId) -> MusicResult<()>;

    /// Skips the current track, advancing to the next queued one if any.
    async fn skip(&self, guild_id: GuildId) -> MusicResult<()>;

    /// Stops playback without destroying the player.
    async fn stop(&self, guild_id: GuildId) -> MusicResult<()>;

    /// Tears the player down entirely: stop, clear queue, drop the voice
    /// connection, deregister.
    async fn destroy(&self, guild_id: GuildId) -> MusicResult<()>;

    async fn is_connected(&self, guild_id: GuildId) -> bool;
    async fn is_playing(&self, guild_id: GuildId) -> bool;
    async fn voice_channel(&self, guild_id: GuildId) -> Option<ChannelId>;
    async fn queue_len(&self, guild_id: GuildId) -> usize;

    /// Whether a skip has anything to act on: a playing track or a queued
    /// one.
    async fn can_skip(&self, guild_id: GuildId) -> bool {
        self.is_playing(guild_id).await || self.queue_len(guild_id).await > 0
    }
}

/// Per-guild player state for the production node.
struct GuildPlayer {
    queue: VecDeque<TrackMetadata>,
    current: Option<TrackHandle>,
    voice_channel: ChannelId,
    #[allow(dead_code)]
    text_channel: ChannelId,
}

/// Production remote backend: yt-dlp resolution + songbird streaming.
#[derive(Clone)]
pub struct StreamingNode {
    songbird: Arc<Songbird>,
    http: reqwest::Client,
    resolver: Arc<YtDlpResolver>,
    players: Arc<DashMap<GuildId, GuildPlayer>>,
}

impl StreamingNode {
    pub fn new(songbird: Arc<Songbird>) -> Self {
        Self {
            songbird,
            http: reqwest::Client::new(),
            resolver: Arc::new(YtDlpResolver),
            players: Arc::new(DashMap::new()),
        }
    }

    /// Pops and starts the next queued track. Used both by `play` and by the
    /// track-end notifier; loops past tracks whose input cannot be built.
    async fn play_next(&self, guild_id: GuildId) -> MusicResult<bool> {
        loop {
            let metadata = {
                let mut player = self
                    .players
                    .get_mut(&guild_id)
                    .ok_or(MusicError::NoPlayer)?;
                player.current = None;
                match player.queue.pop_front() {
                    Some(meta) => meta,
                    None => return Ok(false),
                }
            };

            let url = match metadata.url.as_deref() {
                Some(url) => url.to_string(),
                None => {
                    warn!(
                        "Track '{}' has no URL, skipping to next in queue",
                        metadata.title
                    );
                    continue;
                }
            };

            let mut source = YoutubeDl::new(self.http.clone(), url.clone());
            // Pre-flight the source so unplayable tracks fail here, where
            // the engine can react, instead of dying silently mid-stream.
            if let Err(e) = source.aux_metadata().await {
                return Err(MusicError::AudioSourceError(format!(
                    "Failed to prepare stream for '{}': {}",
                    metadata.title, e
                )));
            }

            let call = self
                .songbird
                .get(guild_id)
                .ok_or(MusicError::NotConnected)?;

            let track_handle = {
                let mut handler = call.lock().await;
                handler.play_input(source.into())
            };

            let _ = track_handle.add_event(
                Event::Track(TrackEvent::End),
                TrackEndNotifier {
                    node: self.clone(),
                    guild_id,
                },
            );

            info!("Started remote playback of '{}' in guild {}", metadata.title, guild_id);

            if let Some(mut player) = self.players.get_mut(&guild_id) {
                player.current = Some(track_handle);
            }

            return Ok(true);
        }
    }
}

/// Advances the queue when a remote track finishes.
struct TrackEndNotifier {
    node: StreamingNode,
    guild_id: GuildId,
}

#[async_trait]
impl EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(_) = ctx {
            debug!("Remote track ended for guild {}", self.guild_id);
            if let Err(e) = self.node.play_next(self.guild_id).await {
                warn!(
                    "Failed to advance remote queue for guild {}: {}",
                    self.guild_id, e
                );
            }
        }
        None
    }
}

#[async_trait]
impl RemoteBackend for StreamingNode {
    async fn search(&self, _guild_id: GuildId, query: &str, requested_by: &str) -> SearchOutcome {
        self.resolver.resolve(query, requested_by)
    }

    async fn connect(
        &self,
        guild_id: GuildId,
        voice_channel: ChannelId,
        text_channel: ChannelId,
    ) -> MusicResult<()> {
        self.songbird
            .join(guild_id, voice_channel)
            .await
            .map_err(|e| MusicError::JoinError(e.to_string()))?;

        // Recreate the player if it was destroyed or never existed, keeping
        // an existing queue when only the channel moved.
        match self.players.get_mut(&guild_id) {
            Some(mut player) => {
                player.voice_channel = voice_channel;
            }
            None => {
                self.players.insert(
                    guild_id,
                    GuildPlayer {
                        queue: VecDeque::new(),
                        current: None,
                        voice_channel,
                        text_channel,
                    },
                );
            }
        }

        Ok(())
    }

    async fn enqueue(&self, guild_id: GuildId, tracks: Vec<TrackMetadata>) {
        if let Some(mut player) = self.players.get_mut(&guild_id) {
            for track in tracks {
                player.queue.push_back(track);
            }
        }
    }

    async fn play(&self, guild_id: GuildId) -> MusicResult<()> {
        self.play_next(guild_id).await.map(|_| ())
    }

    async fn skip(&self, guild_id: GuildId) -> MusicResult<()> {
        let current = self
            .players
            .get_mut(&guild_id)
            .ok_or(MusicError::NoPlayer)?
            .current
            .take();

        match current {
            // Stopping the handle fires the end event, which advances the
            // queue through the notifier.
            Some(handle) => handle
                .stop()
                .map_err(|e| MusicError::AudioSourceError(e.to_string())),
            // Nothing was playing (e.g. the previous start failed); advance
            // the queue directly.
            None => self.play_next(guild_id).await.map(|_| ()),
        }
    }

    async fn stop(&self, guild_id: GuildId) -> MusicResult<()> {
        let mut player = self
            .players
            .get_mut(&guild_id)
            .ok_or(MusicError::NoPlayer)?;
        player.queue.clear();
        if let Some(handle) = player.current.take() {
            handle
                .stop()
                .map_err(|e| MusicError::AudioSourceError(e.to_string()))?;
        }
        Ok(())
    }

    async fn destroy(&self, guild_id: GuildId) -> MusicResult<()> {
        if let Some((_, mut player)) = self.players.remove(&guild_id) {
            player.queue.clear();
            if let Some(handle) = player.current.take() {
                if let Err(e) = handle.stop() {
                    warn!("Failed to stop track while destroying player: {}", e);
                }
            }
        }

        if self.songbird.get(guild_id).is_some() {
            self.songbird
                .remove(guild_id)
                .await
                .map_err(|e| MusicError::JoinError(e.to_string()))?;
        }

        Ok(())
    }

    async fn is_connected(&self, guild_id: GuildId) -> bool {
        self.songbird.get(guild_id).is_some() && self.players.contains_key(&guild_id)
    }

    async fn is_playing(&self, guild_id: GuildId) -> bool {
        self.players
            .get(&guild_id)
            .is_some_and(|p| p.current.is_some())
    }

    async fn voice_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let expected = self.players.get(&guild_id)?.voice_channel;

        // Report the channel only once the gateway actually confirmed it;
        // the arbiter polls this to gate playback on a settled connection.
        let call = self.songbird.get(guild_id)?;
        let connected = call
            .lock()
            .await
            .current_channel()
            .map(|c| ChannelId::new(c.0.get()));

        match connected {
            Some(channel) if channel == expected => Some(channel),
            other => other,
        }
    }

    async fn queue_len(&self, guild_id: GuildId) -> usize {
        self.players
            .get(&guild_id)
            .map(|p| p.queue.len())
            .unwrap_or(0)
    }
}
