//! The local playback backend: plays a downloaded file start-to-finish over
//! a songbird voice connection. It knows nothing about the remote backend;
//! mutual exclusion between the two lives in the connection arbiter.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::input::File;
use songbird::tracks::TrackHandle;
use songbird::{Event, EventContext, EventHandler, Songbird, TrackEvent};
use tracing::{info, warn};

use super::local_index::LocalFileEntry;
use super::music_manager::{MusicError, MusicResult};

/// Bound on how long a local voice join may take before the connection is
/// declared lost.
pub const LOCAL_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Capability surface of the local playback backend.
#[async_trait]
pub trait LocalBackend: Send + Sync {
    /// Connects to the voice channel and plays the file start-to-finish.
    async fn play_file(
        &self,
        guild_id: GuildId,
        voice_channel: ChannelId,
        entry: &LocalFileEntry,
    ) -> MusicResult<()>;

    /// Forcibly stops the audio player and destroys the voice connection.
    async fn stop(&self, guild_id: GuildId) -> MusicResult<()>;

    async fn is_active(&self, guild_id: GuildId) -> bool;
    async fn voice_channel(&self, guild_id: GuildId) -> Option<ChannelId>;
}

/// Production local backend over songbird's file input.
#[derive(Clone)]
pub struct SongbirdLocalPlayer {
    songbird: Arc<Songbird>,
    active: Arc<DashMap<GuildId, TrackHandle>>,
    join_timeout: Duration,
}

impl SongbirdLocalPlayer {
    pub fn new(songbird: Arc<Songbird>) -> Self {
        Self {
            songbird,
            active: Arc::new(DashMap::new()),
            join_timeout: LOCAL_JOIN_TIMEOUT,
        }
    }
}

/// Clears the active-stream entry when a local file finishes.
struct FileEndNotifier {
    active: Arc<DashMap<GuildId, TrackHandle>>,
    guild_id: GuildId,
}

#[async_trait]
impl EventHandler for FileEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(_) = ctx {
            info!("Local file finished for guild {}", self.guild_id);
            self.active.remove(&self.guild_id);
        }
        None
    }
}

#[async_trait]
impl LocalBackend for SongbirdLocalPlayer {
    async fn play_file(
        &self,
        guild_id: GuildId,
        voice_channel: ChannelId,
        entry: &LocalFileEntry,
    ) -> MusicResult<()> {
        let call = tokio::time::timeout(
            self.join_timeout,
            self.songbird.join(guild_id, voice_channel),
        )
        .await
        .map_err(|_| MusicError::ConnectionTimeout(voice_channel))?
        .map_err(|e| MusicError::JoinError(e.to_string()))?;

        let input = File::new(entry.file_path.clone());
        let track_handle = {
            let mut handler = call.lock().await;
            handler.play_input(input.into())
        };

        let _ = track_handle.add_event(
            Event::Track(TrackEvent::End),
            FileEndNotifier {
                active: self.active.clone(),
                guild_id,
            },
        );

        info!(
            "Playing local file '{}' in guild {}",
            entry.title, guild_id
        );
        self.active.insert(guild_id, track_handle);
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) -> MusicResult<()> {
        if let Some((_, handle)) = self.active.remove(&guild_id) {
            if let Err(e) = handle.stop() {
                warn!("Failed to stop local track for guild {}: {}", guild_id, e);
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

    async fn is_active(&self, guild_id: GuildId) -> bool {
        self.active.contains_key(&guild_id)
    }

    async fn voice_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let call = self.songbird.get(guild_id)?;
        let channel = call.lock().await.current_channel()?;
        Some(ChannelId::new(channel.0.get()))
    }
}
