//! The connection arbiter: at most one playback backend may hold a guild's
//! voice connection at any time.
//!
//! Every `switch_to` for a guild runs inside that guild's critical section,
//! and a successful switch hands the caller a `BackendGrant` that keeps the
//! section locked until playback has actually started. A teardown-plus-
//! settle-plus-start sequence therefore always completes before the next
//! request for the same guild proceeds. The backends themselves have no
//! knowledge of each other.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, warn};

use super::local_player::LocalBackend;
use super::music_manager::{MusicError, MusicResult};
use super::remote_node::RemoteBackend;

/// Which backend a `switch_to` call is clearing the way for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendTarget {
    Local,
    Remote,
}

/// Per-guild backend ownership tag. `LocalActive` and `RemoteActive` are
/// mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendState {
    #[default]
    Idle,
    LocalActive,
    RemoteActive,
}

/// The settling delays and confirmation bounds the arbiter works with.
/// Defaults preserve the empirically chosen worst-case bounds; tests shrink
/// them.
#[derive(Debug, Clone, Copy)]
pub struct ArbiterTimeouts {
    /// Pause after remote teardown before the local connection opens, so the
    /// voice-state change propagates through the gateway first.
    pub local_settle: Duration,
    /// Pause after local teardown before remote orchestration resumes.
    pub remote_settle: Duration,
    /// Bound on waiting for the remote player to confirm it is connected to
    /// the target channel.
    pub connect_timeout: Duration,
    /// Poll interval while waiting for that confirmation.
    pub confirm_poll: Duration,
}

impl Default for ArbiterTimeouts {
    fn default() -> Self {
        Self {
            local_settle: Duration::from_millis(750),
            remote_settle: Duration::from_millis(500),
            connect_timeout: Duration::from_secs(10),
            confirm_poll: Duration::from_millis(250),
        }
    }
}

/// Exclusive hold on a guild's slot, handed out by a successful
/// `switch_to`. The caller starts playback while holding it, so a competing
/// request cannot retag the guild between the switch and the first audio.
/// Dropping the grant keeps the ownership tag in place.
#[derive(Debug)]
pub struct BackendGrant {
    state: OwnedMutexGuard<BackendState>,
}

impl BackendGrant {
    /// Resets the guild to idle, for commits that failed after the switch.
    pub fn release(mut self) {
        *self.state = BackendState::Idle;
    }
}

pub struct ConnectionArbiter {
    local: Arc<dyn LocalBackend>,
    remote: Arc<dyn RemoteBackend>,
    slots: DashMap<GuildId, Arc<Mutex<BackendState>>>,
    timeouts: ArbiterTimeouts,
}

impl ConnectionArbiter {
    pub fn new(local: Arc<dyn LocalBackend>, remote: Arc<dyn RemoteBackend>) -> Self {
        Self::with_timeouts(local, remote, ArbiterTimeouts::default())
    }

    pub fn with_timeouts(
        local: Arc<dyn LocalBackend>,
        remote: Arc<dyn RemoteBackend>,
        timeouts: ArbiterTimeouts,
    ) -> Self {
        Self {
            local,
            remote,
            slots: DashMap::new(),
            timeouts,
        }
    }

    fn slot(&self, guild_id: GuildId) -> Arc<Mutex<BackendState>> {
        self.slots
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(BackendState::Idle)))
            .clone()
    }

    /// Current ownership tag for a guild.
    pub async fn state(&self, guild_id: GuildId) -> BackendState {
        *self.slot(guild_id).lock().await
    }

    /// Marks the guild idle after an external stop/leave. Does not touch the
    /// backends; callers tear those down themselves.
    pub async fn release(&self, guild_id: GuildId) {
        let slot = self.slot(guild_id);
        let mut state = slot.lock().await;
        *state = BackendState::Idle;
    }

    /// Clears the way for `target` to own the guild's voice connection.
    ///
    /// On success the losing backend is torn down, the settling delay has
    /// elapsed, and (for the remote target) the player is confirmed
    /// connected to `voice_channel`. The returned grant keeps the guild's
    /// slot locked; the caller starts playback on the winning backend while
    /// holding it, then drops it.
    pub async fn switch_to(
        &self,
        target: BackendTarget,
        guild_id: GuildId,
        voice_channel: ChannelId,
        text_channel: ChannelId,
    ) -> MusicResult<BackendGrant> {
        let slot = self.slot(guild_id);
        let mut state = slot.lock_owned().await;

        let prepared = match target {
            BackendTarget::Local => {
                self.prepare_local(guild_id, voice_channel, &mut *state).await
            }
            BackendTarget::Remote => {
                self.prepare_remote(guild_id, voice_channel, text_channel, &mut *state)
                    .await
            }
        };

        prepared.map(|()| BackendGrant { state })
    }

    async fn prepare_local(
        &self,
        guild_id: GuildId,
        voice_channel: ChannelId,
        state: &mut BackendState,
    ) -> MusicResult<()> {
        if *state == BackendState::LocalActive
            && self.local.is_active(guild_id).await
            && self.local.voice_channel(guild_id).await == Some(voice_channel)
        {
            debug!("Local backend already owns guild {}, nothing to do", guild_id);
            return Ok(());
        }

        // Tear the remote player down best-effort: a failed destroy must not
        // block the user's local playback, only be logged.
        if *state == BackendState::RemoteActive || self.remote.is_connected(guild_id).await {
            info!("Tearing down remote player for guild {} before local playback", guild_id);

            if let Err(e) = self.remote.stop(guild_id).await {
                warn!("Failed to stop remote playback for guild {}: {}", guild_id, e);
            }
            if let Err(e) = self.remote.destroy(guild_id).await {
                warn!("Failed to destroy remote player for guild {}: {}", guild_id, e);
            }

            *state = BackendState::Idle;
            // Let the voice-state change propagate before a second
            // connection attempt claims the channel.
            sleep(self.timeouts.local_settle).await;
        }

        *state = BackendState::LocalActive;
        Ok(())
    }

    async fn prepare_remote(
        &self,
        guild_id: GuildId,
        voice_channel: ChannelId,
        text_channel: ChannelId,
        state: &mut BackendState,
    ) -> MusicResult<()> {
        if *state == BackendState::RemoteActive
            && self.remote.is_connected(guild_id).await
            && self.remote.voice_channel(guild_id).await == Some(voice_channel)
        {
            debug!("Remote backend already owns guild {}, nothing to do", guild_id);
            return Ok(());
        }

        if *state == BackendState::LocalActive || self.local.is_active(guild_id).await {
            info!("Tearing down local stream for guild {} before remote playback", guild_id);

            if let Err(e) = self.local.stop(guild_id).await {
                warn!("Failed to stop local stream for guild {}: {}", guild_id, e);
            }

            *state = BackendState::Idle;
            sleep(self.timeouts.remote_settle).await;
        }

        // Connect (recreating the player if it was destroyed) and wait for
        // confirmation that it landed in the target channel. Both phases
        // share one deadline so the total wait never exceeds
        // `connect_timeout`. A timeout is a hard failure, never a silent
        // proceed-to-play.
        let deadline = Instant::now() + self.timeouts.connect_timeout;
        let connected = async {
            timeout_at(
                deadline,
                self.remote.connect(guild_id, voice_channel, text_channel),
            )
            .await
            .map_err(|_| MusicError::ConnectionTimeout(voice_channel))??;

            self.confirm_remote_channel(guild_id, voice_channel, deadline)
                .await
        }
        .await;

        // A half-finished switch must not leave the guild tagged as owned by
        // a backend that never came up.
        if let Err(e) = connected {
            *state = BackendState::Idle;
            return Err(e);
        }

        *state = BackendState::RemoteActive;
        Ok(())
    }

    /// Polls the remote player until it reports the target channel or the
    /// deadline shared with the connect call passes.
    async fn confirm_remote_channel(
        &self,
        guild_id: GuildId,
        voice_channel: ChannelId,
        deadline: Instant,
    ) -> MusicResult<()> {
        loop {
            if self.remote.is_connected(guild_id).await
                && self.remote.voice_channel(guild_id).await == Some(voice_channel)
            {
                return Ok(());
            }

            if Instant::now() >= deadline {
                warn!(
                    "Remote player for guild {} never confirmed channel {}",
                    guild_id, voice_channel
                );
                return Err(MusicError::ConnectionTimeout(voice_channel));
            }

            sleep(self.timeouts.confirm_poll).await;
        }
    }
}
