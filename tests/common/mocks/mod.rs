//! Recording fakes for the playback backends and the disambiguation prompt.
//!
//! Each fake logs the capability calls it receives so tests can assert on
//! ordering and call counts, and plays back scripted search outcomes and
//! play errors.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};

use crossfade::commands::music::audio_sources::{SearchOutcome, TrackMetadata};
use crossfade::commands::music::utils::disambiguation::{
    DisambiguationPrompt, PromptChoice, PromptGate,
};
use crossfade::commands::music::utils::local_index::LocalFileEntry;
use crossfade::commands::music::utils::local_player::LocalBackend;
use crossfade::commands::music::utils::music_manager::{MusicError, MusicResult};
use crossfade::commands::music::utils::remote_node::RemoteBackend;

/// Scripted remote backend tracking one guild's player state.
#[derive(Default)]
pub struct FakeRemote {
    /// Outcomes returned by successive `search` calls, then `NoMatches`.
    pub outcomes: Mutex<VecDeque<SearchOutcome>>,
    /// Per-query outcomes, consulted before the queue. Lets concurrent
    /// requests get deterministic answers regardless of call order.
    pub outcomes_by_query: Mutex<HashMap<String, SearchOutcome>>,
    /// Artificial delay inside `connect`, for deadline tests.
    pub connect_delay: Mutex<Option<Duration>>,
    /// Errors returned by successive `play` calls, then `Ok`.
    pub play_errors: Mutex<VecDeque<MusicError>>,
    pub calls: Mutex<Vec<String>>,
    pub connected: Mutex<Option<ChannelId>>,
    pub queue: Mutex<Vec<TrackMetadata>>,
    pub playing: AtomicBool,
    /// Make `destroy` fail, for teardown-tolerance tests.
    pub fail_destroy: AtomicBool,
    /// Accept `connect` but never report the channel, so confirmation
    /// times out.
    pub never_confirm: AtomicBool,
}

impl FakeRemote {
    pub fn with_outcomes(outcomes: Vec<SearchOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Default::default()
        }
    }

    /// Pins the outcome for one exact query string.
    pub fn script_query(&self, query: &str, outcome: SearchOutcome) {
        self.outcomes_by_query
            .lock()
            .unwrap()
            .insert(query.to_string(), outcome);
    }

    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == name)
            .count()
    }

    pub fn call_order(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteBackend for FakeRemote {
    async fn search(&self, _guild_id: GuildId, query: &str, _requested_by: &str) -> SearchOutcome {
        self.record("search");
        if let Some(outcome) = self.outcomes_by_query.lock().unwrap().get(query) {
            return outcome.clone();
        }
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SearchOutcome::NoMatches)
    }

    async fn connect(
        &self,
        _guild_id: GuildId,
        voice_channel: ChannelId,
        _text_channel: ChannelId,
    ) -> MusicResult<()> {
        self.record("connect");
        let delay = *self.connect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if !self.never_confirm.load(Ordering::SeqCst) {
            *self.connected.lock().unwrap() = Some(voice_channel);
        }
        Ok(())
    }

    async fn enqueue(&self, _guild_id: GuildId, tracks: Vec<TrackMetadata>) {
        self.record("enqueue");
        self.queue.lock().unwrap().extend(tracks);
    }

    async fn play(&self, _guild_id: GuildId) -> MusicResult<()> {
        self.record("play");
        if let Some(err) = self.play_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn skip(&self, _guild_id: GuildId) -> MusicResult<()> {
        self.record("skip");
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self, _guild_id: GuildId) -> MusicResult<()> {
        self.record("stop");
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self, _guild_id: GuildId) -> MusicResult<()> {
        self.record("destroy");
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err(MusicError::NoPlayer);
        }
        *self.connected.lock().unwrap() = None;
        self.queue.lock().unwrap().clear();
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self, _guild_id: GuildId) -> bool {
        self.connected.lock().unwrap().is_some()
    }

    async fn is_playing(&self, _guild_id: GuildId) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    async fn voice_channel(&self, _guild_id: GuildId) -> Option<ChannelId> {
        *self.connected.lock().unwrap()
    }

    async fn queue_len(&self, _guild_id: GuildId) -> usize {
        self.queue.lock().unwrap().len()
    }
}

/// Scripted local backend tracking one guild's stream.
#[derive(Default)]
pub struct FakeLocal {
    pub calls: Mutex<Vec<String>>,
    pub active: Mutex<Option<ChannelId>>,
    pub fail_play: AtomicBool,
    /// Artificial delay inside `play_file`, widening race windows in
    /// concurrency tests.
    pub play_delay: Mutex<Option<Duration>>,
}

impl FakeLocal {
    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == name)
            .count()
    }
}

#[async_trait]
impl LocalBackend for FakeLocal {
    async fn play_file(
        &self,
        _guild_id: GuildId,
        voice_channel: ChannelId,
        _entry: &LocalFileEntry,
    ) -> MusicResult<()> {
        self.record("play_file");
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(MusicError::JoinError("join refused".to_string()));
        }
        let delay = *self.play_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        *self.active.lock().unwrap() = Some(voice_channel);
        Ok(())
    }

    async fn stop(&self, _guild_id: GuildId) -> MusicResult<()> {
        self.record("stop");
        *self.active.lock().unwrap() = None;
        Ok(())
    }

    async fn is_active(&self, _guild_id: GuildId) -> bool {
        self.active.lock().unwrap().is_some()
    }

    async fn voice_channel(&self, _guild_id: GuildId) -> Option<ChannelId> {
        *self.active.lock().unwrap()
    }
}

/// Prompt gate that answers with a fixed choice and records every prompt it
/// was shown.
pub struct ScriptedGate {
    pub choice: PromptChoice,
    pub seen: Mutex<Vec<DisambiguationPrompt>>,
}

impl ScriptedGate {
    pub fn answering(choice: PromptChoice) -> Self {
        Self {
            choice,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl PromptGate for ScriptedGate {
    async fn ask(&self, prompt: &DisambiguationPrompt) -> PromptChoice {
        self.seen.lock().unwrap().push(prompt.clone());
        self.choice
    }
}
