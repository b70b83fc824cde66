//! Sample data used across the integration tests.

use crossfade::commands::music::audio_sources::TrackMetadata;

/// Guild the tests issue requests for.
pub const GUILD: u64 = 101;

/// A second guild, used for isolation checks.
pub const OTHER_GUILD: u64 = 202;

/// Voice channel the requester sits in.
pub const VOICE_CHANNEL: u64 = 301;

/// Text channel the request came from.
pub const TEXT_CHANNEL: u64 = 401;

/// The requesting user.
pub const REQUESTER: u64 = 501;

/// A resolvable remote track titled like the canonical probe scenario.
pub fn sample_track(title: &str) -> TrackMetadata {
    TrackMetadata {
        title: title.to_string(),
        url: Some(format!(
            "https://example.com/v/{}",
            title.to_lowercase().replace(' ', "-")
        )),
        ..Default::default()
    }
}
