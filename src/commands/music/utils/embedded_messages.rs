use poise::{CreateReply, serenity_prelude as serenity};
use serenity::all::CreateEmbed;

use super::music_manager::MusicError;
use super::playback_engine::PlaybackFeedback;

/// Create an error embed reply
fn error_embed(description: String) -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description(description)
                .color(0xff0000),
        )
        .ephemeral(true)
}

/// Create a success embed reply
fn success_embed(title: &str, description: String) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title(title)
            .description(description)
            .color(0x00ff00),
    )
}

/// Reply used when the user must be in a voice channel first
pub fn user_not_in_voice_channel(err: MusicError) -> CreateReply {
    error_embed(format!("You need to be in a voice channel: {}", err))
}

/// Reply used when the bot has no active playback for the guild
pub fn bot_not_playing() -> CreateReply {
    error_embed("Nothing is playing in this server.".to_string())
}

/// Terminal feedback from the playback engine, colored by its success flag
pub fn playback_feedback(feedback: &PlaybackFeedback) -> CreateReply {
    let (title, color) = if feedback.success {
        ("🎵 Playback", 0x00ff00)
    } else {
        ("❌ Playback", 0xff0000)
    };

    CreateReply::default().embed(
        CreateEmbed::new()
            .title(title)
            .description(feedback.message.clone())
            .color(color),
    )
}

pub fn stopped() -> CreateReply {
    success_embed("⏹️ Stopped", "Playback stopped and queue cleared.".to_string()).ephemeral(true)
}

/// Reply used when a skip has nothing playing and nothing queued
pub fn queue_empty() -> CreateReply {
    error_embed("Nothing is playing or queued to skip to.".to_string())
}

pub fn skipped() -> CreateReply {
    success_embed("⏭️ Skipped", "Skipped to the next track.".to_string())
}

pub fn left_voice_channel() -> CreateReply {
    success_embed("👋 Left", "Disconnected from the voice channel.".to_string()).ephemeral(true)
}

pub fn download_complete(title: &str) -> CreateReply {
    success_embed(
        "💾 Download Complete",
        format!("**{}** is now available for local playback.", title),
    )
}

pub fn download_failed(err: MusicError) -> CreateReply {
    error_embed(format!("Download failed: {}", err))
}

pub fn generic_error(err: &str) -> CreateReply {
    error_embed(err.to_string())
}
