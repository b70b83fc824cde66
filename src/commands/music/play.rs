use super::*;
use crate::commands::music::utils::{
    disambiguation::ButtonPrompt,
    embedded_messages,
    music_manager::MusicManager,
    playback_engine::PlaybackRequest,
};
use tracing::info;

/// Play a downloaded file or a song from a URL/search query
#[poise::command(slash_command, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"] query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);
    let guild_id = match ctx.guild_id() {
        Some(guild_id) => guild_id,
        None => {
            ctx.send(embedded_messages::generic_error(
                "This command only works in a server.",
            ))
            .await?;
            return Ok(());
        }
    };

    // The requester must already be in a voice channel; that channel is the
    // playback target.
    let user_id = ctx.author().id;
    let voice_channel =
        match MusicManager::get_user_voice_channel(ctx.serenity_context(), guild_id, user_id) {
            Ok(channel_id) => channel_id,
            Err(err) => {
                ctx.send(embedded_messages::user_not_in_voice_channel(err))
                    .await?;
                return Ok(());
            }
        };

    // Defer the response since resolution and the prompt might take time
    ctx.defer().await?;

    let request = PlaybackRequest {
        guild_id,
        raw_query: query,
        requester_id: user_id,
        requester_name: ctx.author().name.clone(),
        voice_channel,
        text_channel: ctx.channel_id(),
    };

    let prompt = ButtonPrompt::new(ctx.serenity_context().clone());
    let feedback = ctx.data().engine.handle_request(&request, &prompt).await;

    ctx.send(embedded_messages::playback_feedback(&feedback))
        .await?;

    Ok(())
}
