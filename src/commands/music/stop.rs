use super::*;
use crate::commands::music::utils::{connection_arbiter::BackendState, embedded_messages};
use tracing::warn;

/// Stop playback, clear the queue, and leave the voice channel
#[poise::command(slash_command, category = "Music")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
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

    let data = ctx.data();

    match data.arbiter.state(guild_id).await {
        BackendState::Idle => {
            ctx.send(embedded_messages::bot_not_playing()).await?;
            return Ok(());
        }
        BackendState::LocalActive => {
            if let Err(e) = data.local.stop(guild_id).await {
                warn!("Failed to stop local playback during stop: {}", e);
            }
        }
        BackendState::RemoteActive => {
            if let Err(e) = data.remote.stop(guild_id).await {
                warn!("Failed to stop remote playback during stop: {}", e);
            }
            if let Err(e) = data.remote.destroy(guild_id).await {
                warn!("Failed to destroy remote player during stop: {}", e);
            }
        }
    }

    data.arbiter.release(guild_id).await;
    ctx.send(embedded_messages::stopped()).await?;

    Ok(())
}
