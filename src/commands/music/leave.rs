use super::*;
use crate::commands::music::utils::{connection_arbiter::BackendState, embedded_messages};
use tracing::warn;

/// Disconnect the bot from the voice channel
#[poise::command(slash_command, category = "Music")]
pub async fn leave(ctx: Context<'_>) -> CommandResult {
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

    // Whichever backend holds the connection gets torn down; both paths are
    // best-effort so a broken player never blocks the disconnect.
    match data.arbiter.state(guild_id).await {
        BackendState::LocalActive => {
            if let Err(e) = data.local.stop(guild_id).await {
                warn!("Failed to tear down local playback during leave: {}", e);
            }
        }
        BackendState::RemoteActive | BackendState::Idle => {
            if let Err(e) = data.remote.destroy(guild_id).await {
                warn!("Failed to tear down remote player during leave: {}", e);
            }
        }
    }

    data.arbiter.release(guild_id).await;
    ctx.send(embedded_messages::left_voice_channel()).await?;

    Ok(())
}
