use super::*;
use crate::commands::music::utils::{connection_arbiter::BackendState, embedded_messages};

/// Skip to the next track in the online queue
#[poise::command(slash_command, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
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

    // Local playback is a single file start-to-finish; only the remote
    // queue has a next track to skip to.
    if data.arbiter.state(guild_id).await != BackendState::RemoteActive {
        ctx.send(embedded_messages::bot_not_playing()).await?;
        return Ok(());
    }

    // A skip with nothing playing and nothing queued would "succeed" into
    // silence; report it instead.
    if !data.remote.can_skip(guild_id).await {
        ctx.send(embedded_messages::queue_empty()).await?;
        return Ok(());
    }

    match data.remote.skip(guild_id).await {
        Ok(()) => {
            ctx.send(embedded_messages::skipped()).await?;
        }
        Err(e) => {
            ctx.send(embedded_messages::generic_error(&format!(
                "Failed to skip: {}",
                e
            )))
            .await?;
        }
    }

    Ok(())
}
