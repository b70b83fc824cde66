use crate::{CommandResult, Context};

/// Check that the bot is responsive
#[poise::command(slash_command, category = "General")]
pub async fn ping(ctx: Context<'_>) -> CommandResult {
    ctx.say("Pong!").await?;
    Ok(())
}
