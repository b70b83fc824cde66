use std::sync::Arc;

use commands::music::utils::{
    connection_arbiter::ConnectionArbiter,
    local_index::LocalFileIndex,
    local_player::LocalBackend,
    playback_engine::PlaybackEngine,
    remote_node::RemoteBackend,
};

pub mod commands;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// User data stored and accessible in all command invocations
pub struct Data {
    pub engine: Arc<PlaybackEngine>,
    pub arbiter: Arc<ConnectionArbiter>,
    pub local: Arc<dyn LocalBackend>,
    pub remote: Arc<dyn RemoteBackend>,
    pub index: Arc<LocalFileIndex>,
}

#[poise::command(slash_command, category = "General")]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
pub async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}
