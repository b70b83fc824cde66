use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use songbird::SerenityInit;
use std::env;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crossfade::commands::general::ping::*;
use crossfade::commands::music::{download::*, leave::*, play::*, skip::*, stop::*};
use crossfade::commands::music::utils::{
    connection_arbiter::ConnectionArbiter,
    local_index::LocalFileIndex,
    local_player::{LocalBackend, SongbirdLocalPlayer},
    playback_engine::PlaybackEngine,
    remote_node::{RemoteBackend, StreamingNode},
};
use crossfade::{Data, Error, help, register};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("crossfade=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let token = env::var("DISCORD_TOKEN").expect("Missing DISCORD_TOKEN");
    let download_dir = env::var("DOWNLOAD_DIR").unwrap_or_else(|_| "downloads".to_string());

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let commands = vec![
        // Default commands
        register(),
        help(),
        // General commands
        ping(),
        // Music commands
        play(),
        skip(),
        stop(),
        leave(),
        download(),
    ];

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let songbird = songbird::get(ctx)
                    .await
                    .expect("Songbird Voice client placed in scope at initialization.");

                let index = Arc::new(LocalFileIndex::new(&download_dir));
                let local: Arc<dyn LocalBackend> =
                    Arc::new(SongbirdLocalPlayer::new(songbird.clone()));
                let remote: Arc<dyn RemoteBackend> = Arc::new(StreamingNode::new(songbird));
                let arbiter = Arc::new(ConnectionArbiter::new(local.clone(), remote.clone()));
                let engine = Arc::new(PlaybackEngine::new(
                    index.clone(),
                    arbiter.clone(),
                    local.clone(),
                    remote.clone(),
                ));

                Ok(Data {
                    engine,
                    arbiter,
                    local,
                    remote,
                    index,
                })
            })
        })
        .build();

    let mut client = ClientBuilder::new(token, intents)
        .framework(framework)
        .register_songbird()
        .await?;

    client.start().await.map_err(Into::into)
}
