use std::path::PathBuf;
use std::process::Command;

use chrono::Utc;
use tracing::info;
use url::Url;

use super::*;
use crate::commands::music::utils::{
    embedded_messages,
    local_index::{LocalFileEntry, title_from_file_name},
    music_manager::MusicError,
};

/// Download a track for local playback in this server
#[poise::command(slash_command, category = "Music")]
pub async fn download(
    ctx: Context<'_>,
    #[description = "URL of the track to download"] url: String,
) -> CommandResult {
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

    if Url::parse(&url).is_err() {
        ctx.send(embedded_messages::generic_error(
            "That doesn't look like a valid URL.",
        ))
        .await?;
        return Ok(());
    }

    // Downloads take a while; defer so the interaction doesn't expire.
    ctx.defer().await?;

    let index = ctx.data().index.clone();
    let dir = index.dir().to_path_buf();

    let result = tokio::task::spawn_blocking(move || download_audio(&dir, &url))
        .await
        .map_err(|e| MusicError::DownloadError(e.to_string()))?;

    match result {
        Ok((file_path, original_url)) => {
            let file_name = file_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let title = title_from_file_name(&file_name);

            let entry = LocalFileEntry {
                file_name,
                file_path,
                title: title.clone(),
                guild_id,
                download_date: Utc::now(),
                original_url: Some(original_url),
            };

            match index.record(&entry) {
                Ok(()) => {
                    info!("Recorded download '{}' for guild {}", title, guild_id);
                    ctx.send(embedded_messages::download_complete(&title)).await?;
                }
                Err(e) => {
                    ctx.send(embedded_messages::download_failed(e)).await?;
                }
            }
        }
        Err(e) => {
            ctx.send(embedded_messages::download_failed(e)).await?;
        }
    }

    Ok(())
}

/// Runs yt-dlp to extract audio into the download directory, returning the
/// final file path it printed.
fn download_audio(dir: &PathBuf, url: &str) -> Result<(PathBuf, String), MusicError> {
    std::fs::create_dir_all(dir).map_err(|e| MusicError::DownloadError(e.to_string()))?;

    let output_template = dir.join("%(title)s.%(ext)s");

    let output = Command::new("yt-dlp")
        .args([
            "-x",
            "--audio-format",
            "mp3",
            "--no-playlist",
            "--print",
            "after_move:filepath",
            "--no-simulate",
            "-o",
        ])
        .arg(&output_template)
        .arg(url)
        .output()
        .map_err(|e| MusicError::DownloadError(format!("Failed to run yt-dlp: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MusicError::DownloadError(stderr.trim().to_string()));
    }

    let file_path = String::from_utf8_lossy(&output.stdout)
        .lines()
        .last()
        .map(|line| PathBuf::from(line.trim()))
        .filter(|path| path.exists())
        .ok_or_else(|| {
            MusicError::DownloadError("yt-dlp did not report a downloaded file".to_string())
        })?;

    Ok((file_path, url.to_string()))
}
