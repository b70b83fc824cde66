//! Common test utilities, fixtures, and mocks shared across the
//! integration tests.

pub mod fixtures;
pub mod mocks;

use std::fs;
use std::path::Path;

use chrono::Utc;
use crossfade::commands::music::utils::local_index::{LocalFileEntry, title_from_file_name};
use serenity::model::id::GuildId;

/// Creates a real backing file in `dir` and returns an index entry for it.
pub fn local_entry(dir: &Path, file_name: &str, guild: u64) -> LocalFileEntry {
    let file_path = dir.join(file_name);
    fs::write(&file_path, b"audio").expect("failed to create backing file");

    LocalFileEntry {
        file_name: file_name.to_string(),
        file_path,
        title: title_from_file_name(file_name),
        guild_id: GuildId::new(guild),
        download_date: Utc::now(),
        original_url: None,
    }
}
