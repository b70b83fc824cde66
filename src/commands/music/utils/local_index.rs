//! The per-download-directory index of locally stored audio files.
//!
//! The index is a single JSON object on disk mapping file name to its
//! metadata record. It is read wholesale and rewritten wholesale on any
//! mutation; a missing or malformed file is treated as an empty index and
//! never crashes a lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serenity::model::id::GuildId;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, warn};

use super::music_manager::{MusicError, MusicResult};

const INDEX_FILE: &str = "download_index.json";

/// On-disk record for one downloaded file, keyed by file name in the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexRecord {
    pub download_date: DateTime<Utc>,
    pub original_url: Option<String>,
    pub file_path: PathBuf,
    pub guild_id: GuildId,
}

/// A fully resolved local file, ready to hand to the local playback backend.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFileEntry {
    pub file_name: String,
    pub file_path: PathBuf,
    /// Display title, derived from the file name.
    pub title: String,
    pub guild_id: GuildId,
    pub download_date: DateTime<Utc>,
    pub original_url: Option<String>,
}

/// Index over one download directory.
pub struct LocalFileIndex {
    dir: PathBuf,
    // Serializes the read-modify-rewrite cycle on the index file.
    save_lock: Mutex<()>,
}

impl LocalFileIndex {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            save_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Loads the whole index, degrading to empty on any problem.
    fn load(&self) -> BTreeMap<String, IndexRecord> {
        let path = self.index_path();
        if !path.exists() {
            return BTreeMap::new();
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read download index {:?}: {}", path, e);
                return BTreeMap::new();
            }
        };

        if content.trim().is_empty() {
            return BTreeMap::new();
        }

        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    "Download index {:?} is malformed, treating as empty: {}",
                    path, e
                );
                BTreeMap::new()
            }
        }
    }

    /// Records a completed download, rewriting the index file wholesale.
    pub fn record(&self, entry: &LocalFileEntry) -> MusicResult<()> {
        let _lock = self
            .save_lock
            .lock()
            .map_err(|e| MusicError::IndexError(e.to_string()))?;

        let mut map = self.load();
        map.insert(
            entry.file_name.clone(),
            IndexRecord {
                download_date: entry.download_date,
                original_url: entry.original_url.clone(),
                file_path: entry.file_path.clone(),
                guild_id: entry.guild_id,
            },
        );

        fs::create_dir_all(&self.dir).map_err(|e| MusicError::IndexError(e.to_string()))?;
        let serialized = serde_json::to_string_pretty(&map)
            .map_err(|e| MusicError::IndexError(e.to_string()))?;
        fs::write(self.index_path(), serialized)
            .map_err(|e| MusicError::IndexError(e.to_string()))?;

        debug!("Recorded download '{}' in {:?}", entry.file_name, self.dir);
        Ok(())
    }

    /// Finds the first indexed file owned by `guild_id` whose title matches
    /// the search string. Entries without a backing file on disk are stale
    /// and skipped.
    pub fn find_match(&self, search: &str, guild_id: GuildId) -> Option<LocalFileEntry> {
        for (file_name, record) in self.load() {
            if record.guild_id != guild_id {
                continue;
            }

            let title = title_from_file_name(&file_name);
            if !tokens_match(search, &title) {
                continue;
            }

            if !record.file_path.exists() {
                debug!(
                    "Index entry '{}' has no backing file, skipping",
                    file_name
                );
                continue;
            }

            return Some(LocalFileEntry {
                file_name,
                file_path: record.file_path,
                title,
                guild_id: record.guild_id,
                download_date: record.download_date,
                original_url: record.original_url,
            });
        }

        None
    }
}

/// Derives a display title from a file name: extension stripped, underscores
/// treated as spaces.
pub fn title_from_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    stem.replace('_', " ")
}

/// Order-independent token-subset match between a search string and a title.
///
/// Every query word must satisfy at least one title word: exact equality for
/// words shorter than 3 characters, bidirectional substring containment
/// otherwise. Deliberately loose so partial titles still hit; no fuzzy
/// edit-distance.
pub fn tokens_match(search: &str, title: &str) -> bool {
    let title_lower = title.to_lowercase();
    let title_words: Vec<&str> = title_lower.split_whitespace().collect();
    let search_lower = search.to_lowercase();
    let search_words: Vec<&str> = search_lower.split_whitespace().collect();

    if search_words.is_empty() || title_words.is_empty() {
        return false;
    }

    search_words.iter().all(|q| {
        title_words.iter().any(|t| {
            if q.len() < 3 {
                q == t
            } else {
                q.contains(t) || t.contains(q)
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn entry(dir: &Path, file_name: &str, guild: u64) -> LocalFileEntry {
        let file_path = dir.join(file_name);
        fs::write(&file_path, b"audio").unwrap();
        LocalFileEntry {
            file_name: file_name.to_string(),
            file_path,
            title: title_from_file_name(file_name),
            guild_id: GuildId::new(guild),
            download_date: Utc::now(),
            original_url: Some("https://example.com/video123".to_string()),
        }
    }

    #[test_case("Never Gonna Give You Up", "never gonna" => true; "substring tokens match")]
    #[test_case("Interstellar Main Theme", "interstellar ost" => false; "unmatched token fails")]
    #[test_case("Ai", "ai" => true; "short token exact match")]
    #[test_case("Ai", "a" => false; "short token inexact no match")]
    #[test_case("Never Gonna Give You Up", "gonna never" => true; "order independent")]
    #[test_case("Some Title", "" => false; "empty query never matches")]
    fn token_policy(title: &str, query: &str) -> bool {
        tokens_match(query, title)
    }

    #[test]
    fn round_trip_record_then_find() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalFileIndex::new(dir.path());
        let entry = entry(dir.path(), "Never_Gonna_Give_You_Up.mp3", 1);
        index.record(&entry).unwrap();

        let found = index
            .find_match("Never Gonna Give You Up", GuildId::new(1))
            .expect("exact title should match its own entry");
        assert_eq!(found.file_name, "Never_Gonna_Give_You_Up.mp3");
        assert_eq!(found.title, "Never Gonna Give You Up");
    }

    #[test]
    fn entries_never_leak_across_guilds() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalFileIndex::new(dir.path());
        index.record(&entry(dir.path(), "song.mp3", 1)).unwrap();

        assert!(index.find_match("song", GuildId::new(2)).is_none());
        assert!(index.find_match("song", GuildId::new(1)).is_some());
    }

    #[test]
    fn stale_entry_without_backing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalFileIndex::new(dir.path());
        let entry = entry(dir.path(), "gone.mp3", 1);
        index.record(&entry).unwrap();
        fs::remove_file(&entry.file_path).unwrap();

        assert!(index.find_match("gone", GuildId::new(1)).is_none());
    }

    #[test]
    fn malformed_index_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(INDEX_FILE), b"{ not json").unwrap();
        let index = LocalFileIndex::new(dir.path());

        assert!(index.find_match("anything", GuildId::new(1)).is_none());

        // Recording through the malformed file recovers it.
        index.record(&entry(dir.path(), "fresh.mp3", 1)).unwrap();
        assert!(index.find_match("fresh", GuildId::new(1)).is_some());
    }

    #[test]
    fn missing_index_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalFileIndex::new(dir.path());
        assert!(index.find_match("anything", GuildId::new(1)).is_none());
    }
}
