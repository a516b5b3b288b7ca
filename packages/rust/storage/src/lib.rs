//! Flat-file state for ReelMiner: keyword history and used keywords.
//!
//! [`HistoryStore`] is the single writer. It is loaded once at the start of a
//! run, mutated in memory, and flushed as whole-file overwrites. Each file is
//! written to a temp file in the same directory and renamed into place, so a
//! crash before or during a flush leaves the previous flush intact.

mod history;
mod used;

use std::io::Write;
use std::path::{Path, PathBuf};

use reelminer_shared::{Keyword, ReelMinerError, Result, StateConfig};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub use history::{HistoryRecord, KeywordHistory};
pub use used::UsedKeywords;

/// Locations of the two state files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub history_file: PathBuf,
    pub used_file: PathBuf,
}

impl From<&StateConfig> for StatePaths {
    fn from(config: &StateConfig) -> Self {
        Self {
            history_file: PathBuf::from(&config.history_file),
            used_file: PathBuf::from(&config.used_file),
        }
    }
}

/// In-memory run state backed by the two flat files.
#[derive(Debug)]
pub struct HistoryStore {
    paths: StatePaths,
    history: KeywordHistory,
    used: UsedKeywords,
}

impl HistoryStore {
    /// Load both files. Missing files mean empty state.
    pub fn open(paths: StatePaths) -> Result<Self> {
        let history = load_history(&paths.history_file)?;
        let used = load_used_keywords(&paths.used_file)?;
        debug!(
            documents = history.len(),
            used = used.len(),
            "state loaded"
        );
        Ok(Self {
            paths,
            history,
            used,
        })
    }

    /// Overwrite the history entry for `document` with this run's extraction.
    pub fn record_extraction(&mut self, document: &str, keywords: Vec<Keyword>) {
        self.history.record(document, keywords);
    }

    /// Add `keyword` to the used set. Returns `true` if it was new.
    pub fn mark_used(&mut self, keyword: Keyword) -> bool {
        self.used.insert(keyword)
    }

    /// Forget every used keyword. Only reachable from the CLI.
    pub fn reset_used(&mut self) {
        self.used.clear();
    }

    pub fn history(&self) -> &KeywordHistory {
        &self.history
    }

    pub fn used(&self) -> &UsedKeywords {
        &self.used
    }

    pub fn paths(&self) -> &StatePaths {
        &self.paths
    }

    /// Persist both files.
    pub fn flush(&self) -> Result<()> {
        save_history(&self.paths.history_file, &self.history)?;
        save_used_keywords(&self.paths.used_file, &self.used)?;
        info!(
            documents = self.history.len(),
            used = self.used.len(),
            "state flushed"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Read the history JSON. A missing file is an empty history.
pub fn load_history(path: &Path) -> Result<KeywordHistory> {
    if !path.exists() {
        return Ok(KeywordHistory::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| ReelMinerError::io(path, e))?;
    if content.trim().is_empty() {
        return Ok(KeywordHistory::new());
    }
    serde_json::from_str(&content).map_err(|e| {
        ReelMinerError::Storage(format!("invalid history file {}: {e}", path.display()))
    })
}

/// Write the history JSON with 4-space indentation, non-ASCII kept as is.
pub fn save_history(path: &Path, history: &KeywordHistory) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    history
        .serialize(&mut ser)
        .map_err(|e| ReelMinerError::Storage(format!("failed to encode history: {e}")))?;
    buf.push(b'\n');
    write_atomically(path, &buf)
}

/// Read the used-keyword file. A missing file is an empty set.
pub fn load_used_keywords(path: &Path) -> Result<UsedKeywords> {
    if !path.exists() {
        return Ok(UsedKeywords::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| ReelMinerError::io(path, e))?;
    Ok(UsedKeywords::parse(&content))
}

/// Write the used-keyword file, one keyword per line.
pub fn save_used_keywords(path: &Path, used: &UsedKeywords) -> Result<()> {
    write_atomically(path, used.render().as_bytes())
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| ReelMinerError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ReelMinerError::io(dir, e))?;
    tmp.write_all(contents)
        .map_err(|e| ReelMinerError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| ReelMinerError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| ReelMinerError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(word: &str) -> Keyword {
        Keyword::parse(word).unwrap()
    }

    fn paths_in(dir: &Path) -> StatePaths {
        StatePaths {
            history_file: dir.join("keywords_dict.json"),
            used_file: dir.join("used_keywords.txt"),
        }
    }

    #[test]
    fn missing_files_open_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(paths_in(dir.path())).unwrap();
        assert!(store.history().is_empty());
        assert!(store.used().is_empty());
    }

    #[test]
    fn flush_then_reopen_restores_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = HistoryStore::open(paths_in(dir.path())).unwrap();
        store.record_extraction("Guion 1", vec![kw("GATO"), kw("PERRO")]);
        store.record_extraction("Guion 2", vec![kw("SOL")]);
        assert!(store.mark_used(kw("PERRO")));
        assert!(!store.mark_used(kw("PERRO")));
        store.flush().unwrap();

        let reopened = HistoryStore::open(paths_in(dir.path())).unwrap();
        assert_eq!(reopened.history(), store.history());
        assert_eq!(reopened.history().latest().unwrap().document, "Guion 2");
        assert!(reopened.used().contains(&kw("PERRO")));
    }

    #[test]
    fn unflushed_changes_do_not_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = HistoryStore::open(paths_in(dir.path())).unwrap();
        store.record_extraction("a", vec![kw("MAR")]);
        store.flush().unwrap();

        store.record_extraction("b", vec![kw("RIO")]);
        store.mark_used(kw("RIO"));
        drop(store);

        let reopened = HistoryStore::open(paths_in(dir.path())).unwrap();
        assert_eq!(reopened.history().len(), 1);
        assert!(reopened.used().is_empty());
    }

    #[test]
    fn used_keywords_roundtrip_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("used.txt");
        std::fs::write(&path, "SOL\nGATO\n\nPERRO\n").unwrap();

        let loaded = load_used_keywords(&path).unwrap();
        save_used_keywords(&path, &loaded).unwrap();
        let reloaded = load_used_keywords(&path).unwrap();

        assert_eq!(loaded, reloaded);
        assert_eq!(reloaded.len(), 3);
    }

    #[test]
    fn used_keywords_keep_lines_that_do_not_normalize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("used.txt");
        std::fs::write(&path, "Gato,\nSOL\n日本\n").unwrap();

        let loaded = load_used_keywords(&path).unwrap();
        save_used_keywords(&path, &loaded).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Gato,\nSOL\n日本\n");
        assert!(loaded.contains(&kw("GATO")));
        assert!(loaded.contains(&kw("SOL")));
    }

    #[test]
    fn history_file_matches_legacy_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords_dict.json");
        let mut history = KeywordHistory::new();
        history.record("Guión", vec![kw("SOL")]);
        save_history(&path, &history).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\n    \"Guión\": [\n        \"SOL\"\n    ]\n}\n");
    }

    #[test]
    fn corrupt_history_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords_dict.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_history(&path).unwrap_err();
        assert!(matches!(err, ReelMinerError::Storage(_)));
    }

    #[test]
    fn fixture_history_loads_in_file_order() {
        let history = load_history(Path::new("../../../fixtures/json/keywords_dict.fixture.json"))
            .expect("load fixture");
        assert_eq!(history.len(), 3);
        assert_eq!(history.latest().unwrap().document, "Guion episodio 3");
        assert_eq!(history.occurrences(&kw("PLAYA")), 3);
    }

    #[test]
    fn reset_used_clears_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = HistoryStore::open(paths_in(dir.path())).unwrap();
        store.mark_used(kw("SOL"));
        store.reset_used();
        store.flush().unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("used_keywords.txt")).unwrap(), "");
    }
}
