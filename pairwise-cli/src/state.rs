use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pairwise_core::KvStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// `$PAIRWISE_HOME`, or `~/.pairwise`.
pub fn pairwise_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("PAIRWISE_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".pairwise"))
}

pub fn ensure_pairwise_home() -> Result<PathBuf> {
    let dir = pairwise_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// On-disk layout of the state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StateFile {
    saved_at_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    slots: BTreeMap<String, Value>,
}

/// Key-value store backed by one JSON file.
///
/// Writes stay in memory until [`KvStore::flush`], which replaces the file
/// atomically (temp file + rename).
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    file: StateFile,
    dirty: bool,
}

impl JsonFileStore {
    /// Open `path`. A missing file is an empty store; an unreadable JSON file
    /// is moved aside to `<path>.bak` and replaced by an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                file: StateFile::default(),
                dirty: false,
            });
        }

        let s = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let file = match serde_json::from_str::<StateFile>(&s) {
            Ok(file) => file,
            Err(e) => {
                let backup = backup_path(&path);
                warn!(
                    path = %path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "state file is corrupt; starting fresh"
                );
                fs::rename(&path, &backup)
                    .with_context(|| format!("move {} aside", path.display()))?;
                StateFile::default()
            }
        };

        Ok(Self {
            path,
            file,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.file.saved_at_utc
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.file.slots.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        if self.file.slots.get(key) != Some(&value) {
            self.file.slots.insert(key.to_string(), value);
            self.dirty = true;
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.file.slots.remove(key).is_some() {
            self.dirty = true;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }

        self.file.saved_at_utc = Some(Utc::now());
        let json = serde_json::to_string_pretty(&self.file).context("serialize state")?;

        let tmp = tmp_path(&self.path);
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace {}", self.path.display()))?;

        self.dirty = false;
        info!(path = %self.path.display(), "state saved");
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".tmp");
    PathBuf::from(s)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".bak");
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairwise_core::{Session, Stage};

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("state.json")).unwrap();
        assert!(store.get(pairwise_core::keys::TASKS).is_none());
        assert!(store.saved_at().is_none());
    }

    #[test]
    fn session_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut s = Session::new();
        s.add_tasks_bulk("Write report\nCall client\nClean desk");
        s.start().unwrap();
        s.skip();

        let mut store = JsonFileStore::open(&path).unwrap();
        s.save(&mut store).unwrap();
        assert!(path.exists());
        assert!(!tmp_path(&path).exists());

        let reopened = JsonFileStore::open(&path).unwrap();
        assert!(reopened.saved_at().is_some());
        let loaded = Session::load(&reopened);
        assert_eq!(loaded, s);
        assert_eq!(loaded.stage(), Stage::Comparing);
        assert_eq!(loaded.engine().cursor(), 1);
    }

    #[test]
    fn corrupt_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.get(pairwise_core::keys::STAGE).is_none());
        assert!(backup_path(&path).exists());
        assert!(!path.exists());
    }

    #[test]
    fn clearing_removes_slots_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut s = Session::new();
        s.add_task("a");
        let mut store = JsonFileStore::open(&path).unwrap();
        s.save(&mut store).unwrap();

        Session::clear_store(&mut store).unwrap();
        let reopened = JsonFileStore::open(&path).unwrap();
        assert!(Session::load(&reopened).tasks().is_empty());
        assert!(reopened.get(pairwise_core::keys::NEXT_ID).is_none());
    }
}
