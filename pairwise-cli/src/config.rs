use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::state::ensure_pairwise_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputSection,
    pub storage: StorageSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSection {
    /// Longest task label accepted by `add`, in characters.
    pub max_task_len: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// State file name, relative to the pairwise home unless absolute.
    pub state_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter used when RUST_LOG is unset (e.g. "warn", "pairwise_core=debug").
    pub level: String,
}

impl Default for InputSection {
    fn default() -> Self {
        Self { max_task_len: 200 }
    }
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            state_file: "state.json".to_string(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn state_path(&self) -> Result<PathBuf> {
        let p = PathBuf::from(&self.storage.state_file);
        if p.is_absolute() {
            return Ok(p);
        }
        Ok(ensure_pairwise_home()?.join(p))
    }
}

pub fn config_path() -> Result<PathBuf> {
    ensure_pairwise_home().map(|home| home.join("config.toml"))
}

/// Read `config.toml` from the pairwise home; defaults when it is absent.
pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    match fs::read_to_string(&path) {
        Ok(raw) => parse_config(&raw).with_context(|| format!("parse {}", path.display())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
    }
}

pub fn parse_config(raw: &str) -> Result<Config> {
    Ok(toml::from_str(raw)?)
}

/// Write the default config to `path` unless a file is already there.
/// Returns whether anything was written.
pub fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let body = toml::to_string_pretty(&Config::default()).context("serialize config")?;
    fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.input.max_task_len, 200);
        assert_eq!(cfg.logging.level, "warn");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = parse_config("[input]\nmax_task_len = 80\n").unwrap();
        assert_eq!(cfg.input.max_task_len, 80);
        assert_eq!(cfg.storage.state_file, "state.json");
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        assert_eq!(parse_config(&s).unwrap(), Config::default());
    }

    #[test]
    fn absolute_state_file_is_used_as_is() {
        let mut cfg = Config::default();
        cfg.storage.state_file = "/tmp/pairwise-state.json".to_string();
        assert_eq!(cfg.state_path().unwrap(), PathBuf::from("/tmp/pairwise-state.json"));
    }

    #[test]
    fn default_config_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert!(write_default_config(&path).unwrap());
        fs::write(&path, "[input]\nmax_task_len = 10\n").unwrap();
        assert!(!write_default_config(&path).unwrap());

        let cfg = parse_config(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(cfg.input.max_task_len, 10);
    }

    #[test]
    fn bad_types_are_rejected() {
        assert!(parse_config("[input]\nmax_task_len = \"long\"\n").is_err());
    }
}
