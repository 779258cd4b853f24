use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::logging::LogDestination;

pub const DEFAULT_CONFIG_FILE: &str = "scraper.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("could not serialize config: {0}")]
    Serialize(#[from] ron::Error),
    #[error("could not write config {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the worker's HTTP API listens.
    pub worker_base_url: String,
    /// Output the worker writes; read back to resolve results.
    pub artifact_path: PathBuf,
    /// NDJSON file the worker appends progress events to.
    pub event_log: PathBuf,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub log_destination: LogDestination,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            worker_base_url: "http://127.0.0.1:5000".to_string(),
            artifact_path: PathBuf::from("jobs.xlsx"),
            event_log: PathBuf::from("scraper_events.ndjson"),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            log_destination: LogDestination::Terminal,
        }
    }
}

impl AppConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Loads `path`, falling back to defaults when the file does not exist.
pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Saves `config` unless `path` exists but failed to load, so an operator's
/// broken file is never replaced with defaults. Returns whether it was written.
pub fn save_unless_broken(
    path: &Path,
    config: &AppConfig,
    load_error: Option<&ConfigError>,
) -> Result<bool, ConfigError> {
    if load_error.is_some() {
        return Ok(false);
    }
    save(path, config)?;
    Ok(true)
}

/// Writes `config` next to `path` and renames it into place.
fn save(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let content = ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::new())?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.as_file_mut().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}
