//! Settings file loading and saving.
//!
//! The settings live in a single JSON5 file under a dotted folder in the
//! user's home directory. Loading never fails: an absent or unreadable file
//! yields the default record, which is written back immediately so the next
//! session finds a file.

mod merge;


use crate::{Config, ConfigError};
use directories::UserDirs;
use log::{debug, info, warn};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings folder under the home directory.
pub const DEFAULT_CONFIG_DIR: &str = ".llamatui";
/// Settings file name inside [`DEFAULT_CONFIG_DIR`].
pub const DEFAULT_CONFIG_FILE: &str = "config.json5";

/// Outcome of reading the settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// The file existed and was applied over the defaults.
    Loaded,
    /// No file existed; defaults are in use.
    Missing,
    /// The file could not be read or parsed; defaults are in use.
    Corrupt(String),
}

/// Settings record returned by [`ConfigStore::load`].
#[derive(Debug, Clone)]
pub struct Loaded {
    /// Effective settings.
    pub config: Config,
    /// How the settings were obtained.
    pub status: LoadStatus,
    /// Error from writing the settings back, if any.
    pub save_error: Option<String>,
}

impl Loaded {
    /// One-line summary for the status line.
    pub fn message(&self, path: &Path) -> String {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        match &self.status {
            LoadStatus::Loaded => format!("Settings loaded from {name}."),
            LoadStatus::Missing => "No persistent settings found. Using defaults.".to_string(),
            LoadStatus::Corrupt(_) => "Error loading settings. Using defaults.".to_string(),
        }
    }
}

/// Reads and writes the settings file at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store backed by an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by [`ConfigStore::default_path`].
    pub fn at_default_location() -> Self {
        Self::new(Self::default_path())
    }

    /// `~/.llamatui/config.json5`, or `./config.json5` without a home directory.
    pub fn default_path() -> PathBuf {
        UserDirs::new()
            .map(|dirs| {
                dirs.home_dir()
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILE)
            })
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to defaults, and persist the result.
    pub fn load(&self) -> Loaded {
        let (config, status) = match self.read() {
            Ok(Some(config)) => {
                info!("settings loaded (path={})", self.path.display());
                (config, LoadStatus::Loaded)
            }
            Ok(None) => {
                info!("settings missing, using defaults (path={})", self.path.display());
                (Config::default(), LoadStatus::Missing)
            }
            Err(err) => {
                warn!(
                    "settings unreadable, using defaults (path={}, err={})",
                    self.path.display(),
                    err
                );
                (Config::default(), LoadStatus::Corrupt(err.to_string()))
            }
        };
        let save_error = self.save(&config).err().map(|err| err.to_string());
        Loaded {
            config,
            status,
            save_error,
        }
    }

    /// Write the full settings record.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, contents)?;
        debug!("settings saved (path={})", self.path.display());
        Ok(())
    }

    /// Parse settings from JSON5 text, overlaying them onto the defaults.
    pub fn load_from_str(contents: &str) -> Result<Config, ConfigError> {
        let value: Value = json5::from_str(contents)?;
        let Value::Object(persisted) = value else {
            return Err(ConfigError::NotAnObject);
        };
        let mut config = merge::overlay_onto_defaults(&persisted)?;
        config.sanitize();
        Ok(config)
    }

    fn read(&self) -> Result<Option<Config>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        Self::load_from_str(&contents).map(Some)
    }
}
