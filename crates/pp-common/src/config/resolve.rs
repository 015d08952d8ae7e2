//! Settings resolution.
//!
//! Implements deterministic resolution order:
//! 1. Explicit CLI flag (--config)
//! 2. Environment variable (PARTITION_PROBS_CONFIG)
//! 3. XDG config (`$XDG_CONFIG_HOME/partition_probs/settings.json`, then the
//!    platform config dir)
//! 4. Built-in defaults

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::{ConfigResolution, ConfigSource, LoadedSettings, Settings};
use crate::error::{Error, Result};

/// Environment variable naming an explicit settings file.
pub const CONFIG_ENV_VAR: &str = "PARTITION_PROBS_CONFIG";

const APP_DIR: &str = "partition_probs";
const SETTINGS_FILE: &str = "settings.json";

/// Settings resolver with deterministic resolution order.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    /// Path from the CLI flag
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a new resolver with an optional CLI path.
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        ConfigResolver { cli_path }
    }

    /// Resolve the settings path.
    ///
    /// Explicit paths (flag or env) are returned even when missing so that the
    /// load reports the error; discovered XDG paths are only used if present.
    pub fn resolve_settings_path(&self) -> (Option<PathBuf>, ConfigResolution) {
        // 1. CLI flag
        if let Some(ref path) = self.cli_path {
            return (Some(path.clone()), ConfigResolution::CliFlag);
        }

        // 2. PARTITION_PROBS_CONFIG env var
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return (Some(PathBuf::from(path)), ConfigResolution::EnvVar);
            }
        }

        // 3. XDG config dir
        for dir in Self::config_dirs() {
            let path = dir.join(APP_DIR).join(SETTINGS_FILE);
            if path.exists() {
                return (Some(path), ConfigResolution::XdgConfig);
            }
        }

        // 4. Default
        (None, ConfigResolution::Default)
    }

    fn config_dirs() -> Vec<PathBuf> {
        let mut dirs_found = Vec::new();
        if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
            dirs_found.push(PathBuf::from(xdg));
        }
        if let Some(dir) = dirs::config_dir() {
            if !dirs_found.contains(&dir) {
                dirs_found.push(dir);
            }
        }
        dirs_found
    }

    /// Load settings from the resolved path or defaults.
    pub fn load(&self) -> Result<LoadedSettings> {
        let (path, resolution) = self.resolve_settings_path();

        match path {
            Some(p) => load_from_path(&p, resolution),
            None => Ok(LoadedSettings {
                settings: Settings::default(),
                source: ConfigSource {
                    path: None,
                    hash: None,
                    resolution: ConfigResolution::Default,
                },
            }),
        }
    }
}

fn load_from_path(path: &Path, resolution: ConfigResolution) -> Result<LoadedSettings> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("failed to read settings from {}: {}", path.display(), e))
    })?;

    let hash = compute_sha256(&content);

    let settings: Settings = serde_json::from_str(&content).map_err(|e| {
        Error::InvalidConfig(format!("failed to parse {}: {}", path.display(), e))
    })?;

    settings.validate()?;

    Ok(LoadedSettings {
        settings,
        source: ConfigSource {
            path: Some(path.to_string_lossy().to_string()),
            hash: Some(hash),
            resolution,
        },
    })
}

/// Compute SHA-256 hash of a string.
fn compute_sha256(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}
