//! Runtime configuration read from `config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Window and asset settings. Missing fields take their default.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub fullscreen: bool,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    /// Directory that textures, models and maps are resolved against.
    pub asset_root: PathBuf,
    /// Map file, relative to `asset_root`.
    pub map: PathBuf,
    /// Seed for the vegetation scatter; random when unset.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "emberblock".to_string(),
            fullscreen: false,
            width: 800,
            height: 600,
            target_fps: 60,
            asset_root: PathBuf::from("assets"),
            map: PathBuf::from("maps/level.map"),
            seed: None,
        }
    }
}

impl Config {
    /// Read the config at `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text)
                .with_context(|| format!("invalid config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        if config.target_fps == 0 {
            anyhow::bail!("target_fps must be at least 1");
        }
        Ok(config)
    }

    pub fn map_path(&self) -> PathBuf {
        self.asset_root.join(&self.map)
    }

    /// Fall back to the copy of the assets next to the executable when a
    /// relative `asset_root` does not exist in the working directory.
    pub fn resolve_asset_root(&mut self) {
        if self.asset_root.is_absolute() || self.asset_root.exists() {
            return;
        }
        let beside_exe = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(&self.asset_root)));
        if let Some(root) = beside_exe.filter(|root| root.exists()) {
            log::info!("Using assets from {}", root.display());
            self.asset_root = root;
        }
    }
}
