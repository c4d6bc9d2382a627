use anyhow::{Context, Result};
use directories::ProjectDirs;
use mediasync_config::{clamp_channel_capacity, DEFAULT_CHANNEL_CAPACITY};
use mediasync_fs::atomic_write;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::info;

const QUALIFIER: &str = "com";
const ORG: &str = "mediasync";
const APP: &str = "mediasync";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Identity this machine uploads under. Generated on first run.
    pub device_id: String,
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
    #[serde(default = "default_capacity")]
    pub channel_capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

/// `settings.json` in the platform config directory.
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from(QUALIFIER, ORG, APP)
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(Self {
            dir: proj_dirs.config_dir().to_path_buf(),
        })
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn settings_path(&self) -> PathBuf {
        self.dir.join("settings.json")
    }

    /// Snapshot catalog used when neither the flag nor the settings name one.
    pub fn default_catalog_path(&self) -> PathBuf {
        self.dir.join("catalog.json")
    }

    /// Loads the settings, creating them with a fresh device id when missing.
    pub fn load_or_init(&self) -> Result<Settings> {
        let path = self.settings_path();
        if path.exists() {
            let content = fs::read_to_string(&path).context("Failed to read settings")?;
            let mut settings: Settings =
                serde_json::from_str(&content).context("Failed to parse settings")?;
            settings.channel_capacity = clamp_channel_capacity(settings.channel_capacity);
            return Ok(settings);
        }

        let settings = Settings {
            device_id: uuid::Uuid::new_v4().to_string(),
            catalog_path: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        };
        self.save(&settings)?;
        info!("Created settings with device id {}", settings.device_id);
        Ok(settings)
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        let path = self.settings_path();
        atomic_write(&path, json.as_bytes())
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        Ok(())
    }

    pub fn catalog_path(&self, settings: &Settings) -> PathBuf {
        settings
            .catalog_path
            .clone()
            .unwrap_or_else(|| self.default_catalog_path())
    }
}
