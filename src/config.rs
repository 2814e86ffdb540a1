use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::broadcast::VISIBILITY_RADIUS;
use crate::region::{ObjectOverride, PrototypeTable};

fn default_definitions() -> PathBuf {
    PathBuf::from("data/global_objects.cfg")
}

fn default_tick_interval_ms() -> u64 {
    600
}

fn default_visibility_radius() -> u32 {
    VISIBILITY_RADIUS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_removed_categories() -> Vec<String> {
    vec!["door".to_string(), "gate".to_string()]
}

fn default_category_planes() -> Vec<i32> {
    vec![0, 1, 2, 3]
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorldConfig {
    pub name: String,
    #[serde(default = "default_definitions")]
    pub definitions: PathBuf,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_visibility_radius")]
    pub visibility_radius: u32,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub region: RegionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionConfig {
    #[serde(default = "default_removed_categories")]
    pub removed_categories: Vec<String>,
    #[serde(default = "default_category_planes")]
    pub category_planes: Vec<i32>,
    #[serde(default)]
    pub prototypes: PrototypeTable,
    #[serde(default)]
    pub overrides: Vec<ObjectOverride>,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            removed_categories: default_removed_categories(),
            category_planes: default_category_planes(),
            prototypes: PrototypeTable::default(),
            overrides: Vec::new(),
        }
    }
}

impl WorldConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Reads a world config. A relative `definitions` path is resolved
    /// against the loader's base directory.
    pub fn load(&self, file: impl AsRef<Path>) -> Result<WorldConfig> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read world config {}", path.display()))?;
        let mut config: WorldConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        if config.definitions.is_relative() {
            config.definitions = self.base_dir.join(&config.definitions);
        }
        Ok(config)
    }
}
