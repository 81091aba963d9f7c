//! Engine configuration, read from an optional JSON file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;
use crate::model::DEFAULT_TILE_SIZE;
use crate::world::WorldOptions;
use crate::world::tile::WrapPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding `Map/`, `Tilesets/` and `Script/`.
    pub content_root: PathBuf,
    /// Map used when the savefile names none.
    pub start_map: String,
    pub savefile: String,
    pub item_catalog: String,
    pub tile_size: u32,
    pub floor_wrap: WrapPolicy,
    pub decor_wrap: WrapPolicy,
    pub player_speed: u32,
    pub default_npc_speed: u32,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("GameContent"),
            start_map: "start".to_string(),
            savefile: "Savegame.json".to_string(),
            item_catalog: "ItemList.json".to_string(),
            tile_size: DEFAULT_TILE_SIZE,
            floor_wrap: WrapPolicy::Floor,
            decor_wrap: WrapPolicy::Decor,
            player_speed: 7,
            default_npc_speed: 5,
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Reading config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&json)
            .with_context(|| format!("Parsing config {}", path.display()))?;
        anyhow::ensure!(config.tile_size > 0, "tile_size must be positive");
        Ok(config)
    }

    /// Defaults when `path` is `None`.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn world_options(&self) -> WorldOptions {
        WorldOptions {
            tile_size: self.tile_size,
            default_npc_speed: self.default_npc_speed.max(1),
            floor_wrap: self.floor_wrap,
            decor_wrap: self.decor_wrap,
        }
    }
}
