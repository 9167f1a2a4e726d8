use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::deck::{default_pairs, WordIconPair};
use crate::inventory::{ItemType, Location};
use crate::store::{CollectionPath, DEFAULT_APP_ID};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application id the shared collection is namespaced under
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// Custom sign-in token; anonymous sign-in when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Where the item store keeps its files (defaults to the data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Preselected location in the add-item form
    #[serde(default = "default_location")]
    pub default_location: Location,

    /// Preselected type in the add-item form
    #[serde(default = "default_item_type")]
    pub default_item_type: ItemType,

    /// Show desktop notifications for CLI additions
    #[serde(default)]
    pub notifications: bool,

    #[serde(default)]
    pub game: GameConfig,

    #[serde(default)]
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameConfig {
    /// Replaces the built-in deck when non-empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pairs: Vec<WordIconPair>,
}

/// Hex colour overrides (`#RRGGBB` or `#RGB`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub danger: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_back: Option<String>,
}

fn default_app_id() -> String {
    DEFAULT_APP_ID.to_string()
}

fn default_location() -> Location {
    Location::PantryCloset
}

fn default_item_type() -> ItemType {
    ItemType::PantryItem
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            auth_token: None,
            data_dir: None,
            default_location: default_location(),
            default_item_type: default_item_type(),
            notifications: false,
            game: GameConfig::default(),
            theme: ThemeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("pantry");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
            // Don't clobber a file the user is still editing
            return Ok(AppConfig::default());
        }

        let config = AppConfig::default();
        let _ = config.save();
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Directory holding the item store and log file
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?
            .join("pantry");
        Ok(dir)
    }

    pub fn collection_path(&self) -> CollectionPath {
        CollectionPath::for_app(&self.app_id)
    }

    /// Deck for a new game session
    pub fn pairs(&self) -> Vec<WordIconPair> {
        if self.game.pairs.is_empty() {
            default_pairs()
        } else {
            self.game.pairs.clone()
        }
    }
}
