//! User settings loaded from `~/.papertrade/config.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! A file that exists but does not parse is reported as an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::db;
use crate::ledger::LimitPricePolicy;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_ENV_VAR: &str = "PAPERTRADE_DB";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_path: Option<PathBuf>,
    /// Decimal places used when rendering money and quantities
    pub display_scale: u32,
    /// What to do with a limit price sent on a MARKET order
    pub market_limit_price: LimitPricePolicy,
    pub log_level: String,
    /// Owner of portfolios created from this installation
    pub user_id: Uuid,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            display_scale: 2,
            market_limit_price: LimitPricePolicy::default(),
            log_level: "warn".to_string(),
            user_id: Uuid::nil(),
        }
    }
}

impl Settings {
    /// Load settings from the default location, then apply env overrides
    pub fn load() -> Result<Self> {
        let path = db::get_app_dir()?.join(CONFIG_FILE_NAME);
        let mut settings = Self::load_from(&path)?;
        if let Some(db_path) = std::env::var_os(DB_ENV_VAR) {
            if !db_path.is_empty() {
                settings.database_path = Some(PathBuf::from(db_path));
            }
        }
        Ok(settings)
    }

    /// Load settings from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => db::get_default_db_path(),
        }
    }
}
