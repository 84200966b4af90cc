//! Configuration management for the attribute database.
//!
//! Provides hierarchical configuration loading with priority:
//! 1. Default values (hardcoded)
//! 2. Optional config file (`ATTRDB_CONFIG_PATH`)
//! 3. Environment variables (highest priority)

mod database;

pub use database::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Polling and delivery parameters for the attribute database
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Settings {
    /// Load configuration from defaults, an optional TOML file pointed at by
    /// `ATTRDB_CONFIG_PATH`, and `ATTRDB_`-prefixed environment variables.
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if let Ok(path) = env::var("ATTRDB_CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("ATTRDB")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.database.validate()?;
        Ok(settings)
    }
}
