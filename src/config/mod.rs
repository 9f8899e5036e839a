//! Store configuration.
//!
//! Sources are layered with increasing priority:
//! 1. Default values (hardcoded)
//! 2. Explicit config file passed to [`StoreConfig::load`]
//! 3. File named by the `CONFIG_PATH` environment variable
//! 4. Environment variables prefixed with `RSTORE__`

mod bulk;
mod server;
mod watch;
pub use bulk::*;
pub use server::*;
pub use watch::*;


//---
use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StoreConfig {
    /// Request handling limits and version seeding
    #[serde(default)]
    pub server: ServerConfig,
    /// Watch fan-out buffers
    #[serde(default)]
    pub watch: WatchConfig,
    /// Bulk ingestion policy
    #[serde(default)]
    pub bulk: BulkConfig,
}

impl StoreConfig {
    /// Load configuration from defaults, files and the environment.
    ///
    /// # Arguments
    /// * `path` - Optional path to a TOML file overriding the defaults
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }
        if let Ok(path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("RSTORE")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.watch.validate()?;
        self.bulk.validate()?;
        Ok(())
    }
}
