use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// A list page is cut once its values add up to this many bytes
    #[serde(default = "default_max_page_size_bytes")]
    pub max_page_size_bytes: usize,

    /// Used when a list request asks for less than one item
    #[serde(default = "default_list_limit")]
    pub default_list_limit: i64,

    /// Seed of the version counter, so a restarted store never reuses versions
    #[serde(default = "default_initial_resource_version")]
    pub initial_resource_version: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_page_size_bytes: default_max_page_size_bytes(),
            default_list_limit: default_list_limit(),
            initial_resource_version: default_initial_resource_version(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_page_size_bytes == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_page_size_bytes must be greater than 0".into(),
            )));
        }
        if self.default_list_limit < 1 {
            return Err(Error::Config(ConfigError::Message(format!(
                "default_list_limit must be positive, got {}",
                self.default_list_limit
            ))));
        }
        if self.initial_resource_version < 0 {
            return Err(Error::Config(ConfigError::Message(format!(
                "initial_resource_version can not be negative, got {}",
                self.initial_resource_version
            ))));
        }
        Ok(())
    }
}

fn default_max_page_size_bytes() -> usize {
    2 * 1024 * 1024
}
fn default_list_limit() -> i64 {
    500
}
fn default_initial_resource_version() -> i64 {
    0
}
