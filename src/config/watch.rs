use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Capacity of every subscriber channel
    #[serde(default = "default_subscriber_buffer_size")]
    pub subscriber_buffer_size: usize,

    /// How many recent events a late subscriber gets replayed
    #[serde(default = "default_replay_cache_size")]
    pub replay_cache_size: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer_size: default_subscriber_buffer_size(),
            replay_cache_size: default_replay_cache_size(),
        }
    }
}

impl WatchConfig {
    /// The replay burst must fit into a fresh subscriber buffer, otherwise
    /// every subscription after the cache fills up would be rejected.
    pub fn validate(&self) -> Result<()> {
        if self.subscriber_buffer_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "subscriber_buffer_size must be greater than 0".into(),
            )));
        }
        if self.replay_cache_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "replay_cache_size must be greater than 0".into(),
            )));
        }
        if self.replay_cache_size > self.subscriber_buffer_size {
            return Err(Error::Config(ConfigError::Message(format!(
                "replay_cache_size ({}) can not exceed subscriber_buffer_size ({})",
                self.replay_cache_size, self.subscriber_buffer_size
            ))));
        }
        Ok(())
    }
}

fn default_subscriber_buffer_size() -> usize {
    100
}
fn default_replay_cache_size() -> usize {
    100
}
