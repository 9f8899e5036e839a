use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BulkConfig {
    /// Whether clients may ask for bulk items to bypass payload validation
    #[serde(default = "default_skip_validation_allowed")]
    pub skip_validation_allowed: bool,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            skip_validation_allowed: default_skip_validation_allowed(),
        }
    }
}

impl BulkConfig {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

fn default_skip_validation_allowed() -> bool {
    true
}
