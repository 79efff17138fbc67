use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::leef::ProductIdentity;

/// Header identity for emitted LEEF events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeefConfig {
    /// Vendor name for the LEEF header.
    #[serde(default = "default_vendor")]
    pub vendor: String,

    /// Product name for the LEEF header.
    #[serde(default = "default_product")]
    pub product: String,

    /// Product version for the LEEF header.
    /// If not specified, uses the crate version from Cargo.toml.
    #[serde(default)]
    pub version: Option<String>,
}

impl Default for LeefConfig {
    fn default() -> Self {
        Self {
            vendor: default_vendor(),
            product: default_product(),
            version: None,
        }
    }
}

impl LeefConfig {
    /// Get the product version, falling back to the crate version.
    pub fn get_version(&self) -> &str {
        self.version.as_deref().unwrap_or(env!("CARGO_PKG_VERSION"))
    }

    pub fn identity(&self) -> ProductIdentity {
        ProductIdentity::new(&self.vendor, &self.product, self.get_version())
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.vendor.trim().is_empty() {
            return Err(ConfigError::Validation("leef.vendor must not be empty".into()));
        }
        if self.product.trim().is_empty() {
            return Err(ConfigError::Validation("leef.product must not be empty".into()));
        }
        Ok(())
    }
}

fn default_vendor() -> String {
    "AlphaSOC".to_string()
}

fn default_product() -> String {
    "NFR".to_string()
}
