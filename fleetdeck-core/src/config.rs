//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings shared by every handler.
///
/// All fields have defaults, so an empty TOML document is a valid config:
///
/// ```toml
/// api_prefix = "/api/v1"
/// default_device_type = "Other"
/// conflict_status = 409
/// session_expired_status = 401
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prefix prepended to every backend path.
    pub api_prefix: String,

    /// `deviceType` sent when registering a new device with the core service.
    pub default_device_type: String,

    /// Status the backend uses for uniqueness violations.
    pub conflict_status: u16,

    /// Status that means the session is gone and the app must start over.
    pub session_expired_status: u16,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api/v1".to_string(),
            default_device_type: "Other".to_string(),
            conflict_status: 409,
            session_expired_status: 401,
        }
    }
}

impl StoreConfig {
    /// Parse a config from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "api_prefix must start with '/', got {:?}",
                self.api_prefix
            )));
        }
        if self.conflict_status == self.session_expired_status {
            return Err(ConfigError::Invalid(
                "conflict_status and session_expired_status must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Join `path` onto the API prefix.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_prefix.trim_end_matches('/'), path)
    }
}
