use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::draft::IdentifierMode;
use crate::error::ConfigError;
use crate::registry::DEFAULT_CHANGE_CAPACITY;
use crate::{DEFAULT_FOCUS_RADIUS_KM, DEFAULT_STARTUP_RADIUS_KM};

pub const DEFAULT_DATABASE_FILE: &str = "incident_logs.db3";
pub const DEFAULT_MAX_IDENTIFIER_ATTEMPTS: u32 = 5;

// ============================================================================
// Engine configuration
// ============================================================================

/// Host-supplied settings. Every field has a default, so `{}` is a valid
/// document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub database_path: PathBuf,
    pub identifier_mode: IdentifierMode,
    pub startup_radius_km: f64,
    pub focus_radius_km: f64,
    pub max_identifier_attempts: u32,
    pub change_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_FILE),
            identifier_mode: IdentifierMode::Generated,
            startup_radius_km: DEFAULT_STARTUP_RADIUS_KM,
            focus_radius_km: DEFAULT_FOCUS_RADIUS_KM,
            max_identifier_attempts: DEFAULT_MAX_IDENTIFIER_ATTEMPTS,
            change_channel_capacity: DEFAULT_CHANGE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database_path must not be empty".into()));
        }
        if !(self.startup_radius_km.is_finite() && self.startup_radius_km > 0.0) {
            return Err(ConfigError::Invalid("startup_radius_km must be > 0".into()));
        }
        if !(self.focus_radius_km.is_finite() && self.focus_radius_km > 0.0) {
            return Err(ConfigError::Invalid("focus_radius_km must be > 0".into()));
        }
        if self.max_identifier_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_identifier_attempts must be > 0".into(),
            ));
        }
        if self.change_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "change_channel_capacity must be > 0".into(),
            ));
        }
        Ok(())
    }
}
