/// Service configuration
use crate::error::{Result, ServiceError};
use cabin_core::types::validate_zones;
use cabin_core::{UserId, ZoneConfig};
use cabin_volume::Persistence;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "cabin-audio.toml";

/// Environment variable prefix, e.g. `CABIN_FOCUS__REJECT_NAVIGATION_ON_CALL`
pub const ENV_PREFIX: &str = "CABIN";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_focus")]
    pub focus: FocusSettings,

    #[serde(default = "default_volume")]
    pub volume: VolumeSettings,

    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FocusSettings {
    #[serde(default)]
    pub reject_navigation_on_call: bool,

    /// When false, requests that would be delayed fail instead
    #[serde(default = "default_enabled")]
    pub delayed_focus_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VolumeSettings {
    #[serde(default = "default_enabled")]
    pub persist_gain: bool,

    #[serde(default)]
    pub persist_mute: bool,

    #[serde(default = "default_initial_user")]
    pub initial_user: u32,
}

impl ServiceConfig {
    /// Load configuration from `cabin-audio.toml` and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from `path` (if it exists) and the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_layered(path, ENV_PREFIX)
    }

    /// Parse configuration from TOML text, without environment overrides
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .map_err(|e| ServiceError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ServiceError::Config(e.to_string()))
    }

    fn load_layered(path: &Path, env_prefix: &str) -> Result<Self> {
        let mut settings = config::Config::builder();

        if path.exists() {
            debug!(path = %path.display(), "loading audio configuration file");
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| ServiceError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Validate zone topology
    pub fn validate(&self) -> Result<()> {
        validate_zones(&self.zones)?;
        Ok(())
    }

    pub fn persistence(&self) -> Persistence {
        Persistence {
            gain: self.volume.persist_gain,
            mute: self.volume.persist_mute,
        }
    }

    pub fn initial_user(&self) -> UserId {
        UserId::new(self.volume.initial_user)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            focus: default_focus(),
            volume: default_volume(),
            zones: Vec::new(),
        }
    }
}

// Default value functions
fn default_focus() -> FocusSettings {
    FocusSettings {
        reject_navigation_on_call: false,
        delayed_focus_enabled: default_enabled(),
    }
}

fn default_volume() -> VolumeSettings {
    VolumeSettings {
        persist_gain: default_enabled(),
        persist_mute: false,
        initial_user: default_initial_user(),
    }
}

fn default_enabled() -> bool {
    true
}

fn default_initial_user() -> u32 {
    10
}
