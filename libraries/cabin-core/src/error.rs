/// Core error types for Cabin Audio
use thiserror::Error;

use crate::types::{GroupId, ZoneId};

/// Result type alias using `CabinError`
pub type Result<T> = std::result::Result<T, CabinError>;

/// Core error type for Cabin Audio
///
/// Arbitration outcomes (`FAILED`, `DELAYED`) are not errors; they are
/// returned as `FocusOutcome` values.
#[derive(Error, Debug)]
pub enum CabinError {
    /// A component could not be built from its inputs (fatal at startup)
    #[error("Construction error: {0}")]
    Construction(String),

    /// Invalid argument supplied by a caller
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Zone id not known to the service
    #[error("Unknown zone: {0}")]
    UnknownZone(ZoneId),

    /// Volume group id not known within a zone
    #[error("Unknown volume group {group} in zone {zone}")]
    UnknownVolumeGroup { zone: ZoneId, group: GroupId },

    /// Context id outside the registry, or INVALID where a real context is required
    #[error("Invalid context: {0}")]
    InvalidContext(i32),

    /// Gain index outside the group's range
    #[error("Gain index {index} out of range [{min}, {max}]")]
    GainIndexOutOfRange { index: i32, min: i32, max: i32 },

    /// Configuration validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Settings store errors
    #[error("Settings error: {0}")]
    Settings(String),

    /// Optional override collaborator failed
    #[error("Override error: {0}")]
    Override(String),
}

impl CabinError {
    /// Create a construction error
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a settings store error
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Create an override collaborator error
    pub fn override_failure(msg: impl Into<String>) -> Self {
        Self::Override(msg.into())
    }
}
