//! Service error types

use thiserror::Error;

use cabin_core::CabinError;

/// Result type alias using `ServiceError`
pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Audio core error: {0}")]
    Core(#[from] CabinError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for ServiceError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
