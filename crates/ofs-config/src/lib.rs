//! Key/value configuration for the OrangeFS connector.
//!
//! A [`Configuration`] is a flat, ordered map of dotted keys to string
//! values, the same shape a Hadoop `core-site` file carries. It is always
//! passed explicitly to the components that need it; there is no process
//! wide default resource.

pub mod configuration;
pub mod keys;

pub use configuration::Configuration;

use std::path::PathBuf;

/// Errors raised while loading or reading configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("toml parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("toml serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("missing required key: {0}")]
    Missing(String),

    #[error("type mismatch for {field}: expected {expected}, got {value:?}")]
    TypeMismatch {
        field: String,
        expected: String,
        value: String,
    },

    #[error("value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}
