//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("KDL parse error: {0}")]
    Parse(#[from] kdl::KdlError),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("unknown reference ${{{reference}}} in {key}")]
    InvalidReference { key: String, reference: String },

    #[error("cycle detected while interpolating: {0}")]
    CycleDetected(String),

    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl From<ConfigError> for agentbuild_core::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { path, source } => Self::Io { path, source },
            ConfigError::MissingField(field) => Self::ConfigMissing(field),
            ConfigError::InvalidValue { field, message } => Self::InvalidConfig {
                key: field,
                message,
            },
            ConfigError::InvalidReference { key, reference } => Self::InvalidConfig {
                key,
                message: format!("unknown reference ${{{reference}}}"),
            },
            ConfigError::CycleDetected(chain) => Self::InvalidConfig {
                key: chain.split(" -> ").next().unwrap_or_default().to_string(),
                message: format!("interpolation cycle: {chain}"),
            },
            ConfigError::Parse(e) => Self::InvalidConfig {
                key: "<document>".to_string(),
                message: e.to_string(),
            },
        }
    }
}
