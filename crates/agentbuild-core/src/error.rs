//! Error types for agentbuild.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("unable to build for platform {target} when running on {host}")]
    CrossBuildUnsupported { target: String, host: String },

    #[error("invalid {kind} {value:?}: {message}")]
    InvalidFormat {
        kind: &'static str,
        value: String,
        message: String,
    },

    #[error("email address domain '{domain}' does not belong to the configured domain '{required}'")]
    DomainMismatch { domain: String, required: String },

    #[error("missing configuration value: {0}")]
    ConfigMissing(String),

    #[error("invalid configuration value for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    #[error("build failed: {0}")]
    BuildFailed(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an IO error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an [`Error::InvalidFormat`] for a semantic value.
    pub fn invalid_format(
        kind: &'static str,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidFormat {
            kind,
            value: value.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
