use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Settings that cannot describe a valid terrain. Raised at load time, never clamped.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read terrain config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse terrain config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
