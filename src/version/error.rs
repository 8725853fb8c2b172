use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest: {0}")]
    Parse(String),

    #[error("Invalid requirement '{requirement}': {reason}")]
    InvalidRequirement { requirement: String, reason: String },

    #[error("Manifest does not have {0} requirement")]
    MissingRequirement(String),

    #[error("{package}'s specifier should be exact matching, but `{requirement}`")]
    NotExactPin {
        package: String,
        requirement: String,
    },

    #[error("Cannot locate a `{package}==` pin to rewrite in {path:?}")]
    PinNotRewritable { package: String, path: PathBuf },
}
