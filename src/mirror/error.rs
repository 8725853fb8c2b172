use std::path::PathBuf;

use thiserror::Error;

use crate::version::error::{ConfigError, RegistryError};

#[derive(Debug, Error)]
pub enum VersionControlError {
    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Mirrored files have uncommitted changes: {0:?}")]
    DirtyWorkingTree(Vec<PathBuf>),
}

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error(transparent)]
    Fetch(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    VersionControl(#[from] VersionControlError),

    #[error("Failed to rewrite {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
