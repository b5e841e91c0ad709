//! Top-level error type and process exit codes

use std::io;

use crate::config::ConfigError;
use crate::hooks::HookFailure;
use crate::model::ModelError;

/// Errors that abort a release run
#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid hook configuration: {0}")]
    Model(#[from] ModelError),

    #[error(transparent)]
    Hook(#[from] HookFailure),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReleaseError {
    /// Stable process exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            ReleaseError::Config(ConfigError::Merge(_)) => 2,
            ReleaseError::Config(_) => 1,
            ReleaseError::Model(_) => 3,
            ReleaseError::Hook(_) => 4,
            ReleaseError::Io(_) => 1,
            ReleaseError::Serialization(_) => 1,
        }
    }
}

/// Result type for release operations
pub type ReleaseResult<T> = Result<T, ReleaseError>;
