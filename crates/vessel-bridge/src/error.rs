//! Error types for the engine bridge

use std::path::PathBuf;
use thiserror::Error;

/// Where in the library load sequence a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Locating,
    Opening,
    Resolving,
}

impl std::fmt::Display for LoadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadStage::Locating => write!(f, "locating library"),
            LoadStage::Opening => write!(f, "opening library"),
            LoadStage::Resolving => write!(f, "resolving entry points"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Engine load failed at {stage} stage: {path}\n  Reason: {reason}")]
    LoadFailed {
        path: PathBuf,
        stage: LoadStage,
        reason: String,
    },

    #[error("Engine returned no instance")]
    InstantiationFailed,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to restore engine state: {0}")]
    StateRestoreError(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
