//! Engine error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("State is not valid base64: {0}")]
    StateEncoding(#[from] base64::DecodeError),

    #[error("State payload is malformed: {0}")]
    StatePayload(#[from] bincode::Error),

    #[error("State is not valid UTF-8: {0}")]
    StateText(#[from] std::str::Utf8Error),

    #[error("Parent window handle {0:#x} is unusable")]
    InvalidParentWindow(usize),

    #[error("Window handles are not supported on this platform")]
    UnsupportedPlatform,
}

pub type Result<T> = std::result::Result<T, EngineError>;
