//! Provider error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Stable error codes a provider reports.
///
/// Subprocess providers put these on the wire, so the spelling is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The path is not a valid binary module (malformed or wrong format).
    UnreadableArtifact,
    /// The module was read but signing it failed (permissions, locked file).
    SigningFailed,
    /// A key pair could not be generated.
    KeyGenerationFailed,
    /// A reference fixup or friend-declaration scrub failed.
    OperationFailed,
    /// The provider violated the request/response envelope.
    ProtocolError,
    /// Local I/O failure while talking to the provider.
    IoError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreadableArtifact => write!(f, "UNREADABLE_ARTIFACT"),
            Self::SigningFailed => write!(f, "SIGNING_FAILED"),
            Self::KeyGenerationFailed => write!(f, "KEY_GENERATION_FAILED"),
            Self::OperationFailed => write!(f, "OPERATION_FAILED"),
            Self::ProtocolError => write!(f, "PROTOCOL_ERROR"),
            Self::IoError => write!(f, "IO_ERROR"),
        }
    }
}

/// Error payload of a failed provider response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    pub code: ErrorCode,
    /// Single-line human-readable message
    pub message: String,
}

impl WireError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Errors returned by `SigningProvider` operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("unreadable artifact '{}': {reason}", path.display())]
    UnreadableArtifact { path: PathBuf, reason: String },

    #[error("signing failed for '{}': {reason}", path.display())]
    SigningFailed { path: PathBuf, reason: String },

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("provider operation failed: {0}")]
    Operation(String),

    #[error("provider protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnreadableArtifact {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn signing_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SigningFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnreadableArtifact { .. } => ErrorCode::UnreadableArtifact,
            Self::SigningFailed { .. } => ErrorCode::SigningFailed,
            Self::KeyGeneration(_) => ErrorCode::KeyGenerationFailed,
            Self::Operation(_) => ErrorCode::OperationFailed,
            Self::Protocol(_) | Self::Json(_) => ErrorCode::ProtocolError,
            Self::Io(_) => ErrorCode::IoError,
        }
    }

    /// True for the recognized malformed-binary failure
    pub fn is_unreadable(&self) -> bool {
        matches!(self, Self::UnreadableArtifact { .. })
    }

    /// Rebuild a typed error from a wire payload. `path` is the artifact the
    /// request was about, if any.
    pub fn from_wire(error: WireError, path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_default();
        match error.code {
            ErrorCode::UnreadableArtifact => Self::unreadable(path, error.message),
            ErrorCode::SigningFailed => Self::signing_failed(path, error.message),
            ErrorCode::KeyGenerationFailed => Self::KeyGeneration(error.message),
            ErrorCode::OperationFailed => Self::Operation(error.message),
            ErrorCode::ProtocolError => Self::Protocol(error.message),
            ErrorCode::IoError => Self::Io(io::Error::other(error.message)),
        }
    }

    /// Short reason without the path prefix, for per-artifact reports
    pub fn reason(&self) -> String {
        match self {
            Self::UnreadableArtifact { reason, .. } | Self::SigningFailed { reason, .. } => {
                reason.clone()
            }
            other => other.to_string(),
        }
    }
}
