//! Centralized error types for the Gerbang workspace.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Top-level error enum. Variants map to subsystems.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GerbangError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server rejected request: {0}")]
    Rejected(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

pub type GerbangResult<T> = Result<T, GerbangError>;

// ---------------------------------------------------------------------------
// Guarded mutations
// ---------------------------------------------------------------------------

/// Used when a failure carries no usable text of its own.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// Shown for transport-level failures; the underlying error is logged instead.
pub const NETWORK_FAILURE_MESSAGE: &str = "Unable to reach the server, please try again";

/// Terminal failure of a guarded mutation.
///
/// The payload is always a non-empty, human-readable message that a UI can
/// render as-is. Build values through the constructors to keep that true.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    /// The CSRF token endpoint was unreachable or answered non-2xx.
    #[error("{0}")]
    TokenUnavailable(String),

    /// The server refused the mutation (`status: false` or non-2xx).
    #[error("{0}")]
    RequestRejected(String),

    /// The mutation request itself never got a response.
    #[error("{0}")]
    NetworkError(String),
}

impl MutationError {
    pub fn token_unavailable(message: impl Into<String>) -> Self {
        Self::TokenUnavailable(non_empty(message.into()))
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::RequestRejected(non_empty(message.into()))
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError(non_empty(message.into()))
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::TokenUnavailable(_) => FailureKind::TokenUnavailable,
            Self::RequestRejected(_) => FailureKind::RequestRejected,
            Self::NetworkError(_) => FailureKind::NetworkError,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::TokenUnavailable(m) | Self::RequestRejected(m) | Self::NetworkError(m) => m,
        }
    }
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        GENERIC_FAILURE_MESSAGE.to_string()
    } else {
        message
    }
}

/// Discriminant of [`MutationError`], handy for logging and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    TokenUnavailable,
    RequestRejected,
    NetworkError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TokenUnavailable => "token-unavailable",
            Self::RequestRejected => "request-rejected",
            Self::NetworkError => "network-error",
        };
        f.write_str(s)
    }
}

/// Outcome of one guarded mutation: the response's `data` on success.
pub type MutationResult = Result<serde_json::Value, MutationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_messages_fall_back_to_generic() {
        let err = MutationError::rejected("   ");
        assert_eq!(err.message(), GENERIC_FAILURE_MESSAGE);
        assert_eq!(err.kind(), FailureKind::RequestRejected);
    }

    #[test]
    fn display_is_the_bare_message() {
        let err = MutationError::rejected("User not found");
        assert_eq!(err.to_string(), "User not found");
    }

    #[test]
    fn kind_labels() {
        assert_eq!(
            MutationError::token_unavailable("x").kind().to_string(),
            "token-unavailable"
        );
        assert_eq!(
            MutationError::network("x").kind(),
            FailureKind::NetworkError
        );
    }
}
