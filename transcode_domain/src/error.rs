// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Domain error taxonomy.
//!
//! Each variant corresponds to one of the error kinds a caller of the RPC
//! surface can observe, and maps to a fixed `_http_resp_code` for replies.

use thiserror::Error;

/// Domain-specific errors for the transcode worker.
#[derive(Error, Debug, Clone)]
pub enum TranscodeError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication/authorization error: {0}")]
    Auth(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("format error: {0}")]
    Format(String),

    #[error("transcoder error: {0}")]
    Transcoder(String),

    #[error("capacity exceeded: {0}")]
    Capacity(String),

    #[error("service error: {0}")]
    Service(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl TranscodeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn transcoder(msg: impl Into<String>) -> Self {
        Self::Transcoder(msg.into())
    }

    pub fn capacity(msg: impl Into<String>) -> Self {
        Self::Capacity(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    /// Errors worth a retry by the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Capacity(_) | Self::Service(_) | Self::Io(_))
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Auth(_) => "auth",
            Self::Storage(_) => "storage",
            Self::Format(_) => "format",
            Self::Transcoder(_) => "transcoder",
            Self::Capacity(_) => "capacity",
            Self::Service(_) => "service",
            Self::Io(_) => "io",
            Self::Internal(_) => "internal",
        }
    }

    /// The `_http_resp_code` carried on a terminal error reply, per the
    /// kind-to-status-code mapping in the RPC contract.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Auth(_) => 401,
            Self::Storage(_) => 404,
            Self::Format(_) => 422,
            Self::Capacity(_) => 429,
            Self::Transcoder(_) | Self::Internal(_) => 500,
            Self::Service(_) | Self::Io(_) => 503,
        }
    }
}

impl From<std::io::Error> for TranscodeError {
    fn from(err: std::io::Error) -> Self {
        TranscodeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TranscodeError {
    fn from(err: serde_json::Error) -> Self {
        TranscodeError::Format(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_matches_kind_table() {
        assert_eq!(TranscodeError::validation("x").http_status(), 400);
        assert_eq!(TranscodeError::Auth("x".into()).http_status(), 401);
        assert_eq!(TranscodeError::storage("x").http_status(), 404);
        assert_eq!(TranscodeError::format("x").http_status(), 422);
        assert_eq!(TranscodeError::capacity("x").http_status(), 429);
        assert_eq!(TranscodeError::transcoder("x").http_status(), 500);
        assert_eq!(TranscodeError::service("x").http_status(), 503);
    }

    #[test]
    fn recoverable_kinds_are_capacity_service_io() {
        assert!(TranscodeError::capacity("x").is_recoverable());
        assert!(TranscodeError::service("x").is_recoverable());
        assert!(TranscodeError::Io("x".into()).is_recoverable());
        assert!(!TranscodeError::validation("x").is_recoverable());
        assert!(!TranscodeError::transcoder("x").is_recoverable());
    }
}
