//! Unified error type for the whole crate.
//!
//! Core operations return [`Result`]; the HTTP layer turns an [`Error`] into a status code
//! and a JSON body through the [`IntoResponse`] implementation at the bottom of this file.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Message shown for every rejected pledge. The concrete cause is only logged.
pub const CLAIM_FAILED_MESSAGE: &str = "Failed to claim this need, it may already be claimed";

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Any error raised by the relational store
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem errors (object store, config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing, expired or malformed bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated, but not allowed to perform the action
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Why the action was refused
        message: String,
    },

    /// A referenced row does not exist (or is not visible to the caller)
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"need"`
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Input failed validation
    #[error("Validation error: {message}")]
    Validation {
        /// Which rule was violated
        message: String,
    },

    /// A pledge could not be recorded. The cause is intentionally not exposed.
    #[error("Failed to claim this need, it may already be claimed")]
    ClaimFailed {
        /// Need the donor tried to claim
        need_id: i64,
    },

    /// The chat room is archived or its need has been completed
    #[error("Chat room {room_id} is closed")]
    RoomClosed {
        /// Room that rejected the message
        room_id: i64,
    },

    /// A state machine refused a transition
    #[error("Cannot {action} while {state}")]
    TransitionRejected {
        /// Current state label
        state: String,
        /// Attempted action label
        action: String,
    },

    /// Object storage failure (upload, signing)
    #[error("Storage error: {message}")]
    Storage {
        /// What went wrong
        message: String,
    },

    /// Environment variable missing or unreadable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::ClaimFailed { .. } | Self::RoomClosed { .. } | Self::TransitionRejected { .. } => {
                StatusCode::CONFLICT
            }
            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::Storage { .. }
            | Self::EnvVar(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::ClaimFailed { .. } => "CLAIM_FAILED",
            Self::RoomClosed { .. } => "ROOM_CLOSED",
            Self::TransitionRejected { .. } => "TRANSITION_REJECTED",
            Self::Storage { .. } => "STORAGE_ERROR",
            Self::EnvVar(_) => "ENV_ERROR",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!(error = %value, "Rejected bearer token");
        Self::Unauthorized
    }
}

impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Self::Config {
            message: format!("Failed to parse config.toml: {value}"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(error = %self, code, "Server error");
        } else {
            tracing::debug!(error = %self, code, "Client error");
        }

        // Server-side details stay in the log.
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_failed_is_generic() {
        let err = Error::ClaimFailed { need_id: 42 };
        assert_eq!(err.to_string(), CLAIM_FAILED_MESSAGE);
        assert!(!err.to_string().contains("42"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::not_found("need", 7).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Storage {
                message: "disk full".to_string()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(Error::not_found("home", 3).to_string(), "home not found: 3");
    }
}
