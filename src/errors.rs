//! Unified error types for the club manager.
//!
//! Every layer returns [`Result`]. Database errors are classified on the way in so
//! that unique and foreign-key violations surface as [`Error::Constraint`] rather
//! than as an opaque driver failure.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed input, described for the caller.
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// A foreign-key or unique constraint rejected the write.
    #[error("Constraint violation: {message}")]
    Constraint {
        /// Driver message, logged but never shown to callers
        message: String,
    },

    /// The requested row does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of resource, e.g. `"event"`
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The caller is authenticated but not allowed to perform the operation.
    #[error("Forbidden")]
    Forbidden,

    /// No session accompanies a request to a protected route.
    #[error("Authentication required")]
    Unauthenticated,

    /// Username, password or claimed role did not match a stored user.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A user with this username already exists.
    #[error("Username {username} is already taken")]
    DuplicateUsername {
        /// The conflicting username
        username: String,
    },

    /// Credential provisioning failed after the entity row was written.
    /// The compensating delete has already been attempted.
    #[error("Account provisioning failed: {message}")]
    AccountProvisioning {
        /// Description of the original failure
        message: String,
    },

    /// The document store (or another collaborator) failed.
    #[error("Upstream error: {message}")]
    Upstream {
        /// Description of the upstream failure
        message: String,
    },

    /// Password hashing primitive failed.
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration
        message: String,
    },

    /// Any other relational store failure.
    #[error("Database error: {0}")]
    Database(DbErr),

    /// I/O failure (config file, listener).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`].
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(
                SqlErr::UniqueConstraintViolation(message)
                | SqlErr::ForeignKeyConstraintViolation(message),
            ) => Self::Constraint { message },
            _ => Self::Database(err),
        }
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::PasswordHash(err.to_string())
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
