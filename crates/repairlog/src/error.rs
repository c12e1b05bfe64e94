//! Error types for repairlog.
//!
//! This module defines all error types used throughout the repairlog crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for repairlog operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Record Errors ===
    /// A submitted record failed validation and was not stored.
    #[error("invalid record: {field} {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the validation failure.
        message: String,
    },

    /// No record exists with the requested id.
    #[error("record {id} not found")]
    RecordNotFound {
        /// The requested record id.
        id: u64,
    },

    // === Render Errors ===
    /// The template references a tag the record context does not provide.
    #[error("template tag '{{{{{tag}}}}}' has no value in the record context")]
    TemplateTag {
        /// The unresolved tag name.
        tag: String,
    },

    /// The template contains tag delimiters that do not form a valid tag.
    #[error("malformed template: {message}")]
    TemplateMalformed {
        /// Description of what is wrong with the template.
        message: String,
    },

    // === Session Errors ===
    /// The user name is not one of the recognized accounts.
    #[error("unknown user '{username}'")]
    UnknownUser {
        /// The rejected user name.
        username: String,
    },

    /// The password does not match the account.
    #[error("wrong password for '{username}'")]
    WrongPassword {
        /// The account whose password was wrong.
        username: String,
    },

    /// The operation needs a logged-in session.
    #[error("not logged in; use 'login <user> [password]'")]
    NotLoggedIn,

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read an input file.
    #[error("failed to read {path}: {source}")]
    FileRead {
        /// Path that couldn't be read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for repairlog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a validation error for a required field that was left blank.
    #[must_use]
    pub fn required(field: &'static str) -> Self {
        Self::Validation {
            field,
            message: "is required".to_string(),
        }
    }

    /// Create a malformed template error.
    #[must_use]
    pub fn template_malformed(message: impl Into<String>) -> Self {
        Self::TemplateMalformed {
            message: message.into(),
        }
    }

    /// Check if this error means a record was rejected before storage.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error came from rendering a template.
    #[must_use]
    pub fn is_render_error(&self) -> bool {
        matches!(self, Self::TemplateTag { .. } | Self::TemplateMalformed { .. })
    }
}
