//! Error types for Dockerfile generation.
//!
//! All errors use `thiserror` for ergonomic error handling and proper error
//! chains. Generation is all-or-nothing: the first failing fragment aborts the
//! whole call, and every collaborator failure is wrapped with context naming
//! the fragment that was being produced.

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Errors produced while assembling a build plan.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// A filesystem operation on the staging area failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A configuration lookup (base image tag, python requirements) failed.
    #[error("{context}: {source}")]
    Config {
        context: String,
        #[source]
        source: ConfigError,
    },

    /// A declared run command cannot be rendered as written.
    #[error("{0}")]
    Validation(String),
}

impl GenerateError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn config(context: impl Into<String>, source: ConfigError) -> Self {
        Self::Config {
            context: context.into(),
            source,
        }
    }
}
