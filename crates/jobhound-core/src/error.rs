//! The one error type every JobHound crate returns.
//!
//! Crates wrap their library errors in [`AppError`] with a coarse
//! [`ErrorKind`]. The kind decides whether the worker retries a job, so
//! pick it by what the caller can do about the failure, not by which
//! library raised it.

use std::fmt;

use thiserror::Error;

/// Coarse failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Bad input that will stay bad, e.g. a malformed job payload.
    Validation,
    /// A uniqueness race the caller lost.
    Conflict,
    /// The messaging API asked us to slow down.
    RateLimit,
    Internal,
    Database,
    Cache,
    /// Missing or invalid settings. Fatal at startup.
    Configuration,
    Serialization,
    /// A job board or the messaging API failed or was unreachable.
    ExternalService,
}

impl ErrorKind {
    /// Upper snake case label used in messages and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::Conflict => "CONFLICT",
            Self::RateLimit => "RATE_LIMIT",
            Self::Internal => "INTERNAL",
            Self::Database => "DATABASE",
            Self::Cache => "CACHE",
            Self::Configuration => "CONFIGURATION",
            Self::Serialization => "SERIALIZATION",
            Self::ExternalService => "EXTERNAL_SERVICE",
        }
    }

    /// Failures that may clear up on their own.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Conflict | Self::RateLimit | Self::Database | Self::Cache | Self::ExternalService
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error carried through every `?` in the workspace.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a library error, keeping it as the `source()` chain.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cache, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// A source adapter or the messaging transport failed.
    pub fn external(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalService, message)
    }

    /// Whether a later attempt of the same job could succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_transient()
    }
}

// The source is not clonable; clones keep kind and message only.
impl Clone for AppError {
    fn clone(&self) -> Self {
        Self::new(self.kind, self.message.clone())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorKind::Serialization, format!("Invalid JSON: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(ErrorKind::Configuration, format!("Bad configuration: {err}"), err)
    }
}
