//! Error handling for the flowdash application
//!
//! This module defines the crate error type and a Result alias for use
//! throughout the application.
//!
//! Only two variants represent blocking UI states: [`DashError::Schema`]
//! (malformed register catalog, halts startup) and
//! [`DashError::AuthRequired`] (the backend answered with an auth
//! challenge, halts polling until re-authentication). Everything else
//! degrades a single fetch or widget and lets the loop continue.

use thiserror::Error;

/// Main error type for flowdash operations
#[derive(Error, Debug)]
pub enum DashError {
    /// Malformed register catalog; halts startup
    #[error("Schema error: {0}")]
    Schema(String),

    /// The backend answered with an authentication challenge
    #[error("Authentication required")]
    AuthRequired,

    /// A single poll or backfill fetch failed; the next tick is the retry
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Errors from the underlying HTTP client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// CSV export errors
    #[error("Export error: {0}")]
    Export(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<DashError>,
    },
}

impl DashError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        DashError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// True if this error (or its cause) is an authentication challenge
    pub fn is_auth(&self) -> bool {
        match self {
            DashError::AuthRequired => true,
            DashError::WithContext { source, .. } => source.is_auth(),
            _ => false,
        }
    }
}

/// Result type alias for flowdash operations
pub type Result<T> = std::result::Result<T, DashError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DashError::Schema("registers is not an array".to_string());
        assert_eq!(err.to_string(), "Schema error: registers is not an array");
    }

    #[test]
    fn test_error_with_context() {
        let err = DashError::Fetch("timed out".to_string());
        let with_ctx = err.with_context("live sample");
        assert!(with_ctx.to_string().contains("live sample"));
    }

    #[test]
    fn test_is_auth_through_context() {
        let err = DashError::AuthRequired.with_context("schema fetch");
        assert!(err.is_auth());
        assert!(!DashError::Fetch("x".into()).is_auth());
    }
}
