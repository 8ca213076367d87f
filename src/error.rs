//! Unified error hierarchy for SleepRS
//!
//! Structured error types for record storage, export and the optional advice
//! provider, with severity levels that map onto the tracing system.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for all SleepRS operations
#[derive(Debug, Error)]
pub enum SleepRsError {
    /// Invalid user input (times, dates, quality rating)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Advice provider errors
    #[error("Advice provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Record store errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Store file could not be read or written
    #[error("Cannot access record store at {path}: {reason}")]
    Access { path: PathBuf, reason: String },

    /// Store file exists but does not hold a record list
    #[error("Corrupted record store at {path}: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    /// Record already exists and replacement was not requested
    #[error("A record for {date} already exists")]
    Duplicate { date: String },
}

/// Failures of the optional text-generation provider.
///
/// Every variant is recoverable: the advisor falls back to the rule-based
/// advice whenever one of these is produced.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No provider configured (missing API key, disabled in config)
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Network failure before a response was received
    #[error("Request failed: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Response body did not contain the expected text field
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Serialization(err.to_string())
    }
}

/// Result type alias for SleepRS operations
pub type Result<T> = std::result::Result<T, SleepRsError>;

impl ProviderError {
    /// Whether the provider was simply absent rather than failing
    pub fn is_configuration(&self) -> bool {
        matches!(self, ProviderError::NotConfigured(_))
    }
}

impl SleepRsError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SleepRsError::Provider(ProviderError::Transport(_))
                | SleepRsError::Provider(ProviderError::Timeout(_))
                | SleepRsError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SleepRsError::Validation(_) => ErrorSeverity::Warning,
            SleepRsError::Storage(StorageError::Duplicate { .. }) => ErrorSeverity::Warning,
            SleepRsError::Provider(ProviderError::NotConfigured(_)) => ErrorSeverity::Info,
            SleepRsError::Provider(_) => ErrorSeverity::Warning,
            SleepRsError::Storage(StorageError::Corrupted { .. }) => ErrorSeverity::Error,
            SleepRsError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            SleepRsError::Storage(StorageError::Duplicate { date }) => {
                format!(
                    "A sleep record for {} already exists. Use --replace to overwrite it.",
                    date
                )
            }
            SleepRsError::Storage(StorageError::Corrupted { path, .. }) => {
                format!(
                    "The sleep log at {} could not be read. Please check the file.",
                    path.display()
                )
            }
            SleepRsError::Provider(_) => {
                "The advice service is unavailable; built-in advice was used instead.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
