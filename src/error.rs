// src/error.rs

//! Unified error handling for the notifier.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for notifier operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regex compilation failed
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Course list could not be discovered
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Course page could not be retrieved
    #[error("Fetch failed for {course}: {message}")]
    Fetch { course: String, message: String },

    /// Course page had an unexpected structure
    #[error("Extraction failed for {course}: {message}")]
    Extraction { course: String, message: String },

    /// Enrichment call failed (never fatal to a cycle)
    #[error("Enrichment error: {0}")]
    Enrichment(String),

    /// Notification delivery failed
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Version store medium unreachable or unwritable
    #[error("Version store unavailable at {}: {source}", path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Version record present but unreadable
    #[error("Corrupt version record {}: {message}", path.display())]
    CorruptRecord { path: PathBuf, message: String },

    /// A bounded step ran out of time
    #[error("{step} timed out after {secs}s")]
    Timeout { step: String, secs: u64 },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a discovery error.
    pub fn discovery(message: impl fmt::Display) -> Self {
        Self::Discovery(message.to_string())
    }

    /// Create a fetch error for a course.
    pub fn fetch(course: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            course: course.into(),
            message: message.to_string(),
        }
    }

    /// Create an extraction error for a course.
    pub fn extraction(course: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Extraction {
            course: course.into(),
            message: message.to_string(),
        }
    }

    pub fn enrichment(message: impl fmt::Display) -> Self {
        Self::Enrichment(message.to_string())
    }

    pub fn delivery(message: impl fmt::Display) -> Self {
        Self::Delivery(message.to_string())
    }

    /// Wrap an I/O failure of the version store.
    pub fn store_unavailable(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::StoreUnavailable {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a corrupt record error.
    pub fn corrupt_record(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Self::CorruptRecord {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn timeout(step: impl Into<String>, secs: u64) -> Self {
        Self::Timeout {
            step: step.into(),
            secs,
        }
    }

    /// Short label for logs and sweep statistics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { .. } | Self::Http(_) => "fetch",
            Self::Extraction { .. } | Self::Selector { .. } => "extraction",
            Self::Enrichment(_) => "enrichment",
            Self::Delivery(_) => "delivery",
            Self::StoreUnavailable { .. } => "store-unavailable",
            Self::CorruptRecord { .. } => "corrupt-record",
            Self::Timeout { .. } => "timeout",
            Self::Discovery(_) => "discovery",
            Self::Config(_) | Self::Validation(_) | Self::Toml(_) => "config",
            Self::Io(_) | Self::Json(_) | Self::Url(_) | Self::Regex(_) => "internal",
        }
    }
}
