//! Result and error types for Webcheck.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::driver::DriverError;

/// Result type for Webcheck operations
pub type WebcheckResult<T> = Result<T, WebcheckError>;

/// Errors that can occur in Webcheck
#[derive(Debug, Error)]
pub enum WebcheckError {
    /// Browser session could not be launched. Fatal, never retried.
    #[error("Failed to launch browser session: {message}")]
    SessionLaunch {
        /// Error message
        message: String,
    },

    /// Element did not become visible and enabled before the deadline
    #[error(
        "Element not found: {locator}\nTest: {test_name}\nWaited: {}ms\nScreenshot: {}",
        .elapsed.as_millis(),
        display_path(.screenshot)
    )]
    Timeout {
        /// Locator description
        locator: String,
        /// Test that was waiting
        test_name: String,
        /// Timeout bound that elapsed
        elapsed: Duration,
        /// Persisted screenshot, if capture succeeded
        screenshot: Option<PathBuf>,
    },

    /// Driver failed while an element wait was polling
    #[error(
        "Driver failure while waiting for {locator}: {cause}\nTest: {test_name}\nScreenshot: {}",
        display_path(.screenshot)
    )]
    DriverTransport {
        /// Locator description
        locator: String,
        /// Test that was waiting
        test_name: String,
        /// Underlying driver failure
        #[source]
        cause: DriverError,
        /// Persisted screenshot, if capture succeeded
        screenshot: Option<PathBuf>,
    },

    /// No candidate of a fallback scan matched
    #[error(
        "No element matched any of {} candidates [{}]\nTest: {test_name}\nScreenshot: {}",
        .candidates.len(),
        .candidates.join(", "),
        display_path(.screenshot)
    )]
    ElementNotFoundAfterScan {
        /// Candidate locator descriptions, in scan order
        candidates: Vec<String>,
        /// Test that ran the scan
        test_name: String,
        /// Persisted screenshot, if capture succeeded
        screenshot: Option<PathBuf>,
    },

    /// Driver failure outside of an element wait
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// URL did not match the expected pattern in time
    #[error("URL did not match {pattern} within {}ms (last seen: {last_url})", .elapsed.as_millis())]
    UrlTimeout {
        /// Pattern description
        pattern: String,
        /// Last URL observed
        last_url: String,
        /// Timeout bound that elapsed
        elapsed: Duration,
    },

    /// Page assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl WebcheckError {
    /// Create an assertion error
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Screenshot persisted for this failure, if any
    #[must_use]
    pub fn screenshot(&self) -> Option<&PathBuf> {
        match self {
            Self::Timeout { screenshot, .. }
            | Self::DriverTransport { screenshot, .. }
            | Self::ElementNotFoundAfterScan { screenshot, .. } => screenshot.as_ref(),
            _ => None,
        }
    }

    /// Whether this is the wait primitive's timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map_or_else(|| "<not captured>".to_string(), |p| p.display().to_string())
}
