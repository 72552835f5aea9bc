//! Automation driver boundary.
//!
//! The core never talks to a browser directly. It sequences calls through
//! these traits, which keeps the session manager and the wait primitive
//! independent of the automation backend.
//!
//! # Implementations
//!
//! - [`MockDriver`] - scripted page model, always available, used by tests
//! - `ChromiumDriver` - Chrome `DevTools` Protocol via chromiumoxide
//!   (`browser` feature)

mod mock;

#[cfg(feature = "browser")]
mod chromium;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SessionConfig;
use crate::locator::Locator;

pub use mock::{MockDriver, MockElement, MockElementHandle, MockLauncher, MockPage};

#[cfg(feature = "browser")]
pub use chromium::{ChromiumDriver, ChromiumElement, ChromiumLauncher};

/// Result type for driver calls
pub type DriverResult<T> = Result<T, DriverError>;

/// Failures reported by a driver implementation.
///
/// "Element not found" is deliberately absent: it is a [`Lookup::NotFound`]
/// value, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Transport or protocol level failure
    #[error("transport failure: {message}")]
    Transport {
        /// Error message
        message: String,
    },

    /// The session was already quit
    #[error("session is closed")]
    SessionClosed,

    /// Element handle refers to a page that is no longer loaded
    #[error("stale element reference: {locator}")]
    StaleElement {
        /// Locator the element was found with
        locator: String,
    },

    /// Operation not supported by this driver
    #[error("unsupported operation: {operation}")]
    Unsupported {
        /// Operation name
        operation: String,
    },
}

impl DriverError {
    /// Create a transport error
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an unsupported-operation error
    #[must_use]
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }
}

/// Outcome of a single, non-waiting element query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<E> {
    /// At least one element matched; this is the first
    Found(E),
    /// Nothing matched (yet)
    NotFound,
}

impl<E> Lookup<E> {
    /// Whether an element was found
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Convert into an `Option`
    #[must_use]
    pub fn into_option(self) -> Option<E> {
        match self {
            Self::Found(e) => Some(e),
            Self::NotFound => None,
        }
    }

    /// Map the found element
    pub fn map<F, T>(self, f: F) -> Lookup<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            Self::Found(e) => Lookup::Found(f(e)),
            Self::NotFound => Lookup::NotFound,
        }
    }
}

impl<E> From<Option<E>> for Lookup<E> {
    fn from(value: Option<E>) -> Self {
        value.map_or(Self::NotFound, Self::Found)
    }
}

/// Session-level timeouts applied right after launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Maximum time a navigation may take
    pub page_load: Duration,
    /// Budget a single element query may spend re-querying a missing element
    pub implicit_wait: Duration,
}

/// Special keys that can be sent to an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Enter / Return
    Enter,
    /// Tab
    Tab,
    /// Escape
    Escape,
    /// Backspace
    Backspace,
}

impl Key {
    /// DOM key name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enter => "Enter",
            Self::Tab => "Tab",
            Self::Escape => "Escape",
            Self::Backspace => "Backspace",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live browser session as seen by the core
#[async_trait]
pub trait WebDriver: Send + Sync + fmt::Debug {
    /// Element handle type produced by this driver
    type Element: WebElement;

    /// Apply page-load and implicit-wait timeouts
    async fn set_timeouts(&mut self, timeouts: Timeouts) -> DriverResult<()>;

    /// Navigate to an absolute URL
    async fn navigate(&self, url: &str) -> DriverResult<()>;

    /// Query the first element matching the locator
    async fn find_element(&self, locator: &Locator) -> DriverResult<Lookup<Self::Element>>;

    /// Query all elements matching the locator
    async fn find_elements(&self, locator: &Locator) -> DriverResult<Vec<Self::Element>>;

    /// Current page URL
    async fn current_url(&self) -> DriverResult<String>;

    /// Current page title
    async fn title(&self) -> DriverResult<String>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> DriverResult<Vec<u8>>;

    /// Terminate the browser session
    async fn quit(&mut self) -> DriverResult<()>;
}

/// A reference to one DOM element
#[async_trait]
pub trait WebElement: Send + Sync + fmt::Debug + Sized {
    /// Whether the element is rendered and visible
    async fn is_displayed(&self) -> DriverResult<bool>;

    /// Whether the element accepts interaction
    async fn is_enabled(&self) -> DriverResult<bool>;

    /// Rendered text content
    async fn text(&self) -> DriverResult<String>;

    /// Click the element
    async fn click(&self) -> DriverResult<()>;

    /// Type text into the element
    async fn send_keys(&self, text: &str) -> DriverResult<()>;

    /// Press a special key while the element has focus
    async fn press_key(&self, key: Key) -> DriverResult<()>;

    /// Clear an editable element's value
    async fn clear(&self) -> DriverResult<()>;

    /// Query the first descendant matching the locator
    async fn find_child(&self, locator: &Locator) -> DriverResult<Lookup<Self>>;
}

/// Starts browser sessions from a configuration
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Driver type produced by this launcher
    type Driver: WebDriver;

    /// Launch a new browser session
    async fn launch(&self, config: &SessionConfig) -> DriverResult<Self::Driver>;
}
