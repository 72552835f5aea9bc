//! Webcheck: browser-driven UI regression checks.
//!
//! A test acquires a browser session, waits for elements to become usable,
//! interacts with them and asserts on what the page shows. The session is
//! released on every exit path and failed waits leave a screenshot behind.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   acquire/release   ┌────────────────┐   Launcher    ┌───────────┐
//! │ Test body  │ ──────────────────► │ SessionManager │ ────────────► │ WebDriver │
//! │            │                     └────────────────┘               │ (mock or  │
//! │            │   wait_for / scan   ┌────────────────┐   find/query  │ chromium) │
//! │            │ ──────────────────► │ wait / scan    │ ────────────► │           │
//! └────────────┘                     └───────┬────────┘               └───────────┘
//!                                            │ on failure
//!                                            ▼
//!                                    ┌────────────────┐
//!                                    │ ArtifactStore  │  {test}_error_{ts}.png
//!                                    └────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use webcheck::prelude::*;
//!
//! let manager = SessionManager::new(ChromiumLauncher::new(), SessionConfig::default());
//! manager
//!     .run_scoped("open_login_form", |session| {
//!         Box::pin(async move {
//!             wait_for(session, &Locator::css("a.sign-In")).await?.click().await?;
//!             let form = wait_for(session, &Locator::css("form[action='/signin']")).await?;
//!             expect_visible(&form, "login form").await
//!         })
//!     })
//!     .await?;
//! ```

#![warn(missing_docs)]

mod artifacts;
mod assertion;
mod config;
mod driver;
mod element;
mod locator;
mod result;
mod scan;
mod session;
mod wait;

/// Tracing subscriber setup
pub mod logging;

pub use artifacts::{sanitize, ArtifactStore, TIMESTAMP_FORMAT};
pub use assertion::{
    contains_any_ignore_case, expect_count_at_least, expect_text_contains_any, expect_title,
    expect_url_contains, expect_visible,
};
pub use config::{
    CookieBanner, SessionConfig, WindowOptions, DEFAULT_BASE_URL, DEFAULT_IMPLICIT_WAIT_MS,
    DEFAULT_PAGE_LOAD_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SCAN_FAILURE_SCREENSHOT,
    DEFAULT_WAIT_TIMEOUT_MS, ENV_ARTIFACTS_DIR, ENV_BASE_URL, ENV_CHROMIUM_PATH, ENV_HEADLESS,
};
pub use driver::{
    DriverError, DriverResult, Key, Launcher, Lookup, MockDriver, MockElement, MockElementHandle,
    MockLauncher, MockPage, Timeouts, WebDriver, WebElement,
};
#[cfg(feature = "browser")]
pub use driver::{ChromiumDriver, ChromiumElement, ChromiumLauncher};
pub use element::Element;
pub use locator::Locator;
pub use result::{WebcheckError, WebcheckResult};
pub use scan::scan;
pub use session::{Session, SessionManager};
pub use wait::{
    poll, wait_for, wait_for_url, wait_for_with, wait_for_within, UrlPattern, WaitOptions,
    WaitOutcome,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::assertion::*;
    pub use super::driver::{Key, Launcher, Lookup, WebDriver, WebElement};
    #[cfg(feature = "browser")]
    pub use super::driver::ChromiumLauncher;
    pub use super::element::Element;
    pub use super::locator::Locator;
    pub use super::result::{WebcheckError, WebcheckResult};
    pub use super::scan::scan;
    pub use super::session::{Session, SessionManager};
    pub use super::config::SessionConfig;
    pub use super::wait::{wait_for, wait_for_url, wait_for_with, wait_for_within, UrlPattern, WaitOptions};
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
