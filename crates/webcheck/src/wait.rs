//! Element wait primitive.
//!
//! [`poll`] is the bare loop: it re-queries a locator until the element is
//! both displayed and enabled, the deadline passes, or the driver fails.
//! [`wait_for`] and friends wrap it with failure diagnostics: a screenshot
//! persisted as `{test}_error_{yyyyMMddHHmmss}.png` and an error carrying
//! the locator, the test name and the screenshot path.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, trace, warn};

use crate::artifacts::ArtifactStore;
use crate::config::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};
use crate::driver::{DriverError, WebDriver, WebElement};
use crate::element::Element;
use crate::locator::Locator;
use crate::result::{WebcheckError, WebcheckResult};
use crate::session::Session;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for element waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Deadline measured from the first query
    pub timeout: Duration,
    /// Pause between queries
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults (20s, polling every 250ms)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Session defaults
    #[must_use]
    pub const fn from_config(config: &crate::config::SessionConfig) -> Self {
        Self {
            timeout: config.default_wait,
            poll_interval: config.poll_interval,
        }
    }
}

// =============================================================================
// POLL LOOP
// =============================================================================

/// Result of [`poll`]
#[derive(Debug)]
pub enum WaitOutcome<E> {
    /// A displayed, enabled element
    Resolved(E),
    /// The deadline passed without a usable element
    TimedOut,
    /// The driver failed; polling stopped
    DriverError(DriverError),
}

impl<E> WaitOutcome<E> {
    /// Whether an element was resolved
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Re-query `locator` until it resolves, the deadline passes, or the
/// driver fails.
///
/// Missing, hidden and disabled elements all count as "not yet". Each
/// sleep is clamped to the time left, so a timeout is reported no earlier
/// than `options.timeout` and no later than one interval after it. A zero
/// timeout performs exactly one query.
pub async fn poll<D: WebDriver>(
    driver: &D,
    locator: &Locator,
    options: &WaitOptions,
) -> WaitOutcome<D::Element> {
    let deadline = Instant::now() + options.timeout;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        match probe(driver, locator).await {
            Ok(Some(element)) => {
                trace!(%locator, attempts, "element ready");
                return WaitOutcome::Resolved(element);
            }
            Ok(None) => trace!(%locator, attempts, "element not ready"),
            Err(err) => return WaitOutcome::DriverError(err),
        }

        let now = Instant::now();
        if now >= deadline {
            return WaitOutcome::TimedOut;
        }
        sleep(options.poll_interval.min(deadline - now)).await;
    }
}

/// One direct query plus the readiness check.
///
/// Goes through `find_elements`, which never spends the driver's implicit
/// wait, so the deadline arithmetic in [`poll`] holds. A document replaced
/// during the query or between the query and the check is treated like a
/// missing element.
async fn probe<D: WebDriver>(driver: &D, locator: &Locator) -> Result<Option<D::Element>, DriverError> {
    let found = match driver.find_elements(locator).await {
        Ok(found) => found,
        Err(DriverError::StaleElement { .. }) => return Ok(None),
        Err(err) => return Err(err),
    };
    let Some(element) = found.into_iter().next() else {
        return Ok(None);
    };
    match ready(&element).await {
        Ok(true) => Ok(Some(element)),
        Ok(false) | Err(DriverError::StaleElement { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

async fn ready<E: WebElement>(element: &E) -> Result<bool, DriverError> {
    Ok(element.is_displayed().await? && element.is_enabled().await?)
}

// =============================================================================
// ELEMENT WAITS
// =============================================================================

/// Wait for `locator` using the session's default timeout (20s unless
/// configured otherwise)
pub async fn wait_for<'s, D: WebDriver>(
    session: &'s Session<D>,
    locator: &Locator,
) -> WebcheckResult<Element<'s, D::Element>> {
    wait_for_with(session, locator, WaitOptions::from_config(session.config())).await
}

/// Wait for `locator` with an explicit timeout
pub async fn wait_for_within<'s, D: WebDriver>(
    session: &'s Session<D>,
    locator: &Locator,
    timeout: Duration,
) -> WebcheckResult<Element<'s, D::Element>> {
    let options = WaitOptions::from_config(session.config()).with_timeout(timeout);
    wait_for_with(session, locator, options).await
}

/// Wait for `locator` to be displayed and enabled.
///
/// # Errors
///
/// - [`WebcheckError::Timeout`] if the deadline passes
/// - [`WebcheckError::DriverTransport`] if the driver fails while polling
///
/// Both carry the path of a freshly captured screenshot, or `None` when the
/// capture itself failed.
pub async fn wait_for_with<'s, D: WebDriver>(
    session: &'s Session<D>,
    locator: &Locator,
    options: WaitOptions,
) -> WebcheckResult<Element<'s, D::Element>> {
    let started = Instant::now();
    let outcome = poll(session.driver(), locator, &options).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        WaitOutcome::Resolved(handle) => {
            debug!(test = session.test_name(), %locator, elapsed_ms, "element resolved");
            Ok(Element::new(handle, locator.clone()))
        }
        WaitOutcome::TimedOut => {
            warn!(test = session.test_name(), %locator, elapsed_ms, "element wait timed out");
            let screenshot = capture_error_screenshot(session).await;
            Err(WebcheckError::Timeout {
                locator: locator.to_string(),
                test_name: session.test_name().to_string(),
                elapsed: options.timeout,
                screenshot,
            })
        }
        WaitOutcome::DriverError(cause) => {
            warn!(test = session.test_name(), %locator, error = %cause, "driver failed during element wait");
            let screenshot = capture_error_screenshot(session).await;
            Err(WebcheckError::DriverTransport {
                locator: locator.to_string(),
                test_name: session.test_name().to_string(),
                cause,
                screenshot,
            })
        }
    }
}

async fn capture_error_screenshot<D: WebDriver>(session: &Session<D>) -> Option<std::path::PathBuf> {
    let name = ArtifactStore::error_screenshot_name_now(session.test_name());
    session.save_screenshot(&name).await
}

// =============================================================================
// URL WAITS
// =============================================================================

/// URL matcher for [`wait_for_url`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern.as_str()),
            Self::Contains(pattern) => url.contains(pattern.as_str()),
        }
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "exact '{p}'"),
            Self::Prefix(p) => write!(f, "prefix '{p}'"),
            Self::Contains(p) => write!(f, "containing '{p}'"),
        }
    }
}

/// Wait until the current URL matches `pattern`.
///
/// Polls at the session's configured interval. No screenshot is taken on
/// failure.
pub async fn wait_for_url<D: WebDriver>(
    session: &Session<D>,
    pattern: &UrlPattern,
    timeout: Duration,
) -> WebcheckResult<String> {
    let interval = session.config().poll_interval;
    let deadline = Instant::now() + timeout;

    loop {
        let url = session.current_url().await?;
        if pattern.matches(&url) {
            return Ok(url);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(WebcheckError::UrlTimeout {
                pattern: pattern.to_string(),
                last_url: url,
                elapsed: timeout,
            });
        }
        sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::driver::{MockDriver, MockElement, MockPage};

    const URL: &str = "https://site.test/";

    async fn driver_with(element: MockElement) -> MockDriver {
        let driver = MockDriver::new().with_page(MockPage::new(URL, "Page").with_element(element));
        driver.navigate(URL).await.unwrap();
        driver
    }

    fn options(timeout_ms: u64) -> WaitOptions {
        WaitOptions::new().with_timeout(Duration::from_millis(timeout_ms))
    }

    mod options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let options = WaitOptions::default();
            assert_eq!(options.timeout, Duration::from_secs(20));
            assert_eq!(options.poll_interval, Duration::from_millis(250));
        }

        #[test]
        fn test_from_config() {
            let config = SessionConfig::new().with_default_wait(Duration::from_secs(5));
            assert_eq!(WaitOptions::from_config(&config).timeout, Duration::from_secs(5));
        }
    }

    mod poll_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_immediate_resolution() {
            let locator = Locator::css("h1");
            let driver = driver_with(MockElement::new(locator.clone())).await;
            let started = Instant::now();
            let outcome = poll(&driver, &locator, &options(20_000)).await;
            assert!(outcome.is_resolved());
            assert!(started.elapsed() < Duration::from_millis(250));
            assert_eq!(driver.query_count(&locator), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_late_element_is_picked_up() {
            let locator = Locator::css(".results");
            let driver =
                driver_with(MockElement::new(locator.clone()).appears_after(Duration::from_millis(900)))
                    .await;
            let started = Instant::now();
            let outcome = poll(&driver, &locator, &options(5_000)).await;
            assert!(outcome.is_resolved());
            assert_eq!(started.elapsed(), Duration::from_millis(1_000));
            assert_eq!(driver.query_count(&locator), 5);
        }

        #[tokio::test(start_paused = true)]
        async fn test_timeout_bounds() {
            let locator = Locator::css(".never");
            let driver = driver_with(MockElement::new(Locator::css("h1"))).await;
            let opts = options(1_100);
            let started = Instant::now();
            let outcome = poll(&driver, &locator, &opts).await;
            let elapsed = started.elapsed();
            assert!(matches!(outcome, WaitOutcome::TimedOut));
            assert!(elapsed >= opts.timeout);
            assert!(elapsed <= opts.timeout + opts.poll_interval);
        }

        #[tokio::test(start_paused = true)]
        async fn test_zero_timeout_queries_once() {
            let locator = Locator::css(".never");
            let driver = driver_with(MockElement::new(Locator::css("h1"))).await;
            let outcome = poll(&driver, &locator, &options(0)).await;
            assert!(matches!(outcome, WaitOutcome::TimedOut));
            assert_eq!(driver.query_count(&locator), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_hidden_element_never_resolves() {
            let locator = Locator::css(".hidden");
            let driver = driver_with(MockElement::new(locator.clone()).hidden()).await;
            let outcome = poll(&driver, &locator, &options(1_000)).await;
            assert!(matches!(outcome, WaitOutcome::TimedOut));
        }

        #[tokio::test(start_paused = true)]
        async fn test_disabled_element_never_resolves() {
            let locator = Locator::css("button");
            let driver = driver_with(MockElement::new(locator.clone()).disabled()).await;
            let outcome = poll(&driver, &locator, &options(1_000)).await;
            assert!(matches!(outcome, WaitOutcome::TimedOut));
        }

        #[tokio::test(start_paused = true)]
        async fn test_element_shown_later_resolves() {
            let locator = Locator::css(".fade-in");
            let driver =
                driver_with(MockElement::new(locator.clone()).shown_after(Duration::from_millis(600)))
                    .await;
            let started = Instant::now();
            assert!(poll(&driver, &locator, &options(5_000)).await.is_resolved());
            assert_eq!(started.elapsed(), Duration::from_millis(750));
        }

        #[tokio::test(start_paused = true)]
        async fn test_driver_error_stops_polling() {
            let locator = Locator::css("h1");
            let driver = driver_with(MockElement::new(Locator::css("p"))).await;
            driver.fail_queries("connection reset");
            let outcome = poll(&driver, &locator, &options(5_000)).await;
            assert!(matches!(
                outcome,
                WaitOutcome::DriverError(DriverError::Transport { .. })
            ));
        }
    }

    mod url_tests {
        use super::*;

        #[test]
        fn test_pattern_matching() {
            let url = "https://neocities.org/browse?tag=portfolio";
            assert!(UrlPattern::Contains("portfolio".into()).matches(url));
            assert!(UrlPattern::Prefix("https://neocities.org/".into()).matches(url));
            assert!(UrlPattern::Exact(url.into()).matches(url));
            assert!(!UrlPattern::Exact("https://neocities.org/".into()).matches(url));
        }

        #[test]
        fn test_pattern_display() {
            assert_eq!(UrlPattern::Contains("x".into()).to_string(), "containing 'x'");
        }
    }
}
