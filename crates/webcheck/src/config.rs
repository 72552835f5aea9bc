//! Session configuration.
//!
//! Every session is launched from the same fixed profile. Values can come
//! from defaults, a YAML file, and a handful of environment overrides, in
//! that order.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::Timeouts;
use crate::locator::Locator;
use crate::result::{WebcheckError, WebcheckResult};

/// Default site under test
pub const DEFAULT_BASE_URL: &str = "https://neocities.org/";

/// Default element wait (20 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 20_000;

/// Default polling interval for element waits (250ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Default page-load timeout (30 seconds)
pub const DEFAULT_PAGE_LOAD_TIMEOUT_MS: u64 = 30_000;

/// Default implicit wait (2 seconds)
pub const DEFAULT_IMPLICIT_WAIT_MS: u64 = 2_000;

/// Fixed screenshot name used when a fallback scan fails
pub const DEFAULT_SCAN_FAILURE_SCREENSHOT: &str = "fallback_scan_error.png";

/// Environment variable overriding [`SessionConfig::base_url`]
pub const ENV_BASE_URL: &str = "WEBCHECK_BASE_URL";
/// Environment variable overriding [`SessionConfig::headless`]
pub const ENV_HEADLESS: &str = "WEBCHECK_HEADLESS";
/// Environment variable overriding [`SessionConfig::chromium_path`]
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";
/// Environment variable overriding [`SessionConfig::artifacts_dir`]
pub const ENV_ARTIFACTS_DIR: &str = "WEBCHECK_ARTIFACTS_DIR";

/// Browser window launch options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowOptions {
    /// Start with a maximized window
    pub start_maximized: bool,
    /// Block web notification prompts
    pub disable_notifications: bool,
    /// UI language passed as `--lang`
    pub lang: String,
    /// Allow popups instead of blocking them
    pub disable_popup_blocking: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            start_maximized: true,
            disable_notifications: true,
            lang: "en".to_string(),
            disable_popup_blocking: true,
        }
    }
}

impl WindowOptions {
    /// Command-line switches for the browser
    #[must_use]
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.start_maximized {
            args.push("--start-maximized".to_string());
        }
        if self.disable_notifications {
            args.push("--disable-notifications".to_string());
        }
        if !self.lang.is_empty() {
            args.push(format!("--lang={}", self.lang));
        }
        if self.disable_popup_blocking {
            args.push("--disable-popup-blocking".to_string());
        }
        args
    }
}

/// Optional cookie / GDPR banner dismissed after the first navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieBanner {
    /// Banner container
    pub banner: Locator,
    /// Accept control inside the banner
    pub accept: Locator,
    /// Pause after clicking, so the banner can animate away
    #[serde(rename = "settle_ms", with = "duration_ms")]
    pub settle: Duration,
}

impl Default for CookieBanner {
    fn default() -> Self {
        Self {
            banner: Locator::css(".cookie-banner, .gdpr-modal"),
            accept: Locator::css("button.accept, .btn-primary"),
            settle: Duration::from_millis(500),
        }
    }
}

/// Configuration for one browser session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Page loaded right after launch; relative paths resolve against it
    pub base_url: String,
    /// Run without a visible window
    pub headless: bool,
    /// Chrome sandbox (disable for containers/CI)
    pub sandbox: bool,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Window launch options
    pub window: WindowOptions,
    /// Navigation timeout
    #[serde(rename = "page_load_timeout_ms", with = "duration_ms")]
    pub page_load_timeout: Duration,
    /// Implicit wait applied to single element queries
    #[serde(rename = "implicit_wait_ms", with = "duration_ms")]
    pub implicit_wait: Duration,
    /// Banner to dismiss after the first navigation (None = skip)
    pub cookie_banner: Option<CookieBanner>,
    /// Directory receiving screenshots
    pub artifacts_dir: PathBuf,
    /// Fixed screenshot name for fallback scan failures
    pub scan_failure_screenshot: String,
    /// Element wait used when the caller does not pass one
    #[serde(rename = "default_wait_ms", with = "duration_ms")]
    pub default_wait: Duration,
    /// Element wait polling interval
    #[serde(rename = "poll_interval_ms", with = "duration_ms")]
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headless: false,
            sandbox: true,
            chromium_path: None,
            window: WindowOptions::default(),
            page_load_timeout: Duration::from_millis(DEFAULT_PAGE_LOAD_TIMEOUT_MS),
            implicit_wait: Duration::from_millis(DEFAULT_IMPLICIT_WAIT_MS),
            cookie_banner: Some(CookieBanner::default()),
            artifacts_dir: PathBuf::from("target/webcheck"),
            scan_failure_screenshot: DEFAULT_SCAN_FAILURE_SCREENSHOT.to_string(),
            default_wait: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl SessionConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set the cookie banner, or `None` to skip dismissal
    #[must_use]
    pub fn with_cookie_banner(mut self, banner: Option<CookieBanner>) -> Self {
        self.cookie_banner = banner;
        self
    }

    /// Set artifacts directory
    #[must_use]
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    /// Set page-load timeout
    #[must_use]
    pub const fn with_page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }

    /// Set implicit wait
    #[must_use]
    pub const fn with_implicit_wait(mut self, wait: Duration) -> Self {
        self.implicit_wait = wait;
        self
    }

    /// Set default element wait
    #[must_use]
    pub const fn with_default_wait(mut self, wait: Duration) -> Self {
        self.default_wait = wait;
        self
    }

    /// Set element wait polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Timeouts applied to the driver after launch
    #[must_use]
    pub const fn timeouts(&self) -> Timeouts {
        Timeouts {
            page_load: self.page_load_timeout,
            implicit_wait: self.implicit_wait,
        }
    }

    /// Resolve an absolute URL or a path relative to [`Self::base_url`]
    #[must_use]
    pub fn url_for(&self, target: &str) -> String {
        const ABSOLUTE: [&str; 4] = ["http://", "https://", "about:", "file:"];
        if ABSOLUTE.iter().any(|scheme| target.starts_with(scheme)) {
            return target.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            target.trim_start_matches('/')
        )
    }

    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed, or fails validation
    pub fn from_yaml_file(path: impl AsRef<Path>) -> WebcheckResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns error if the text cannot be parsed or fails validation
    pub fn from_yaml_str(text: &str) -> WebcheckResult<Self> {
        let config: Self = serde_yaml_ng::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `WEBCHECK_*` / `CHROMIUM_PATH` environment overrides
    ///
    /// # Errors
    ///
    /// Returns error if an override has an invalid value
    pub fn apply_env_overrides(&mut self) -> WebcheckResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Returns error if an override has an invalid value
    pub fn apply_overrides<F>(&mut self, lookup: F) -> WebcheckResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(value) = lookup(ENV_HEADLESS) {
            self.headless = parse_bool(&value).ok_or_else(|| {
                WebcheckError::config(format!("{ENV_HEADLESS} must be a boolean, got '{value}'"))
            })?;
        }
        if let Some(path) = lookup(ENV_CHROMIUM_PATH) {
            self.chromium_path = Some(path);
        }
        if let Some(dir) = lookup(ENV_ARTIFACTS_DIR) {
            self.artifacts_dir = PathBuf::from(dir);
        }
        self.validate()
    }

    /// Check invariants the session manager relies on
    ///
    /// # Errors
    ///
    /// Returns error describing the first violated invariant
    pub fn validate(&self) -> WebcheckResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(WebcheckError::config("base_url must not be empty"));
        }
        if self.poll_interval.is_zero() {
            return Err(WebcheckError::config("poll_interval_ms must be positive"));
        }
        if self.page_load_timeout.is_zero() {
            return Err(WebcheckError::config("page_load_timeout_ms must be positive"));
        }
        if self.scan_failure_screenshot.trim().is_empty() {
            return Err(WebcheckError::config(
                "scan_failure_screenshot must not be empty",
            ));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Durations stored as integer milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    mod default_tests {
        use super::*;

        #[test]
        fn test_fixed_profile() {
            let config = SessionConfig::default();
            assert_eq!(config.base_url, DEFAULT_BASE_URL);
            assert_eq!(config.page_load_timeout, Duration::from_secs(30));
            assert_eq!(config.implicit_wait, Duration::from_secs(2));
            assert_eq!(config.default_wait, Duration::from_secs(20));
            assert_eq!(config.poll_interval, Duration::from_millis(250));
            assert_eq!(config.scan_failure_screenshot, "fallback_scan_error.png");
            assert!(config.cookie_banner.is_some());
        }

        #[test]
        fn test_launch_args() {
            assert_eq!(
                WindowOptions::default().launch_args(),
                vec![
                    "--start-maximized",
                    "--disable-notifications",
                    "--lang=en",
                    "--disable-popup-blocking"
                ]
            );
        }

        #[test]
        fn test_timeouts() {
            let timeouts = SessionConfig::new()
                .with_implicit_wait(Duration::from_millis(500))
                .timeouts();
            assert_eq!(timeouts.implicit_wait, Duration::from_millis(500));
            assert_eq!(timeouts.page_load, Duration::from_secs(30));
        }
    }

    mod url_tests {
        use super::*;

        #[test]
        fn test_relative_paths_join_base() {
            let config = SessionConfig::new().with_base_url("https://neocities.org/");
            assert_eq!(config.url_for("browse"), "https://neocities.org/browse");
            assert_eq!(config.url_for("/tutorials"), "https://neocities.org/tutorials");
            assert_eq!(config.url_for(""), "https://neocities.org/");
        }

        #[test]
        fn test_absolute_urls_pass_through() {
            let config = SessionConfig::new();
            assert_eq!(config.url_for("https://example.com/x"), "https://example.com/x");
            assert_eq!(config.url_for("about:blank"), "about:blank");
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_partial_yaml_keeps_defaults() {
            let config = SessionConfig::from_yaml_str(
                "base_url: https://staging.test/\nheadless: true\nimplicit_wait_ms: 500\n",
            )
            .unwrap();
            assert_eq!(config.base_url, "https://staging.test/");
            assert!(config.headless);
            assert_eq!(config.implicit_wait, Duration::from_millis(500));
            assert_eq!(config.page_load_timeout, Duration::from_secs(30));
        }

        #[test]
        fn test_banner_can_be_disabled() {
            let config = SessionConfig::from_yaml_str("cookie_banner: null\n").unwrap();
            assert!(config.cookie_banner.is_none());
        }

        #[test]
        fn test_banner_locators() {
            let config = SessionConfig::from_yaml_str(
                "cookie_banner:\n  banner:\n    id: consent\n  accept:\n    css: button.ok\n  settle_ms: 100\n",
            )
            .unwrap();
            let banner = config.cookie_banner.unwrap();
            assert_eq!(banner.banner, Locator::id("consent"));
            assert_eq!(banner.accept, Locator::css("button.ok"));
            assert_eq!(banner.settle, Duration::from_millis(100));
        }

        #[test]
        fn test_zero_poll_interval_rejected() {
            let err = SessionConfig::from_yaml_str("poll_interval_ms: 0\n").unwrap_err();
            assert!(matches!(err, WebcheckError::Config { .. }));
        }

        #[test]
        fn test_file_loading() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("webcheck.yaml");
            std::fs::write(&path, "base_url: https://file.test/\n").unwrap();
            let config = SessionConfig::from_yaml_file(&path).unwrap();
            assert_eq!(config.base_url, "https://file.test/");
        }

        #[test]
        fn test_serialized_form_reloads() {
            let config = SessionConfig::new().with_headless(true);
            let text = serde_yaml_ng::to_string(&config).unwrap();
            assert!(text.contains("page_load_timeout_ms: 30000"));
            assert_eq!(SessionConfig::from_yaml_str(&text).unwrap(), config);
        }
    }

    mod override_tests {
        use super::*;

        fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
            let map: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect();
            move |key| map.get(key).cloned()
        }

        #[test]
        fn test_overrides_apply() {
            let mut config = SessionConfig::new();
            config
                .apply_overrides(lookup(&[
                    (ENV_BASE_URL, "https://ci.test/"),
                    (ENV_HEADLESS, "yes"),
                    (ENV_CHROMIUM_PATH, "/usr/bin/chromium"),
                    (ENV_ARTIFACTS_DIR, "/tmp/shots"),
                ]))
                .unwrap();
            assert_eq!(config.base_url, "https://ci.test/");
            assert!(config.headless);
            assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
            assert_eq!(config.artifacts_dir, PathBuf::from("/tmp/shots"));
        }

        #[test]
        fn test_invalid_headless_rejected() {
            let mut config = SessionConfig::new();
            let err = config
                .apply_overrides(lookup(&[(ENV_HEADLESS, "sometimes")]))
                .unwrap_err();
            assert!(err.to_string().contains(ENV_HEADLESS));
        }

        #[test]
        fn test_no_overrides_is_noop() {
            let mut config = SessionConfig::new();
            config.apply_overrides(|_| None).unwrap();
            assert_eq!(config, SessionConfig::new());
        }
    }
}
