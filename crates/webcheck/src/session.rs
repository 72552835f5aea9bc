//! Driver session lifecycle.
//!
//! [`SessionManager::acquire`] launches and prepares one browser session per
//! test. [`Session::release`] quits it and is idempotent.
//! [`SessionManager::run_scoped`] ties the two together so the browser is
//! released on every exit path of a test body, panics included.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactStore;
use crate::config::SessionConfig;
use crate::driver::{DriverError, Launcher, Lookup, WebDriver, WebElement};
use crate::element::Element;
use crate::locator::Locator;
use crate::result::{WebcheckError, WebcheckResult};

/// Hands out configured sessions
#[derive(Debug)]
pub struct SessionManager<L: Launcher> {
    launcher: L,
    config: SessionConfig,
}

impl<L: Launcher> SessionManager<L> {
    /// Manager launching every session from `config`
    #[must_use]
    pub const fn new(launcher: L, config: SessionConfig) -> Self {
        Self { launcher, config }
    }

    /// Configuration applied to every session
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The launcher in use
    #[must_use]
    pub const fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Launch a session, apply timeouts, open the base URL and dismiss the
    /// cookie banner if one shows up.
    ///
    /// A launch failure is reported as [`WebcheckError::SessionLaunch`] and
    /// is not retried. If a later step fails the browser is quit before the
    /// error is returned.
    pub async fn acquire(&self, test_name: impl Into<String>) -> WebcheckResult<Session<L::Driver>> {
        let test_name = test_name.into();
        info!(test = %test_name, base_url = %self.config.base_url, "launching browser session");

        let driver = self.launcher.launch(&self.config).await.map_err(|e| {
            WebcheckError::SessionLaunch {
                message: e.to_string(),
            }
        })?;

        let mut session = Session::new(driver, self.config.clone(), test_name);
        if let Err(err) = session.prepare().await {
            warn!(test = %session.test_name, error = %err, "session setup failed, quitting browser");
            if let Err(quit_err) = session.release().await {
                warn!(test = %session.test_name, error = %quit_err, "quit after failed setup also failed");
            }
            return Err(err);
        }
        Ok(session)
    }

    /// Run `body` against a fresh session and release it afterwards.
    ///
    /// The session is released whether the body returns, fails or panics;
    /// a panic is resumed once the browser is gone. When both the body and
    /// the release fail, the body's error is returned.
    ///
    /// ```ignore
    /// manager
    ///     .run_scoped("open_login_form", |session| {
    ///         Box::pin(async move {
    ///             let link = wait_for(session, &Locator::css("a.sign-In")).await?;
    ///             link.click().await
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn run_scoped<T, F>(&self, test_name: impl Into<String>, body: F) -> WebcheckResult<T>
    where
        F: for<'s> FnOnce(&'s Session<L::Driver>) -> BoxFuture<'s, WebcheckResult<T>>,
    {
        let mut session = self.acquire(test_name).await?;
        let outcome = AssertUnwindSafe(body(&session)).catch_unwind().await;
        let released = session.release().await;

        match outcome {
            Ok(Ok(value)) => released.map(|()| value),
            Ok(Err(err)) => {
                if let Err(release_err) = released {
                    warn!(test = %session.test_name, error = %release_err, "release failed after test error");
                }
                Err(err)
            }
            Err(panic) => {
                if let Err(release_err) = released {
                    warn!(test = %session.test_name, error = %release_err, "release failed after panic");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }
}

/// One live browser session, exclusively owned by a test
#[derive(Debug)]
pub struct Session<D: WebDriver> {
    driver: D,
    config: SessionConfig,
    test_name: String,
    artifacts: ArtifactStore,
    released: bool,
}

impl<D: WebDriver> Session<D> {
    /// Wrap an already launched driver.
    ///
    /// No setup is performed; [`SessionManager::acquire`] is the usual way
    /// to obtain a ready session.
    #[must_use]
    pub fn new(driver: D, config: SessionConfig, test_name: impl Into<String>) -> Self {
        let artifacts = ArtifactStore::new(config.artifacts_dir.clone());
        Self {
            driver,
            config,
            test_name: test_name.into(),
            artifacts,
            released: false,
        }
    }

    async fn prepare(&mut self) -> WebcheckResult<()> {
        self.driver.set_timeouts(self.config.timeouts()).await?;
        let base_url = self.config.base_url.clone();
        self.navigate(&base_url).await?;
        let _ = self.dismiss_cookie_banner().await?;
        Ok(())
    }

    /// Click the configured banner's accept control, if both are present.
    ///
    /// Returns whether a click happened. Absence is not an error; driver
    /// failures are.
    pub async fn dismiss_cookie_banner(&self) -> WebcheckResult<bool> {
        let Some(banner) = self.config.cookie_banner.as_ref() else {
            return Ok(false);
        };

        let Lookup::Found(container) = self.driver.find_element(&banner.banner).await? else {
            debug!(test = %self.test_name, banner = %banner.banner, "no cookie banner");
            return Ok(false);
        };

        let Lookup::Found(accept) = container.find_child(&banner.accept).await? else {
            debug!(test = %self.test_name, accept = %banner.accept, "cookie banner without accept control");
            return Ok(false);
        };

        accept.click().await?;
        tokio::time::sleep(banner.settle).await;
        info!(test = %self.test_name, "cookie banner dismissed");
        Ok(true)
    }

    /// Quit the browser. Calling this again is a no-op.
    pub async fn release(&mut self) -> WebcheckResult<()> {
        if self.released {
            debug!(test = %self.test_name, "session already released");
            return Ok(());
        }
        self.released = true;

        match self.driver.quit().await {
            Ok(()) | Err(DriverError::SessionClosed) => {
                info!(test = %self.test_name, "browser session released");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Whether [`Session::release`] already ran
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }

    /// Navigate to an absolute URL or a path relative to the base URL
    pub async fn navigate(&self, target: &str) -> WebcheckResult<()> {
        let url = self.config.url_for(target);
        debug!(test = %self.test_name, %url, "navigate");
        Ok(self.driver.navigate(&url).await?)
    }

    /// Current page URL
    pub async fn current_url(&self) -> WebcheckResult<String> {
        Ok(self.driver.current_url().await?)
    }

    /// Current page title
    pub async fn title(&self) -> WebcheckResult<String> {
        Ok(self.driver.title().await?)
    }

    /// One direct query, no waiting beyond the driver's implicit wait
    pub async fn find_element(
        &self,
        locator: &Locator,
    ) -> WebcheckResult<Lookup<Element<'_, D::Element>>> {
        let found = self.driver.find_element(locator).await?;
        Ok(found.map(|handle| Element::new(handle, locator.clone())))
    }

    /// All elements currently matching `locator`
    pub async fn find_elements(&self, locator: &Locator) -> WebcheckResult<Vec<Element<'_, D::Element>>> {
        let handles = self.driver.find_elements(locator).await?;
        Ok(handles
            .into_iter()
            .map(|handle| Element::new(handle, locator.clone()))
            .collect())
    }

    /// PNG screenshot of the current page
    pub async fn screenshot(&self) -> WebcheckResult<Vec<u8>> {
        Ok(self.driver.screenshot().await?)
    }

    /// Capture a screenshot and persist it as `name` in the artifacts
    /// directory.
    ///
    /// Capture and write problems are logged and reported as `None`.
    pub async fn save_screenshot(&self, name: &str) -> Option<PathBuf> {
        let bytes = match self.driver.screenshot().await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(test = %self.test_name, error = %err, "screenshot capture failed");
                return None;
            }
        };
        match self.artifacts.save(name, &bytes) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(test = %self.test_name, error = %err, "screenshot could not be written");
                None
            }
        }
    }

    /// Identifier of the test owning this session
    #[must_use]
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Configuration the session was launched with
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Screenshot store
    #[must_use]
    pub const fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Underlying driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }
}

impl<D: WebDriver> Drop for Session<D> {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                test = %self.test_name,
                "session dropped without release; browser teardown left to the driver"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::CookieBanner;
    use crate::driver::{MockDriver, MockElement, MockLauncher, MockPage};
    use std::time::Duration;

    const BASE: &str = "https://site.test/";

    fn config(dir: &std::path::Path) -> SessionConfig {
        SessionConfig::new()
            .with_base_url(BASE)
            .with_artifacts_dir(dir)
    }

    fn banner_page() -> MockPage {
        let banner = CookieBanner::default();
        MockPage::new(BASE, "Home").with_element(
            MockElement::new(banner.banner)
                .with_child(MockElement::new(banner.accept).with_text("Accept")),
        )
    }

    mod acquire_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_acquire_prepares_session() {
            let tmp = tempfile::tempdir().unwrap();
            let launcher = MockLauncher::new(MockDriver::new().with_page(MockPage::new(BASE, "Home")));
            let manager = SessionManager::new(launcher, config(tmp.path()));

            let mut session = manager.acquire("setup").await.unwrap();
            let driver = manager.launcher().driver();
            let timeouts = driver.timeouts().unwrap();
            assert_eq!(timeouts.page_load, Duration::from_secs(30));
            assert_eq!(timeouts.implicit_wait, Duration::from_secs(2));
            assert_eq!(session.title().await.unwrap(), "Home");
            assert_eq!(session.test_name(), "setup");
            assert_eq!(driver.history()[..2], ["launch".to_string(), format!("navigate:{BASE}")]);
            session.release().await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_launch_failure_is_fatal() {
            let manager = SessionManager::new(MockLauncher::failing("no chromium"), SessionConfig::new());
            let err = manager.acquire("t").await.unwrap_err();
            assert!(matches!(err, WebcheckError::SessionLaunch { ref message } if message.contains("no chromium")));
            assert_eq!(manager.launcher().launches(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_failed_setup_quits_browser() {
            let driver = MockDriver::new();
            driver.fail_queries("navigation refused");
            let manager = SessionManager::new(MockLauncher::new(driver.clone()), SessionConfig::new());
            let err = manager.acquire("t").await.unwrap_err();
            assert!(matches!(err, WebcheckError::Driver(DriverError::Transport { .. })));
            assert!(driver.is_closed());
            assert_eq!(driver.quit_calls(), 1);
        }
    }

    mod banner_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_banner_is_dismissed() {
            let tmp = tempfile::tempdir().unwrap();
            let driver = MockDriver::new().with_page(banner_page());
            let manager = SessionManager::new(MockLauncher::new(driver.clone()), config(tmp.path()));

            let started = tokio::time::Instant::now();
            let mut session = manager.acquire("banner").await.unwrap();
            assert!(started.elapsed() >= Duration::from_millis(500));
            assert!(driver.was_called("click:By.CssSelector: button.accept, .btn-primary"));
            session.release().await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_absent_banner_is_silent() {
            let tmp = tempfile::tempdir().unwrap();
            let driver = MockDriver::new().with_page(MockPage::new(BASE, "Home"));
            let manager = SessionManager::new(MockLauncher::new(driver.clone()), config(tmp.path()));
            let mut session = manager.acquire("no_banner").await.unwrap();
            assert!(!driver.was_called("click"));
            assert!(!session.dismiss_cookie_banner().await.unwrap());
            session.release().await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_banner_without_accept_control() {
            let tmp = tempfile::tempdir().unwrap();
            let page = MockPage::new(BASE, "Home")
                .with_element(MockElement::new(CookieBanner::default().banner));
            let driver = MockDriver::new().with_page(page);
            let manager = SessionManager::new(MockLauncher::new(driver.clone()), config(tmp.path()));
            let mut session = manager.acquire("bare_banner").await.unwrap();
            assert!(!driver.was_called("click"));
            session.release().await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_banner_dismissal_can_be_skipped() {
            let tmp = tempfile::tempdir().unwrap();
            let driver = MockDriver::new().with_page(banner_page());
            let manager = SessionManager::new(
                MockLauncher::new(driver.clone()),
                config(tmp.path()).with_cookie_banner(None),
            );
            let mut session = manager.acquire("skip").await.unwrap();
            assert!(!driver.was_called("click"));
            session.release().await.unwrap();
        }
    }

    mod release_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_release_is_idempotent() {
            let tmp = tempfile::tempdir().unwrap();
            let driver = MockDriver::new();
            let manager = SessionManager::new(MockLauncher::new(driver.clone()), config(tmp.path()));
            let mut session = manager.acquire("idem").await.unwrap();
            session.release().await.unwrap();
            session.release().await.unwrap();
            assert!(session.is_released());
            assert_eq!(driver.quit_calls(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_externally_closed_session_releases_cleanly() {
            let tmp = tempfile::tempdir().unwrap();
            let mut driver = MockDriver::new();
            let mut session = Session::new(driver.clone(), config(tmp.path()), "closed");
            driver.quit().await.unwrap();
            session.release().await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_save_screenshot_failure_is_none() {
            let tmp = tempfile::tempdir().unwrap();
            let driver = MockDriver::new();
            driver.fail_screenshots("gpu lost");
            let mut session = Session::new(driver, config(tmp.path()), "shots");
            assert!(session.save_screenshot("x.png").await.is_none());
            session.release().await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_navigate_resolves_relative_paths() {
            let tmp = tempfile::tempdir().unwrap();
            let driver = MockDriver::new();
            let mut session = Session::new(driver.clone(), config(tmp.path()), "nav");
            session.navigate("browse").await.unwrap();
            assert_eq!(session.current_url().await.unwrap(), "https://site.test/browse");
            session.release().await.unwrap();
        }
    }
}
