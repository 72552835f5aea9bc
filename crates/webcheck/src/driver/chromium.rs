//! Chromium driver over the Chrome `DevTools` Protocol.
//!
//! One browser process and one page per session. A handler task is spawned
//! on the tokio runtime to pump CDP events; it ends when the browser closes.

use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

use super::{DriverError, DriverResult, Key, Launcher, Lookup, Timeouts, WebDriver, WebElement};
use crate::config::SessionConfig;
use crate::locator::Locator;

/// Re-query pause while emulating the implicit wait
const IMPLICIT_WAIT_STEP: Duration = Duration::from_millis(100);

const IS_DISPLAYED_JS: &str = "function() {
    if (!this.isConnected) { return false; }
    const style = window.getComputedStyle(this);
    if (style.display === 'none' || style.visibility === 'hidden' || parseFloat(style.opacity) === 0) {
        return false;
    }
    const rect = this.getBoundingClientRect();
    return rect.width > 0 || rect.height > 0;
}";

const IS_ENABLED_JS: &str = "function() { return !this.disabled; }";

const CLEAR_JS: &str = "function() {
    if ('value' in this) {
        this.value = '';
        this.dispatchEvent(new Event('input', { bubbles: true }));
        this.dispatchEvent(new Event('change', { bubbles: true }));
    }
}";

/// Map a CDP failure, recognising detached nodes as stale handles
fn cdp_error(err: impl Display, locator: &Locator) -> DriverError {
    let message = err.to_string();
    let detached = ["No node with given id", "does not belong to the document", "Could not find node"];
    if detached.iter().any(|needle| message.contains(needle)) {
        DriverError::StaleElement {
            locator: locator.to_string(),
        }
    } else {
        DriverError::transport(message)
    }
}

fn transport(err: impl Display) -> DriverError {
    DriverError::transport(err.to_string())
}

/// Launches Chromium sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumLauncher;

impl ChromiumLauncher {
    /// Create a launcher
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn browser_config(config: &SessionConfig) -> DriverResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .args(config.window.launch_args())
            .request_timeout(config.page_load_timeout);

        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(DriverError::transport)
    }
}

#[async_trait]
impl Launcher for ChromiumLauncher {
    type Driver = ChromiumDriver;

    async fn launch(&self, config: &SessionConfig) -> DriverResult<ChromiumDriver> {
        let browser_config = Self::browser_config(config)?;
        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(transport)?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handle.abort();
                return Err(transport(err));
            }
        };

        tracing::debug!(headless = config.headless, "chromium launched");
        Ok(ChromiumDriver {
            browser: Some(browser),
            page,
            handler: handle,
            timeouts: config.timeouts(),
        })
    }
}

/// A Chromium session
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Option<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    timeouts: Timeouts,
}

impl ChromiumDriver {
    fn ensure_open(&self) -> DriverResult<()> {
        if self.browser.is_none() {
            return Err(DriverError::SessionClosed);
        }
        Ok(())
    }

    async fn query(&self, locator: &Locator) -> DriverResult<Vec<Element>> {
        self.ensure_open()?;
        let found = match locator.to_css() {
            Some(css) => self.page.find_elements(css).await,
            None => self.page.find_xpaths(locator.value()).await,
        };
        found.map_err(|e| cdp_error(e, locator))
    }
}

#[async_trait]
impl WebDriver for ChromiumDriver {
    type Element = ChromiumElement;

    async fn set_timeouts(&mut self, timeouts: Timeouts) -> DriverResult<()> {
        self.ensure_open()?;
        self.timeouts = timeouts;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.ensure_open()?;
        match timeout(self.timeouts.page_load, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(transport(err)),
            Err(_) => Err(DriverError::transport(format!(
                "page load of {url} exceeded {}ms",
                self.timeouts.page_load.as_millis()
            ))),
        }
    }

    async fn find_element(&self, locator: &Locator) -> DriverResult<Lookup<ChromiumElement>> {
        let deadline = Instant::now() + self.timeouts.implicit_wait;
        loop {
            if let Some(element) = self.query(locator).await?.into_iter().next() {
                return Ok(Lookup::Found(ChromiumElement::new(element, locator.clone())));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Lookup::NotFound);
            }
            sleep(IMPLICIT_WAIT_STEP.min(deadline - now)).await;
        }
    }

    async fn find_elements(&self, locator: &Locator) -> DriverResult<Vec<ChromiumElement>> {
        Ok(self
            .query(locator)
            .await?
            .into_iter()
            .map(|element| ChromiumElement::new(element, locator.clone()))
            .collect())
    }

    async fn current_url(&self) -> DriverResult<String> {
        self.ensure_open()?;
        Ok(self.page.url().await.map_err(transport)?.unwrap_or_default())
    }

    async fn title(&self) -> DriverResult<String> {
        self.ensure_open()?;
        Ok(self.page.get_title().await.map_err(transport)?.unwrap_or_default())
    }

    async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        self.ensure_open()?;
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();

        let screenshot = self.page.execute(params).await.map_err(transport)?;

        base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(transport)
    }

    async fn quit(&mut self) -> DriverResult<()> {
        let Some(mut browser) = self.browser.take() else {
            return Err(DriverError::SessionClosed);
        };
        let closed = browser.close().await.map_err(transport);
        if let Err(err) = browser.wait().await {
            tracing::debug!(error = %err, "waiting for chromium process exit failed");
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}

/// Element handle produced by [`ChromiumDriver`]
#[derive(Debug)]
pub struct ChromiumElement {
    inner: Element,
    locator: Locator,
}

impl ChromiumElement {
    const fn new(inner: Element, locator: Locator) -> Self {
        Self { inner, locator }
    }

    async fn eval_bool(&self, function: &str) -> DriverResult<bool> {
        let returns = self
            .inner
            .call_js_fn(function, false)
            .await
            .map_err(|e| cdp_error(e, &self.locator))?;
        Ok(returns
            .result
            .value
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }
}

#[async_trait]
impl WebElement for ChromiumElement {
    async fn is_displayed(&self) -> DriverResult<bool> {
        self.eval_bool(IS_DISPLAYED_JS).await
    }

    async fn is_enabled(&self) -> DriverResult<bool> {
        self.eval_bool(IS_ENABLED_JS).await
    }

    async fn text(&self) -> DriverResult<String> {
        let text = self
            .inner
            .inner_text()
            .await
            .map_err(|e| cdp_error(e, &self.locator))?;
        Ok(text.unwrap_or_default())
    }

    async fn click(&self) -> DriverResult<()> {
        self.inner
            .click()
            .await
            .map_err(|e| cdp_error(e, &self.locator))?;
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> DriverResult<()> {
        self.inner
            .click()
            .await
            .map_err(|e| cdp_error(e, &self.locator))?
            .type_str(text)
            .await
            .map_err(|e| cdp_error(e, &self.locator))?;
        Ok(())
    }

    async fn press_key(&self, key: Key) -> DriverResult<()> {
        self.inner
            .press_key(key.as_str())
            .await
            .map_err(|e| cdp_error(e, &self.locator))?;
        Ok(())
    }

    async fn clear(&self) -> DriverResult<()> {
        self.inner
            .call_js_fn(CLEAR_JS, false)
            .await
            .map_err(|e| cdp_error(e, &self.locator))?;
        Ok(())
    }

    async fn find_child(&self, locator: &Locator) -> DriverResult<Lookup<Self>> {
        let Some(css) = locator.to_css() else {
            return Err(DriverError::unsupported("xpath child lookup"));
        };
        let children = self
            .inner
            .find_elements(css)
            .await
            .map_err(|e| cdp_error(e, &self.locator))?;
        Ok(Lookup::from(
            children
                .into_iter()
                .next()
                .map(|child| Self::new(child, locator.clone())),
        ))
    }
}
