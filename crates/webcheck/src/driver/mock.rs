//! Mock driver for unit testing.
//!
//! Pages are scripted up front: each [`MockElement`] can appear, become
//! visible, detach again or stay disabled on a timeline measured from the moment its page
//! was loaded. Time is read from `tokio::time`, so tests running with a
//! paused clock are fully deterministic. Queries resolve instantly unless
//! [`MockDriver::emulating_implicit_wait`] is set, in which case a single
//! element lookup keeps re-querying for the configured implicit wait like a
//! real browser does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{DriverError, DriverResult, Key, Launcher, Lookup, Timeouts, WebDriver, WebElement};
use crate::config::SessionConfig;
use crate::locator::Locator;

/// Re-query pause while emulating the implicit wait
const IMPLICIT_WAIT_STEP: Duration = Duration::from_millis(100);

/// PNG file signature, returned as the mock screenshot payload
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// A scripted element
#[derive(Debug, Clone)]
pub struct MockElement {
    locator: Locator,
    text: String,
    displayed: bool,
    enabled: bool,
    appears_after: Duration,
    removed_after: Option<Duration>,
    shown_after: Option<Duration>,
    navigates_to: Option<String>,
    children: Vec<MockElement>,
}

impl MockElement {
    /// Visible, enabled element matched by `locator`, present from page load
    #[must_use]
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            text: String::new(),
            displayed: true,
            enabled: true,
            appears_after: Duration::ZERO,
            removed_after: None,
            shown_after: None,
            navigates_to: None,
            children: Vec::new(),
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Element exists but is never displayed
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Element is displayed but disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Element is attached to the DOM only after `delay`
    #[must_use]
    pub const fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = delay;
        self
    }

    /// Element is detached from the DOM once `delay` has passed
    #[must_use]
    pub const fn removed_after(mut self, delay: Duration) -> Self {
        self.removed_after = Some(delay);
        self
    }

    /// Element exists from page load but is only displayed after `delay`
    #[must_use]
    pub const fn shown_after(mut self, delay: Duration) -> Self {
        self.shown_after = Some(delay);
        self
    }

    /// Clicking the element (or pressing Enter in it) loads `url`
    #[must_use]
    pub fn navigates_to(mut self, url: impl Into<String>) -> Self {
        self.navigates_to = Some(url.into());
        self
    }

    /// Add a descendant element
    #[must_use]
    pub fn with_child(mut self, child: MockElement) -> Self {
        self.children.push(child);
        self
    }
}

/// A scripted page
#[derive(Debug, Clone)]
pub struct MockPage {
    url: String,
    title: String,
    elements: Vec<MockElement>,
}

impl MockPage {
    /// Create an empty page
    #[must_use]
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            elements: Vec::new(),
        }
    }

    /// Add a top-level element
    #[must_use]
    pub fn with_element(mut self, element: MockElement) -> Self {
        self.elements.push(element);
        self
    }

    fn blank(url: &str) -> Self {
        Self::new(url, "")
    }
}

#[derive(Debug)]
struct Node {
    element: MockElement,
    parent: Option<usize>,
    value: String,
}

#[derive(Debug)]
struct MockState {
    pages: HashMap<String, MockPage>,
    current_url: String,
    title: String,
    nodes: Vec<Node>,
    generation: u64,
    loaded_at: Instant,
    timeouts: Option<Timeouts>,
    implicit_wait: bool,
    stale_queries: usize,
    transport_fault: Option<String>,
    screenshot_fault: Option<String>,
    quit_fault: Option<String>,
    closed: bool,
    quit_calls: usize,
    queries: Vec<Locator>,
    history: Vec<String>,
}

impl MockState {
    fn load(&mut self, url: &str) {
        let page = self
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| MockPage::blank(url));

        self.nodes.clear();
        for element in page.elements {
            self.attach(element, None);
        }
        self.current_url = page.url;
        self.title = page.title;
        self.generation += 1;
        self.loaded_at = Instant::now();
    }

    fn attach(&mut self, mut element: MockElement, parent: Option<usize>) {
        let children = std::mem::take(&mut element.children);
        let index = self.nodes.len();
        self.nodes.push(Node {
            element,
            parent,
            value: String::new(),
        });
        for child in children {
            self.attach(child, Some(index));
        }
    }

    /// Record a page-level query and return the matching node indices
    fn query(&mut self, locator: &Locator) -> DriverResult<(Vec<usize>, u64)> {
        self.check_open()?;
        self.queries.push(locator.clone());
        if self.stale_queries > 0 {
            self.stale_queries -= 1;
            return Err(DriverError::StaleElement {
                locator: locator.to_string(),
            });
        }
        Ok((self.matches(locator, None), self.generation))
    }

    fn implicit_budget(&self) -> Duration {
        match self.timeouts {
            Some(timeouts) if self.implicit_wait => timeouts.implicit_wait,
            _ => Duration::ZERO,
        }
    }

    fn check_open(&self) -> DriverResult<()> {
        if self.closed {
            return Err(DriverError::SessionClosed);
        }
        if let Some(ref message) = self.transport_fault {
            return Err(DriverError::transport(message.clone()));
        }
        Ok(())
    }

    fn attached(&self, index: usize) -> bool {
        let element = &self.nodes[index].element;
        let elapsed = self.loaded_at.elapsed();
        elapsed >= element.appears_after && element.removed_after.map_or(true, |gone| elapsed < gone)
    }

    fn first_match(&self, locator: &Locator, parent: Option<Option<usize>>) -> Option<usize> {
        self.matches(locator, parent).into_iter().next()
    }

    fn matches(&self, locator: &Locator, parent: Option<Option<usize>>) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| parent.map_or(true, |p| self.nodes[i].parent == p))
            .filter(|&i| self.nodes[i].element.locator == *locator && self.attached(i))
            .collect()
    }
}

/// Mock driver for unit testing.
///
/// Cloning shares the underlying state, so a test can keep a clone for
/// inspection after handing the driver to a session.
#[derive(Debug, Clone)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create new mock driver showing `about:blank`
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                pages: HashMap::new(),
                current_url: String::from("about:blank"),
                title: String::new(),
                nodes: Vec::new(),
                generation: 0,
                loaded_at: Instant::now(),
                timeouts: None,
                implicit_wait: false,
                stale_queries: 0,
                transport_fault: None,
                screenshot_fault: None,
                quit_fault: None,
                closed: false,
                quit_calls: 0,
                queries: Vec::new(),
                history: Vec::new(),
            })),
        }
    }

    /// Register a page served at its URL
    #[must_use]
    pub fn with_page(self, page: MockPage) -> Self {
        self.add_page(page);
        self
    }

    /// Register a page served at its URL
    pub fn add_page(&self, page: MockPage) {
        let mut state = self.lock();
        let _ = state.pages.insert(page.url.clone(), page);
    }

    /// Single element lookups re-query a missing element for the implicit
    /// wait passed to `set_timeouts`
    #[must_use]
    pub fn emulating_implicit_wait(self) -> Self {
        self.lock().implicit_wait = true;
        self
    }

    /// The next `count` page queries fail as if the document was replaced
    /// mid-query
    pub fn stale_queries(&self, count: usize) {
        self.lock().stale_queries = count;
    }

    /// Make every subsequent call fail with a transport error
    pub fn fail_queries(&self, message: impl Into<String>) {
        self.lock().transport_fault = Some(message.into());
    }

    /// Make screenshots fail with a transport error
    pub fn fail_screenshots(&self, message: impl Into<String>) {
        self.lock().screenshot_fault = Some(message.into());
    }

    /// Make `quit` report a transport error (the browser still ends up closed)
    pub fn fail_quit(&self, message: impl Into<String>) {
        self.lock().quit_fault = Some(message.into());
    }

    /// Remove injected faults
    pub fn clear_faults(&self) {
        let mut state = self.lock();
        state.transport_fault = None;
        state.screenshot_fault = None;
        state.quit_fault = None;
        state.stale_queries = 0;
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock().history.iter().any(|c| c.starts_with(method))
    }

    /// Locators queried through `find_element` / `find_elements`, in order
    #[must_use]
    pub fn queries(&self) -> Vec<Locator> {
        self.lock().queries.clone()
    }

    /// Number of page-level queries for `locator`
    #[must_use]
    pub fn query_count(&self, locator: &Locator) -> usize {
        self.lock().queries.iter().filter(|q| *q == locator).count()
    }

    /// Number of `quit` calls received
    #[must_use]
    pub fn quit_calls(&self) -> usize {
        self.lock().quit_calls
    }

    /// Whether the session was quit
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Timeouts applied by the session manager
    #[must_use]
    pub fn timeouts(&self) -> Option<Timeouts> {
        self.lock().timeouts
    }

    /// Text typed into the first element matching `locator`
    #[must_use]
    pub fn typed_value(&self, locator: &Locator) -> Option<String> {
        let state = self.lock();
        state
            .nodes
            .iter()
            .find(|n| n.element.locator == *locator)
            .map(|n| n.value.clone())
    }

    fn reopen(&self) {
        let mut state = self.lock();
        state.closed = false;
        state.history.push("launch".to_string());
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, index: usize, generation: u64) -> MockElementHandle {
        MockElementHandle {
            state: Arc::clone(&self.state),
            index,
            generation,
        }
    }
}

#[async_trait]
impl WebDriver for MockDriver {
    type Element = MockElementHandle;

    async fn set_timeouts(&mut self, timeouts: Timeouts) -> DriverResult<()> {
        let mut state = self.lock();
        state.check_open()?;
        state.timeouts = Some(timeouts);
        Ok(())
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        let mut state = self.lock();
        state.check_open()?;
        state.history.push(format!("navigate:{url}"));
        state.load(url);
        Ok(())
    }

    async fn find_element(&self, locator: &Locator) -> DriverResult<Lookup<Self::Element>> {
        let deadline = Instant::now() + self.lock().implicit_budget();
        loop {
            let (found, generation) = self.lock().query(locator)?;
            if let Some(index) = found.into_iter().next() {
                return Ok(Lookup::Found(self.handle(index, generation)));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Lookup::NotFound);
            }
            tokio::time::sleep(IMPLICIT_WAIT_STEP.min(deadline - now)).await;
        }
    }

    async fn find_elements(&self, locator: &Locator) -> DriverResult<Vec<Self::Element>> {
        let (found, generation) = self.lock().query(locator)?;
        Ok(found
            .into_iter()
            .map(|i| self.handle(i, generation))
            .collect())
    }

    async fn current_url(&self) -> DriverResult<String> {
        let state = self.lock();
        state.check_open()?;
        Ok(state.current_url.clone())
    }

    async fn title(&self) -> DriverResult<String> {
        let state = self.lock();
        state.check_open()?;
        Ok(state.title.clone())
    }

    async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        let mut state = self.lock();
        if state.closed {
            return Err(DriverError::SessionClosed);
        }
        if let Some(ref message) = state.screenshot_fault {
            return Err(DriverError::transport(message.clone()));
        }
        state.history.push("screenshot".to_string());
        Ok(PNG_SIGNATURE.to_vec())
    }

    async fn quit(&mut self) -> DriverResult<()> {
        let mut state = self.lock();
        state.quit_calls += 1;
        if state.closed {
            return Err(DriverError::SessionClosed);
        }
        state.closed = true;
        state.history.push("quit".to_string());
        match state.quit_fault {
            Some(ref message) => Err(DriverError::transport(message.clone())),
            None => Ok(()),
        }
    }
}

/// Element handle produced by [`MockDriver`]
#[derive(Debug)]
pub struct MockElementHandle {
    state: Arc<Mutex<MockState>>,
    index: usize,
    generation: u64,
}

impl MockElementHandle {
    fn lock(&self) -> DriverResult<MutexGuard<'_, MockState>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.check_open()?;
        if state.generation != self.generation || !state.attached(self.index) {
            return Err(DriverError::StaleElement {
                locator: state
                    .nodes
                    .get(self.index)
                    .map_or_else(String::new, |n| n.element.locator.to_string()),
            });
        }
        Ok(state)
    }

    fn activate(&self, action: &str) -> DriverResult<()> {
        let mut state = self.lock()?;
        let node = &state.nodes[self.index];
        let entry = format!("{action}:{}", node.element.locator);
        let target = node.element.navigates_to.clone();
        state.history.push(entry);
        if let Some(url) = target {
            state.history.push(format!("navigate:{url}"));
            state.load(&url);
        }
        Ok(())
    }
}

#[async_trait]
impl WebElement for MockElementHandle {
    async fn is_displayed(&self) -> DriverResult<bool> {
        let state = self.lock()?;
        let element = &state.nodes[self.index].element;
        let shown = element
            .shown_after
            .map_or(true, |delay| state.loaded_at.elapsed() >= delay);
        Ok(element.displayed && shown)
    }

    async fn is_enabled(&self) -> DriverResult<bool> {
        let state = self.lock()?;
        Ok(state.nodes[self.index].element.enabled)
    }

    async fn text(&self) -> DriverResult<String> {
        let state = self.lock()?;
        Ok(state.nodes[self.index].element.text.clone())
    }

    async fn click(&self) -> DriverResult<()> {
        self.activate("click")
    }

    async fn send_keys(&self, text: &str) -> DriverResult<()> {
        let mut state = self.lock()?;
        let entry = format!("send_keys:{}", state.nodes[self.index].element.locator);
        state.nodes[self.index].value.push_str(text);
        state.history.push(entry);
        Ok(())
    }

    async fn press_key(&self, key: Key) -> DriverResult<()> {
        if key == Key::Enter {
            return self.activate("press:Enter");
        }
        let mut state = self.lock()?;
        let entry = format!("press:{key}:{}", state.nodes[self.index].element.locator);
        state.history.push(entry);
        Ok(())
    }

    async fn clear(&self) -> DriverResult<()> {
        let mut state = self.lock()?;
        let entry = format!("clear:{}", state.nodes[self.index].element.locator);
        state.nodes[self.index].value.clear();
        state.history.push(entry);
        Ok(())
    }

    async fn find_child(&self, locator: &Locator) -> DriverResult<Lookup<Self>> {
        let state = self.lock()?;
        let found = state.first_match(locator, Some(Some(self.index)));
        Ok(Lookup::from(found.map(|index| Self {
            state: Arc::clone(&self.state),
            index,
            generation: self.generation,
        })))
    }
}

/// Launcher handing out a shared [`MockDriver`]
#[derive(Debug, Clone)]
pub struct MockLauncher {
    driver: MockDriver,
    launch_failure: Option<String>,
    launches: Arc<AtomicUsize>,
}

impl MockLauncher {
    /// Launcher whose sessions all drive `driver`
    #[must_use]
    pub fn new(driver: MockDriver) -> Self {
        Self {
            driver,
            launch_failure: None,
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every launch fails with `message`
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            launch_failure: Some(message.into()),
            ..Self::new(MockDriver::new())
        }
    }

    /// Shared driver, for inspection
    #[must_use]
    pub fn driver(&self) -> &MockDriver {
        &self.driver
    }

    /// Number of launch attempts
    #[must_use]
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Launcher for MockLauncher {
    type Driver = MockDriver;

    async fn launch(&self, _config: &SessionConfig) -> DriverResult<MockDriver> {
        let _ = self.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(ref message) = self.launch_failure {
            return Err(DriverError::transport(message.clone()));
        }
        self.driver.reopen();
        Ok(self.driver.clone())
    }
}
