//! Element handles bound to a session.

use std::marker::PhantomData;

use crate::driver::{Key, Lookup, WebElement};
use crate::locator::Locator;
use crate::result::WebcheckResult;

/// A live element in the session's current page.
///
/// The handle borrows its [`Session`](crate::Session) and cannot outlive
/// it. It also goes stale once the page navigates away; operations on a
/// stale handle fail with
/// [`DriverError::StaleElement`](crate::DriverError::StaleElement).
#[derive(Debug)]
pub struct Element<'s, E: WebElement> {
    handle: E,
    locator: Locator,
    session: PhantomData<&'s ()>,
}

impl<'s, E: WebElement> Element<'s, E> {
    pub(crate) const fn new(handle: E, locator: Locator) -> Self {
        Self {
            handle,
            locator,
            session: PhantomData,
        }
    }

    /// Locator this element was found with
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Underlying driver handle
    #[must_use]
    pub const fn handle(&self) -> &E {
        &self.handle
    }

    /// Whether the element is rendered and visible
    pub async fn is_displayed(&self) -> WebcheckResult<bool> {
        Ok(self.handle.is_displayed().await?)
    }

    /// Whether the element accepts interaction
    pub async fn is_enabled(&self) -> WebcheckResult<bool> {
        Ok(self.handle.is_enabled().await?)
    }

    /// Rendered text
    pub async fn text(&self) -> WebcheckResult<String> {
        Ok(self.handle.text().await?)
    }

    /// Click the element
    pub async fn click(&self) -> WebcheckResult<()> {
        tracing::debug!(locator = %self.locator, "click");
        Ok(self.handle.click().await?)
    }

    /// Type text into the element
    pub async fn send_keys(&self, text: &str) -> WebcheckResult<()> {
        tracing::debug!(locator = %self.locator, chars = text.chars().count(), "send_keys");
        Ok(self.handle.send_keys(text).await?)
    }

    /// Press a special key in the element
    pub async fn press_key(&self, key: Key) -> WebcheckResult<()> {
        tracing::debug!(locator = %self.locator, %key, "press_key");
        Ok(self.handle.press_key(key).await?)
    }

    /// Press Enter, submitting the enclosing form
    pub async fn submit(&self) -> WebcheckResult<()> {
        self.press_key(Key::Enter).await
    }

    /// Clear an editable element
    pub async fn clear(&self) -> WebcheckResult<()> {
        Ok(self.handle.clear().await?)
    }

    /// Clear, then type `text`
    pub async fn fill(&self, text: &str) -> WebcheckResult<()> {
        self.clear().await?;
        self.send_keys(text).await
    }

    /// Direct query for a descendant (no waiting)
    pub async fn find_child(&self, locator: &Locator) -> WebcheckResult<Lookup<Element<'s, E>>> {
        let found = self.handle.find_child(locator).await?;
        Ok(found.map(|handle| Element::new(handle, locator.clone())))
    }
}
