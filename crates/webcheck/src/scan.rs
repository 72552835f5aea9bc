//! Fallback-selector scan.
//!
//! When markup varies between page versions, a test lists several candidate
//! locators for the same logical element. [`scan`] tries them in order with
//! a single query each and no waiting.

use tracing::{debug, trace, warn};

use crate::driver::{DriverError, WebDriver, WebElement};
use crate::element::Element;
use crate::locator::Locator;
use crate::result::{WebcheckError, WebcheckResult};
use crate::session::Session;

/// First candidate that exists, is displayed and has non-blank text.
///
/// Candidates after the accepted one are never queried. Each query bypasses
/// the driver's implicit wait.
///
/// # Errors
///
/// - [`WebcheckError::ElementNotFoundAfterScan`] when no candidate
///   qualifies (or the list is empty). A screenshot is saved under the
///   configured fallback name first.
/// - [`WebcheckError::Driver`] on transport failures, without a screenshot
pub async fn scan<'s, D: WebDriver>(
    session: &'s Session<D>,
    candidates: &[Locator],
) -> WebcheckResult<Element<'s, D::Element>> {
    for (position, locator) in candidates.iter().enumerate() {
        let Some(handle) = session.driver().find_elements(locator).await?.into_iter().next() else {
            trace!(%locator, position, "scan candidate absent");
            continue;
        };
        if qualifies(&handle).await? {
            debug!(test = session.test_name(), %locator, position, "scan candidate accepted");
            return Ok(Element::new(handle, locator.clone()));
        }
        trace!(%locator, position, "scan candidate hidden or blank");
    }

    warn!(test = session.test_name(), candidates = candidates.len(), "fallback scan found nothing");
    let screenshot = session
        .save_screenshot(&session.config().scan_failure_screenshot)
        .await;
    Err(WebcheckError::ElementNotFoundAfterScan {
        candidates: candidates.iter().map(ToString::to_string).collect(),
        test_name: session.test_name().to_string(),
        screenshot,
    })
}

async fn qualifies<E: WebElement>(element: &E) -> Result<bool, DriverError> {
    match visible_with_text(element).await {
        Err(DriverError::StaleElement { .. }) => Ok(false),
        other => other,
    }
}

async fn visible_with_text<E: WebElement>(element: &E) -> Result<bool, DriverError> {
    Ok(element.is_displayed().await? && !element.text().await?.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::driver::{MockDriver, MockElement, MockPage};

    const URL: &str = "https://site.test/tutorials";

    async fn session_with(page: MockPage, dir: &std::path::Path) -> Session<MockDriver> {
        let driver = MockDriver::new().with_page(page);
        let config = SessionConfig::new().with_artifacts_dir(dir);
        let session = Session::new(driver, config, "scan");
        session.navigate(URL).await.unwrap();
        session
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_qualifying_candidate_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let page = MockPage::new(URL, "Tutorials")
            .with_element(MockElement::new(Locator::css(".page-title")).with_text("   "))
            .with_element(MockElement::new(Locator::css("h1")).hidden().with_text("Hidden"))
            .with_element(MockElement::new(Locator::css("main h1")).with_text("Learn HTML"));
        let mut session = session_with(page, tmp.path()).await;

        let candidates = [
            Locator::css("h1"),
            Locator::css(".page-title"),
            Locator::css("main h1"),
        ];
        let element = scan(&session, &candidates).await.unwrap();
        assert_eq!(element.locator(), &Locator::css("main h1"));
        assert_eq!(element.text().await.unwrap(), "Learn HTML");
        drop(element);
        session.release().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_candidate_list_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_with(MockPage::new(URL, "Tutorials"), tmp.path()).await;
        let err = scan(&session, &[]).await.unwrap_err();
        assert!(matches!(
            err,
            WebcheckError::ElementNotFoundAfterScan { ref candidates, .. } if candidates.is_empty()
        ));
        assert!(tmp.path().join("fallback_scan_error.png").exists());
        session.release().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_propagates_without_screenshot() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_with(MockPage::new(URL, "Tutorials"), tmp.path()).await;
        session.driver().fail_queries("socket closed");
        let err = scan(&session, &[Locator::css("h1")]).await.unwrap_err();
        assert!(matches!(err, WebcheckError::Driver(DriverError::Transport { .. })));
        assert!(!tmp.path().join("fallback_scan_error.png").exists());
        session.driver().clear_faults();
        session.release().await.unwrap();
    }
}
