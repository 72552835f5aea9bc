//! Page assertions.
//!
//! Each helper returns [`WebcheckError::AssertionFailed`] instead of
//! panicking, so a failing check inside
//! [`SessionManager::run_scoped`](crate::SessionManager::run_scoped) still
//! lets the session be released normally.

use crate::driver::{WebDriver, WebElement};
use crate::element::Element;
use crate::locator::Locator;
use crate::result::{WebcheckError, WebcheckResult};
use crate::session::Session;

fn ensure(condition: bool, message: impl FnOnce() -> String) -> WebcheckResult<()> {
    if condition {
        Ok(())
    } else {
        Err(WebcheckError::assertion(message()))
    }
}

/// Case-insensitive containment of any keyword
#[must_use]
pub fn contains_any_ignore_case(haystack: &str, keywords: &[&str]) -> bool {
    let haystack = haystack.to_lowercase();
    keywords
        .iter()
        .any(|keyword| haystack.contains(&keyword.to_lowercase()))
}

/// Page title equals `expected`
pub async fn expect_title<D: WebDriver>(session: &Session<D>, expected: &str) -> WebcheckResult<()> {
    let title = session.title().await?;
    ensure(title == expected, || {
        format!("expected title '{expected}', got '{title}'")
    })
}

/// Current URL contains `fragment`, ignoring case
pub async fn expect_url_contains<D: WebDriver>(
    session: &Session<D>,
    fragment: &str,
) -> WebcheckResult<()> {
    let url = session.current_url().await?;
    ensure(contains_any_ignore_case(&url, &[fragment]), || {
        format!("expected URL '{url}' to contain '{fragment}'")
    })
}

/// Element is currently displayed; `what` names it in the failure message
pub async fn expect_visible<E: WebElement>(element: &Element<'_, E>, what: &str) -> WebcheckResult<()> {
    let displayed = element.is_displayed().await?;
    ensure(displayed, || {
        format!("{what} is not displayed ({})", element.locator())
    })
}

/// Element text contains at least one keyword, ignoring case
pub async fn expect_text_contains_any<E: WebElement>(
    element: &Element<'_, E>,
    keywords: &[&str],
) -> WebcheckResult<()> {
    let text = element.text().await?;
    if text.trim().is_empty() {
        return Err(WebcheckError::assertion(format!(
            "{} has no text",
            element.locator()
        )));
    }
    ensure(contains_any_ignore_case(&text, keywords), || {
        format!("'{text}' contains none of {keywords:?}")
    })
}

/// At least `min` elements currently match `locator`
pub async fn expect_count_at_least<D: WebDriver>(
    session: &Session<D>,
    locator: &Locator,
    min: usize,
) -> WebcheckResult<usize> {
    let count = session.find_elements(locator).await?.len();
    ensure(count >= min, || {
        format!("expected at least {min} matches for {locator}, found {count}")
    })?;
    Ok(count)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::driver::{Lookup, MockDriver, MockElement, MockPage};

    const URL: &str = "https://site.test/browse?tag=Portfolio";

    async fn session() -> Session<MockDriver> {
        let page = MockPage::new(URL, "Browse Sites")
            .with_element(MockElement::new(Locator::css("h1")).with_text("Tutorials and Guides"))
            .with_element(MockElement::new(Locator::css(".empty")))
            .with_element(MockElement::new(Locator::css(".ghost")).hidden())
            .with_element(MockElement::new(Locator::css("li a")))
            .with_element(MockElement::new(Locator::css("li a")));
        let session = Session::new(MockDriver::new().with_page(page), SessionConfig::new(), "assert");
        session.navigate(URL).await.unwrap();
        session
    }

    async fn find<'s>(
        session: &'s Session<MockDriver>,
        css: &str,
    ) -> Element<'s, crate::driver::MockElementHandle> {
        match session.find_element(&Locator::css(css)).await.unwrap() {
            Lookup::Found(element) => element,
            Lookup::NotFound => panic!("fixture page lacks {css}"),
        }
    }

    mod helper_tests {
        use super::*;

        #[test]
        fn test_contains_any_ignore_case() {
            assert!(contains_any_ignore_case("Getting STARTED", &["started"]));
            assert!(!contains_any_ignore_case("Welcome", &["learn", "guide"]));
            assert!(!contains_any_ignore_case("anything", &[]));
        }
    }

    mod page_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_title() {
            let mut session = session().await;
            expect_title(&session, "Browse Sites").await.unwrap();
            let err = expect_title(&session, "Home").await.unwrap_err();
            assert!(err.to_string().contains("expected title 'Home'"));
            session.release().await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_url_contains_ignores_case() {
            let mut session = session().await;
            expect_url_contains(&session, "portfolio").await.unwrap();
            assert!(expect_url_contains(&session, "tutorials").await.is_err());
            session.release().await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_count_at_least() {
            let mut session = session().await;
            assert_eq!(expect_count_at_least(&session, &Locator::css("li a"), 1).await.unwrap(), 2);
            let err = expect_count_at_least(&session, &Locator::css("li a"), 3)
                .await
                .unwrap_err();
            assert!(matches!(err, WebcheckError::AssertionFailed { .. }));
            session.release().await.unwrap();
        }
    }

    mod element_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_visible() {
            let mut session = session().await;
            {
                let heading = find(&session, "h1").await;
                expect_visible(&heading, "heading").await.unwrap();
                let ghost = find(&session, ".ghost").await;
                let err = expect_visible(&ghost, "ghost").await.unwrap_err();
                assert!(err.to_string().contains("ghost is not displayed"));
            }
            session.release().await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_text_keywords() {
            let mut session = session().await;
            {
                let heading = find(&session, "h1").await;
                expect_text_contains_any(&heading, &["learn", "guide"]).await.unwrap();
                assert!(expect_text_contains_any(&heading, &["pricing"]).await.is_err());
                let empty = find(&session, ".empty").await;
                let err = expect_text_contains_any(&empty, &["x"]).await.unwrap_err();
                assert!(err.to_string().contains("has no text"));
            }
            session.release().await.unwrap();
        }
    }
}
