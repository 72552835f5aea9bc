//! Smoke test against a real Chromium.
//!
//! Needs the `browser` feature, a Chromium install and network access:
//!
//! ```bash
//! cargo test -p webcheck --features browser -- --ignored
//! ```

#![cfg(feature = "browser")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use webcheck::{
    expect_url_contains, expect_visible, wait_for_within, ChromiumLauncher, Locator,
    SessionConfig, SessionManager,
};

#[tokio::test]
#[ignore = "requires chromium and network access"]
async fn home_page_renders_and_releases() {
    webcheck::logging::init_test_logging();
    let artifacts = tempfile::tempdir().unwrap();
    let mut config = SessionConfig::new()
        .with_headless(true)
        .with_no_sandbox()
        .with_artifacts_dir(artifacts.path());
    config.apply_env_overrides().unwrap();
    let manager = SessionManager::new(ChromiumLauncher::new(), config);

    manager
        .run_scoped("live_home_page", |session| {
            Box::pin(async move {
                let body = wait_for_within(session, &Locator::css("body"), Duration::from_secs(30)).await?;
                expect_visible(&body, "page body").await?;
                let base = session.config().base_url.clone();
                let host = base
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .trim_end_matches('/')
                    .to_string();
                expect_url_contains(session, &host).await
            })
        })
        .await
        .unwrap();
}
