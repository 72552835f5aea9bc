//! Subcommand implementations

use serde::Serialize;
use tracing::info;
use webcheck::{
    scan, wait_for, wait_for_within, Launcher, SessionConfig, SessionManager,
};

use crate::cli::{Cli, Commands, ConfigArgs, ScanArgs, WaitArgs};
use crate::error::{CliError, CliResult};

/// What a successful wait or scan found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementReport {
    /// Session name
    pub test_name: String,
    /// Locator that resolved
    pub locator: String,
    /// Zero-based candidate position (scan only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    /// Visible text of the element
    pub text: String,
    /// Page URL at the time the element resolved
    pub url: String,
}

impl ElementReport {
    /// Render as pretty JSON or human-readable lines
    ///
    /// # Errors
    ///
    /// Returns error if JSON serialization fails
    pub fn render(&self, json: bool) -> CliResult<String> {
        if json {
            return Ok(serde_json::to_string_pretty(self)?);
        }
        let mut out = format!("Found: {}\n", self.locator);
        if let Some(position) = self.position {
            out.push_str(&format!("Candidate: #{}\n", position + 1));
        }
        out.push_str(&format!("Text: {}\nURL: {}", self.text, self.url));
        Ok(out)
    }
}

/// Dispatch the parsed command line and return what to print on stdout
///
/// # Errors
///
/// Returns error if configuration fails to load or the command fails
pub async fn execute(cli: &Cli) -> CliResult<String> {
    let session_config = cli.cli_config().session_config()?;
    match &cli.command {
        Commands::Config(args) => render_config(&session_config, args),
        Commands::Wait(args) => {
            let manager = SessionManager::new(launcher()?, session_config);
            wait(&manager, args).await?.render(args.json)
        }
        Commands::Scan(args) => {
            let manager = SessionManager::new(launcher()?, session_config);
            scan_candidates(&manager, args).await?.render(args.json)
        }
    }
}

#[cfg(feature = "browser")]
fn launcher() -> CliResult<webcheck::ChromiumLauncher> {
    Ok(webcheck::ChromiumLauncher::new())
}

#[cfg(not(feature = "browser"))]
fn launcher() -> CliResult<webcheck::MockLauncher> {
    Err(CliError::BrowserUnavailable)
}

/// Open the page and wait for one element
///
/// # Errors
///
/// Returns error if the arguments are invalid, the session cannot be
/// acquired, or the wait fails
pub async fn wait<L: Launcher>(manager: &SessionManager<L>, args: &WaitArgs) -> CliResult<ElementReport> {
    let locator = args.locator()?;
    let timeout = args.timeout()?;
    let path = args.path.clone();
    info!(test = %args.test_name, %locator, "wait command");

    let report = manager
        .run_scoped(args.test_name.clone(), move |session| {
            Box::pin(async move {
                if let Some(path) = path.as_deref() {
                    session.navigate(path).await?;
                }
                let element = match timeout {
                    Some(timeout) => wait_for_within(session, &locator, timeout).await?,
                    None => wait_for(session, &locator).await?,
                };
                Ok(ElementReport {
                    test_name: session.test_name().to_string(),
                    locator: locator.to_string(),
                    position: None,
                    text: element.text().await?,
                    url: session.current_url().await?,
                })
            })
        })
        .await?;
    Ok(report)
}

/// Open the page and return the first candidate showing text
///
/// # Errors
///
/// Returns error if the arguments are invalid, the session cannot be
/// acquired, or no candidate qualifies
pub async fn scan_candidates<L: Launcher>(
    manager: &SessionManager<L>,
    args: &ScanArgs,
) -> CliResult<ElementReport> {
    let candidates = args.locators()?;
    let path = args.path.clone();
    info!(test = %args.test_name, candidates = candidates.len(), "scan command");

    let report = manager
        .run_scoped(args.test_name.clone(), move |session| {
            Box::pin(async move {
                if let Some(path) = path.as_deref() {
                    session.navigate(path).await?;
                }
                let element = scan(session, &candidates).await?;
                Ok(ElementReport {
                    test_name: session.test_name().to_string(),
                    locator: element.locator().to_string(),
                    position: candidates.iter().position(|c| c == element.locator()),
                    text: element.text().await?,
                    url: session.current_url().await?,
                })
            })
        })
        .await?;
    Ok(report)
}

/// Effective configuration as YAML (default) or JSON
///
/// # Errors
///
/// Returns error if serialization fails
pub fn render_config(config: &SessionConfig, args: &ConfigArgs) -> CliResult<String> {
    if args.json {
        return Ok(serde_json::to_string_pretty(config)?);
    }
    serde_yaml_ng::to_string(config).map_err(|e| CliError::config(e.to_string()))
}
