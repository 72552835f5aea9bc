//! Command-line arguments

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use webcheck::Locator;

use crate::config::{CliConfig, Verbosity};
use crate::error::{CliError, CliResult};

/// Webcheck: triage selectors against a live page
#[derive(Parser, Debug)]
#[command(name = "webcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// YAML session configuration
    #[arg(short, long, global = true, env = "WEBCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// CLI configuration from the global flags
    #[must_use]
    pub fn cli_config(&self) -> CliConfig {
        let config = CliConfig::new().with_verbosity(Verbosity::from_count(self.verbose));
        match &self.config {
            Some(path) => config.with_config_file(path),
            None => config,
        }
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wait for one element to become visible and enabled
    Wait(WaitArgs),

    /// Return the first of several CSS selectors that shows text
    Scan(ScanArgs),

    /// Print the effective session configuration
    Config(ConfigArgs),
}

/// Locator strategy accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrategyArg {
    /// CSS selector
    #[default]
    Css,
    /// XPath expression
    Xpath,
    /// Element id
    Id,
    /// Name attribute
    Name,
    /// data-testid attribute
    TestId,
}

impl StrategyArg {
    /// Build a locator for `selector`
    #[must_use]
    pub fn locator(self, selector: &str) -> Locator {
        match self {
            Self::Css => Locator::css(selector),
            Self::Xpath => Locator::xpath(selector),
            Self::Id => Locator::id(selector),
            Self::Name => Locator::name(selector),
            Self::TestId => Locator::test_id(selector),
        }
    }
}

/// Arguments for the wait command
#[derive(Args, Debug, Clone)]
pub struct WaitArgs {
    /// Selector to wait for
    pub selector: String,

    /// How to interpret the selector
    #[arg(short, long, value_enum, default_value_t = StrategyArg::Css)]
    pub strategy: StrategyArg,

    /// Page to open, absolute or relative to the base URL
    #[arg(short, long)]
    pub path: Option<String>,

    /// Timeout in seconds (defaults to the configured wait)
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Name used for the session and failure screenshots
    #[arg(long, default_value = "webcheck_cli")]
    pub test_name: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl WaitArgs {
    /// Locator built from the selector and strategy
    ///
    /// # Errors
    ///
    /// Returns error if the selector is blank
    pub fn locator(&self) -> CliResult<Locator> {
        if self.selector.trim().is_empty() {
            return Err(CliError::invalid_argument("selector must not be empty"));
        }
        Ok(self.strategy.locator(&self.selector))
    }

    /// Explicit timeout, if one was given
    ///
    /// # Errors
    ///
    /// Returns error if the value is negative or not finite
    pub fn timeout(&self) -> CliResult<Option<Duration>> {
        self.timeout
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|_| {
                    CliError::invalid_argument(format!(
                        "--timeout must be a non-negative number of seconds, got {secs}"
                    ))
                })
            })
            .transpose()
    }
}

/// Arguments for the scan command
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// CSS selectors, tried in order
    #[arg(required = true)]
    pub selectors: Vec<String>,

    /// Page to open, absolute or relative to the base URL
    #[arg(short, long)]
    pub path: Option<String>,

    /// Name used for the session
    #[arg(long, default_value = "webcheck_cli")]
    pub test_name: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl ScanArgs {
    /// Candidate locators in the order given
    ///
    /// # Errors
    ///
    /// Returns error if any selector is blank
    pub fn locators(&self) -> CliResult<Vec<Locator>> {
        self.selectors
            .iter()
            .map(|selector| {
                if selector.trim().is_empty() {
                    Err(CliError::invalid_argument("selectors must not be empty"))
                } else {
                    Ok(Locator::css(selector.as_str()))
                }
            })
            .collect()
    }
}

/// Arguments for the config command
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Print as JSON instead of YAML
    #[arg(long)]
    pub json: bool,
}
