//! Webcheck CLI library
//!
//! Command-line front end for triaging selectors against a live page without
//! writing a test.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]

mod cli;
mod commands;
mod config;
mod error;

pub use cli::{Cli, Commands, ConfigArgs, ScanArgs, StrategyArg, WaitArgs};
pub use commands::{execute, render_config, scan_candidates, wait, ElementReport};
pub use config::{CliConfig, Verbosity};
pub use error::{CliError, CliResult};
