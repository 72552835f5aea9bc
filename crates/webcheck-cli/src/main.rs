//! Webcheck CLI: triage selectors against a live page
//!
//! ## Usage
//!
//! ```bash
//! webcheck wait ".website-Gallery"                 # Wait on the base URL
//! webcheck wait username -s name --path /signin    # Other strategies and pages
//! webcheck scan h1 ".page-title" "main h1" --json  # First candidate with text
//! webcheck config                                  # Effective configuration
//! ```

use std::process::ExitCode;

use clap::Parser;
use webcheck_cli::{execute, Cli, CliResult};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    webcheck::logging::init_logging(cli.cli_config().verbosity.as_count());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(execute(&cli))?;
    println!("{output}");
    Ok(())
}
