//! CLI configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use webcheck::SessionConfig;

use crate::error::{CliError, CliResult};

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Normal - warnings and errors only
    #[default]
    Normal,
    /// Verbose - session lifecycle
    Verbose,
    /// Debug - every driver call
    Debug,
}

impl Verbosity {
    /// Map a `-v` count
    #[must_use]
    pub const fn from_count(count: u8) -> Self {
        match count {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// `-v` count understood by [`webcheck::logging::init_logging`]
    #[must_use]
    pub const fn as_count(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Verbose => 1,
            Self::Debug => 2,
        }
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }
}

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// YAML session configuration file
    pub config_file: Option<PathBuf>,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set the session configuration file
    #[must_use]
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Effective session configuration: file (or defaults), then environment.
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or invalid, or an environment
    /// override has a bad value
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        self.session_config_with(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::session_config`] with an explicit variable lookup
    ///
    /// # Errors
    ///
    /// See [`Self::session_config`]
    pub fn session_config_with<F>(&self, lookup: F) -> CliResult<SessionConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &self.config_file {
            Some(path) => load_file(path)?,
            None => SessionConfig::default(),
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }
}

fn load_file(path: &Path) -> CliResult<SessionConfig> {
    if !path.exists() {
        return Err(CliError::config(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    Ok(SessionConfig::from_yaml_file(path)?)
}
