//! CLI configuration.
//!
//! # Priority (highest to lowest)
//!
//! 1. Command line flags
//! 2. Environment variables (`MILVUS_CLI_*`)
//! 3. Configuration file (`<home>/config.toml`)
//! 4. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{CliError, Result};
use crate::output::OutputFormat;

/// Environment variable overriding the CLI home directory.
pub const HOME_ENV: &str = "MILVUS_CLI_HOME";

/// Location of every file the CLI persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    home: PathBuf,
}

impl Paths {
    /// Uses `$MILVUS_CLI_HOME`, else `~/.milvus_cli`, else `./.milvus_cli`.
    #[must_use]
    pub fn from_env() -> Self {
        let home = std::env::var_os(HOME_ENV)
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".milvus_cli")))
            .unwrap_or_else(|| PathBuf::from(".milvus_cli"));
        Self { home }
    }

    /// Uses an explicit home directory.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Home directory.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// `config.toml`
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Line editor history.
    #[must_use]
    pub fn history_file(&self) -> PathBuf {
        self.home.join("history")
    }

    /// Saved connections.
    #[must_use]
    pub fn connections_file(&self) -> PathBuf {
        self.home.join("connections.json")
    }

    /// Creates the home directory if needed.
    pub fn ensure_home(&self) -> Result<()> {
        std::fs::create_dir_all(&self.home)?;
        Ok(())
    }
}

/// CLI settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Server used by `connect` when no URI is given.
    pub uri: String,
    /// Token used by `connect` when none is given.
    pub token: Option<String>,
    /// Database selected after connecting.
    pub db_name: String,
    /// Initial output format: table, json or csv.
    pub output: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Rows fetched per step by `query_iterator` and `search_iterator`.
    pub query_batch_size: u64,
    /// Ask before destructive commands.
    pub confirm_destructive: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            uri: "http://127.0.0.1:19530".to_string(),
            token: None,
            db_name: milvus_client::DEFAULT_DATABASE.to_string(),
            output: "table".to_string(),
            timeout_secs: 30,
            query_batch_size: 100,
            confirm_destructive: true,
        }
    }
}

impl CliConfig {
    /// Loads the configuration, degrading to defaults on any error.
    #[must_use]
    pub fn load(paths: &Paths) -> Self {
        match Self::load_from_path(paths.config_file()) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable configuration");
                Self::default()
            }
        }
    }

    /// Loads defaults, then `path` when it exists, then `MILVUS_CLI_*`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the file or an environment value
    /// cannot be parsed, or if a value fails validation.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("MILVUS_CLI_").ignore(&["home"]))
            .extract()
            .map_err(|e| CliError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if parsing or validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str))
            .extract()
            .map_err(|e| CliError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] naming the first invalid key.
    pub fn validate(&self) -> Result<()> {
        if self.uri.trim().is_empty() {
            return Err(CliError::Config("uri must not be empty".to_string()));
        }
        if OutputFormat::parse(&self.output).is_none() {
            return Err(CliError::Config(format!(
                "output must be one of table, json, csv; got '{}'",
                self.output
            )));
        }
        if self.timeout_secs == 0 {
            return Err(CliError::Config("timeout_secs must be positive".to_string()));
        }
        if self.query_batch_size == 0 || self.query_batch_size > 16_384 {
            return Err(CliError::Config(
                "query_batch_size must be between 1 and 16384".to_string(),
            ));
        }
        Ok(())
    }
}
