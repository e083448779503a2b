//! Application configuration with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/<name>/<name>.toml`
//! 3. Explicit config file passed to `AppConfig::load`
//! 4. Environment variables: `<NAME>_*` prefix (e.g. `DEMO_RAISE_ERRORS=true`)
//!
//! Input and output streams are not part of the file format; they are set on
//! the `Application` builder.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{AppError, AppResult};

/// Recognized application options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Program name used in usage lines and config paths
    pub name: String,
    /// Whether `Application::launch` dispatches the process arguments
    pub autorun: bool,
    /// Generate first-letter short aliases for parameters when free
    pub auto_short_aliases: bool,
    /// Hand errors back to the caller instead of reporting and exiting
    pub raise_errors: bool,
    /// Make `help` the default command when none is declared
    pub help_as_default: bool,
    /// Do not register the built-in `help` command
    pub suppress_help: bool,
    /// Replaces the generated usage line of the help listing
    pub help_banner: Option<String>,
    /// Poll interval of the throbber animation
    pub throbber_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            autorun: true,
            auto_short_aliases: true,
            raise_errors: false,
            help_as_default: true,
            suppress_help: false,
            help_banner: None,
            throbber_interval_ms: 250,
        }
    }
}

/// Program name from argv[0], falling back to "app".
fn default_name() -> String {
    std::env::args_os()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "app".to_string())
}

/// Raw config for intermediate parsing (`None` = not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawConfig {
    pub autorun: Option<bool>,
    pub auto_short_aliases: Option<bool>,
    pub raise_errors: Option<bool>,
    pub help_as_default: Option<bool>,
    pub suppress_help: Option<bool>,
    pub help_banner: Option<String>,
    pub throbber_interval_ms: Option<u64>,
}

/// Get the path to the global config file of an application.
pub fn global_config_path(name: &str) -> Option<PathBuf> {
    ProjectDirs::from("", "", name).map(|dirs| dirs.config_dir().join(format!("{name}.toml")))
}

/// Environment variable prefix for an application name: `my-tool` -> `MY_TOOL`.
pub fn env_prefix(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn load_raw(path: &Path) -> AppResult<RawConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl AppConfig {
    /// Defaults with an explicit program name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn throbber_interval(&self) -> Duration {
        Duration::from_millis(self.throbber_interval_ms)
    }

    /// Overlay wins where it specifies a value.
    pub fn merge_with(&self, overlay: &RawConfig) -> Self {
        Self {
            name: self.name.clone(),
            autorun: overlay.autorun.unwrap_or(self.autorun),
            auto_short_aliases: overlay.auto_short_aliases.unwrap_or(self.auto_short_aliases),
            raise_errors: overlay.raise_errors.unwrap_or(self.raise_errors),
            help_as_default: overlay.help_as_default.unwrap_or(self.help_as_default),
            suppress_help: overlay.suppress_help.unwrap_or(self.suppress_help),
            help_banner: overlay
                .help_banner
                .clone()
                .or_else(|| self.help_banner.clone()),
            throbber_interval_ms: overlay
                .throbber_interval_ms
                .unwrap_or(self.throbber_interval_ms),
        }
    }

    /// Load configuration with layered precedence.
    ///
    /// # Arguments
    /// * `name` - Program name; selects the global config path and env prefix
    /// * `file` - Optional explicit config file; it must exist
    pub fn load(name: &str, file: Option<&Path>) -> AppResult<Self> {
        let mut current = Self::named(name);

        if let Some(global_path) = global_config_path(name) {
            if global_path.exists() {
                debug!("global config: {}", global_path.display());
                current = current.merge_with(&load_raw(&global_path)?);
            }
        }

        if let Some(path) = file {
            debug!("config file: {}", path.display());
            current = current.merge_with(&load_raw(path)?);
        }

        current.apply_env_overrides(&env_prefix(name))
    }

    /// Apply `<PREFIX>_*` environment variables as explicit overrides.
    fn apply_env_overrides(self, prefix: &str) -> AppResult<Self> {
        let config = Config::builder()
            .add_source(Environment::with_prefix(prefix))
            .build()
            .map_err(config_err)?;

        let raw = RawConfig {
            autorun: config.get_bool("autorun").ok(),
            auto_short_aliases: config.get_bool("auto_short_aliases").ok(),
            raise_errors: config.get_bool("raise_errors").ok(),
            help_as_default: config.get_bool("help_as_default").ok(),
            suppress_help: config.get_bool("suppress_help").ok(),
            help_banner: config.get_string("help_banner").ok(),
            throbber_interval_ms: config
                .get_int("throbber_interval_ms")
                .ok()
                .and_then(|ms| u64::try_from(ms).ok()),
        };
        Ok(self.merge_with(&raw))
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> AppResult<String> {
        toml::to_string_pretty(self).map_err(|e| AppError::Config {
            message: format!("serialize config: {e}"),
        })
    }
}

fn config_err(e: ConfigError) -> AppError {
    AppError::Config {
        message: e.to_string(),
    }
}
