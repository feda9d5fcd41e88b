//! Configuration file support for the demo.
//!
//! Settings are layered: defaults < config file < command-line arguments.
//! Unknown fields are ignored, so older builds keep reading newer files.

use etcetera::BaseStrategy;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use verdict_core::{FatalAction, FatalPolicy, OutputOptions, RegistryConfig};

use crate::args::CommandLineArgs;
use crate::error::DemoError;
use crate::productinfo;

/// Root configuration structure.
///
/// All fields are optional to support partial configuration.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where results go and how they look.
    pub report: ReportConfig,

    /// What happens once a required test fails.
    pub fatal: FatalConfig,
}

/// Output destinations and options.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Name of the test run.
    pub name: Option<String>,
    /// Partial path for text files.
    pub text: Option<PathBuf>,
    /// Partial path for HTML files.
    pub html: Option<PathBuf>,
    /// Partial path for XML files.
    pub xml: Option<PathBuf>,
    /// Partial path for JUnit XML files.
    pub junit: Option<PathBuf>,
    /// Output option letters, as accepted by `-o`.
    pub options: Option<String>,
}

/// Fatal path settings.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default)]
pub struct FatalConfig {
    /// Flush the summary before exiting.
    #[serde(rename = "flush-summary")]
    pub flush_summary: Option<bool>,

    /// Process exit code after a required test fails.
    #[serde(rename = "exit-code")]
    pub exit_code: Option<i32>,
}

impl Config {
    /// Builds the registry configuration, merging in command-line arguments.
    pub fn to_registry_config(&self, args: &CommandLineArgs) -> Result<RegistryConfig, DemoError> {
        let name = args
            .name
            .as_deref()
            .or(self.report.name.as_deref())
            .unwrap_or(productinfo::DEFAULT_RUN_NAME);

        let options = match args
            .output_options
            .as_deref()
            .or(self.report.options.as_deref())
        {
            Some(letters) => {
                OutputOptions::from_str(letters).map_err(|source| DemoError::OutputOptions {
                    letters: letters.to_owned(),
                    source,
                })?
            }
            None => OutputOptions::NOTHING,
        };

        let defaults = FatalPolicy::default();
        let fatal = FatalPolicy {
            flush_summary: self.fatal.flush_summary.unwrap_or(defaults.flush_summary),
            action: self
                .fatal
                .exit_code
                .map_or(defaults.action, FatalAction::Exit),
        };

        let mut config = RegistryConfig::new(name)
            .with_options(options)
            .with_fatal_policy(fatal)
            .with_summary_on_drop(!args.keep_alive);

        if let Some(path) = pick(args.text_file.as_ref(), self.report.text.as_ref()) {
            config = config.with_text_file(path);
        }
        if let Some(path) = pick(args.html_file.as_ref(), self.report.html.as_ref()) {
            config = config.with_html_file(path);
        }
        if let Some(path) = pick(args.xml_file.as_ref(), self.report.xml.as_ref()) {
            config = config.with_xml_file(path);
        }
        if let Some(path) = pick(args.junit_file.as_ref(), self.report.junit.as_ref()) {
            config = config.with_junit_file(path);
        }

        if !config.has_any_output() {
            return Err(DemoError::NoOutput);
        }

        Ok(config)
    }
}

/// Priority: CLI (if provided) > config file.
fn pick<'a>(cli_value: Option<&'a PathBuf>, config_value: Option<&'a PathBuf>) -> Option<&'a PathBuf> {
    cli_value.or(config_value)
}

/// Result of attempting to load a configuration file.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration, or default if loading failed.
    pub config: Config,

    /// The path that was used (or attempted) for loading.
    pub path: Option<PathBuf>,

    /// Any error that occurred during loading.
    pub error: Option<ConfigLoadError>,

    /// Whether the path was explicitly provided by the user (via `--config`).
    /// If true and there's an error, the program should fail rather than continue.
    pub explicit_path: bool,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the TOML content.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Returns the default configuration file path for the current platform.
///
/// Returns `None` if the platform's config directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("verdict").join("config.toml"))
}

/// Loads configuration from the specified path.
pub fn load_from_path(path: &Path) -> ConfigLoadResult {
    let parsed = std::fs::read_to_string(path)
        .map_err(ConfigLoadError::from)
        .and_then(|content| toml::from_str(&content).map_err(ConfigLoadError::from));

    let (config, error) = match parsed {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    ConfigLoadResult {
        config,
        path: Some(path.to_path_buf()),
        error,
        explicit_path: false,
    }
}

/// Loads configuration, honoring `--no-config` and `--config`.
///
/// A missing file at the default path is not an error.
pub fn load_config(disabled: bool, explicit_path: Option<&Path>) -> ConfigLoadResult {
    let empty = |path| ConfigLoadResult {
        config: Config::default(),
        path,
        error: None,
        explicit_path: false,
    };

    if disabled {
        return empty(None);
    }

    let is_explicit = explicit_path.is_some();
    let path = match explicit_path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => return empty(None),
        },
    };

    if !is_explicit && !path.exists() {
        return empty(Some(path));
    }

    let mut result = load_from_path(&path);
    result.explicit_path = is_explicit;
    result
}
