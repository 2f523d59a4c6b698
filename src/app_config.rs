//! Application configuration loading and CLI merging.
//!
//! Precedence: built-in defaults < config file < command-line flags.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use beatmap_fetch::{
    DEFAULT_CONCURRENCY, DEFAULT_EXTENSION, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY,
    FetchConfig, FilenamePolicy, Mirror, RetryPolicy, UrlTemplate,
};
use serde::Deserialize;

use crate::cli::Args;

/// TOML-backed file configuration. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Default output directory for downloads.
    pub output_dir: Option<PathBuf>,
    /// Default concurrency (same range as CLI).
    pub concurrency: Option<u8>,
    /// Attempts per id, first try included.
    pub max_retries: Option<u8>,
    /// Fixed delay between attempts, in seconds.
    pub retry_delay_secs: Option<u64>,
    /// Mirror preset name.
    pub mirror: Option<String>,
    /// Custom URL template; wins over `mirror`.
    pub url_template: Option<String>,
    /// Extension used for fallback filenames.
    pub extension: Option<String>,
    /// Keep server-suggested filenames verbatim.
    pub trust_server_filenames: Option<bool>,
    /// Skip ids already present in the output directory.
    pub skip_existing: Option<bool>,
    /// Show per-download progress bars.
    pub progress: Option<bool>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// User-Agent header override.
    pub user_agent: Option<String>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(1..=100).contains(&concurrency)
        {
            bail!("Invalid config value for `concurrency`: {concurrency}. Expected range: 1..=100");
        }

        if let Some(max_retries) = self.max_retries
            && !(1..=10).contains(&max_retries)
        {
            bail!("Invalid config value for `max_retries`: {max_retries}. Expected range: 1..=10");
        }

        if let Some(delay) = self.retry_delay_secs
            && delay > 3600
        {
            bail!("Invalid config value for `retry_delay_secs`: {delay}. Expected range: 0..=3600");
        }

        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;

        if let Some(mirror) = &self.mirror {
            mirror.parse::<Mirror>().with_context(|| {
                format!(
                    "Invalid config value for `mirror`. Expected one of: {}",
                    Mirror::names().join(", ")
                )
            })?;
        }

        if let Some(user_agent) = &self.user_agent
            && user_agent.trim().is_empty()
        {
            bail!("Invalid config value for `user_agent`: must not be empty");
        }

        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    if let Some(timeout) = value
        && !(1..=3600).contains(&timeout)
    {
        bail!("Invalid config value for `{field}`: {timeout}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/beatmap-fetch/config.toml`
/// 2. `$HOME/.config/beatmap-fetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("beatmap-fetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("beatmap-fetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the file config.
///
/// An explicit path must exist. The default path is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<(Option<PathBuf>, FileConfig)> {
    if let Some(path) = explicit {
        return Ok((Some(path.to_path_buf()), read_config_file(path)?));
    }

    match resolve_default_config_path() {
        Some(path) if path.exists() => {
            let config = read_config_file(&path)?;
            Ok((Some(path), config))
        }
        _ => Ok((None, FileConfig::default())),
    }
}

fn read_config_file(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

/// Fully resolved run settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Identifier list path.
    pub input: PathBuf,
    /// Destination directory.
    pub output_dir: PathBuf,
    /// Engine configuration.
    pub fetch: FetchConfig,
    /// Whether to skip ids already present.
    pub skip_existing: bool,
    /// Whether to draw progress bars.
    pub progress: bool,
    /// JSON report path.
    pub report: Option<PathBuf>,
    /// HTTP connect timeout override.
    pub connect_timeout: Option<Duration>,
    /// HTTP read timeout override.
    pub read_timeout: Option<Duration>,
    /// User-Agent override.
    pub user_agent: Option<String>,
}

impl Settings {
    /// Merges CLI flags over the file config over built-in defaults.
    pub fn resolve(args: &Args, file: FileConfig) -> Result<Self> {
        let url_template = match (&args.url_template, args.mirror) {
            (Some(template), _) => UrlTemplate::new(template.clone())?,
            (None, Some(mirror)) => mirror.url_template(),
            (None, None) => match (file.url_template, file.mirror) {
                (Some(template), _) => UrlTemplate::new(template)?,
                (None, Some(mirror)) => mirror.parse::<Mirror>()?.url_template(),
                (None, None) => Mirror::default().url_template(),
            },
        };

        let concurrency = args
            .concurrency
            .or(file.concurrency)
            .map_or(DEFAULT_CONCURRENCY, usize::from);
        let max_attempts = args
            .max_retries
            .or(file.max_retries)
            .map_or(DEFAULT_MAX_RETRIES, u32::from);
        let delay = args
            .retry_delay
            .or(file.retry_delay_secs)
            .map_or(DEFAULT_RETRY_DELAY, Duration::from_secs);
        let extension = args
            .extension
            .clone()
            .or(file.extension)
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
        let filename_policy =
            if args.trust_server_filenames || file.trust_server_filenames.unwrap_or(false) {
                FilenamePolicy::Verbatim
            } else {
                FilenamePolicy::Sanitize
            };

        let fetch = FetchConfig::new(url_template)
            .with_max_concurrent(concurrency)
            .with_retry_policy(RetryPolicy::new(max_attempts, delay))
            .with_extension(&extension)?
            .with_filename_policy(filename_policy);

        Ok(Self {
            input: args.input.clone(),
            output_dir: args
                .output_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            fetch,
            skip_existing: args.skip_existing || file.skip_existing.unwrap_or(false),
            progress: args.progress || file.progress.unwrap_or(false),
            report: args.report.clone(),
            connect_timeout: file.connect_timeout_secs.map(Duration::from_secs),
            read_timeout: file.read_timeout_secs.map(Duration::from_secs),
            user_agent: file.user_agent,
        })
    }
}
