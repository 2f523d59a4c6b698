//! Batch fetch configuration.
//!
//! [`FetchConfig`] replaces process-wide constants (retry count and delay,
//! URL template, concurrency limit) with one value handed to the
//! [`DownloadEngine`](crate::download::DownloadEngine) at construction, so
//! tests and concurrent batches can each carry their own settings.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::download::{FetchRequest, FilenamePolicy, RetryPolicy};
use crate::input::Identifier;

/// Placeholder substituted with the identifier in URL templates.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Default maximum number of concurrent fetch lifecycles.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default extension for fallback filenames.
pub const DEFAULT_EXTENSION: &str = "osz";

/// Errors raised while building a [`FetchConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The URL template lacks the `{id}` placeholder.
    #[error("URL template '{template}' must contain the {{id}} placeholder")]
    MissingPlaceholder {
        /// The rejected template.
        template: String,
    },

    /// The URL template does not produce an absolute http(s) URL.
    #[error("URL template '{template}' does not produce a valid http(s) URL")]
    InvalidUrl {
        /// The rejected template.
        template: String,
    },

    /// The fallback extension is empty.
    #[error("file extension must not be empty")]
    EmptyExtension,

    /// The mirror name is not one of the known presets.
    #[error("unknown mirror '{name}' (expected one of: {})", Mirror::names().join(", "))]
    UnknownMirror {
        /// The rejected name.
        name: String,
    },
}

/// Public beatmap mirrors with a known download URL layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mirror {
    /// `api.nerinyan.moe`
    #[default]
    Nerinyan,
    /// `beatconnect.io`
    Beatconnect,
    /// `osu.direct`
    OsuDirect,
    /// `catboy.best`
    Catboy,
    /// The official site (requires a logged-in session for most sets).
    OsuPpy,
}

impl Mirror {
    const ALL: [Self; 5] = [
        Self::Nerinyan,
        Self::Beatconnect,
        Self::OsuDirect,
        Self::Catboy,
        Self::OsuPpy,
    ];

    /// Stable lowercase name used on the command line and in config files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nerinyan => "nerinyan",
            Self::Beatconnect => "beatconnect",
            Self::OsuDirect => "osu-direct",
            Self::Catboy => "catboy",
            Self::OsuPpy => "osu-ppy",
        }
    }

    /// URL template for this mirror.
    #[must_use]
    pub fn template(self) -> &'static str {
        match self {
            Self::Nerinyan => "https://api.nerinyan.moe/d/{id}",
            Self::Beatconnect => "https://beatconnect.io/b/{id}",
            Self::OsuDirect => "https://osu.direct/api/d/{id}",
            Self::Catboy => "https://catboy.best/d/{id}",
            Self::OsuPpy => "https://osu.ppy.sh/beatmapsets/{id}/download",
        }
    }

    /// All preset names.
    #[must_use]
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|m| m.as_str()).collect()
    }

    /// Returns the validated template for this mirror.
    #[must_use]
    pub fn url_template(self) -> UrlTemplate {
        UrlTemplate(self.template().to_string())
    }
}

impl fmt::Display for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mirror {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownMirror { name: s.to_string() })
    }
}

/// URL template with a single `{id}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    /// Validates and wraps a template.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingPlaceholder`] if `{id}` is absent and
    /// [`ConfigError::InvalidUrl`] if binding a sample id does not yield an
    /// absolute http or https URL.
    pub fn new(template: impl Into<String>) -> Result<Self, ConfigError> {
        let template = template.into();
        if !template.contains(ID_PLACEHOLDER) {
            return Err(ConfigError::MissingPlaceholder { template });
        }
        let sample = template.replace(ID_PLACEHOLDER, "1");
        match Url::parse(&sample) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
                Ok(Self(template))
            }
            _ => Err(ConfigError::InvalidUrl { template }),
        }
    }

    /// Returns the raw template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Binds an identifier, percent-encoding it so it stays one path segment.
    #[must_use]
    pub fn bind(&self, identifier: &Identifier) -> FetchRequest {
        let encoded = urlencoding::encode(identifier.as_str());
        FetchRequest::new(identifier.clone(), self.0.replace(ID_PLACEHOLDER, &encoded))
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Settings for one batch run.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    url_template: UrlTemplate,
    max_concurrent: usize,
    retry_policy: RetryPolicy,
    extension: String,
    filename_policy: FilenamePolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url_template: Mirror::default().url_template(),
            max_concurrent: DEFAULT_CONCURRENCY,
            retry_policy: RetryPolicy::default(),
            extension: DEFAULT_EXTENSION.to_string(),
            filename_policy: FilenamePolicy::default(),
        }
    }
}

impl FetchConfig {
    /// Creates a config for the given template with default settings otherwise.
    #[must_use]
    pub fn new(url_template: UrlTemplate) -> Self {
        Self {
            url_template,
            ..Self::default()
        }
    }

    /// Sets the concurrency limit (validated by the engine).
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Sets the fallback extension; a leading dot is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyExtension`] for an empty extension.
    pub fn with_extension(mut self, extension: &str) -> Result<Self, ConfigError> {
        let trimmed = extension.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyExtension);
        }
        self.extension = trimmed.to_string();
        Ok(self)
    }

    /// Sets how server-supplied filenames are treated.
    #[must_use]
    pub fn with_filename_policy(mut self, filename_policy: FilenamePolicy) -> Self {
        self.filename_policy = filename_policy;
        self
    }

    /// Returns the URL template.
    #[must_use]
    pub fn url_template(&self) -> &UrlTemplate {
        &self.url_template
    }

    /// Returns the concurrency limit.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the fallback extension (without dot).
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Returns the filename policy.
    #[must_use]
    pub fn filename_policy(&self) -> FilenamePolicy {
        self.filename_policy
    }
}
