//! Transport client: one outbound request per call, no retries.
//!
//! The [`Transport`] trait is the seam between the fetch state machine and
//! the network. [`HttpTransport`] implements it over a single shared
//! `reqwest::Client`, so every fetch in a batch reuses the same connection
//! pool.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use indicatif::ProgressBar;
use reqwest::Client;
use reqwest::header::HeaderMap;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::progress::ProgressDisplay;
use crate::input::Identifier;
use crate::user_agent;

/// A URL template bound to one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    identifier: Identifier,
    url: String,
}

impl FetchRequest {
    /// Creates a request for `identifier` at `url`.
    #[must_use]
    pub fn new(identifier: Identifier, url: impl Into<String>) -> Self {
        Self {
            identifier,
            url: url.into(),
        }
    }

    /// The identifier this request fetches.
    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// The fully bound URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Status, headers and fully buffered body of one response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers (lookups are case-insensitive).
    pub headers: HeaderMap,
    /// Response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Creates a response with the given status and body and no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Single-shot request executor.
///
/// Implementations must be shareable across tasks; the engine holds one
/// behind an `Arc` for the whole batch.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues `request` once.
    ///
    /// Any HTTP status is a successful transport result; only connection,
    /// timeout and body-read failures are errors.
    async fn fetch(&self, request: &FetchRequest) -> Result<TransportResponse, DownloadError>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
///
/// # Example
///
/// ```no_run
/// use beatmap_fetch::download::{FetchRequest, HttpTransport, Transport};
/// use beatmap_fetch::Identifier;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = HttpTransport::new();
/// let request = FetchRequest::new(Identifier::from(1), "https://api.nerinyan.moe/d/1");
/// let response = transport.fetch(&request).await?;
/// println!("status {}", response.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    progress: Option<ProgressDisplay>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    /// Creates a transport with default timeouts and User-Agent.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::builder()
            .build()
            .expect("failed to build HTTP client with static configuration")
    }

    /// Starts a builder for custom timeouts or User-Agent.
    #[must_use]
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Whether body reads report byte progress.
    #[must_use]
    pub fn shows_progress(&self) -> bool {
        self.progress.is_some()
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    connect_timeout: Duration,
    read_timeout: Duration,
    user_agent: Option<String>,
    progress: Option<ProgressDisplay>,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            user_agent: None,
            progress: None,
        }
    }
}

impl HttpTransportBuilder {
    /// Sets the TCP/TLS connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the whole-request timeout (headers and body).
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Overrides the User-Agent header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Reports per-download byte progress on `display`.
    #[must_use]
    pub fn progress(mut self, display: ProgressDisplay) -> Self {
        self.progress = Some(display);
        self
    }

    /// Builds the transport.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if reqwest rejects the configuration.
    #[instrument(level = "debug", skip(self), fields(
        connect_secs = self.connect_timeout.as_secs(),
        read_secs = self.read_timeout.as_secs(),
    ))]
    pub fn build(self) -> Result<HttpTransport, DownloadError> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(user_agent::default_user_agent);
        let client = Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.read_timeout)
            .gzip(true)
            .user_agent(user_agent)
            .build()
            .map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(HttpTransport {
            client,
            progress: self.progress,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(id = %request.identifier(), url = %request.url()))]
    async fn fetch(&self, request: &FetchRequest) -> Result<TransportResponse, DownloadError> {
        let url = request.url();
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        debug!(status, "response headers received");

        let capacity = response
            .content_length()
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or(0);
        let bar = self
            .progress
            .as_ref()
            .map(|display| display.start(request.identifier(), response.content_length()));

        let body = read_body(response.bytes_stream(), capacity, url, bar.as_ref()).await;
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        let body = body?;
        debug!(status, bytes = body.len(), "response body buffered");

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Drains the body stream into memory, advancing `bar` per chunk.
async fn read_body<S, B>(
    stream: S,
    capacity: usize,
    url: &str,
    bar: Option<&ProgressBar>,
) -> Result<Vec<u8>, DownloadError>
where
    S: Stream<Item = Result<B, reqwest::Error>>,
    B: AsRef<[u8]>,
{
    let mut stream = std::pin::pin!(stream);
    let mut body = Vec::with_capacity(capacity);

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::from_reqwest(url, e))?;
        let chunk = chunk.as_ref();
        body.extend_from_slice(chunk);
        if let Some(bar) = bar {
            bar.inc(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
        }
    }

    Ok(body)
}
