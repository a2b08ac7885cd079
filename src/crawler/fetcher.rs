//! Page fetching
//!
//! This module defines the [`Fetcher`] seam used by the coordinator and its
//! HTTP implementation:
//! - Building HTTP clients with the configured user agent and timeouts
//! - GET requests with status and Content-Type checks
//! - Link extraction from the returned document
//! - Error classification (transport, protocol, content)

use crate::config::{Config, HttpConfig, UserAgentConfig};
use crate::crawler::parser::extract_links;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Fetches one page and returns the absolute URLs it links to
///
/// Implementations must not block forever; the HTTP implementation relies on
/// the configured request timeout.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<String>, FetchError>;
}

/// Why a single page could not be fetched
///
/// None of these abort a crawl; the page simply contributes no links.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failure, timeout or an unusable request URL
    #[error("getting {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    /// The server answered with a non-success status
    #[error("getting {url}: {status}")]
    Status { url: String, status: StatusCode },

    /// The body could not be read or is not an HTML document
    #[error("parsing {url} as HTML: {message}")]
    Content { url: String, message: String },
}

/// Coarse failure category, used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FetchErrorKind {
    Transport,
    Protocol,
    Content,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Content => "content",
        };
        f.write_str(name)
    }
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Transport { .. } => FetchErrorKind::Transport,
            Self::Status { .. } => FetchErrorKind::Protocol,
            Self::Content { .. } => FetchErrorKind::Content,
        }
    }

    /// Whether trying the same URL again could plausibly succeed
    ///
    /// | Condition | Transient |
    /// |-----------|-----------|
    /// | Timeout / connection refused | yes |
    /// | HTTP 5xx, HTTP 429 | yes |
    /// | Other HTTP errors | no |
    /// | Invalid URL, body or content errors | no |
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            Self::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Content { .. } => false,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use ripple_crawl::config::{HttpConfig, UserAgentConfig};
/// use ripple_crawl::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    http: &HttpConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(http.timeout_secs))
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by reqwest and the HTML link parser
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    accept_any_content_type: bool,
}

impl HttpFetcher {
    /// Creates a fetcher with a client built from the configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent, &config.http)?;
        Ok(Self::with_client(client, config.http.accept_any_content_type))
    }

    pub fn with_client(client: Client, accept_any_content_type: bool) -> Self {
        Self {
            client,
            accept_any_content_type,
        }
    }

    fn check_content_type(&self, url: &str, content_type: Option<&str>) -> Result<(), FetchError> {
        match content_type {
            Some(value) if !self.accept_any_content_type && !is_html(value) => {
                Err(FetchError::Content {
                    url: url.to_string(),
                    message: format!("unexpected Content-Type {}", value),
                })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<String>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.check_content_type(url, content_type.as_deref())?;

        // Relative links resolve against where we ended up after redirects
        let base_url: Url = response.url().clone();

        let body = response.text().await.map_err(|e| FetchError::Content {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let links = extract_links(&body, &base_url);
        tracing::debug!("Found {} links on {}", links.len(), base_url);
        Ok(links)
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}
