//! Fetch interface for enrichment steps.
//!
//! Steps never talk to HTTP directly: they go through [`Fetcher`], whose
//! failures are classified so a missing resource ([`EnrichError::NotFound`])
//! can be told apart from every other failure ([`EnrichError::Fetch`]).
//! [`HttpFetcher`] is the reqwest-backed implementation used by the CLI.

pub mod address;
mod sites;

use std::time::Duration;

use async_trait::async_trait;
use docenrich_shared::{EnrichError, HttpConfig, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};

pub use sites::SiteRegistry;

/// Default timeout in seconds for a single fetch.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Maximum number of redirects to follow per fetch.
const DEFAULT_MAX_REDIRECTS: usize = 5;

/// User-Agent string for enrichment requests.
const USER_AGENT: &str = concat!("docenrich/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Source of auxiliary data for enrichment steps.
///
/// Implementations must return [`EnrichError::NotFound`] for a 404-equivalent
/// and [`EnrichError::Fetch`] for anything else that goes wrong.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch and decode a JSON resource.
    async fn fetch_json(&self, url: &str) -> Result<Value>;

    /// Fetch a resource as text.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Fetch options
// ---------------------------------------------------------------------------

/// Configuration for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
    /// Redirect limit per request.
    pub max_redirects: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl From<&HttpConfig> for FetchOptions {
    fn from(config: &HttpConfig) -> Self {
        Self {
            timeout_secs: config.timeout_secs,
            max_redirects: config.max_redirects,
        }
    }
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

fn build_client(opts: &FetchOptions, user_agent: &str) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(opts.max_redirects))
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| EnrichError::config(format!("failed to build HTTP client: {e}")))
}

/// [`Fetcher`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with the given options.
    pub fn new(opts: &FetchOptions) -> Result<Self> {
        let client = build_client(opts, USER_AGENT)?;
        Ok(Self { client })
    }

    /// Issue a GET and classify the status.
    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EnrichError::fetch(url, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(url, "resource not found");
            return Err(EnrichError::not_found(url));
        }
        if !status.is_success() {
            return Err(EnrichError::fetch(url, format!("HTTP {status}")));
        }

        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        let response = self.get(url).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| EnrichError::fetch(url, format!("invalid JSON body: {e}")))
    }

    #[instrument(skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        response
            .text()
            .await
            .map_err(|e| EnrichError::fetch(url, format!("failed to read body: {e}")))
    }
}
