// src/checker/http.rs
// =============================================================================
// This module checks if URLs are alive by making HTTP requests.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download)
// - Falls back to GET when a server refuses HEAD (405, 501)
// - Detects various failure modes (404, timeout, SSL errors, etc.)
// - Every request is bounded by a timeout chosen by the caller
//
// Rust concepts:
// - async/await: For concurrent network I/O
// - Traits: Fetcher lets tests and hosts swap the HTTP client out
// - Enums: To represent different link states
// =============================================================================

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Redirects followed before giving up.
const MAX_REDIRECTS: usize = 5;

// Represents the status of a link after checking
//
// #[derive(Serialize, Deserialize)] lets us convert to/from JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinkStatus {
    /// Link is working (2xx)
    Ok,
    /// Link ends up somewhere else (301, 302, etc.)
    Redirect { target: String },
    /// Link is broken (404, 410)
    Broken,
    /// Request timed out
    Timeout,
    /// SSL/TLS certificate error
    SslError,
    /// Too many redirects (redirect loop)
    TooManyRedirects,
    /// Could not resolve hostname
    DnsError,
    /// Other error (5xx, connection refused, ...)
    Error,
}

impl LinkStatus {
    /// Ok and Redirect count as alive
    pub fn is_ok(&self) -> bool {
        matches!(self, LinkStatus::Ok | LinkStatus::Redirect { .. })
    }
}

// Represents the result of checking a single link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCheckResult {
    /// The URL that was checked
    pub url: String,
    /// The status of the link
    #[serde(flatten)] // This merges the LinkStatus fields into LinkCheckResult
    pub status: LinkStatus,
    /// HTTP status code, when a response arrived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Optional message with more details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LinkCheckResult {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

/// Something that can tell whether a URL is alive.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Never blocks longer than `timeout`; failures are reported in the
    /// result, not as errors.
    async fn fetch(&self, url: &str, timeout: Duration) -> LinkCheckResult;
}

/// Fetcher backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        // One client for all requests (connection pooling). No client-wide
        // timeout: fetch() bounds each call by the caller's budget.
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("linkchecker/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn head_then_get(&self, url: &str) -> LinkCheckResult {
        // First, try a HEAD request (faster, no body download)
        let result = match self.client.head(url).send().await {
            Ok(response)
                if matches!(
                    response.status(),
                    StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
                ) =>
            {
                self.client.get(url).send().await
            }
            other => other,
        };

        match result {
            Ok(response) => analyze_response(url, response),
            Err(e) => categorize_error(url, e),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> LinkCheckResult {
        // HEAD and the GET fallback share one budget
        match tokio::time::timeout(timeout, self.head_then_get(url)).await {
            Ok(result) => result,
            Err(_) => LinkCheckResult {
                url: url.to_string(),
                status: LinkStatus::Timeout,
                code: None,
                message: Some("Request timed out".to_string()),
            },
        }
    }
}

// Analyzes an HTTP response to determine link status
//
// HTTP status codes:
// - 200-299: Success (a Redirect if we ended up on another URL)
// - 300-399: Redirect that was not followed
// - 404, 410: Broken
// - anything else: Error
fn analyze_response(url: &str, response: reqwest::Response) -> LinkCheckResult {
    let status_code = response.status();
    let code = Some(status_code.as_u16());
    let final_url = response.url().as_str();

    let (status, message) = if status_code.is_success() {
        if landed_elsewhere(url, final_url) {
            let target = final_url.to_string();
            let message = format!("HTTP {} after redirect to {}", status_code.as_u16(), target);
            (LinkStatus::Redirect { target }, message)
        } else {
            (LinkStatus::Ok, format!("HTTP {}", status_code.as_u16()))
        }
    } else if status_code.is_redirection() {
        // Try to get the Location header to show where it redirects to
        let target = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let message = format!("HTTP {} -> {}", status_code.as_u16(), target);
        (LinkStatus::Redirect { target }, message)
    } else if matches!(status_code, StatusCode::NOT_FOUND | StatusCode::GONE) {
        (LinkStatus::Broken, format!("HTTP {}", status_code.as_u16()))
    } else {
        (LinkStatus::Error, format!("HTTP {}", status_code.as_u16()))
    };

    LinkCheckResult {
        url: url.to_string(),
        status,
        code,
        message: Some(message),
    }
}

// reqwest normalizes URLs ("http://x" -> "http://x/"), so compare parsed forms
fn landed_elsewhere(requested: &str, final_url: &str) -> bool {
    match url::Url::parse(&requested.replace(' ', "%20")) {
        Ok(parsed) => parsed.as_str() != final_url,
        Err(_) => requested != final_url,
    }
}

// Categorizes different error types from reqwest
fn categorize_error(url: &str, error: reqwest::Error) -> LinkCheckResult {
    // Convert error to string once to avoid lifetime issues
    let error_string = error.to_string();

    let (status, message) = if error.is_timeout() {
        (LinkStatus::Timeout, "Request timed out".to_string())
    } else if error.is_redirect() {
        (LinkStatus::TooManyRedirects, "Too many redirects".to_string())
    } else if error.is_connect() {
        // Connection errors often mean DNS issues or host unreachable
        if error_string.contains("dns") {
            (LinkStatus::DnsError, "Could not resolve hostname".to_string())
        } else {
            (LinkStatus::Error, "Connection failed".to_string())
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        (LinkStatus::SslError, "SSL certificate error".to_string())
    } else {
        (LinkStatus::Error, error_string)
    };

    LinkCheckResult {
        url: url.to_string(),
        status,
        code: None,
        message: Some(message),
    }
}
