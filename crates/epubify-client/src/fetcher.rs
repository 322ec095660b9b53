use std::net::IpAddr;
use std::time::Duration;

use epubify_core::config::{ConversionConfig, DEFAULT_FETCH_TIMEOUT};
use epubify_core::error::AppError;
use epubify_core::models::FetchedPage;
use epubify_core::traits::Fetcher;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response, redirect};
use url::Url;

/// Asks for HTML explicitly; some documentation hosts serve an XML/RSS
/// variant when the header is missing or ambiguous.
pub const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

pub const USER_AGENT: &str = concat!(
    "Epubify/",
    env!("CARGO_PKG_VERSION"),
    " (documentation to EPUB converter)"
);

pub const MAX_REDIRECTS: usize = 10;

/// HTTP fetcher using reqwest.
///
/// Every request carries HTML-preferring `Accept` headers and a descriptive
/// User-Agent. Hosts that resolve to private or reserved addresses are
/// refused unless [`allow_private_urls`](Self::allow_private_urls) is set,
/// because the server fetches whatever URL a client submits. Redirects are
/// followed by hand so every hop goes through the same check.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
    block_private: bool,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
            block_private: true,
        })
    }

    /// Build a fetcher from the shared conversion settings.
    pub fn from_config(config: &ConversionConfig) -> Result<Self, AppError> {
        let fetcher = Self::with_timeout(config.fetch_timeout)?;
        Ok(if config.allow_private_urls {
            fetcher.allow_private_urls()
        } else {
            fetcher
        })
    }

    /// Allow requests to loopback/private/reserved addresses (CLI use, tests).
    pub fn allow_private_urls(mut self) -> Self {
        self.block_private = false;
        self
    }

    async fn send(&self, target: Url) -> Result<Response, AppError> {
        self.client
            .get(target)
            .header(ACCEPT, HTML_ACCEPT)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| self.map_send_error(e))
    }

    /// GET `url`, following up to [`MAX_REDIRECTS`] redirects. Each hop is
    /// checked with [`check_target`] before it is requested.
    async fn get_following_redirects(&self, url: &str) -> Result<Response, AppError> {
        let mut target = check_target(url, self.block_private).await?;

        for _ in 0..=MAX_REDIRECTS {
            let response = self.send(target.clone()).await?;
            if !response.status().is_redirection() {
                return Ok(response);
            }
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let Some(location) = location else {
                return Ok(response);
            };

            let next = target.join(&location).map_err(|e| {
                AppError::HttpError(format!("Invalid redirect location '{location}' from {target}: {e}"))
            })?;
            tracing::debug!(from = %target, to = %next, status = response.status().as_u16(), "Following redirect");
            target = check_target(next.as_str(), self.block_private).await?;
        }

        Err(AppError::HttpError(format!(
            "Too many redirects (more than {MAX_REDIRECTS}) for {url}"
        )))
    }

    fn map_send_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {e}"))
        } else {
            AppError::HttpError(e.to_string())
        }
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, AppError> {
        let response = self.get_following_redirects(url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;

        tracing::debug!(%url, %final_url, ?content_type, bytes = body.len(), "Fetched page");

        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            content_type,
            body,
        })
    }
}

/// Parse the URL, allow only http(s), and optionally refuse hosts that
/// resolve to private or reserved addresses.
async fn check_target(url: &str, block_private: bool) -> Result<Url, AppError> {
    let parsed =
        Url::parse(url).map_err(|e| AppError::InvalidInput(format!("Invalid URL {url}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::InvalidInput(format!(
            "URL scheme '{}' is not allowed (only http/https)",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::InvalidInput(format!("URL has no host: {url}")))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();

    if !block_private {
        return Ok(parsed);
    }

    let addresses: Vec<IpAddr> = match host.parse::<IpAddr>() {
        Ok(ip) => vec![ip],
        Err(_) => {
            let port = parsed.port_or_known_default().unwrap_or(80);
            tokio::net::lookup_host((host.as_str(), port))
                .await
                .map_err(|e| {
                    AppError::NetworkError(format!("DNS resolution failed for {host}: {e}"))
                })?
                .map(|addr| addr.ip())
                .collect()
        }
    };

    if let Some(ip) = addresses.into_iter().find(|ip| is_reserved(*ip)) {
        return Err(AppError::InvalidInput(format!(
            "Refusing to fetch {host}: resolves to private/reserved address {ip}"
        )));
    }

    Ok(parsed)
}

fn is_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || (a == 100 && (b & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xFFC0) == 0xFE80
                || (first & 0xFE00) == 0xFC00
                || v6.to_ipv4_mapped().is_some_and(|v4| is_reserved(IpAddr::V4(v4)))
        }
    }
}
