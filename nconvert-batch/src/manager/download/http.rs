//! Blocking HTTP transport built on `reqwest`.
//!
//! This module provides:
//! - [`ReqwestTransport`], the production [`HttpTransport`]
//! - [`ContentRange`] parsing for `206 Partial Content` responses

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE};

use crate::manager::config::DEFAULT_TIMEOUT;
use crate::manager::error::{ManagerError, ManagerResult};
use crate::manager::traits::{HttpTransport, TransportResponse};

/// Parsed `Content-Range` response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// First byte of the range, 0 for unsatisfied ranges (`bytes */N`).
    pub start: u64,
    /// Last byte of the range, inclusive.
    pub end: Option<u64>,
    /// Complete length of the resource, if the server knows it.
    pub total: Option<u64>,
}

impl ContentRange {
    /// Parse a header value such as `bytes 100-199/1000`, `bytes 0-9/*` or
    /// `bytes */1000`.
    pub fn parse(value: &str) -> Option<Self> {
        let spec = value.trim().strip_prefix("bytes")?.trim_start();
        let (range, total) = spec.split_once('/')?;

        let total = match total.trim() {
            "*" => None,
            t => Some(t.parse::<u64>().ok()?),
        };

        if range.trim() == "*" {
            return Some(Self {
                start: 0,
                end: None,
                total,
            });
        }

        let (start, end) = range.split_once('-')?;
        let start = start.trim().parse::<u64>().ok()?;
        let end = end.trim().parse::<u64>().ok()?;
        if end < start {
            return None;
        }

        Some(Self {
            start,
            end: Some(end),
            total,
        })
    }
}

/// Production transport using a blocking `reqwest` client.
///
/// The client timeout covers connecting and each read from the body.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    pub(crate) timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport with the default timeout.
    pub fn new() -> ManagerResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a transport with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> ManagerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("nconvert-batch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ManagerError::InvalidConfig(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, timeout })
    }

    fn map_send_error(&self, url: &str, e: reqwest::Error) -> ManagerError {
        if e.is_timeout() {
            ManagerError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            ManagerError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, range_start: Option<u64>) -> ManagerResult<TransportResponse> {
        let mut request = self.client.get(url);
        if let Some(start) = range_start {
            request = request.header(RANGE, format!("bytes={}-", start));
        }

        let response = request.send().map_err(|e| self.map_send_error(url, e))?;

        let headers = response.headers();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let content_range = headers
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(ContentRange::parse);

        Ok(TransportResponse {
            status: response.status().as_u16(),
            content_length,
            content_range,
            body: Box::new(response),
        })
    }
}
