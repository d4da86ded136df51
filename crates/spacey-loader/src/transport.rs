// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! HTTP transport used for probing and fetching sources.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{LoaderError, Result};

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Existence check, no body transfer
    Head,
    Get,
}

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Response body; empty for `HEAD`
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network capability. Every request bypasses caches.
///
/// An `Err` means no status was obtained (DNS, connect, TLS...); any HTTP
/// status, including 4xx/5xx, is an `Ok` response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, method: Method, url: &str) -> Result<HttpResponse>;

    /// GET `url` and return its body, failing on a non-2xx status.
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.request(Method::Get, url).await?;
        if !response.is_success() {
            return Err(LoaderError::Http {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response.body)
    }
}

/// `reqwest`-backed transport.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(20)
            .user_agent(format!("spacey-loader/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// The underlying client, shared with telemetry beacons
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self))]
    async fn request(&self, method: Method, url: &str) -> Result<HttpResponse> {
        let builder = match method {
            Method::Head => self.client.head(url),
            Method::Get => self.client.get(url),
        };

        let response = builder
            .header(CACHE_CONTROL, "no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let status = response.status().as_u16();
        debug!("{:?} {} -> {}", method, url, status);

        let body = match method {
            Method::Head => String::new(),
            Method::Get => response.text().await?,
        };

        Ok(HttpResponse { status, body })
    }
}
