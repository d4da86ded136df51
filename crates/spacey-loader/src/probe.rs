// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Availability prober: cheap existence checks with retry and backoff.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::LoaderSettings;
use crate::error::Result;
use crate::telemetry::Telemetry;
use crate::transport::{Method, Transport};

/// Retry policy for one probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOptions {
    /// Retry credits; each retry consumes one
    pub retries: u32,
    /// Base delay, grown by 1.5x per attempt
    pub backoff: Duration,
    /// Retry a 403/405 `HEAD` as a `GET`
    pub allow_get_fallback: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff: Duration::from_millis(300),
            allow_get_fallback: true,
        }
    }
}

impl ProbeOptions {
    pub fn from_settings(settings: &LoaderSettings) -> Self {
        Self {
            retries: settings.probe_retries,
            backoff: settings.probe_backoff(),
            allow_get_fallback: settings.allow_get_fallback,
        }
    }

    /// Delay before retry number `attempt` (zero-based)
    pub fn delay_for(&self, attempt: i32) -> Duration {
        let millis = self.backoff.as_millis() as f64 * 1.5_f64.powi(attempt);
        Duration::from_millis(millis as u64)
    }
}

/// Outcome of a probe. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub reachable: bool,
    /// Status that produced the outcome; `None` when no response arrived
    pub status: Option<u16>,
}

/// Whether a status is transient: no status, 5xx, or 429.
pub fn is_retryable_status(status: Option<u16>) -> bool {
    match status {
        None | Some(0) => true,
        Some(s) => s >= 500 || s == 429,
    }
}

/// Checks whether URLs are reachable.
#[derive(Clone)]
pub struct AvailabilityProber {
    transport: Arc<dyn Transport>,
    telemetry: Telemetry,
    options: ProbeOptions,
}

impl AvailabilityProber {
    /// Create a prober with default options
    pub fn new(transport: Arc<dyn Transport>, telemetry: Telemetry) -> Self {
        Self {
            transport,
            telemetry,
            options: ProbeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ProbeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    /// Probe `url` with the configured options.
    pub async fn probe(&self, url: &str) -> ProbeResult {
        self.probe_with(url, &self.options).await
    }

    /// Probe `url`, returning only reachability
    pub async fn is_reachable(&self, url: &str) -> bool {
        self.probe(url).await.reachable
    }

    /// Probe `url` with explicit options.
    ///
    /// Terminates after at most `retries + 1` attempts.
    #[instrument(skip(self, options))]
    pub async fn probe_with(&self, url: &str, options: &ProbeOptions) -> ProbeResult {
        let mut retries = options.retries;
        let mut attempt = 0;

        loop {
            match self.check(url, options).await {
                Ok(status) if (200..300).contains(&status) => {
                    debug!("probe ok: {} ({})", url, status);
                    return ProbeResult {
                        reachable: true,
                        status: Some(status),
                    };
                }
                Ok(status) => {
                    if retries > 0 && is_retryable_status(Some(status)) {
                        retries -= 1;
                        tokio::time::sleep(options.delay_for(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    self.telemetry
                        .info("probe:fail", json!({ "url": url, "status": status }));
                    return ProbeResult {
                        reachable: false,
                        status: Some(status),
                    };
                }
                Err(e) => {
                    if retries > 0 {
                        retries -= 1;
                        tokio::time::sleep(options.delay_for(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    self.telemetry
                        .info("probe:fail", json!({ "url": url, "error": e.to_string() }));
                    return ProbeResult {
                        reachable: false,
                        status: None,
                    };
                }
            }
        }
    }

    /// One attempt: `HEAD`, then `GET` if the method itself was refused.
    async fn check(&self, url: &str, options: &ProbeOptions) -> Result<u16> {
        let head = self.transport.request(Method::Head, url).await?;
        if head.is_success() {
            return Ok(head.status);
        }
        if options.allow_get_fallback && (head.status == 405 || head.status == 403) {
            let get = self.transport.request(Method::Get, url).await?;
            return Ok(get.status);
        }
        Ok(head.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::RecordingSink;
    use crate::testing::{FakeTransport, Reply};
    use tokio::time::Instant;

    const URL: &str = "https://cdn.example.com/pkg";

    fn prober(transport: Arc<FakeTransport>) -> AvailabilityProber {
        AvailabilityProber::new(transport, Telemetry::default())
    }

    #[tokio::test]
    async fn test_head_success() {
        let transport = Arc::new(FakeTransport::new().route(URL, 200, ""));
        let result = prober(transport.clone()).probe(URL).await;

        assert!(result.reachable);
        assert_eq!(result.status, Some(200));
        assert_eq!(transport.calls(), vec![(Method::Head, URL.to_string())]);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let transport = Arc::new(FakeTransport::new());
        let result = prober(transport.clone()).probe(URL).await;

        assert!(!result.reachable);
        assert_eq!(result.status, Some(404));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_get_fallback_on_405() {
        let transport = Arc::new(
            FakeTransport::new()
                .replies(Method::Head, URL, vec![Reply::Status(405, "")])
                .replies(Method::Get, URL, vec![Reply::Status(200, "ok")]),
        );
        let result = prober(transport.clone()).probe(URL).await;

        assert!(result.reachable);
        assert_eq!(transport.count(Method::Get, URL), 1);
    }

    #[tokio::test]
    async fn test_get_fallback_disabled() {
        let transport = Arc::new(
            FakeTransport::new()
                .replies(Method::Head, URL, vec![Reply::Status(403, "")])
                .replies(Method::Get, URL, vec![Reply::Status(200, "ok")]),
        );
        let options = ProbeOptions {
            allow_get_fallback: false,
            ..Default::default()
        };
        let result = prober(transport.clone()).probe_with(URL, &options).await;

        assert!(!result.reachable);
        assert_eq!(result.status, Some(403));
        assert_eq!(transport.count(Method::Get, URL), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_server_error_with_backoff() {
        let transport = Arc::new(FakeTransport::new().replies(
            Method::Head,
            URL,
            vec![Reply::Status(503, ""), Reply::Status(200, "")],
        ));
        let start = Instant::now();
        let result = prober(transport.clone()).probe(URL).await;

        assert!(result.reachable);
        assert_eq!(transport.count(Method::Head, URL), 2);
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_bounds_attempts() {
        let transport = Arc::new(FakeTransport::new().replies(
            Method::Head,
            URL,
            vec![Reply::Status(429, "")],
        ));
        let start = Instant::now();
        let result = prober(transport.clone()).probe(URL).await;

        assert!(!result.reachable);
        assert_eq!(result.status, Some(429));
        assert_eq!(transport.count(Method::Head, URL), 3);
        // 300ms + 450ms
        assert!(start.elapsed() >= Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_retried_then_reported() {
        let sink = Arc::new(RecordingSink::new());
        let telemetry = Telemetry::new(sink.clone());
        telemetry.set_enabled(true);
        let transport = Arc::new(FakeTransport::new().replies(
            Method::Head,
            URL,
            vec![Reply::NetworkError],
        ));
        let result = AvailabilityProber::new(transport.clone(), telemetry)
            .with_options(ProbeOptions {
                retries: 1,
                ..Default::default()
            })
            .probe(URL)
            .await;

        assert_eq!(result, ProbeResult { reachable: false, status: None });
        assert_eq!(transport.count(Method::Head, URL), 2);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "probe:fail");
        assert!(events[0].detail["error"].is_string());
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(None));
        assert!(is_retryable_status(Some(0)));
        assert!(is_retryable_status(Some(500)));
        assert!(is_retryable_status(Some(429)));
        assert!(!is_retryable_status(Some(404)));
        assert!(!is_retryable_status(Some(403)));
    }

    #[test]
    fn test_delay_growth() {
        let options = ProbeOptions::default();
        assert_eq!(options.delay_for(0), Duration::from_millis(300));
        assert_eq!(options.delay_for(1), Duration::from_millis(450));
    }
}
