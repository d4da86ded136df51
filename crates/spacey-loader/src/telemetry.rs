// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Client telemetry: fire-and-forget event log gated by CI detection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// One client log event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEvent {
    pub event: String,
    pub detail: Value,
    pub level: Level,
    /// Milliseconds since the Unix epoch
    pub ts: u64,
    /// Page URL, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// Destination for client events. Implementations must not block or fail.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: &ClientEvent);
}

/// Writes events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit(&self, event: &ClientEvent) {
        match event.level {
            Level::Error => error!(event = %event.event, detail = %event.detail, "client event"),
            Level::Warn => warn!(event = %event.event, detail = %event.detail, "client event"),
            Level::Info => info!(event = %event.event, detail = %event.detail, "client event"),
            Level::Debug => debug!(event = %event.event, detail = %event.detail, "client event"),
        }
    }
}

/// Posts events as JSON to a client log endpoint without awaiting the response.
#[derive(Clone)]
pub struct BeaconSink {
    client: reqwest::Client,
    endpoint: String,
}

impl BeaconSink {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

impl TelemetrySink for BeaconSink {
    fn emit(&self, event: &ClientEvent) {
        TracingSink.emit(event);
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let request = self.client.post(&self.endpoint).json(event);
        handle.spawn(async move {
            // Delivery failures must never interfere with loading.
            if let Err(e) = request.send().await {
                debug!("client log delivery failed: {}", e);
            }
        });
    }
}

/// Keeps every event in memory; useful for embedding and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ClientEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events
    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().clone()
    }

    /// Names of recorded events, in order
    pub fn names(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.event.clone()).collect()
    }
}

impl TelemetrySink for RecordingSink {
    fn emit(&self, event: &ClientEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Gated client logger shared by every loader component.
#[derive(Clone)]
pub struct Telemetry {
    sink: Arc<dyn TelemetrySink>,
    enabled: Arc<AtomicBool>,
    href: Option<Arc<str>>,
}

impl Telemetry {
    /// Create a logger writing to `sink`. Verbose events start disabled.
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            sink,
            enabled: Arc::new(AtomicBool::new(false)),
            href: None,
        }
    }

    /// Logger that only writes through `tracing`
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    /// Attach the page URL to every event.
    pub fn with_href(mut self, href: impl AsRef<str>) -> Self {
        self.href = Some(Arc::from(href.as_ref()));
        self
    }

    /// Toggle verbose (below warn) events
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Record an event. Warn and error always pass the gate.
    pub fn log(&self, event: &str, detail: Value, level: Level) {
        if level < Level::Warn && !self.is_enabled() {
            return;
        }
        self.sink.emit(&ClientEvent {
            event: event.to_string(),
            detail,
            level,
            ts: now_ms(),
            href: self.href.as_deref().map(str::to_string),
        });
    }

    pub fn info(&self, event: &str, detail: Value) {
        self.log(event, detail, Level::Info);
    }

    pub fn warn(&self, event: &str, detail: Value) {
        self.log(event, detail, Level::Warn);
    }

    pub fn error(&self, event: &str, detail: Value) {
        self.log(event, detail, Level::Error);
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::tracing()
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("enabled", &self.is_enabled())
            .field("href", &self.href)
            .finish()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
