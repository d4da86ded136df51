// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Script loading on top of the host's injector

use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::{LoaderError, Result};
use crate::host::ScriptInjector;
use crate::telemetry::Telemetry;

/// Loads remote scripts and modules, reporting each outcome.
#[derive(Clone)]
pub struct ScriptLoader {
    injector: Arc<dyn ScriptInjector>,
    telemetry: Telemetry,
}

impl ScriptLoader {
    pub fn new(injector: Arc<dyn ScriptInjector>, telemetry: Telemetry) -> Self {
        Self { injector, telemetry }
    }

    /// Inject a classic script; resolves once it executed.
    ///
    /// Whether it published anything is the caller's concern.
    pub async fn load(&self, url: &str) -> Result<()> {
        match self.injector.inject(url).await {
            Ok(()) => {
                self.telemetry.info("loadScript:success", json!({ "url": url }));
                Ok(())
            }
            Err(e) => {
                self.telemetry
                    .info("loadScript:error", json!({ "url": url, "error": e.to_string() }));
                Err(LoaderError::ScriptLoad { url: url.to_string() })
            }
        }
    }

    /// Import an ECMAScript module and return its exports.
    pub async fn import(&self, url: &str) -> Result<Value> {
        match self.injector.import_module(url).await {
            Ok(exports) => {
                self.telemetry.info("loadScript:success", json!({ "url": url, "format": "esm" }));
                Ok(exports)
            }
            Err(e) => {
                self.telemetry.info(
                    "loadScript:error",
                    json!({ "url": url, "format": "esm", "error": e.to_string() }),
                );
                Err(LoaderError::ScriptLoad { url: url.to_string() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::GlobalScope;
    use crate::telemetry::RecordingSink;
    use crate::testing::FakeScriptHost;

    #[tokio::test]
    async fn test_load_success_and_failure() {
        let host = FakeScriptHost::new();
        host.script("https://cdn/a.js", "A", json!({"ok": true}));
        let sink = Arc::new(RecordingSink::new());
        let telemetry = Telemetry::new(sink.clone());
        telemetry.set_enabled(true);
        let loader = ScriptLoader::new(host.clone(), telemetry);

        loader.load("https://cdn/a.js").await.unwrap();
        assert_eq!(host.get("A"), Some(json!({"ok": true})));

        let err = loader.load("https://cdn/missing.js").await.unwrap_err();
        assert!(matches!(err, LoaderError::ScriptLoad { ref url } if url == "https://cdn/missing.js"));
        assert_eq!(err.to_string(), "Failed to load https://cdn/missing.js");
        assert_eq!(sink.names(), vec!["loadScript:success", "loadScript:error"]);
    }

    #[tokio::test]
    async fn test_import_returns_exports() {
        let host = FakeScriptHost::new();
        host.esm("https://cdn/m.mjs", json!({"default": 1, "named": 2}));
        let loader = ScriptLoader::new(host, Telemetry::default());

        let exports = loader.import("https://cdn/m.mjs").await.unwrap();
        assert_eq!(exports["named"], 2);
        assert!(loader.import("https://cdn/nope.mjs").await.is_err());
    }
}
