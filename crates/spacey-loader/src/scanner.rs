// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Source scanning for eager dependency preloading.
//!
//! Module bodies call the synchronous `require`, so everything they import
//! has to be in the registry before they run. The scanner finds those
//! specifiers with two textual patterns; it does not parse.

use futures::future::{join_all, try_join_all};
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;
use tracing::{Instrument, debug, warn};

use crate::config::{DynamicModuleRule, find_rule};
use crate::error::{LoaderError, Result};
use crate::require::Require;
use crate::telemetry::Telemetry;

/// `import x from "spec"`, `import { a } from 'spec'`, `import "spec"`
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+(?:[^'"]+from\s+)?["']([^"']+)["']"#).expect("import pattern is valid")
});

/// `require("spec")`
static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"require\(\s*["']([^"']+)["']\s*\)"#).expect("require pattern is valid")
});

/// Specifiers referenced by `source`, de-duplicated in first-seen order.
///
/// Declarative imports come before call-style requires.
pub fn collect_module_specifiers(source: &str) -> Vec<String> {
    let mut specs: Vec<String> = Vec::new();
    for re in [&*IMPORT_RE, &*REQUIRE_RE] {
        for cap in re.captures_iter(source) {
            if let Some(spec) = cap.get(1).map(|m| m.as_str()) {
                if !specs.iter().any(|s| s == spec) {
                    specs.push(spec.to_string());
                }
            }
        }
    }
    specs
}

/// The specifiers of `source` covered by a dynamic rule.
pub fn collect_dynamic_module_imports(source: &str, rules: &[DynamicModuleRule]) -> Vec<String> {
    if rules.is_empty() {
        return Vec::new();
    }
    collect_module_specifiers(source)
        .into_iter()
        .filter(|spec| find_rule(rules, spec).is_some())
        .collect()
}

/// Load every dependency of `source` concurrently.
///
/// Fails on the first rejection with the failing specifier and its cause.
/// The remaining loads are not awaited but keep running on their own tasks.
pub async fn preload_modules_from_source(source: &str, require: &Require, base_dir: Option<&str>) -> Result<()> {
    let specs = collect_module_specifiers(source);
    if specs.is_empty() {
        return Ok(());
    }
    debug!("preloading {} module(s)", specs.len());

    let loads = specs.into_iter().map(|spec| {
        let require = require.clone();
        let base_dir = base_dir.map(str::to_string);
        let label = spec.clone();
        let handle = tokio::spawn(
            async move {
                require
                    .require_async(&spec, base_dir.as_deref())
                    .await
                    .map_err(|e| LoaderError::preload(spec.as_str(), e))
            }
            .in_current_span(),
        );
        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(LoaderError::preload(label, LoaderError::Other(e.to_string()))),
            }
        }
    });
    try_join_all(loads).await?;
    Ok(())
}

/// Best-effort preload of the dynamic-rule imports of `source`.
///
/// Failures are logged and never propagated.
pub async fn preload_dynamic_modules_from_source(source: &str, require: &Require, telemetry: &Telemetry) {
    let specs = collect_dynamic_module_imports(source, require.rules());
    if specs.is_empty() {
        return;
    }

    let results = join_all(specs.iter().map(|spec| require.require_async(spec, None))).await;
    for (spec, result) in specs.iter().zip(results) {
        if let Err(e) = result {
            warn!("preload failed for {}: {}", spec, e);
            telemetry.warn(
                "dynamic-module:preload-failed",
                json!({ "name": spec, "error": e.to_string() }),
            );
        }
    }
}
