// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Remote module resolution: pick the first reachable candidate URL.

use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::{DynamicModuleRule, ModuleDescriptor};
use crate::environment::PageContext;
use crate::error::{LoaderError, Result};
use crate::probe::AvailabilityProber;
use crate::provider::ProviderResolver;
use crate::telemetry::Telemetry;

/// Package-layout variants tried for a combined prefix/file path.
const LAYOUT_VARIANTS: &[&str] = &["", "umd/", "dist/"];

fn trim_slashes(value: &str) -> &str {
    value.trim_matches('/')
}

/// `pathPrefix` and `file` joined with `/`, empty parts dropped.
fn combined_path(path_prefix: Option<&str>, file: Option<&str>) -> String {
    [path_prefix, file]
        .into_iter()
        .flatten()
        .map(trim_slashes)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build candidate URLs: providers in the outer loop, path variants inner.
fn build_candidates(
    bases: &[String],
    package: &str,
    version: Option<&str>,
    explicit_path: Option<&str>,
    combined: &str,
) -> Vec<String> {
    let version = version
        .filter(|v| !v.is_empty())
        .map(|v| format!("@{}", v))
        .unwrap_or_default();
    let explicit_path = explicit_path
        .map(|p| p.trim_start_matches('/'))
        .filter(|p| !p.is_empty());

    let mut candidates: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    };

    for base in bases {
        let root = format!("{}{}{}", base, package, version);
        if let Some(path) = explicit_path {
            push(format!("{}/{}", root, path));
        } else if !combined.is_empty() {
            for variant in LAYOUT_VARIANTS {
                push(format!("{}/{}{}", root, variant, combined));
            }
        } else {
            push(root);
        }
    }
    candidates
}

/// Resolve root-relative candidates (`/proxy/npm/react`) against the page.
fn absolute_candidates(page: &PageContext, candidates: Vec<String>) -> Vec<String> {
    let mut absolute: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let url = if candidate.starts_with("http://") || candidate.starts_with("https://") {
            candidate
        } else {
            match page.join(&candidate) {
                Ok(url) => url.to_string(),
                Err(e) => {
                    debug!("keeping unresolvable candidate {}: {}", candidate, e);
                    candidate
                }
            }
        };
        if !absolute.contains(&url) {
            absolute.push(url);
        }
    }
    absolute
}

/// Resolves descriptors and dynamic rules to reachable URLs.
#[derive(Clone)]
pub struct RemoteModuleResolver {
    providers: Arc<ProviderResolver>,
    prober: AvailabilityProber,
    telemetry: Telemetry,
}

impl RemoteModuleResolver {
    pub fn new(providers: Arc<ProviderResolver>, prober: AvailabilityProber, telemetry: Telemetry) -> Self {
        Self {
            providers,
            prober,
            telemetry,
        }
    }

    pub fn providers(&self) -> &ProviderResolver {
        &self.providers
    }

    pub fn prober(&self) -> &AvailabilityProber {
        &self.prober
    }

    /// Every candidate URL for `descriptor`, in probe order.
    pub fn candidates(&self, descriptor: &ModuleDescriptor) -> Vec<String> {
        let bases = self.providers.collect_bases(descriptor);
        let combined = combined_path(descriptor.path_prefix.as_deref(), descriptor.file.as_deref());
        let candidates = build_candidates(
            &bases,
            descriptor.package_name(),
            descriptor.version.as_deref(),
            descriptor.path.as_deref(),
            &combined,
        );
        absolute_candidates(self.providers.page(), candidates)
    }

    /// Every candidate URL for `icon` under `rule`, in probe order.
    pub fn rule_candidates(&self, rule: &DynamicModuleRule, icon: &str) -> Vec<String> {
        let bases = self.providers.rule_bases(rule);
        let file = rule.file_for(icon);
        let combined = combined_path(rule.path_prefix.as_deref(), Some(&file));
        let candidates = build_candidates(&bases, &rule.package_name(), rule.version.as_deref(), None, &combined);
        absolute_candidates(self.providers.page(), candidates)
    }

    /// Resolve a descriptor. A set `url` is returned verbatim.
    #[instrument(skip(self, descriptor), fields(name = %descriptor.name))]
    pub async fn resolve(&self, descriptor: &ModuleDescriptor) -> Result<String> {
        if let Some(url) = descriptor.url.as_deref().filter(|u| !u.is_empty()) {
            return Ok(url.to_string());
        }
        let name = if descriptor.name.is_empty() {
            "<unnamed>"
        } else {
            descriptor.name.as_str()
        };
        self.first_reachable(name, self.candidates(descriptor)).await
    }

    /// Resolve the module `name` (icon `icon`) through a dynamic rule.
    pub async fn resolve_dynamic(&self, rule: &DynamicModuleRule, name: &str, icon: &str) -> Result<String> {
        self.first_reachable(name, self.rule_candidates(rule, icon)).await
    }

    /// Probe strictly in order; stop at the first reachable candidate.
    async fn first_reachable(&self, name: &str, candidates: Vec<String>) -> Result<String> {
        for url in &candidates {
            if self.prober.is_reachable(url).await {
                debug!("resolved {} -> {}", name, url);
                self.telemetry
                    .info("resolve:success", json!({ "name": name, "url": url }));
                return Ok(url.clone());
            }
        }

        self.telemetry
            .info("resolve:fail", json!({ "name": name, "tried": candidates }));
        Err(LoaderError::resolution(name, candidates))
    }
}
