// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Provider resolution: turn descriptor hints into ordered base URLs.

use std::collections::BTreeMap;

use crate::config::{BootConfig, DynamicModuleRule, ModuleDescriptor};
use crate::environment::PageContext;

/// Public registries tried last, unless a descriptor opts out.
pub const DEFAULT_FALLBACK_PROVIDERS: &[&str] =
    &["https://cdn.jsdelivr.net/npm/", "https://unpkg.com/"];

/// Aliases available without configuration.
pub const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("jsdelivr", "https://cdn.jsdelivr.net/npm/"),
    ("unpkg", "https://unpkg.com/"),
    ("esm.sh", "https://esm.sh/"),
];

/// Normalize a provider base.
///
/// Paths and `http(s)://` URLs get exactly one trailing slash; bare hosts are
/// upgraded to `https://`. Empty input stays empty. Idempotent.
pub fn normalize_provider(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let stripped = trimmed.trim_end_matches('/');
    if trimmed.starts_with('/') {
        return format!("{}/", stripped);
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return format!("{}/", stripped);
    }
    format!("https://{}/", stripped)
}

/// Provider fields shared by module descriptors and dynamic rules.
pub trait ProviderHints {
    fn provider(&self) -> Option<&str>;
    fn ci_provider(&self) -> Option<&str>;
    fn production_provider(&self) -> Option<&str>;
    /// Whether fallback registries may be appended
    fn allows_fallback(&self) -> bool;
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl ProviderHints for ModuleDescriptor {
    fn provider(&self) -> Option<&str> {
        non_empty(&self.provider)
    }

    fn ci_provider(&self) -> Option<&str> {
        non_empty(&self.ci_provider)
    }

    fn production_provider(&self) -> Option<&str> {
        non_empty(&self.production_provider)
    }

    fn allows_fallback(&self) -> bool {
        ModuleDescriptor::allows_fallback(self)
    }
}

impl ProviderHints for DynamicModuleRule {
    fn provider(&self) -> Option<&str> {
        non_empty(&self.provider)
    }

    fn ci_provider(&self) -> Option<&str> {
        non_empty(&self.ci_provider)
    }

    fn production_provider(&self) -> Option<&str> {
        non_empty(&self.production_provider)
    }

    fn allows_fallback(&self) -> bool {
        DynamicModuleRule::allows_fallback(self)
    }
}

/// Ordered, de-duplicated list of normalized bases.
#[derive(Default)]
struct BaseList(Vec<String>);

impl BaseList {
    fn add(&mut self, resolver: &ProviderResolver, raw: Option<&str>) {
        let Some(raw) = raw else {
            return;
        };
        let normalized = resolver.normalize_base(raw);
        if !normalized.is_empty() && !self.0.contains(&normalized) {
            self.0.push(normalized);
        }
    }
}

/// Computes candidate provider bases for one page.
#[derive(Debug, Clone)]
pub struct ProviderResolver {
    page: PageContext,
    /// Alias name -> normalized base
    aliases: BTreeMap<String, String>,
    /// Normalized base used when nothing else is configured
    default_base: Option<String>,
    fallbacks: Vec<String>,
}

impl ProviderResolver {
    /// Create a resolver with built-in aliases and default fallbacks.
    pub fn new(page: PageContext) -> Self {
        let mut resolver = Self {
            page,
            aliases: BTreeMap::new(),
            default_base: None,
            fallbacks: Vec::new(),
        };
        resolver.set_aliases(&BTreeMap::new());
        resolver.set_fallback_providers(&[]);
        resolver
    }

    /// Apply the provider sections of a configuration document.
    pub fn configure(&mut self, config: &BootConfig) {
        self.set_aliases(&config.providers.aliases);
        self.set_default_base(config.providers.default.as_deref());
        self.set_fallback_providers(&config.fallback_providers);
    }

    /// Replace configured aliases; built-ins stay unless overridden.
    pub fn set_aliases(&mut self, aliases: &BTreeMap<String, String>) {
        let builtin = BUILTIN_ALIASES
            .iter()
            .map(|(name, base)| (name.to_string(), base.to_string()));
        let configured = aliases.iter().map(|(k, v)| (k.clone(), v.clone()));

        self.aliases = builtin
            .chain(configured)
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, base)| (name, normalize_provider(&base)))
            .filter(|(_, base)| !base.is_empty())
            .collect();
    }

    pub fn set_default_base(&mut self, base: Option<&str>) {
        self.default_base = base.map(normalize_provider).filter(|b| !b.is_empty());
    }

    /// Replace the fallback list. An empty list, or one that normalizes to
    /// nothing, restores the defaults.
    pub fn set_fallback_providers(&mut self, providers: &[String]) {
        self.fallbacks = providers
            .iter()
            .map(|p| self.normalize_base(p))
            .filter(|p| !p.is_empty())
            .collect();
        if self.fallbacks.is_empty() {
            self.fallbacks = DEFAULT_FALLBACK_PROVIDERS
                .iter()
                .map(|p| p.to_string())
                .collect();
        }
    }

    pub fn fallback_providers(&self) -> &[String] {
        &self.fallbacks
    }

    pub fn default_base(&self) -> Option<&str> {
        self.default_base.as_deref()
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    /// Expand an alias, or normalize the raw value.
    pub fn normalize_base(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if let Some(base) = self.aliases.get(trimmed) {
            return base.clone();
        }
        normalize_provider(trimmed)
    }

    /// The provider preferred for this environment, un-normalized.
    ///
    /// With a CI or production provider set, CI-like pages prefer the CI one
    /// and others the production one. Otherwise the first of `provider`, CI,
    /// production, or the default base.
    pub fn resolve_provider(&self, hints: &impl ProviderHints) -> Option<String> {
        let ci = hints.ci_provider();
        let prod = hints.production_provider();
        if ci.is_some() || prod.is_some() {
            let preferred = if self.page.prefers_ci_provider() {
                ci.or(prod)
            } else {
                prod.or(ci)
            };
            return preferred.map(str::to_string);
        }
        hints
            .provider()
            .map(str::to_string)
            .or_else(|| self.default_base.clone())
    }

    /// Ordered candidate bases for a module descriptor.
    pub fn collect_bases(&self, hints: &impl ProviderHints) -> Vec<String> {
        let mut bases = BaseList::default();
        bases.add(self, self.resolve_provider(hints).as_deref());
        bases.add(self, hints.provider());
        bases.add(self, hints.ci_provider());
        bases.add(self, hints.production_provider());
        if hints.allows_fallback() {
            for fallback in &self.fallbacks {
                bases.add(self, Some(fallback));
            }
        }
        bases.0
    }

    /// Ordered candidate bases for a dynamic rule.
    pub fn rule_bases(&self, rule: &DynamicModuleRule) -> Vec<String> {
        let (ci, provider, prod) = (rule.ci_provider(), rule.provider(), rule.production_provider());
        let order = if self.page.prefers_ci_provider() {
            [ci, provider, prod]
        } else {
            [prod, provider, ci]
        };

        let mut bases = BaseList::default();
        for base in order {
            bases.add(self, base);
        }
        if bases.0.is_empty() {
            bases.add(self, self.default_base.as_deref());
        }
        if rule.allows_fallback() {
            for fallback in &self.fallbacks {
                bases.add(self, Some(fallback));
            }
        }
        bases.0
    }
}
