// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The `require` accessor handed to executing modules.
//!
//! [`Require::require`] is the synchronous lookup module bodies call; it only
//! ever reads the registry. [`Require::require_async`] is used ahead of
//! execution to make sure those lookups will hit, dispatching every
//! specifier to exactly one of the registry, the local loader, or the
//! dynamic loader.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::config::{BootConfig, DynamicModuleRule, find_rule};
use crate::error::{LoaderError, Result};
use crate::local::paths::is_local_specifier;
use crate::namespace::Namespace;
use crate::registry::ModuleRegistry;

/// Loads local modules on behalf of [`Require::require_async`].
#[async_trait]
pub trait LocalModuleLoad: Send + Sync {
    /// Load `specifier` relative to `base_dir`. Implementations register the
    /// result themselves.
    async fn load(&self, specifier: &str, base_dir: &str, require: &Require) -> Result<Arc<Namespace>>;
}

/// Loads modules matched by a dynamic rule.
#[async_trait]
pub trait DynamicModuleLoad: Send + Sync {
    async fn load(
        &self,
        name: &str,
        rule: &DynamicModuleRule,
        registry: &ModuleRegistry,
    ) -> Result<Arc<Namespace>>;
}

/// How a specifier will be satisfied.
#[derive(Debug, Clone)]
pub enum SpecifierKind<'a> {
    /// Already in the registry
    Registered(Arc<Namespace>),
    /// Relative or absolute path
    Local,
    /// Covered by a dynamic rule
    DynamicRule(&'a DynamicModuleRule),
    Unknown,
}

struct RequireInner {
    registry: ModuleRegistry,
    rules: Vec<DynamicModuleRule>,
    entry_dir: String,
    local: Option<Arc<dyn LocalModuleLoad>>,
    dynamic: Option<Arc<dyn DynamicModuleLoad>>,
}

/// Module accessor. Cheap to clone; clones share the registry and loaders.
#[derive(Clone)]
pub struct Require {
    inner: Arc<RequireInner>,
}

impl Require {
    /// Synchronous lookup. Never fetches.
    pub fn require(&self, name: &str) -> Result<Arc<Namespace>> {
        self.inner
            .registry
            .get(name)
            .ok_or_else(|| LoaderError::ModuleNotLoaded(name.to_string()))
    }

    /// Decide once how `name` is satisfied.
    ///
    /// Local and dynamic classes only apply when the matching loader is
    /// configured. Local specifiers always go to the local loader, which
    /// keys its cache by importing directory; the registry entry under a
    /// relative specifier only serves synchronous lookups.
    pub fn classify(&self, name: &str) -> SpecifierKind<'_> {
        if self.inner.local.is_some() && is_local_specifier(name) {
            return SpecifierKind::Local;
        }
        if let Some(namespace) = self.inner.registry.get(name) {
            return SpecifierKind::Registered(namespace);
        }
        if self.inner.dynamic.is_some() {
            if let Some(rule) = find_rule(&self.inner.rules, name) {
                return SpecifierKind::DynamicRule(rule);
            }
        }
        SpecifierKind::Unknown
    }

    /// Load `name` if needed and return its namespace.
    ///
    /// Local specifiers resolve against `base_dir`, defaulting to the entry
    /// directory.
    pub async fn require_async(&self, name: &str, base_dir: Option<&str>) -> Result<Arc<Namespace>> {
        match self.classify(name) {
            SpecifierKind::Registered(namespace) => Ok(namespace),
            SpecifierKind::Local => {
                let Some(local) = &self.inner.local else {
                    return Err(LoaderError::ModuleNotRegistered(name.to_string()));
                };
                let base_dir = base_dir.unwrap_or(&self.inner.entry_dir);
                debug!("require_async local {} from '{}'", name, base_dir);
                local.load(name, base_dir, self).await
            }
            SpecifierKind::DynamicRule(rule) => {
                let Some(dynamic) = &self.inner.dynamic else {
                    return Err(LoaderError::DynamicRuleMissing(name.to_string()));
                };
                debug!("require_async dynamic {} via '{}'", name, rule.prefix);
                dynamic.load(name, rule, &self.inner.registry).await
            }
            SpecifierKind::Unknown => Err(LoaderError::ModuleNotRegistered(name.to_string())),
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.inner.registry
    }

    /// Directory local specifiers resolve against by default
    pub fn entry_dir(&self) -> &str {
        &self.inner.entry_dir
    }

    pub fn rules(&self) -> &[DynamicModuleRule] {
        &self.inner.rules
    }
}

impl std::fmt::Debug for Require {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Require")
            .field("registry", &self.inner.registry)
            .field("entry_dir", &self.inner.entry_dir)
            .field("rules", &self.inner.rules.len())
            .finish()
    }
}

/// Builder for [`Require`].
pub struct RequireBuilder {
    registry: ModuleRegistry,
    rules: Vec<DynamicModuleRule>,
    entry_dir: String,
    local: Option<Arc<dyn LocalModuleLoad>>,
    dynamic: Option<Arc<dyn DynamicModuleLoad>>,
}

impl RequireBuilder {
    pub fn new(registry: ModuleRegistry) -> Self {
        Self {
            registry,
            rules: Vec::new(),
            entry_dir: String::new(),
            local: None,
            dynamic: None,
        }
    }

    /// Take dynamic rules and the entry directory from a configuration.
    pub fn config(mut self, config: &BootConfig) -> Self {
        self.rules = config.dynamic_modules.clone();
        self.entry_dir = config.entry_dir().to_string();
        self
    }

    pub fn rules(mut self, rules: Vec<DynamicModuleRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn entry_dir(mut self, entry_dir: impl Into<String>) -> Self {
        self.entry_dir = entry_dir.into();
        self
    }

    pub fn local_loader(mut self, loader: Arc<dyn LocalModuleLoad>) -> Self {
        self.local = Some(loader);
        self
    }

    pub fn dynamic_loader(mut self, loader: Arc<dyn DynamicModuleLoad>) -> Self {
        self.dynamic = Some(loader);
        self
    }

    pub fn build(self) -> Require {
        Require {
            inner: Arc::new(RequireInner {
                registry: self.registry,
                rules: self.rules,
                entry_dir: self.entry_dir,
                local: self.local,
                dynamic: self.dynamic,
            }),
        }
    }
}
