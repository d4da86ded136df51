// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! On-demand loading of modules matched by a dynamic rule (icon sets and
//! the like).

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

use crate::config::{DynamicModuleRule, ModuleFormat, find_rule};
use crate::error::{LoaderError, Result};
use crate::host::GlobalScope;
use crate::namespace::Namespace;
use crate::registry::ModuleRegistry;
use crate::require::DynamicModuleLoad;
use crate::resolver::RemoteModuleResolver;
use crate::script::ScriptLoader;
use crate::telemetry::Telemetry;

/// Resolves, loads, and registers dynamic-rule modules.
#[derive(Clone)]
pub struct DynamicModuleLoader {
    resolver: RemoteModuleResolver,
    scripts: ScriptLoader,
    globals: Arc<dyn GlobalScope>,
    telemetry: Telemetry,
}

impl DynamicModuleLoader {
    pub fn new(
        resolver: RemoteModuleResolver,
        scripts: ScriptLoader,
        globals: Arc<dyn GlobalScope>,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            resolver,
            scripts,
            globals,
            telemetry,
        }
    }

    /// Load `name` through the first rule of `rules` that matches it.
    pub async fn load_dynamic(
        &self,
        name: &str,
        rules: &[DynamicModuleRule],
        registry: &ModuleRegistry,
    ) -> Result<Arc<Namespace>> {
        let rule = find_rule(rules, name).ok_or_else(|| LoaderError::DynamicRuleMissing(name.to_string()))?;
        self.load_with_rule(name, rule, registry).await
    }

    /// Load `name` through `rule`, registering it under both the icon and
    /// the full name.
    #[instrument(skip(self, rule, registry), fields(prefix = %rule.prefix))]
    pub async fn load_with_rule(
        &self,
        name: &str,
        rule: &DynamicModuleRule,
        registry: &ModuleRegistry,
    ) -> Result<Arc<Namespace>> {
        if !rule.matches(name) {
            return Err(LoaderError::DynamicRuleMissing(name.to_string()));
        }
        let icon = rule.icon(name);
        let url = self.resolver.resolve_dynamic(rule, name, icon).await?;

        let (namespace, global) = match rule.format {
            ModuleFormat::Esm => {
                let exports = self.scripts.import(&url).await?;
                (Namespace::from_value(exports), None)
            }
            ModuleFormat::Global => {
                self.scripts.load(&url).await?;
                let global = rule.global_for(icon);
                let value = self
                    .globals
                    .lookup(&global)
                    .ok_or_else(|| LoaderError::global_missing(&url, &global))?;
                (Namespace::from_value(value), Some(global))
            }
        };

        let namespace = Arc::new(namespace);
        registry.insert(icon, Arc::clone(&namespace));
        registry.insert(name, Arc::clone(&namespace));
        self.telemetry.info(
            "dynamic-module:loaded",
            json!({
                "name": icon,
                "url": url,
                "global": global,
                "format": rule.format,
            }),
        );
        Ok(namespace)
    }
}

#[async_trait]
impl DynamicModuleLoad for DynamicModuleLoader {
    async fn load(
        &self,
        name: &str,
        rule: &DynamicModuleRule,
        registry: &ModuleRegistry,
    ) -> Result<Arc<Namespace>> {
        self.load_with_rule(name, rule, registry).await
    }
}
