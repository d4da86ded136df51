// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loading of the declared tools and library modules

use futures::future::try_join_all;
use serde_json::json;
use std::sync::Arc;
use tracing::{Instrument, info, instrument};

use crate::config::{ModuleDescriptor, ModuleFormat};
use crate::error::{LoaderError, Result};
use crate::host::GlobalScope;
use crate::namespace::Namespace;
use crate::registry::ModuleRegistry;
use crate::resolver::RemoteModuleResolver;
use crate::script::ScriptLoader;
use crate::telemetry::Telemetry;

/// Loads tools (global-only scripts such as a compiler) and library modules.
#[derive(Clone)]
pub struct ToolsLoader {
    resolver: RemoteModuleResolver,
    scripts: ScriptLoader,
    globals: Arc<dyn GlobalScope>,
    telemetry: Telemetry,
}

impl ToolsLoader {
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

    /// Load every tool concurrently; fails on the first error.
    ///
    /// Each tool must publish its `global` (its name when unset). Tools run
    /// on their own tasks, so a failure does not abandon the other injections.
    pub async fn load_tools(&self, tools: &[ModuleDescriptor]) -> Result<()> {
        let loads = tools.iter().cloned().map(|tool| {
            let loader = self.clone();
            let handle = tokio::spawn(async move { loader.load_tool(&tool).await }.in_current_span());
            async move {
                match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(LoaderError::Other(format!("tool task failed: {}", e))),
                }
            }
        });
        try_join_all(loads).await?;
        info!("loaded {} tool(s)", tools.len());
        Ok(())
    }

    #[instrument(skip(self, tool), fields(name = %tool.name))]
    async fn load_tool(&self, tool: &ModuleDescriptor) -> Result<()> {
        let url = self.resolver.resolve(tool).await?;
        self.scripts.load(&url).await?;

        let global = tool.global.as_deref().unwrap_or(&tool.name);
        if self.globals.lookup(global).is_none() {
            return Err(LoaderError::global_missing(&url, global));
        }
        self.telemetry.info(
            "tool:loaded",
            json!({ "name": tool.name, "url": url, "global": global }),
        );
        Ok(())
    }

    /// Load library modules in declaration order into `registry`.
    pub async fn load_modules(&self, modules: &[ModuleDescriptor], registry: &ModuleRegistry) -> Result<()> {
        for module in modules {
            let namespace = self.load_module(module).await?;
            registry.insert(module.name.as_str(), namespace);
        }
        Ok(())
    }

    #[instrument(skip(self, module), fields(name = %module.name))]
    async fn load_module(&self, module: &ModuleDescriptor) -> Result<Arc<Namespace>> {
        let url = self.resolver.resolve(module).await?;

        let namespace = match module.format {
            ModuleFormat::Esm => {
                let exports = self.scripts.import(&url).await?;
                let namespace = Namespace::from_value(exports);
                self.ensure_global_from_namespace(module.global.as_deref(), &namespace);
                namespace
            }
            ModuleFormat::Global => {
                self.scripts.load(&url).await?;
                let global = module.global.as_deref().unwrap_or(&module.name);
                let value = self
                    .globals
                    .lookup(global)
                    .ok_or_else(|| LoaderError::global_missing(&url, global))?;
                Namespace::from_value(value)
            }
        };

        self.telemetry.info(
            "module:loaded",
            json!({
                "name": module.name,
                "url": url,
                "global": module.global,
                "format": module.format,
            }),
        );
        Ok(Arc::new(namespace))
    }

    /// Publish an ESM namespace's default export under `global`, unless the
    /// global already holds something else.
    fn ensure_global_from_namespace(&self, global: Option<&str>, namespace: &Namespace) {
        let Some(global) = global.filter(|g| !g.is_empty()) else {
            return;
        };
        let default = namespace.default_export();
        match self.globals.get(global) {
            Some(existing) if !existing.is_null() && &existing != default => {}
            _ => self.globals.set(global, default.clone()),
        }
    }
}
