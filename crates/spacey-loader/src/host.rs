// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Capabilities the loader needs from its host page.
//!
//! Everything environment-specific (injecting a script tag, evaluating a
//! compiled module body, compiling stylesheets, mounting the UI) sits behind
//! these traits, so the resolution and registry logic never depends on how
//! the page does it.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::RenderConfig;
use crate::error::Result;
use crate::namespace::Namespace;
use crate::registry::ModuleRegistry;
use crate::require::Require;

/// Loads remote code into the shared global context.
#[async_trait]
pub trait ScriptInjector: Send + Sync {
    /// Inject a classic script and wait until it executed or failed.
    async fn inject(&self, url: &str) -> Result<()>;

    /// Import an ECMAScript module by URL and return its exports.
    async fn import_module(&self, url: &str) -> Result<Value>;
}

/// Named globals of the page.
pub trait GlobalScope: Send + Sync {
    fn get(&self, name: &str) -> Option<Value>;

    fn set(&self, name: &str, value: Value);

    /// Look up a dotted path such as `Icons.Home`.
    fn lookup(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.').filter(|s| !s.is_empty());
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = current.get(segment)?.clone();
        }
        if current.is_null() { None } else { Some(current) }
    }
}

/// Output of the source compiler: code ready for the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledModule {
    /// Logical path the source was loaded from
    pub path: String,
    pub code: String,
}

/// Turns module source into an executable unit.
pub trait SourceCompiler: Send + Sync {
    fn compile(&self, source: &str, logical_path: &str) -> Result<CompiledModule>;
}

/// Runs a compiled module against the module accessor and returns its exports.
pub trait ModuleExecutor: Send + Sync {
    fn execute(&self, unit: &CompiledModule, require: &Require) -> Result<Value>;
}

/// Stylesheet preprocessor
pub trait StyleCompiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<String>;
}

/// Receives compiled CSS
pub trait StyleSink: Send + Sync {
    fn inject_css(&self, css: &str);
}

/// Mounts the application.
pub trait Renderer: Send + Sync {
    /// Perform the initial paint of `app` into the root described by `config`.
    fn render(&self, config: &RenderConfig, registry: &ModuleRegistry, app: Arc<Namespace>) -> Result<()>;
}

/// Shows a startup failure to the user.
pub trait ErrorSurface: Send + Sync {
    fn show(&self, root_id: &str, message: &str);
}
