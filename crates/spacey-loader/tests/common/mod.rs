// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! In-memory site and page used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use spacey_loader::config::RenderConfig;
use spacey_loader::host::{
    CompiledModule, ErrorSurface, GlobalScope, ModuleExecutor, Renderer, ScriptInjector, SourceCompiler, StyleCompiler,
    StyleSink,
};
use spacey_loader::scanner::collect_module_specifiers;
use spacey_loader::transport::{HttpResponse, Method, Transport};
use spacey_loader::{HostBindings, LoaderError, ModuleRegistry, Namespace, Require, Result};

/// Static site: every file answers 200, everything else 404.
#[derive(Default)]
pub struct Site {
    files: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<(Method, String)>>,
}

impl Site {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn file(&self, url: &str, body: &str) -> &Self {
        self.files.lock().insert(url.to_string(), body.to_string());
        self
    }

    pub fn requests(&self) -> Vec<(Method, String)> {
        self.requests.lock().clone()
    }

    pub fn gets(&self, url: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|(m, u)| *m == Method::Get && u == url)
            .count()
    }
}

#[async_trait]
impl Transport for Site {
    async fn request(&self, method: Method, url: &str) -> Result<HttpResponse> {
        self.requests.lock().push((method, url.to_string()));
        tokio::task::yield_now().await;
        match self.files.lock().get(url) {
            Some(body) if method == Method::Get => Ok(HttpResponse::new(200, body.clone())),
            Some(_) => Ok(HttpResponse::new(200, "")),
            None => Ok(HttpResponse::new(404, "")),
        }
    }
}

/// Browser-side collaborators with observable effects.
#[derive(Default)]
pub struct Browser {
    /// url -> globals the script publishes
    scripts: Mutex<HashMap<String, Vec<(String, Value)>>>,
    globals: Mutex<HashMap<String, Value>>,
    pub injected: Mutex<Vec<String>>,
    pub compiled: Mutex<Vec<String>>,
    pub css: Mutex<Vec<String>>,
    pub rendered: Mutex<Vec<(String, Value)>>,
    pub errors: Mutex<Vec<String>>,
}

impl Browser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, url: &str, global: &str, value: Value) {
        self.scripts
            .lock()
            .entry(url.to_string())
            .or_default()
            .push((global.to_string(), value));
    }

    pub fn bindings(self: &Arc<Self>) -> HostBindings {
        HostBindings {
            injector: self.clone(),
            globals: self.clone(),
            compiler: self.clone(),
            executor: self.clone(),
            style_compiler: self.clone(),
            style_sink: self.clone(),
            renderer: self.clone(),
            error_surface: self.clone(),
        }
    }
}

#[async_trait]
impl ScriptInjector for Browser {
    async fn inject(&self, url: &str) -> Result<()> {
        self.injected.lock().push(url.to_string());
        let published = self.scripts.lock().get(url).cloned().ok_or_else(|| LoaderError::ScriptLoad {
            url: url.to_string(),
        })?;
        self.globals.lock().extend(published);
        Ok(())
    }

    async fn import_module(&self, url: &str) -> Result<Value> {
        Err(LoaderError::ScriptLoad { url: url.to_string() })
    }
}

impl GlobalScope for Browser {
    fn get(&self, name: &str) -> Option<Value> {
        self.globals.lock().get(name).cloned()
    }

    fn set(&self, name: &str, value: Value) {
        self.globals.lock().insert(name.to_string(), value);
    }
}

impl SourceCompiler for Browser {
    fn compile(&self, source: &str, logical_path: &str) -> Result<CompiledModule> {
        self.compiled.lock().push(logical_path.to_string());
        Ok(CompiledModule {
            path: logical_path.to_string(),
            code: source.to_string(),
        })
    }
}

/// Resolves every import synchronously and exports `{path, deps}`.
impl ModuleExecutor for Browser {
    fn execute(&self, unit: &CompiledModule, require: &Require) -> Result<Value> {
        let deps = collect_module_specifiers(&unit.code);
        for dep in &deps {
            require.require(dep)?;
        }
        Ok(json!({ "path": unit.path, "deps": deps }))
    }
}

impl StyleCompiler for Browser {
    fn compile(&self, source: &str) -> Result<String> {
        Ok(source.replace('$', "--"))
    }
}

impl StyleSink for Browser {
    fn inject_css(&self, css: &str) {
        self.css.lock().push(css.to_string());
    }
}

impl Renderer for Browser {
    fn render(&self, config: &RenderConfig, registry: &ModuleRegistry, app: Arc<Namespace>) -> Result<()> {
        let dom = config.dom_module.as_deref().unwrap_or_default();
        if !registry.contains(dom) {
            return Err(LoaderError::Render(format!("DOM render module missing: {}", dom)));
        }
        self.rendered.lock().push((config.root_id.clone(), app.to_value()));
        Ok(())
    }
}

impl ErrorSurface for Browser {
    fn show(&self, _root_id: &str, message: &str) {
        self.errors.lock().push(message.to_string());
    }
}
