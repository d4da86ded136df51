// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Fakes shared by unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RenderConfig;
use crate::error::{LoaderError, Result};
use crate::host::{
    CompiledModule, ErrorSurface, GlobalScope, ModuleExecutor, Renderer, ScriptInjector, SourceCompiler, StyleCompiler,
    StyleSink,
};
use crate::namespace::Namespace;
use crate::registry::ModuleRegistry;
use crate::require::Require;
use crate::scanner::collect_module_specifiers;
use crate::transport::{HttpResponse, Method, Transport};

/// Scripted reply for one request
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Status(u16, &'static str),
    NetworkError,
}

/// Transport answering from a routing table; unrouted URLs get 404.
///
/// A route holds a queue of replies; the last one repeats once the queue
/// drains to a single element.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<(Method, String)>>,
    delay: Option<Duration>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer both HEAD and GET on `url` with `status`/`body`.
    pub fn route(self, url: &str, status: u16, body: &'static str) -> Self {
        self.replies(Method::Head, url, vec![Reply::Status(status, "")])
            .replies(Method::Get, url, vec![Reply::Status(status, body)])
    }

    /// Answer `method` on `url` with `replies` in order.
    pub fn replies(self, method: Method, url: &str, replies: Vec<Reply>) -> Self {
        self.routes
            .lock()
            .insert((method, url.to_string()), replies.into_iter().collect());
        self
    }

    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().clone()
    }

    /// URLs requested with `method`, in order
    pub fn urls(&self, method: Method) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, u)| u.clone())
            .collect()
    }

    pub fn count(&self, method: Method, url: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(m, u)| *m == method && u == url)
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn request(&self, method: Method, url: &str) -> Result<HttpResponse> {
        self.calls.lock().push((method, url.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = {
            let mut routes = self.routes.lock();
            match routes.get_mut(&(method, url.to_string())) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        match reply {
            Some(Reply::Status(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Reply::NetworkError) => Err(LoaderError::Network(format!("unreachable: {}", url))),
            None => Ok(HttpResponse::new(404, "")),
        }
    }
}

/// Script host where injecting a URL publishes configured globals.
#[derive(Default)]
pub(crate) struct FakeScriptHost {
    /// url -> (global name, value) published on load
    scripts: Mutex<HashMap<String, Vec<(String, Value)>>>,
    /// url -> exports returned by `import_module`
    esm: Mutex<HashMap<String, Value>>,
    globals: Mutex<HashMap<String, Value>>,
    injected: Mutex<Vec<String>>,
}

impl FakeScriptHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Loading `url` publishes `global = value`.
    pub fn script(&self, url: &str, global: &str, value: Value) {
        self.scripts
            .lock()
            .entry(url.to_string())
            .or_default()
            .push((global.to_string(), value));
    }

    /// Loading `url` succeeds without publishing anything.
    pub fn empty_script(&self, url: &str) {
        self.scripts.lock().entry(url.to_string()).or_default();
    }

    pub fn esm(&self, url: &str, exports: Value) {
        self.esm.lock().insert(url.to_string(), exports);
    }

    pub fn injected(&self) -> Vec<String> {
        self.injected.lock().clone()
    }
}

#[async_trait]
impl ScriptInjector for FakeScriptHost {
    async fn inject(&self, url: &str) -> Result<()> {
        self.injected.lock().push(url.to_string());
        let published = self
            .scripts
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| LoaderError::ScriptLoad {
                url: url.to_string(),
            })?;
        let mut globals = self.globals.lock();
        for (name, value) in published {
            globals.insert(name, value);
        }
        Ok(())
    }

    async fn import_module(&self, url: &str) -> Result<Value> {
        self.esm
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| LoaderError::ScriptLoad {
                url: url.to_string(),
            })
    }
}

impl GlobalScope for FakeScriptHost {
    fn get(&self, name: &str) -> Option<Value> {
        self.globals.lock().get(name).cloned()
    }

    fn set(&self, name: &str, value: Value) {
        self.globals.lock().insert(name.to_string(), value);
    }
}

/// Compiler that passes source through and counts invocations.
#[derive(Default)]
pub(crate) struct FakeCompiler {
    compiled: Mutex<Vec<String>>,
}

impl FakeCompiler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Logical paths compiled, in order
    pub fn compiled(&self) -> Vec<String> {
        self.compiled.lock().clone()
    }
}

impl SourceCompiler for FakeCompiler {
    fn compile(&self, source: &str, logical_path: &str) -> Result<CompiledModule> {
        if source.contains("syntax error") {
            return Err(LoaderError::Compile {
                path: logical_path.to_string(),
                message: "unexpected token".to_string(),
            });
        }
        self.compiled.lock().push(logical_path.to_string());
        Ok(CompiledModule {
            path: logical_path.to_string(),
            code: source.to_string(),
        })
    }
}

/// Executor that resolves every import synchronously, the way a compiled
/// module body would, and exports its own path and dependencies.
#[derive(Default)]
pub(crate) struct FakeExecutor;

impl ModuleExecutor for FakeExecutor {
    fn execute(&self, unit: &CompiledModule, require: &Require) -> Result<Value> {
        let deps = collect_module_specifiers(&unit.code);
        for dep in &deps {
            require.require(dep).map_err(|e| LoaderError::Execute {
                path: unit.path.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(serde_json::json!({ "path": unit.path, "deps": deps }))
    }
}

/// Page side of the startup sequence: styles, render target, error box.
#[derive(Default)]
pub(crate) struct FakePage {
    css: Mutex<Vec<String>>,
    rendered: Mutex<Vec<String>>,
    errors: Mutex<Vec<(String, String)>>,
}

impl FakePage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn css(&self) -> Vec<String> {
        self.css.lock().clone()
    }

    /// Root ids rendered into
    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().clone()
    }

    /// `(root_id, message)` pairs shown
    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors.lock().clone()
    }
}

impl StyleCompiler for FakePage {
    fn compile(&self, source: &str) -> Result<String> {
        Ok(format!("compiled({})", source))
    }
}

impl StyleSink for FakePage {
    fn inject_css(&self, css: &str) {
        self.css.lock().push(css.to_string());
    }
}

impl Renderer for FakePage {
    fn render(&self, config: &RenderConfig, _registry: &ModuleRegistry, _app: Arc<Namespace>) -> Result<()> {
        self.rendered.lock().push(config.root_id.clone());
        Ok(())
    }
}

impl ErrorSurface for FakePage {
    fn show(&self, root_id: &str, message: &str) {
        self.errors.lock().push((root_id.to_string(), message.to_string()));
    }
}
