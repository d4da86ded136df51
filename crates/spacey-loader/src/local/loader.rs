// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Local module loader with canonical-path deduplication.
//!
//! A request goes through two stages, each deduplicated by its own pending
//! map:
//!
//! 1. *resolve*, keyed by the resolved base path (`src/theme`): fetch the
//!    candidate paths in order until one answers;
//! 2. *execute*, keyed by the canonical path that answered
//!    (`src/theme.tsx`): preload the module's dependencies, compile, execute,
//!    cache.
//!
//! Concurrent requests for one base path share a single fetch, and requests
//! for different base paths that land on the same file share a single
//! execution. Every awaiter receives the same `Arc<Namespace>`. Each stage
//! runs on its own task and removes its pending entry once it settles, even
//! when every awaiter has gone away.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::{Instrument, debug, instrument};
use url::Url;

use crate::error::{LoaderError, Result};
use crate::host::{ModuleExecutor, SourceCompiler};
use crate::local::paths::{LocalPaths, alias_key, module_base_dir, resolve_local_base};
use crate::namespace::Namespace;
use crate::require::{LocalModuleLoad, Require};
use crate::scanner::preload_modules_from_source;
use crate::telemetry::Telemetry;
use crate::transport::Transport;

/// A module that finished loading
#[derive(Debug, Clone)]
pub struct LoadedModule {
    /// Canonical path, e.g. `src/theme.tsx`
    pub path: String,
    pub namespace: Arc<Namespace>,
}

type SharedLoad = Shared<BoxFuture<'static, Result<LoadedModule>>>;

/// Drive `load` on a spawned task and share its outcome.
fn spawn_shared<F>(load: F) -> SharedLoad
where
    F: Future<Output = Result<LoadedModule>> + Send + 'static,
{
    let handle = tokio::spawn(load.in_current_span());
    async move {
        match handle.await {
            Ok(result) => result,
            Err(e) => Err(LoaderError::Other(format!("module load task failed: {}", e))),
        }
    }
    .boxed()
    .shared()
}

struct LoaderState {
    transport: Arc<dyn Transport>,
    compiler: Arc<dyn SourceCompiler>,
    executor: Arc<dyn ModuleExecutor>,
    telemetry: Telemetry,
    page: Url,
    paths: LocalPaths,
    /// `base|specifier` -> canonical path
    aliases: DashMap<String, String>,
    /// Resolved base path -> canonical path
    resolved: DashMap<String, String>,
    /// Canonical path -> namespace
    cache: DashMap<String, Arc<Namespace>>,
    /// In-flight resolve stage, by base path
    resolving: DashMap<String, SharedLoad>,
    /// In-flight execute stage, by canonical path
    executing: DashMap<String, SharedLoad>,
}

/// Loads page-relative modules. Cloning shares all state.
#[derive(Clone)]
pub struct LocalModuleLoader {
    state: Arc<LoaderState>,
}

impl LocalModuleLoader {
    /// Create a loader for a page at `page`
    pub fn new(
        transport: Arc<dyn Transport>,
        compiler: Arc<dyn SourceCompiler>,
        executor: Arc<dyn ModuleExecutor>,
        page: Url,
        paths: LocalPaths,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            state: Arc::new(LoaderState {
                transport,
                compiler,
                executor,
                telemetry,
                page,
                paths,
                aliases: DashMap::new(),
                resolved: DashMap::new(),
                cache: DashMap::new(),
                resolving: DashMap::new(),
                executing: DashMap::new(),
            }),
        }
    }

    /// Canonical path previously recorded for `specifier` from `base_dir`
    pub fn canonical_for(&self, specifier: &str, base_dir: &str) -> Option<String> {
        self.state
            .aliases
            .get(&alias_key(specifier, base_dir))
            .map(|entry| entry.value().clone())
    }

    /// Cached namespace for a canonical path
    pub fn cached(&self, path: &str) -> Option<Arc<Namespace>> {
        self.state.cache.get(path).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of loads currently in flight, both stages
    pub fn pending_count(&self) -> usize {
        self.state.resolving.len() + self.state.executing.len()
    }

    /// Fetch the first candidate of `base_path` that answers.
    ///
    /// Per-candidate failures are skipped; only exhausting every candidate
    /// is an error. Returns the canonical path and source.
    pub async fn fetch_source(&self, base_path: &str) -> Result<(String, String)> {
        self.state.fetch_source(base_path).await
    }

    /// Load `specifier` relative to `base_dir`.
    #[instrument(skip(self, require))]
    pub async fn load_module(&self, specifier: &str, base_dir: &str, require: &Require) -> Result<Arc<Namespace>> {
        let state = &self.state;
        let key = alias_key(specifier, base_dir);

        if let Some(namespace) = state
            .aliases
            .get(&key)
            .and_then(|canonical| self.cached(canonical.value()))
        {
            require.registry().insert(specifier, Arc::clone(&namespace));
            return Ok(namespace);
        }

        let base_path = resolve_local_base(specifier, base_dir, &state.page)?;

        let known = state
            .resolved
            .get(&base_path)
            .map(|canonical| canonical.value().clone());
        if let Some(canonical) = known {
            if let Some(namespace) = self.cached(&canonical) {
                state.aliases.insert(key, canonical);
                require.registry().insert(specifier, Arc::clone(&namespace));
                return Ok(namespace);
            }
        }

        let pending = match state.resolving.entry(base_path.clone()) {
            Entry::Occupied(entry) => {
                debug!("joining in-flight load of {}", base_path);
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let load = spawn_shared(Arc::clone(state).resolve_and_execute(base_path, require.clone()));
                entry.insert(load.clone());
                load
            }
        };

        let loaded = pending.await?;
        state.aliases.insert(key, loaded.path.clone());
        require.registry().insert(specifier, Arc::clone(&loaded.namespace));
        Ok(loaded.namespace)
    }
}

impl LoaderState {
    async fn fetch_source(&self, base_path: &str) -> Result<(String, String)> {
        let candidates = self.paths.candidate_paths(base_path);

        for candidate in &candidates {
            let url = match self.page.join(&format!("/{}", candidate)) {
                Ok(url) => url,
                Err(e) => {
                    debug!("skipping {}: {}", candidate, e);
                    continue;
                }
            };
            match self.transport.fetch_text(url.as_str()).await {
                Ok(source) => return Ok((candidate.clone(), source)),
                Err(e) => debug!("candidate {} failed: {}", candidate, e),
            }
        }

        self.telemetry.warn(
            "local-module:failed",
            json!({ "basePath": base_path, "candidates": candidates }),
        );
        Err(LoaderError::LocalModuleNotFound {
            base_path: base_path.to_string(),
            tried: candidates,
        })
    }

    /// Resolve stage. Removes its own pending entry once settled.
    async fn resolve_and_execute(self: Arc<Self>, base_path: String, require: Require) -> Result<LoadedModule> {
        let result = self.resolve_stage(&base_path, &require).await;
        self.resolving.remove(&base_path);
        result
    }

    async fn resolve_stage(self: &Arc<Self>, base_path: &str, require: &Require) -> Result<LoadedModule> {
        let (canonical, source) = self.fetch_source(base_path).await?;
        self.resolved.insert(base_path.to_string(), canonical.clone());

        let pending = match self.executing.entry(canonical.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                // The cache is written before the pending entry is removed.
                if let Some(namespace) = self.cache.get(&canonical).map(|e| Arc::clone(e.value())) {
                    return Ok(LoadedModule {
                        path: canonical,
                        namespace,
                    });
                }
                let load = spawn_shared(Arc::clone(self).execute(canonical, source, require.clone()));
                entry.insert(load.clone());
                load
            }
        };
        pending.await
    }

    /// Execute stage. Removes its own pending entry once settled.
    async fn execute(self: Arc<Self>, canonical: String, source: String, require: Require) -> Result<LoadedModule> {
        let result = self.execute_stage(&canonical, &source, &require).await;
        self.executing.remove(&canonical);
        result
    }

    async fn execute_stage(&self, canonical: &str, source: &str, require: &Require) -> Result<LoadedModule> {
        let dir = module_base_dir(canonical);
        preload_modules_from_source(source, require, Some(&dir)).await?;

        let unit = self.compiler.compile(source, canonical)?;
        let exports = self.executor.execute(&unit, require)?;
        let namespace = Arc::new(Namespace::from_value(exports));

        self.cache.insert(canonical.to_string(), Arc::clone(&namespace));
        require.registry().insert(canonical, Arc::clone(&namespace));
        debug!("executed local module {}", canonical);

        Ok(LoadedModule {
            path: canonical.to_string(),
            namespace,
        })
    }
}

#[async_trait]
impl LocalModuleLoad for LocalModuleLoader {
    async fn load(&self, specifier: &str, base_dir: &str, require: &Require) -> Result<Arc<Namespace>> {
        self.load_module(specifier, base_dir, require).await
    }
}
