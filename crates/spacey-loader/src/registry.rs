// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module registry shared by every accessor of one loader instance

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

use crate::namespace::Namespace;

/// Thread-safe map from module key to namespace.
///
/// Keys are declared names or canonical local paths. Entries are never
/// evicted. Cloning yields a handle to the same registry.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    entries: Arc<DashMap<String, Arc<Namespace>>>,
    /// Insertion order, for diagnostics only
    order: Arc<Mutex<Vec<String>>>,
}

impl ModuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a namespace by key
    pub fn get(&self, key: &str) -> Option<Arc<Namespace>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Check if a key is registered
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Register a namespace under `key`, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, namespace: Arc<Namespace>) {
        let key = key.into();
        if self.entries.insert(key.clone(), namespace).is_none() {
            self.order.lock().push(key);
        }
    }

    /// Wrap `value` into a namespace and register it.
    pub fn register_value(&self, key: impl Into<String>, value: Value) -> Arc<Namespace> {
        let namespace = Arc::new(Namespace::from_value(value));
        self.insert(key, Arc::clone(&namespace));
        namespace
    }

    /// Registered keys in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.order.lock().clone()
    }

    /// Get the number of registered modules
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
