// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Namespace objects: the uniform shape every loaded module is exposed as.

use serde_json::{Map, Value};

/// Key flagging a value that is already shaped like a namespace.
pub const ES_MODULE_FLAG: &str = "__esModule";

/// A loaded module: a `default` value plus named exports.
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    exports: Map<String, Value>,
}

impl Namespace {
    /// Wrap a loaded value.
    ///
    /// A value flagged `__esModule` is kept as-is. Otherwise its own keys are
    /// copied, `default` is set to the value itself when absent, and the own
    /// keys of an object `default` are lifted unless already present.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(obj) = &value else {
            let mut exports = Map::new();
            exports.insert("default".to_string(), value);
            return Self { exports };
        };

        if obj.get(ES_MODULE_FLAG).is_some_and(is_truthy) {
            return Self {
                exports: obj.clone(),
            };
        }

        let mut exports = obj.clone();
        if !exports.contains_key("default") {
            exports.insert("default".to_string(), value.clone());
        }

        if let Some(Value::Object(default)) = exports.get("default").cloned() {
            for (key, member) in default {
                if key == "default" || key == ES_MODULE_FLAG {
                    continue;
                }
                exports.entry(key).or_insert(member);
            }
        }

        Self { exports }
    }

    /// Build a namespace from already-shaped exports
    pub fn from_exports(exports: Map<String, Value>) -> Self {
        Self { exports }
    }

    /// The default export, `Null` when an `__esModule` value has none
    pub fn default_export(&self) -> &Value {
        self.exports.get("default").unwrap_or(&Value::Null)
    }

    /// A named export
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.exports.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.exports.contains_key(key)
    }

    /// Export names
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }

    pub fn exports(&self) -> &Map<String, Value> {
        &self.exports
    }

    /// The namespace as a plain object
    pub fn to_value(&self) -> Value {
        Value::Object(self.exports.clone())
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
