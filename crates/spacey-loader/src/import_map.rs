// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Import map generation for the declared library modules

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::ModuleDescriptor;
use crate::error::Result;
use crate::resolver::RemoteModuleResolver;

/// `{"imports": {specifier: url}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMap {
    pub imports: BTreeMap<String, String>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map every import specifier of `module` to `url`. A later module
    /// claiming the same specifier wins.
    pub fn insert_module(&mut self, module: &ModuleDescriptor, url: &str) {
        for spec in import_specifiers(module) {
            self.imports.insert(spec.to_string(), url.to_string());
        }
    }

    pub fn get(&self, specifier: &str) -> Option<&str> {
        self.imports.get(specifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    /// Pretty-printed JSON, as placed in an import map script element.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Keys a module is importable under: its `importSpecifiers`, or its name.
/// Empty specifiers are skipped.
pub fn import_specifiers(module: &ModuleDescriptor) -> impl Iterator<Item = &str> {
    let specs: Vec<&str> = if module.import_specifiers.is_empty() {
        vec![module.name.as_str()]
    } else {
        module.import_specifiers.iter().map(String::as_str).collect()
    };
    specs.into_iter().filter(|s| !s.is_empty())
}

/// Resolve `modules` in declaration order and build their import map.
///
/// A module's `url` is used as-is; any resolution failure aborts.
pub async fn build_import_map(resolver: &RemoteModuleResolver, modules: &[ModuleDescriptor]) -> Result<ImportMap> {
    let mut map = ImportMap::new();
    for module in modules {
        let url = resolver.resolve(module).await?;
        debug!("import map: {} -> {}", module.name, url);
        map.insert_module(module, &url);
    }
    Ok(map)
}
