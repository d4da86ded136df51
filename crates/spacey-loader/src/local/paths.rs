// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Path helpers for local modules.
//!
//! Resolved local paths are relative to the site root and carry no leading
//! or trailing slash, e.g. `nested/app/src/theme.tsx` for a page served
//! from `/nested/app/`.

use url::Url;

use crate::config::DEFAULT_LOCAL_EXTENSIONS;
use crate::error::Result;

/// Whether `specifier` names a local module (`./x`, `../x`, `/x`).
pub fn is_local_specifier(specifier: &str) -> bool {
    specifier.starts_with('.') || specifier.starts_with('/')
}

/// Strip leading and trailing slashes.
pub fn normalize_dir(dir: &str) -> &str {
    dir.trim_matches('/')
}

/// Alias map key for a specifier requested from `base_dir`.
pub fn alias_key(specifier: &str, base_dir: &str) -> String {
    format!("{}|{}", normalize_dir(base_dir), specifier)
}

/// Resolve `specifier` against `base_dir` and return the resulting path.
///
/// A plain `base_dir` (`src`) is relative to the page; one with a leading
/// slash (`/nested/app/src`) is relative to the site root, which is how the
/// directories of already-loaded modules are passed. Uses URL resolution,
/// so `..` segments and absolute specifiers behave as they do for
/// `<script src>`.
pub fn resolve_local_base(specifier: &str, base_dir: &str, page: &Url) -> Result<String> {
    let base = normalize_dir(base_dir);
    let dir = match (base_dir.starts_with('/'), base.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}/", base),
        (false, true) => "./".to_string(),
        (false, false) => format!("{}/", base),
    };
    let resolved = page.join(&dir)?.join(specifier)?;
    Ok(normalize_dir(resolved.path()).to_string())
}

/// Root-relative directory of a loaded module, usable as a `base_dir`.
pub fn module_base_dir(path: &str) -> String {
    format!("/{}", module_dir(path))
}

/// Directory part of a local path, `""` at the root.
pub fn module_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Candidate generation for one extension list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPaths {
    extensions: Vec<String>,
}

impl Default for LocalPaths {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_EXTENSIONS.iter().map(|e| e.to_string()).collect())
    }
}

impl LocalPaths {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Whether `path` already ends in a source extension
    pub fn has_known_extension(&self, path: &str) -> bool {
        self.extensions.iter().any(|ext| path.ends_with(ext.as_str()))
    }

    /// Paths to fetch for `base`, in order.
    ///
    /// A base with a known extension is its own only candidate. Otherwise:
    /// the bare base, base plus each extension, then `base/index` plus each
    /// extension.
    pub fn candidate_paths(&self, base: &str) -> Vec<String> {
        let base = base.trim_end_matches('/');
        let mut candidates: Vec<String> = Vec::new();
        let mut add = |candidate: String| {
            if !candidate.is_empty() && !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        };

        add(base.to_string());
        if !self.has_known_extension(base) {
            for ext in &self.extensions {
                add(format!("{}{}", base, ext));
            }
            for ext in &self.extensions {
                add(format!("{}/index{}", base, ext));
            }
        }
        candidates
    }
}
