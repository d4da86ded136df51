// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the loader

use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that can occur while resolving, fetching, or wiring modules.
///
/// The type is `Clone` because an in-flight local load is shared by every
/// concurrent requester, and each of them receives the same outcome.
#[derive(Debug, Clone, Error)]
pub enum LoaderError {
    /// No candidate URL for a remote dependency was reachable
    #[error("Unable to resolve URL for module {name} (tried: {})", tried.join(", "))]
    ResolutionFailure {
        /// Descriptor name
        name: String,
        /// Every candidate URL, in probe order
        tried: Vec<String>,
    },

    /// A script loaded but did not publish the expected global
    #[error("Global not found after loading {url}: {global}")]
    GlobalMissing {
        /// Script URL
        url: String,
        /// Expected global name or dotted path
        global: String,
    },

    /// The script element reported a load error
    #[error("Failed to load {url}")]
    ScriptLoad {
        /// Script URL
        url: String,
    },

    /// Synchronous access to a module that has not been preloaded
    #[error("Module not yet loaded: {0} (use a preload step via require_async for dynamic modules)")]
    ModuleNotLoaded(String),

    /// Specifier is neither registered, local, nor covered by a dynamic rule
    #[error("Module not registered: {0}")]
    ModuleNotRegistered(String),

    /// No dynamic module rule matches the requested name
    #[error("No dynamic rule for module: {0}")]
    DynamicRuleMissing(String),

    /// All local candidate paths missed
    #[error("Failed to load local module: {base_path} (tried: {})", tried.join(", "))]
    LocalModuleNotFound {
        /// Resolved base path before extension probing
        base_path: String,
        /// Every candidate path, in fetch order
        tried: Vec<String>,
    },

    /// A fanned-out preload rejected
    #[error("Failed to preload module(s): {specifier}: {cause}. Check file paths and dynamic module rules.")]
    PreloadFailed {
        /// The specifier that failed first
        specifier: String,
        /// The underlying failure
        cause: Box<LoaderError>,
    },

    /// The external compiler rejected a module body
    #[error("Compile error in {path}: {message}")]
    Compile {
        /// Logical module path
        path: String,
        /// Compiler message
        message: String,
    },

    /// Executing a compiled module failed
    #[error("Execution error in {path}: {message}")]
    Execute {
        /// Logical module path
        path: String,
        /// Executor message
        message: String,
    },

    /// The render collaborator failed
    #[error("Render error: {0}")]
    Render(String),

    /// Configuration document was missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// A request completed with a non-success status
    #[error("Failed to fetch {url}: HTTP {status}")]
    Http {
        /// Requested URL
        url: String,
        /// Response status
        status: u16,
    },

    /// Transport-level failure (DNS, connect, TLS, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// General error with message
    #[error("{0}")]
    Other(String),
}

impl LoaderError {
    /// Create a resolution failure
    pub fn resolution(name: impl Into<String>, tried: Vec<String>) -> Self {
        Self::ResolutionFailure {
            name: name.into(),
            tried,
        }
    }

    /// Create a missing-global error
    pub fn global_missing(url: impl Into<String>, global: impl Into<String>) -> Self {
        Self::GlobalMissing {
            url: url.into(),
            global: global.into(),
        }
    }

    /// Wrap a preload failure for `specifier`
    pub fn preload(specifier: impl Into<String>, cause: LoaderError) -> Self {
        Self::PreloadFailed {
            specifier: specifier.into(),
            cause: Box::new(cause),
        }
    }

    /// Whether this error is a programmer error that must never be retried
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Self::ModuleNotLoaded(_) | Self::ModuleNotRegistered(_) | Self::DynamicRuleMissing(_)
        )
    }
}

impl From<reqwest::Error> for LoaderError {
    fn from(err: reqwest::Error) -> Self {
        LoaderError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for LoaderError {
    fn from(err: serde_json::Error) -> Self {
        LoaderError::Config(err.to_string())
    }
}

impl From<url::ParseError> for LoaderError {
    fn from(err: url::ParseError) -> Self {
        LoaderError::Other(format!("Invalid URL: {}", err))
    }
}

impl From<&str> for LoaderError {
    fn from(s: &str) -> Self {
        LoaderError::Other(s.to_string())
    }
}

impl From<String> for LoaderError {
    fn from(s: String) -> Self {
        LoaderError::Other(s)
    }
}
