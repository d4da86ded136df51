// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-loader
//!
//! A runtime dependency loader for applications that ship no bundle.
//!
//! At page load the loader fetches a declarative `config.json`, resolves each
//! declared dependency to a reachable URL, loads it, and wires the results
//! into a `require`-style accessor the application's entry code calls as if
//! everything had been bundled ahead of time:
//!
//! - provider resolution with aliases, CI/production preference, and
//!   public fallback registries
//! - availability probing (`HEAD`, `GET` fallback, bounded retry with backoff)
//! - first-reachable candidate selection across package layouts
//! - a shared module registry with synchronous and asynchronous access
//! - local module loading with extension probing and canonical-path
//!   deduplication
//! - eager preloading of the imports found in module source
//!
//! Script injection, compilation, execution, styling, and rendering are
//! environment-specific and sit behind the traits in [`host`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spacey_loader::{Bootstrapper, LoaderSettings, PageContext};
//!
//! let page = PageContext::parse("https://app.example.com/")?;
//! let boot = Bootstrapper::with_reqwest(page, LoaderSettings::load(), bindings)?;
//! boot.bootstrap().await;
//! ```

#![warn(clippy::all)]

pub mod bootstrap;
pub mod config;
pub mod dynamic;
pub mod environment;
pub mod error;
pub mod host;
pub mod import_map;
pub mod local;
pub mod namespace;
pub mod probe;
pub mod provider;
pub mod registry;
pub mod require;
pub mod resolver;
pub mod scanner;
pub mod script;
pub mod telemetry;
pub mod tools;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-exports
pub use bootstrap::{Booted, Bootstrapper, HostBindings};
pub use config::{BootConfig, DynamicModuleRule, LoaderSettings, ModuleDescriptor, ModuleFormat, ProxyMode};
pub use dynamic::DynamicModuleLoader;
pub use environment::PageContext;
pub use error::{LoaderError, Result};
pub use import_map::{ImportMap, build_import_map};
pub use local::{LoadedModule, LocalModuleLoader, LocalPaths};
pub use namespace::Namespace;
pub use probe::{AvailabilityProber, ProbeOptions, ProbeResult};
pub use provider::ProviderResolver;
pub use registry::ModuleRegistry;
pub use require::{Require, RequireBuilder};
pub use resolver::RemoteModuleResolver;
pub use script::ScriptLoader;
pub use telemetry::Telemetry;
pub use tools::ToolsLoader;
pub use transport::{ReqwestTransport, Transport};

/// Version of the loader
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
