// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Startup sequence.
//!
//! One [`Bootstrapper::run`] performs, in order:
//!
//! 1. fetch `config.json` (once per bootstrapper) and configure providers;
//! 2. enable verbose client logging when the page looks like CI;
//! 3. load tools concurrently;
//! 4. fetch, compile, and inject the stylesheet;
//! 5. load library modules in declaration order;
//! 6. build the module accessor over the local and dynamic loaders;
//! 7. fetch the entry, preload its dependencies, compile and execute it;
//! 8. render.
//!
//! Rendering comes last so a failure anywhere leaves no partial UI.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{error, info, instrument};

use crate::config::{BootConfig, LoaderSettings, RenderConfig};
use crate::dynamic::DynamicModuleLoader;
use crate::environment::PageContext;
use crate::error::Result;
use crate::host::{
    ErrorSurface, GlobalScope, ModuleExecutor, Renderer, ScriptInjector, SourceCompiler, StyleCompiler, StyleSink,
};
use crate::local::{LocalModuleLoader, LocalPaths};
use crate::namespace::Namespace;
use crate::probe::{AvailabilityProber, ProbeOptions};
use crate::provider::ProviderResolver;
use crate::registry::ModuleRegistry;
use crate::require::{Require, RequireBuilder};
use crate::resolver::RemoteModuleResolver;
use crate::scanner::{preload_dynamic_modules_from_source, preload_modules_from_source};
use crate::script::ScriptLoader;
use crate::telemetry::{BeaconSink, Telemetry};
use crate::tools::ToolsLoader;
use crate::transport::{ReqwestTransport, Transport};

/// The environment-specific collaborators the loader drives.
#[derive(Clone)]
pub struct HostBindings {
    pub injector: Arc<dyn ScriptInjector>,
    pub globals: Arc<dyn GlobalScope>,
    pub compiler: Arc<dyn SourceCompiler>,
    pub executor: Arc<dyn ModuleExecutor>,
    pub style_compiler: Arc<dyn StyleCompiler>,
    pub style_sink: Arc<dyn StyleSink>,
    pub renderer: Arc<dyn Renderer>,
    pub error_surface: Arc<dyn ErrorSurface>,
}

/// Result of a successful startup
#[derive(Debug, Clone)]
pub struct Booted {
    pub registry: ModuleRegistry,
    pub require: Require,
    /// Namespace of the executed entry module
    pub app: Arc<Namespace>,
}

/// Drives one page load.
pub struct Bootstrapper {
    page: PageContext,
    settings: LoaderSettings,
    transport: Arc<dyn Transport>,
    host: HostBindings,
    telemetry: Telemetry,
    config: OnceCell<BootConfig>,
}

impl Bootstrapper {
    /// Create a bootstrapper that logs client events through `tracing` only.
    pub fn new(page: PageContext, settings: LoaderSettings, transport: Arc<dyn Transport>, host: HostBindings) -> Self {
        let telemetry = Telemetry::tracing().with_href(page.href());
        Self {
            page,
            settings,
            transport,
            host,
            telemetry,
            config: OnceCell::new(),
        }
    }

    /// Create a bootstrapper over `reqwest` that also posts client events
    /// to the configured log endpoint.
    pub fn with_reqwest(page: PageContext, settings: LoaderSettings, host: HostBindings) -> Result<Self> {
        let transport = ReqwestTransport::new(Duration::from_secs(settings.timeout))?;
        let endpoint = page.join(&settings.client_log_endpoint)?;
        let telemetry = Telemetry::new(Arc::new(BeaconSink::new(transport.client().clone(), endpoint)))
            .with_href(page.href());
        Ok(Self::new(page, settings, Arc::new(transport), host).with_telemetry(telemetry))
    }

    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    /// The configuration document, fetched at most once.
    pub async fn load_config(&self) -> Result<&BootConfig> {
        self.config
            .get_or_try_init(|| async {
                let url = self.page.join(&self.settings.config_url)?;
                let text = self.transport.fetch_text(url.as_str()).await?;
                BootConfig::from_json(&text)
            })
            .await
    }

    /// Run the startup sequence; failures are logged and shown on the page.
    pub async fn bootstrap(&self) -> Option<Booted> {
        match self.run().await {
            Ok(booted) => Some(booted),
            Err(e) => {
                error!("bootstrap failed: {}", e);
                self.telemetry.error("bootstrap:error", json!({ "message": e.to_string() }));
                let root_id = self
                    .config
                    .get()
                    .map(|c| c.render.root_id.as_str())
                    .unwrap_or("root");
                self.host
                    .error_surface
                    .show(root_id, &format!("Bootstrap error: {}", e));
                None
            }
        }
    }

    /// Run the startup sequence, propagating the first failure.
    #[instrument(skip(self), fields(page = %self.page.href()))]
    pub async fn run(&self) -> Result<Booted> {
        let config = self.load_config().await?;
        let resolver = self.configure(config);
        let scripts = ScriptLoader::new(self.host.injector.clone(), self.telemetry.clone());
        let tools = ToolsLoader::new(
            resolver.clone(),
            scripts.clone(),
            self.host.globals.clone(),
            self.telemetry.clone(),
        );

        tools.load_tools(&config.tools).await?;
        self.apply_styles(&config.styles).await?;

        let registry = ModuleRegistry::new();
        tools.load_modules(&config.modules, &registry).await?;

        let require = self.build_require(config, registry.clone(), resolver, scripts);
        let app = self.compile_entry(&config.entry, config.entry_dir(), &require).await?;

        self.render(&config.render, &registry, Arc::clone(&app))?;
        self.telemetry.info(
            "bootstrap:success",
            json!({ "entryFile": config.entry, "scssFile": config.styles }),
        );
        info!("bootstrap complete: {} module(s) registered", registry.len());
        Ok(Booted { registry, require, app })
    }

    /// Apply the configuration's provider sections and the logging gate.
    fn configure(&self, config: &BootConfig) -> RemoteModuleResolver {
        let mut providers = ProviderResolver::new(self.page.clone());
        providers.configure(config);

        let ci = self
            .page
            .detect_ci_logging(Some(config), &self.settings.ci_log_query_param);
        self.telemetry.set_enabled(ci);
        if ci {
            self.telemetry
                .info("ci:enabled", json!({ "config": true, "href": self.page.href() }));
        }

        let prober = AvailabilityProber::new(self.transport.clone(), self.telemetry.clone())
            .with_options(ProbeOptions::from_settings(&self.settings));
        RemoteModuleResolver::new(Arc::new(providers), prober, self.telemetry.clone())
    }

    async fn apply_styles(&self, styles: &str) -> Result<()> {
        let url = self.page.join(styles)?;
        let source = self.transport.fetch_text(url.as_str()).await?;
        let css = self.host.style_compiler.compile(&source)?;
        self.host.style_sink.inject_css(&css);
        Ok(())
    }

    fn build_require(
        &self,
        config: &BootConfig,
        registry: ModuleRegistry,
        resolver: RemoteModuleResolver,
        scripts: ScriptLoader,
    ) -> Require {
        let local = LocalModuleLoader::new(
            self.transport.clone(),
            self.host.compiler.clone(),
            self.host.executor.clone(),
            self.page.location().clone(),
            LocalPaths::new(self.settings.extensions.clone()),
            self.telemetry.clone(),
        );
        let dynamic = DynamicModuleLoader::new(resolver, scripts, self.host.globals.clone(), self.telemetry.clone());

        RequireBuilder::new(registry)
            .config(config)
            .local_loader(Arc::new(local))
            .dynamic_loader(Arc::new(dynamic))
            .build()
    }

    /// Fetch the entry file, load what it imports, then compile and execute it.
    async fn compile_entry(&self, entry: &str, entry_dir: &str, require: &Require) -> Result<Arc<Namespace>> {
        let url = self.page.join(entry)?;
        let source = self.transport.fetch_text(url.as_str()).await?;

        preload_dynamic_modules_from_source(&source, require, &self.telemetry).await;
        preload_modules_from_source(&source, require, Some(entry_dir)).await?;

        let unit = self.host.compiler.compile(&source, entry)?;
        let exports = self.host.executor.execute(&unit, require)?;
        self.telemetry.info(
            "tsx:compiled",
            json!({ "entryFile": entry, "entryDir": entry_dir }),
        );
        Ok(Arc::new(Namespace::from_value(exports)))
    }

    fn render(&self, config: &RenderConfig, registry: &ModuleRegistry, app: Arc<Namespace>) -> Result<()> {
        self.host.renderer.render(config, registry, app)
    }
}
