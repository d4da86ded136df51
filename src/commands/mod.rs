// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Command implementations for spacey-boot.

pub mod import_map;
pub mod probe;
pub mod resolve;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use spacey_loader::config::ProxyMode;
use spacey_loader::{
    AvailabilityProber, BootConfig, LoaderSettings, PageContext, ProbeOptions, ProviderResolver, RemoteModuleResolver,
    ReqwestTransport, Telemetry, Transport,
};

use crate::cli::Cli;

/// Common context for command execution.
pub struct CommandContext {
    pub page: PageContext,
    pub settings: LoaderSettings,
    pub transport: Arc<dyn Transport>,
    pub telemetry: Telemetry,
}

impl CommandContext {
    /// Create a context from settings overlaid with CLI options.
    pub fn new(cli: &Cli) -> Result<Self> {
        let settings = settings_from(cli);
        let transport = ReqwestTransport::new(Duration::from_secs(settings.timeout))?;
        Self::with_transport(cli, settings, Arc::new(transport))
    }

    pub fn with_transport(cli: &Cli, settings: LoaderSettings, transport: Arc<dyn Transport>) -> Result<Self> {
        let page = PageContext::parse(&cli.page)
            .with_context(|| format!("invalid page URL: {}", cli.page))?
            .with_proxy_mode(settings.proxy_mode);
        let telemetry = Telemetry::tracing().with_href(page.href());
        telemetry.set_enabled(cli.verbose);
        Ok(Self {
            page,
            settings,
            transport,
            telemetry,
        })
    }

    /// Read a configuration from a URL or a local file.
    pub async fn load_config(&self, source: &str) -> Result<BootConfig> {
        debug!("Loading config from {}", source);
        let text = if source.starts_with("http://") || source.starts_with("https://") {
            self.transport.fetch_text(source).await?
        } else {
            std::fs::read_to_string(Path::new(source)).with_context(|| format!("failed to read {}", source))?
        };
        Ok(BootConfig::from_json(&text)?)
    }

    pub fn prober(&self) -> AvailabilityProber {
        AvailabilityProber::new(self.transport.clone(), self.telemetry.clone())
            .with_options(ProbeOptions::from_settings(&self.settings))
    }

    /// Resolver configured with `config`'s provider sections
    pub fn resolver(&self, config: &BootConfig) -> RemoteModuleResolver {
        let mut providers = ProviderResolver::new(self.page.clone());
        providers.configure(config);
        RemoteModuleResolver::new(Arc::new(providers), self.prober(), self.telemetry.clone())
    }
}

/// `SPACEY_BOOT_*` settings with CLI flags applied on top.
pub fn settings_from(cli: &Cli) -> LoaderSettings {
    let mut settings = LoaderSettings::load();
    if let Some(mode) = &cli.proxy_mode {
        settings.proxy_mode = ProxyMode::parse(mode);
    }
    if let Some(retries) = cli.retries {
        settings.probe_retries = retries;
    }
    if let Some(backoff) = cli.backoff_ms {
        settings.probe_backoff_ms = backoff;
    }
    if cli.no_get_fallback {
        settings.allow_get_fallback = false;
    }
    settings
}
