// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Page context: where the loader runs and what that implies.

use url::Url;

use crate::config::{BootConfig, ProxyMode};
use crate::error::Result;

/// Host names treated as local/CI contexts.
pub const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

/// The execution context of one page load.
#[derive(Debug, Clone)]
pub struct PageContext {
    location: Url,
    proxy_mode: ProxyMode,
    /// Explicit CI logging override, wins over every heuristic
    ci_override: Option<bool>,
}

impl PageContext {
    /// Create a context for a page at `location`.
    pub fn new(location: Url) -> Self {
        Self {
            location,
            proxy_mode: ProxyMode::Auto,
            ci_override: None,
        }
    }

    /// Parse `href` and create a context for it.
    pub fn parse(href: &str) -> Result<Self> {
        Ok(Self::new(Url::parse(href)?))
    }

    /// Set the proxy mode.
    pub fn with_proxy_mode(mut self, mode: ProxyMode) -> Self {
        self.proxy_mode = mode;
        self
    }

    /// Force CI logging on or off.
    pub fn with_ci_override(mut self, enabled: bool) -> Self {
        self.ci_override = Some(enabled);
        self
    }

    /// The page URL
    pub fn location(&self) -> &Url {
        &self.location
    }

    /// The page URL as a string
    pub fn href(&self) -> &str {
        self.location.as_str()
    }

    pub fn proxy_mode(&self) -> ProxyMode {
        self.proxy_mode
    }

    /// Whether the page host is a loopback host.
    pub fn is_ci_like_host(&self) -> bool {
        self.location
            .host_str()
            .is_some_and(|host| LOOPBACK_HOSTS.contains(&host))
    }

    /// Whether CI providers should be preferred over production ones.
    pub fn prefers_ci_provider(&self) -> bool {
        match self.proxy_mode {
            ProxyMode::Proxy => true,
            ProxyMode::Direct => false,
            ProxyMode::Auto => self.is_ci_like_host(),
        }
    }

    /// Whether verbose client logging should be enabled.
    ///
    /// Checked in order: explicit override, `?<query_param>=1|true`, loopback
    /// host, then the `ciLogging` flag of the configuration.
    pub fn detect_ci_logging(&self, config: Option<&BootConfig>, query_param: &str) -> bool {
        if let Some(enabled) = self.ci_override {
            return enabled;
        }
        let flagged = self
            .location
            .query_pairs()
            .any(|(k, v)| k == query_param && (v == "1" || v.eq_ignore_ascii_case("true")));
        if flagged || self.is_ci_like_host() {
            return true;
        }
        config.is_some_and(|c| c.ci_logging)
    }

    /// Resolve a page-relative path (e.g. `config.json`) to an absolute URL.
    pub fn join(&self, path: &str) -> Result<Url> {
        Ok(self.location.join(path)?)
    }
}
