// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Boot configuration document and loader settings.
//!
//! [`BootConfig`] mirrors the `config.json` a page ships. [`LoaderSettings`]
//! holds the knobs that are not part of the document (probe policy, proxy
//! mode, telemetry endpoint) and can be overridden through `SPACEY_BOOT_*`
//! environment variables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{LoaderError, Result};

/// Default location of the configuration document, relative to the page.
pub const DEFAULT_CONFIG_URL: &str = "config.json";

/// Default endpoint for client log beacons.
pub const DEFAULT_CLIENT_LOG_ENDPOINT: &str = "/__client-log";

/// Default query parameter that forces CI logging on.
pub const DEFAULT_CI_LOG_QUERY_PARAM: &str = "ci";

/// Source file extensions probed for local modules, in order.
pub const DEFAULT_LOCAL_EXTENSIONS: &[&str] = &[".tsx", ".ts", ".jsx", ".js"];

/// Environment variable prefix for settings overrides.
const ENV_PREFIX: &str = "SPACEY_BOOT_";

/// How a remote dependency is turned into a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    /// Classic script that publishes a global
    #[default]
    Global,
    /// ECMAScript module imported by URL
    #[serde(alias = "module")]
    Esm,
}

/// One remote dependency (tool or library module).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleDescriptor {
    /// Registry key, and package name unless `package` is set
    pub name: String,
    /// Package name used in URLs when it differs from `name`
    pub package: Option<String>,
    pub version: Option<String>,
    /// Absolute URL; bypasses resolution entirely
    pub url: Option<String>,
    pub provider: Option<String>,
    #[serde(rename = "ci_provider", alias = "ciProvider")]
    pub ci_provider: Option<String>,
    #[serde(rename = "production_provider", alias = "productionProvider")]
    pub production_provider: Option<String>,
    pub file: Option<String>,
    /// Explicit sub-path inside the package; wins over `file`
    pub path: Option<String>,
    pub path_prefix: Option<String>,
    #[serde(alias = "allowJsDelivr")]
    pub allow_fallback_cdn: Option<bool>,
    /// Global the script is expected to publish
    pub global: Option<String>,
    #[serde(alias = "type")]
    pub format: ModuleFormat,
    /// Import-map keys; defaults to `[name]`
    pub import_specifiers: Vec<String>,
}

impl ModuleDescriptor {
    /// Create a descriptor for `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Package name used when building candidate URLs
    pub fn package_name(&self) -> &str {
        self.package.as_deref().unwrap_or(&self.name)
    }

    /// Whether public fallback registries may be tried
    pub fn allows_fallback(&self) -> bool {
        self.allow_fallback_cdn != Some(false)
    }

    /// Check the descriptor invariant: a verbatim `url` or a `name`.
    pub fn validate(&self) -> Result<()> {
        let has_url = self.url.as_deref().is_some_and(|u| !u.is_empty());
        if !has_url && self.name.trim().is_empty() {
            return Err(LoaderError::Config(
                "module descriptor requires either `url` or `name`".into(),
            ));
        }
        Ok(())
    }
}

/// Prefix-matched rule that synthesizes URLs for a family of modules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DynamicModuleRule {
    pub prefix: String,
    pub package: Option<String>,
    pub version: Option<String>,
    /// File name template, `{icon}` is substituted (default `{icon}.js`)
    pub file_pattern: Option<String>,
    /// Dotted global path template, `{icon}` is substituted (default `{icon}`)
    pub global_pattern: Option<String>,
    pub path_prefix: Option<String>,
    pub provider: Option<String>,
    #[serde(rename = "ci_provider", alias = "ciProvider")]
    pub ci_provider: Option<String>,
    #[serde(rename = "production_provider", alias = "productionProvider")]
    pub production_provider: Option<String>,
    #[serde(alias = "allowJsDelivr")]
    pub allow_fallback_cdn: Option<bool>,
    #[serde(alias = "type")]
    pub format: ModuleFormat,
}

impl DynamicModuleRule {
    /// Create a rule matching `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    /// Whether `name` falls under this rule
    pub fn matches(&self, name: &str) -> bool {
        !self.prefix.is_empty() && name.starts_with(&self.prefix)
    }

    /// The part of `name` after the prefix
    pub fn icon<'a>(&self, name: &'a str) -> &'a str {
        name.strip_prefix(self.prefix.as_str()).unwrap_or(name)
    }

    /// Package name; derived from the prefix when not configured
    pub fn package_name(&self) -> String {
        if let Some(pkg) = &self.package {
            return pkg.clone();
        }
        let trimmed = self.prefix.strip_suffix('*').unwrap_or(&self.prefix);
        trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
    }

    /// File path for `icon`
    pub fn file_for(&self, icon: &str) -> String {
        self.file_pattern
            .as_deref()
            .unwrap_or("{icon}.js")
            .replacen("{icon}", icon, 1)
    }

    /// Dotted global path for `icon`
    pub fn global_for(&self, icon: &str) -> String {
        self.global_pattern
            .as_deref()
            .unwrap_or("{icon}")
            .replacen("{icon}", icon, 1)
    }

    /// Whether public fallback registries may be tried
    pub fn allows_fallback(&self) -> bool {
        self.allow_fallback_cdn != Some(false)
    }
}

/// Find the first rule (declaration order) whose prefix matches `name`.
pub fn find_rule<'a>(rules: &'a [DynamicModuleRule], name: &str) -> Option<&'a DynamicModuleRule> {
    rules.iter().find(|rule| rule.matches(name))
}

/// Provider section of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Base used when a descriptor names no provider at all
    pub default: Option<String>,
    /// Alias name -> provider base
    pub aliases: BTreeMap<String, String>,
}

/// Render section of the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    pub root_id: String,
    pub dom_module: Option<String>,
    pub react_module: Option<String>,
    pub create_root: Option<String>,
    pub render_method: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            root_id: "root".to_string(),
            dom_module: None,
            react_module: None,
            create_root: None,
            render_method: "render".to_string(),
        }
    }
}

/// The `config.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BootConfig {
    pub entry: String,
    pub styles: String,
    pub tools: Vec<ModuleDescriptor>,
    pub modules: Vec<ModuleDescriptor>,
    pub dynamic_modules: Vec<DynamicModuleRule>,
    pub providers: ProvidersConfig,
    pub fallback_providers: Vec<String>,
    pub render: RenderConfig,
    pub ci_logging: bool,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            entry: "main.tsx".to_string(),
            styles: "styles.scss".to_string(),
            tools: Vec::new(),
            modules: Vec::new(),
            dynamic_modules: Vec::new(),
            providers: ProvidersConfig::default(),
            fallback_providers: Vec::new(),
            render: RenderConfig::default(),
            ci_logging: false,
        }
    }
}

impl BootConfig {
    /// Parse a configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: BootConfig = serde_json::from_str(text)?;
        for descriptor in config.tools.iter().chain(config.modules.iter()) {
            descriptor.validate()?;
        }
        Ok(config)
    }

    /// Directory of the entry file, `""` when the entry sits at the root.
    pub fn entry_dir(&self) -> &str {
        match self.entry.rfind('/') {
            Some(idx) => &self.entry[..idx],
            None => "",
        }
    }
}

/// Whether CI-like hosts prefer CI providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    /// Decide from the page host
    #[default]
    Auto,
    /// Always prefer `ci_provider`
    Proxy,
    /// Always prefer `production_provider`
    Direct,
}

impl ProxyMode {
    /// Parse a mode name; anything unknown falls back to `Auto`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "proxy" => ProxyMode::Proxy,
            "direct" => ProxyMode::Direct,
            _ => ProxyMode::Auto,
        }
    }
}

/// Loader settings that live outside the configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// URL of the configuration document, relative to the page
    pub config_url: String,
    /// Retry credits per probe
    pub probe_retries: u32,
    /// Base backoff between probe attempts, in milliseconds
    pub probe_backoff_ms: u64,
    /// Whether a rejected HEAD is retried as GET
    pub allow_get_fallback: bool,
    pub proxy_mode: ProxyMode,
    /// Extensions probed for local modules
    pub extensions: Vec<String>,
    pub client_log_endpoint: String,
    pub ci_log_query_param: String,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            config_url: DEFAULT_CONFIG_URL.to_string(),
            probe_retries: 2,
            probe_backoff_ms: 300,
            allow_get_fallback: true,
            proxy_mode: ProxyMode::Auto,
            extensions: DEFAULT_LOCAL_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            client_log_endpoint: DEFAULT_CLIENT_LOG_ENDPOINT.to_string(),
            ci_log_query_param: DEFAULT_CI_LOG_QUERY_PARAM.to_string(),
            timeout: 30,
        }
    }
}

impl LoaderSettings {
    /// Defaults overlaid with `SPACEY_BOOT_*` environment variables.
    pub fn load() -> Self {
        let mut settings = LoaderSettings::default();
        settings.load_from_env();
        settings
    }

    /// Apply `SPACEY_BOOT_*` environment variables.
    fn load_from_env(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(setting) = key.strip_prefix(ENV_PREFIX) {
                let setting = setting.to_lowercase().replace('_', "-");
                self.set(&setting, &value);
            }
        }
    }

    /// Set a value by its kebab-case key. Unknown keys and unparsable values are ignored.
    pub fn set(&mut self, key: &str, value: &str) {
        match key {
            "config-url" => self.config_url = value.to_string(),
            "probe-retries" => {
                if let Ok(n) = value.parse() {
                    self.probe_retries = n;
                }
            }
            "probe-backoff-ms" => {
                if let Ok(n) = value.parse() {
                    self.probe_backoff_ms = n;
                }
            }
            "allow-get-fallback" => self.allow_get_fallback = value == "true",
            "proxy-mode" => self.proxy_mode = ProxyMode::parse(value),
            "extensions" => {
                let exts: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(|e| {
                        if e.starts_with('.') {
                            e.to_string()
                        } else {
                            format!(".{}", e)
                        }
                    })
                    .collect();
                if !exts.is_empty() {
                    self.extensions = exts;
                }
            }
            "client-log-endpoint" => self.client_log_endpoint = value.to_string(),
            "ci-log-query-param" => self.ci_log_query_param = value.to_string(),
            "timeout" => {
                if let Ok(n) = value.parse() {
                    self.timeout = n;
                }
            }
            _ => {}
        }
    }

    /// Base probe backoff
    pub fn probe_backoff(&self) -> Duration {
        Duration::from_millis(self.probe_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_document() {
        let json = r#"{
            "entry": "src/main.tsx",
            "styles": "src/styles.scss",
            "tools": [{"name": "babel", "global": "Babel", "file": "babel.min.js"}],
            "modules": [{
                "name": "react",
                "version": "18.2.0",
                "ci_provider": "/proxy/npm",
                "production_provider": "cdn.example.com",
                "pathPrefix": "umd",
                "file": "react.production.min.js",
                "global": "React",
                "allowJsDelivr": false
            }],
            "dynamicModules": [{"prefix": "icons/", "globalPattern": "Icons.{icon}"}],
            "providers": {"default": "cdn.example.com", "aliases": {"mirror": "mirror.example.com"}},
            "fallbackProviders": ["unpkg.com"],
            "render": {"rootId": "app", "domModule": "react-dom", "reactModule": "react", "createRoot": "createRoot"},
            "ciLogging": true
        }"#;

        let config = BootConfig::from_json(json).unwrap();
        assert_eq!(config.entry_dir(), "src");
        assert_eq!(config.tools[0].global.as_deref(), Some("Babel"));
        let react = &config.modules[0];
        assert_eq!(react.ci_provider.as_deref(), Some("/proxy/npm"));
        assert_eq!(react.path_prefix.as_deref(), Some("umd"));
        assert!(!react.allows_fallback());
        assert_eq!(config.dynamic_modules[0].global_for("Home"), "Icons.Home");
        assert_eq!(config.render.root_id, "app");
        assert_eq!(config.render.render_method, "render");
        assert!(config.ci_logging);
    }

    #[test]
    fn test_defaults() {
        let config = BootConfig::from_json("{}").unwrap();
        assert_eq!(config.entry, "main.tsx");
        assert_eq!(config.styles, "styles.scss");
        assert_eq!(config.entry_dir(), "");
        assert_eq!(config.render.root_id, "root");
    }

    #[test]
    fn test_descriptor_requires_name_or_url() {
        let err = BootConfig::from_json(r#"{"modules": [{"version": "1.0.0"}]}"#).unwrap_err();
        assert!(matches!(err, LoaderError::Config(_)));

        let ok = BootConfig::from_json(r#"{"modules": [{"url": "https://x/y.js"}]}"#);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_rule_helpers() {
        let rule = DynamicModuleRule::new("@icons/*");
        assert_eq!(rule.package_name(), "@icons");
        assert_eq!(rule.file_for("Home"), "Home.js");
        assert_eq!(rule.global_for("Home"), "Home");

        let rules = vec![DynamicModuleRule::new("icons/"), DynamicModuleRule::new("icons/x")];
        assert_eq!(find_rule(&rules, "icons/xyz").unwrap().prefix, "icons/");
        assert!(find_rule(&rules, "lodash").is_none());
    }

    #[test]
    fn test_settings_set() {
        let mut settings = LoaderSettings::default();
        settings.set("probe-retries", "5");
        settings.set("proxy-mode", "PROXY");
        settings.set("extensions", "ts, .js");
        settings.set("timeout", "not-a-number");
        assert_eq!(settings.probe_retries, 5);
        assert_eq!(settings.proxy_mode, ProxyMode::Proxy);
        assert_eq!(settings.extensions, vec![".ts".to_string(), ".js".to_string()]);
        assert_eq!(settings.timeout, 30);
    }

    #[test]
    fn test_proxy_mode_parse() {
        assert_eq!(ProxyMode::parse("direct"), ProxyMode::Direct);
        assert_eq!(ProxyMode::parse(""), ProxyMode::Auto);
        assert_eq!(ProxyMode::parse("bogus"), ProxyMode::Auto);
    }
}
