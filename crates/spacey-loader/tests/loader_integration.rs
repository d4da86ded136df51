// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader Integration Tests
//!
//! Whole page loads against an in-memory site: configuration, remote
//! resolution, local module graphs, dynamic modules, and failure display.

mod common;

use serde_json::json;
use std::sync::Arc;

use common::{Browser, Site};
use spacey_loader::transport::Method;
use spacey_loader::{
    AvailabilityProber, BootConfig, Bootstrapper, LoaderSettings, PageContext, ProviderResolver, RemoteModuleResolver,
    Telemetry, build_import_map,
};

const PAGE: &str = "https://shop.example.com/nested/app/index.html";
const REACT_UMD: &str = "https://cdn.example.com/react@18.2.0/umd/react.js";

fn site_url(path: &str) -> String {
    format!("https://shop.example.com/nested/app/{}", path)
}

fn config() -> String {
    json!({
        "entry": "src/main.tsx",
        "styles": "styles.scss",
        "tools": [{"name": "babel", "url": "https://cdn.example.com/babel.js", "global": "Babel"}],
        "modules": [
            {
                "name": "react",
                "version": "18.2.0",
                "production_provider": "cdn.example.com",
                "file": "react.js",
                "global": "React",
                "allowFallbackCdn": false
            },
            {"name": "react-dom", "url": "https://cdn.example.com/react-dom.js", "global": "ReactDOM"}
        ],
        "dynamicModules": [{
            "prefix": "icons/",
            "package": "@acme/icons",
            "version": "2.0.0",
            "provider": "cdn.example.com",
            "globalPattern": "AcmeIcons.{icon}",
            "allowFallbackCdn": false
        }],
        "render": {"rootId": "root", "domModule": "react-dom", "reactModule": "react", "createRoot": "createRoot"}
    })
    .to_string()
}

fn site(entry: &'static str) -> Arc<Site> {
    let site = Site::new();
    site.file(&site_url("config.json"), &config())
        .file(&site_url("styles.scss"), "$primary: red;")
        .file(&site_url("src/main.tsx"), entry)
        .file(REACT_UMD, "");
    site
}

fn browser() -> Arc<Browser> {
    let browser = Browser::new();
    browser.script("https://cdn.example.com/babel.js", "Babel", json!({"transform": "fn"}));
    browser.script(REACT_UMD, "React", json!({"createElement": "fn"}));
    browser.script("https://cdn.example.com/react-dom.js", "ReactDOM", json!({"createRoot": "fn"}));
    browser
}

fn bootstrapper(site: &Arc<Site>, browser: &Arc<Browser>) -> Bootstrapper {
    Bootstrapper::new(
        PageContext::parse(PAGE).unwrap(),
        LoaderSettings::default(),
        site.clone(),
        browser.bindings(),
    )
}

#[tokio::test]
async fn test_page_load_with_local_module_graph() {
    let site = site(r#"import React from "react"; import App from "./App";"#);
    site.file(
        &site_url("src/App.tsx"),
        r#"import Button from "./components/Button"; import theme from "./theme";"#,
    )
    .file(&site_url("src/components/Button/index.tsx"), r#"import theme from "../../theme";"#)
    .file(&site_url("src/theme.ts"), "export default {};");
    let browser = browser();

    let booted = bootstrapper(&site, &browser).bootstrap().await.unwrap();

    assert!(browser.errors.lock().is_empty());
    assert_eq!(
        *browser.compiled.lock(),
        vec![
            "nested/app/src/theme.ts",
            "nested/app/src/components/Button/index.tsx",
            "nested/app/src/App.tsx",
            "src/main.tsx",
        ]
    );
    assert_eq!(site.gets(&site_url("src/theme.ts")), 1);
    assert_eq!(*browser.css.lock(), vec!["--primary: red;"]);

    // Remote module resolved past the missing flat layout to the UMD build.
    let heads: Vec<String> = site
        .requests()
        .into_iter()
        .filter(|(m, _)| *m == Method::Head)
        .map(|(_, u)| u)
        .collect();
    assert_eq!(
        heads,
        vec!["https://cdn.example.com/react@18.2.0/react.js", REACT_UMD]
    );
    assert!(browser.injected.lock().contains(&REACT_UMD.to_string()));

    let rendered = browser.rendered.lock().clone();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].0, "root");
    assert_eq!(rendered[0].1["path"], "src/main.tsx");
    assert_eq!(booted.app.get("deps"), Some(&json!(["react", "./App"])));
}

#[tokio::test]
async fn test_page_load_with_dynamic_module() {
    let icon_url = "https://cdn.example.com/@acme/icons@2.0.0/Home.js";
    let site = site(r#"import Home from "icons/Home";"#);
    site.file(icon_url, "");
    let browser = browser();
    browser.script(icon_url, "AcmeIcons", json!({"Home": {"svg": "<svg/>"}}));

    let booted = bootstrapper(&site, &browser).bootstrap().await.unwrap();

    let home = booted.registry.get("icons/Home").unwrap();
    assert_eq!(home.get("svg"), Some(&json!("<svg/>")));
    assert!(Arc::ptr_eq(&home, &booted.registry.get("Home").unwrap()));
    let injected = browser.injected.lock().clone();
    assert_eq!(injected.iter().filter(|u| *u == icon_url).count(), 1);
}

#[tokio::test]
async fn test_missing_global_is_shown_instead_of_ui() {
    let site = site(r#"import App from "./App";"#);
    let browser = Browser::new();
    browser.script("https://cdn.example.com/babel.js", "Babel", json!({}));
    browser.script(REACT_UMD, "React", json!({}));
    // react-dom loads but never publishes its global.
    browser.script("https://cdn.example.com/react-dom.js", "Unrelated", json!({}));

    assert!(bootstrapper(&site, &browser).bootstrap().await.is_none());

    assert!(browser.rendered.lock().is_empty());
    assert_eq!(
        *browser.errors.lock(),
        vec!["Bootstrap error: Global not found after loading https://cdn.example.com/react-dom.js: ReactDOM"]
    );
}

#[tokio::test]
async fn test_import_map_for_configured_modules() {
    let site = site("");
    let page = PageContext::parse(PAGE).unwrap();
    let config = BootConfig::from_json(&config()).unwrap();
    let mut providers = ProviderResolver::new(page);
    providers.configure(&config);
    let resolver = RemoteModuleResolver::new(
        Arc::new(providers),
        AvailabilityProber::new(site.clone(), Telemetry::default()),
        Telemetry::default(),
    );

    let map = build_import_map(&resolver, &config.modules).await.unwrap();

    assert_eq!(map.get("react"), Some(REACT_UMD));
    assert_eq!(map.get("react-dom"), Some("https://cdn.example.com/react-dom.js"));
}
