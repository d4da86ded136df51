// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CLI argument parsing for spacey-boot.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// spacey-boot - inspect how the runtime loader resolves a configuration
#[derive(Parser, Debug)]
#[command(name = "spacey-boot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Page URL the loader runs on; drives CI/production provider choice
    #[arg(long, global = true, env = "SPACEY_BOOT_PAGE", default_value = "https://localhost/")]
    pub page: String,

    /// Provider preference: auto, proxy, or direct
    #[arg(long, global = true)]
    pub proxy_mode: Option<String>,

    /// Retry credits per probe
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Base probe backoff in milliseconds
    #[arg(long, global = true)]
    pub backoff_ms: Option<u64>,

    /// Do not retry a rejected HEAD as GET
    #[arg(long, global = true)]
    pub no_get_fallback: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve every tool and module of a configuration
    Resolve(ResolveArgs),

    /// Print the import map for a configuration's modules
    #[command(alias = "importmap")]
    ImportMap(ImportMapArgs),

    /// Probe a single URL
    Probe(ProbeArgs),
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Path or URL of config.json
    #[arg(default_value = "config.json")]
    pub config: String,

    /// List every candidate URL instead of probing
    #[arg(long)]
    pub candidates: bool,

    /// Also resolve these dynamic module names (e.g. icons/Home)
    #[arg(long = "dynamic", value_name = "NAME")]
    pub dynamic: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ImportMapArgs {
    /// Path or URL of config.json
    #[arg(default_value = "config.json")]
    pub config: String,

    /// Write the import map to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// URL to probe
    pub url: String,
}
