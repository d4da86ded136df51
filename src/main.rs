// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! spacey-boot - diagnostics for the spacey runtime dependency loader
//!
//! Shows how a `config.json` resolves from a given page: which provider
//! bases and candidate URLs are tried, which answer, and the import map
//! that results.

use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        println!(
            "{} {} (page: {})",
            "spacey-boot".cyan().bold(),
            spacey_loader::VERSION.dimmed(),
            cli.page
        );
    }

    match &cli.command {
        Commands::Resolve(args) => commands::resolve::run(args, &cli).await,
        Commands::ImportMap(args) => commands::import_map::run(args, &cli).await,
        Commands::Probe(args) => commands::probe::run(args, &cli).await,
    }
}
