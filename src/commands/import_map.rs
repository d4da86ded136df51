// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Import map command implementation.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use spacey_loader::build_import_map;

use crate::cli::{Cli, ImportMapArgs};
use crate::commands::CommandContext;

/// Run the import-map command.
pub async fn run(args: &ImportMapArgs, cli: &Cli) -> Result<()> {
    let ctx = CommandContext::new(cli)?;
    let config = ctx.load_config(&args.config).await?;
    let map = build_import_map(&ctx.resolver(&config), &config.modules).await?;
    let json = map.to_json_pretty()?;

    match &args.out {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "{} {} specifier(s) to {}",
                "Wrote".green().bold(),
                map.len(),
                path.display().cyan()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}
