// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Probe command implementation.

use anyhow::{Result, bail};
use owo_colors::OwoColorize;

use crate::cli::{Cli, ProbeArgs};
use crate::commands::CommandContext;

/// Run the probe command.
pub async fn run(args: &ProbeArgs, cli: &Cli) -> Result<()> {
    let ctx = CommandContext::new(cli)?;
    let result = ctx.prober().probe(&args.url).await;
    let status = result
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "no response".to_string());

    if result.reachable {
        println!("{} {} ({})", "reachable".green().bold(), args.url, status);
        Ok(())
    } else {
        println!("{} {} ({})", "unreachable".red().bold(), args.url, status.dimmed());
        bail!("{} is not reachable", args.url)
    }
}
