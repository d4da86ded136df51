// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Resolve command implementation.

use anyhow::{Result, bail};
use owo_colors::OwoColorize;

use spacey_loader::config::find_rule;
use spacey_loader::{ModuleDescriptor, RemoteModuleResolver};

use crate::cli::{Cli, ResolveArgs};
use crate::commands::CommandContext;

/// Run the resolve command.
pub async fn run(args: &ResolveArgs, cli: &Cli) -> Result<()> {
    let ctx = CommandContext::new(cli)?;
    let config = ctx.load_config(&args.config).await?;
    let resolver = ctx.resolver(&config);

    let mut failures = 0;
    for (kind, descriptors) in [("tools", &config.tools), ("modules", &config.modules)] {
        if descriptors.is_empty() {
            continue;
        }
        println!("{}", format!("{}:", kind).yellow());
        for descriptor in descriptors {
            if args.candidates {
                print_candidates(&resolver, descriptor);
            } else if !resolve_one(&resolver, descriptor).await {
                failures += 1;
            }
        }
    }

    if !args.dynamic.is_empty() {
        println!("{}", "dynamic modules:".yellow());
    }
    for name in &args.dynamic {
        let Some(rule) = find_rule(&config.dynamic_modules, name) else {
            println!("  {} {}: no matching rule", "✗".red(), name);
            failures += 1;
            continue;
        };
        let icon = rule.icon(name);
        if args.candidates {
            println!("  {}", name.cyan());
            for candidate in resolver.rule_candidates(rule, icon) {
                println!("    {}", candidate.dimmed());
            }
            continue;
        }
        match resolver.resolve_dynamic(rule, name, icon).await {
            Ok(url) => println!("  {} {} -> {}", "✓".green(), name, url.cyan()),
            Err(e) => {
                println!("  {} {}: {}", "✗".red(), name, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} dependency(ies) could not be resolved", failures);
    }
    Ok(())
}

async fn resolve_one(resolver: &RemoteModuleResolver, descriptor: &ModuleDescriptor) -> bool {
    match resolver.resolve(descriptor).await {
        Ok(url) => {
            println!("  {} {} -> {}", "✓".green(), descriptor.name, url.cyan());
            true
        }
        Err(e) => {
            println!("  {} {}: {}", "✗".red(), descriptor.name, e);
            false
        }
    }
}

fn print_candidates(resolver: &RemoteModuleResolver, descriptor: &ModuleDescriptor) {
    println!("  {}", descriptor.name.cyan());
    if let Some(url) = descriptor.url.as_deref().filter(|u| !u.is_empty()) {
        println!("    {} {}", url.dimmed(), "(verbatim)".dimmed());
        return;
    }
    for candidate in resolver.candidates(descriptor) {
        println!("    {}", candidate.dimmed());
    }
}
