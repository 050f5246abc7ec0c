//! `analyzer-plugin-gen` — turn NuGet analyzer packages into code-analysis plugins.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and load the tool config ([`config::load_config`]).
//! 2. Check the archive toolchain ([`toolchain`]) and any user-supplied rules file ([`plugin::rules`]).
//! 3. Resolve the package, and its dependencies with `--recurse` ([`repository`], [`graph`]).
//! 4. Find analyzers in each package payload ([`scanner`]).
//! 5. Apply the license-acceptance gate ([`license`]).
//! 6. Assemble one plugin per package with analyzers ([`plugin`]).
//! 7. Render the requested report ([`report`]).
//! 8. Exit `0` on success or `1` when the run failed.

mod cli;
mod config;
mod error;
mod generator;
mod graph;
mod license;
mod log;
mod models;
mod plugin;
mod report;
mod repository;
mod scanner;
#[cfg(test)]
mod testing;
mod toolchain;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, ReportFormat};
use config::{load_config, RunConfig};
use generator::PluginGenerator;
use log::{ConsoleSink, MemorySink, Tee};
use models::Language;
use scanner::{ComponentTableLoader, DefaultConstructorFactory};
use toolchain::ToolchainKind;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir()?;
    let config = load_config(&cwd, cli.config.as_deref())?;

    // Command-line flags win over the config file
    let language = match (&cli.language, &config.generation.language) {
        (Some(arg), _) => Language::from(arg),
        (None, Some(tag)) => tag.parse()?,
        (None, None) => Language::CSharp,
    };
    let output_dir = cli
        .output_dir
        .clone()
        .or_else(|| config.generation.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let feed = cli
        .feed
        .clone()
        .unwrap_or_else(|| config.repository.feed().to_string());
    let toolchain_kind = cli
        .toolchain
        .as_ref()
        .map(ToolchainKind::from)
        .unwrap_or(config.toolchain.kind);

    let run_config = RunConfig::new(
        &cli.package_id,
        cli.package_version.as_deref(),
        language,
        output_dir,
    )?
    .accept_licenses(cli.accept_licenses)
    .recurse(cli.recurse)
    .rule_file(cli.rules.clone());

    let repository = repository::open(&feed, &config.repository.cache_dir())?;
    let toolchain = toolchain_kind.create();

    let memory = MemorySink::new();
    let log = Tee(ConsoleSink::new(cli.quiet), &memory);

    let outcome = PluginGenerator::new(
        repository.as_ref(),
        &ComponentTableLoader,
        &DefaultConstructorFactory,
        toolchain.as_ref(),
        &log,
    )
    .run(&run_config);

    match cli.report {
        ReportFormat::Terminal => {
            report::terminal::render(&run_config.package_id, &outcome, &memory.entries(), cli.quiet)?;
        }
        ReportFormat::Json => {
            println!("{}", report::json::to_string(&outcome, &memory.entries())?);
        }
    }

    if !outcome.success {
        std::process::exit(1);
    }

    Ok(())
}
