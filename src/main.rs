use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use std::fs;
use std::sync::Arc;
use tracing::{info, warn};

use crypto_inventory_core::cli;
use crypto_inventory_core::config::EngineConfig;
use crypto_inventory_core::logging::{self, Verbosity};
use crypto_inventory_core::scanner::Scanner;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    logging::init(Verbosity::from_flags(args.verbose, args.quiet));
    args.validate().context("Invalid arguments")?;

    let mut builder = EngineConfig::builder()
        .with_builtin_presets(!args.no_builtin)
        .with_languages(args.languages());
    for rules in &args.rules {
        builder = builder.with_rule_file(rules);
    }
    if let (Some(types), Some(language)) = (&args.types, args.language) {
        builder = builder.with_type_file(language, types);
    }
    let config = builder.build().context("Failed to load detection rules")?;
    info!(
        rules = config.rule_count(),
        languages = ?config.languages().collect::<Vec<_>>(),
        "configuration loaded"
    );

    let scanner = Scanner::new(Arc::new(config));
    let result = scanner
        .scan_path(&args.path)
        .with_context(|| format!("Failed to scan {}", args.path.display()))?;

    for error in &result.errors {
        warn!("{error}");
    }
    info!(
        files = result.files_scanned,
        findings = result.findings,
        assets = result.nodes,
        errors = result.errors.len(),
        "scan finished"
    );

    let json = scanner
        .inventory()
        .to_json()
        .context("Failed to serialize inventory")?;
    match &args.output_file {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            if !args.quiet {
                eprintln!(
                    "Scanned {} files, {} assets written to {}",
                    result.files_scanned,
                    result.nodes,
                    path.display()
                );
            }
        }
        None => println!("{json}"),
    }

    Ok(())
}
