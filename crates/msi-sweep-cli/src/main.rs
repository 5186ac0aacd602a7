mod commands;
mod interrupt;
mod logging;
mod progress;

use std::error::Error as StdError;
use std::path::Path;
use std::process;

use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use msi_sweep_core::exclusion::system_summary_source;
use msi_sweep_core::models::format_size;
use msi_sweep_core::{msi, platform, AppConfig, OrphanedFile, ScanEngine};
use progress::CliReporter;
use serde::Serialize;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn StdError>> {
    dotenv().ok();

    let guard = logging::init_logger();

    let config = match msi_sweep_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            drop(guard);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let outcome = match args.command {
        Some(Commands::Scan { json, no_metadata }) => run_scan(&config, json, no_metadata),
        Some(Commands::Registered { json }) => run_registered(&config, json),
        Some(Commands::Inspect { path }) => run_inspect(&path),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            println!("Installer cache: {}", config.installer_dir().display());
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        let code = exit_code(err.as_ref());
        drop(guard);
        process::exit(code);
    }

    Ok(())
}

/// Logs the failure and picks the process exit code.
fn exit_code(err: &(dyn StdError + 'static)) -> i32 {
    match err.downcast_ref::<msi_sweep_core::Error>() {
        Some(core) if core.is_permission_denied() => {
            error!("{}", core);
            eprintln!(
                "{}",
                "Access denied. Run msi-sweep from an elevated (administrator) prompt."
                    .red()
                    .bold()
            );
            2
        }
        Some(core) if core.is_cancelled() => {
            eprintln!("{}", "Scan cancelled.".yellow());
            130
        }
        _ => {
            error!("Error: {}", err);
            1
        }
    }
}

#[derive(Serialize)]
struct ScanReport<'a> {
    installer_dir: String,
    reboot_pending: bool,
    registered_count: usize,
    registered_total_bytes: u64,
    actionable: &'a [OrphanedFile],
    actionable_bytes: u64,
    excluded: &'a [OrphanedFile],
    excluded_bytes: u64,
}

fn run_scan(config: &AppConfig, json: bool, no_metadata: bool) -> Result<(), Box<dyn StdError>> {
    let api = msi::system_installer()?;
    let engine = ScanEngine::new(config.clone());
    interrupt::cancel_on_ctrl_c(engine.cancel_token());
    let reporter = CliReporter::new();
    let result = engine.scan(api.as_ref(), &reporter)?;

    let summaries = if no_metadata {
        None
    } else {
        system_summary_source()
    };
    let filtered = engine.filter(&result.orphaned_files, summaries.as_deref());
    let reboot_pending = config.check_pending_reboot && platform::has_pending_reboot();

    if json {
        let report = ScanReport {
            installer_dir: engine.installer_dir().to_string_lossy().into_owned(),
            reboot_pending,
            registered_count: result.registered_packages.len(),
            registered_total_bytes: result.registered_total_bytes,
            actionable: &filtered.actionable,
            actionable_bytes: filtered.actionable_bytes(),
            excluded: &filtered.excluded,
            excluded_bytes: filtered.excluded_bytes(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!(
        "Installer cache: {}",
        engine.installer_dir().display().to_string().cyan()
    );
    println!(
        "Registered packages: {} ({})",
        result.registered_packages.len().to_string().green(),
        format_size(result.registered_total_bytes).green()
    );
    println!(
        "Orphaned packages: {} ({})",
        result.orphaned_files.len().to_string().red(),
        format_size(result.orphaned_total_bytes()).red()
    );

    print_orphans(
        "Actionable",
        &filtered.actionable,
        filtered.actionable_bytes(),
    );
    print_orphans(
        "Excluded by filters",
        &filtered.excluded,
        filtered.excluded_bytes(),
    );

    if reboot_pending {
        println!();
        println!(
            "{}",
            "A reboot is pending. Pending updates may still register cached packages; \
             reboot and scan again before removing anything."
                .yellow()
        );
    }

    info!(
        "{} actionable, {} excluded",
        filtered.actionable.len(),
        filtered.excluded.len()
    );
    Ok(())
}

fn print_orphans(heading: &str, files: &[OrphanedFile], total_bytes: u64) {
    if files.is_empty() {
        return;
    }
    println!();
    println!(
        "{} ({}, {}):",
        heading.bold(),
        files.len(),
        format_size(total_bytes)
    );
    for file in files {
        println!(
            "  {:<40} {:<5} {:>10}",
            file.file_name(),
            file.type_label(),
            file.size_display()
        );
    }
}

fn run_registered(config: &AppConfig, json: bool) -> Result<(), Box<dyn StdError>> {
    let api = msi::system_installer()?;
    let engine = ScanEngine::new(config.clone());
    interrupt::cancel_on_ctrl_c(engine.cancel_token());
    let reporter = CliReporter::new();
    let registered = engine.registered_packages(api.as_ref(), &reporter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&registered)?);
        return Ok(());
    }

    println!();
    for package in &registered {
        let product = if package.product_name.is_empty() {
            "<unknown product>".dimmed().to_string()
        } else {
            package.product_name.clone()
        };
        let marker = if package.vendor_warning {
            " [component, verify]".yellow().to_string()
        } else if package.is_secondary_claim {
            " [component]".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "  {:<40} {} {}{}",
            package.file_name(),
            product,
            package.product_code.dimmed(),
            marker
        );
    }
    println!();
    println!(
        "{} registered packages",
        registered.len().to_string().green()
    );
    Ok(())
}

fn run_inspect(path: &Path) -> Result<(), Box<dyn StdError>> {
    if !path.is_file() {
        return Err(format!("{} is not a file", path.display()).into());
    }
    let source = system_summary_source().ok_or(msi_sweep_core::Error::UnsupportedPlatform)?;

    match source.summary_info(&path.to_string_lossy()) {
        Some(summary) => {
            println!("{}", path.display().to_string().bold());
            println!("  Title:    {}", summary.title);
            println!("  Subject:  {}", summary.subject);
            println!("  Author:   {}", summary.author);
            println!("  Comments: {}", summary.comments);
            println!(
                "  Signer:   {}",
                if summary.signer.is_empty() {
                    "(unsigned)".dimmed().to_string()
                } else {
                    summary.signer
                }
            );
        }
        None => println!("No summary information in {}", path.display()),
    }
    Ok(())
}
