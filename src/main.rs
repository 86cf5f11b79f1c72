#![allow(missing_docs)]

use anyhow::Result;
use clap::Parser;
use devboot::{
    app_config::{expand_home, SetupPlan},
    bootstrap,
    cli::{Cli, Commands},
    merge::{merge_config_files, MergeOptions, MergeReport},
    setup::{run_setup, SetupOptions, SetupReport},
    tools::{CommandPackageManager, GitCli, PackageManager},
};
use std::path::{Path, PathBuf};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(cli.debug, cli.trace);

    match cli.command {
        Commands::MergeConfig { existing, incoming, dry_run, backup } => {
            run_merge_config(&existing, &incoming, MergeOptions { dry_run, backup })
        },
        Commands::Setup { plan, include_optional, dry_run, backup } => {
            run_setup_command(plan.as_deref(), SetupOptions { include_optional, dry_run, backup })
        },
        Commands::Init { force, path } => run_init(path, force),
    }
}

/// Initialize tracing with the specified debug/trace flags
fn initialize_tracing(debug: bool, trace: bool) {
    let log_level = if trace {
        Level::TRACE
    } else if debug {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::builder().with_default_directive(log_level.into()).from_env_lossy())
        .init();
}

fn run_merge_config(existing: &Path, incoming: &Path, options: MergeOptions) -> Result<()> {
    let existing = expand_home(existing);
    let incoming = expand_home(incoming);
    debug!("Merging {} into {}", incoming.display(), existing.display());

    let report = merge_config_files(&existing, &incoming, options)?;
    print_merge_report(&report, &existing, options.dry_run);
    Ok(())
}

fn print_merge_report(report: &MergeReport, existing: &Path, dry_run: bool) {
    for warning in &report.warnings {
        eprintln!("Warning: {warning}");
    }
    for name in &report.added {
        println!("  + {name}");
    }
    for name in &report.preserved {
        println!("  = {name} (kept existing)");
    }
    if let Some(ref backup) = report.backup_path {
        println!("Backup created: {}", backup.display());
    }

    let counts = format!(
        "{} added, {} preserved, {} total",
        report.added.len(),
        report.preserved.len(),
        report.entries_after()
    );
    if dry_run {
        println!(
            "Would merge {} new server(s) into {}: {counts}",
            report.added.len(),
            existing.display()
        );
    } else if report.written {
        println!(
            "Merged {} new server(s) into {}: {counts}",
            report.added.len(),
            existing.display()
        );
    } else {
        println!("Nothing written to {}: {counts}", existing.display());
    }
}

fn run_setup_command(plan_path: Option<&Path>, options: SetupOptions) -> Result<()> {
    let (plan, loaded_from) = SetupPlan::load(plan_path)?;
    debug!("Loaded plan from {}", loaded_from.display());

    let package_manager = plan.package_manager.clone().map(CommandPackageManager::new);
    let git = GitCli::new();

    let report = run_setup(
        &plan,
        package_manager.as_ref().map(|p| p as &dyn PackageManager),
        &git,
        options,
    )?;
    print_setup_report(&report);

    let failed = report.failed_packages();
    if !failed.is_empty() {
        anyhow::bail!("{} package(s) failed to install: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

fn print_setup_report(report: &SetupReport) {
    for warning in &report.warnings {
        eprintln!("Warning: {warning}");
    }
    for (id, outcome) in &report.packages {
        println!("  {id}: {outcome}");
    }
    for id in &report.skipped_packages {
        println!("  {id}: skipped (optional)");
    }
    if let Some(outcome) = report.repository {
        println!("Repository: {outcome}");
    }
    for destination in &report.copied {
        println!("Copied settings to {}", destination.display());
    }
    if let Some(ref merge) = report.merge {
        for name in &merge.added {
            println!("  + {name}");
        }
        println!(
            "MCP servers: {} added, {} preserved",
            merge.added.len(),
            merge.preserved.len()
        );
    }
    println!("Setup complete.");
}

fn run_init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => expand_home(&path),
        None => SetupPlan::config_path()?,
    };

    if bootstrap::bootstrap_plan(&path, force)? {
        println!("Created plan at {}", path.display());
        println!();
        println!("Next steps:");
        println!("  1. Edit the plan to match your machine");
        println!("  2. Run 'devboot setup --dry-run' to preview");
        println!("  3. Run 'devboot setup'");
    } else {
        println!("Plan already exists at {} (use --force to overwrite)", path.display());
    }
    Ok(())
}
