use crate::app_config::{expand_home, PackageSpec, SetupPlan};
use crate::config::writer;
use crate::merge::{merge_config_files, MergeOptions, MergeReport};
use crate::tools::{Outcome, PackageManager, VersionControl};
use crate::DevbootError;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct SetupOptions {
    pub include_optional: bool,
    pub dry_run: bool,
    pub backup: bool,
}

#[derive(Debug, Default)]
pub struct SetupReport {
    /// Package id and what the package manager did with it.
    pub packages: Vec<(String, Outcome)>,
    /// Optional packages left alone because they were not requested.
    pub skipped_packages: Vec<String>,
    pub repository: Option<Outcome>,
    pub copied: Vec<PathBuf>,
    pub warnings: Vec<String>,
    pub merge: Option<MergeReport>,
}

impl SetupReport {
    #[must_use]
    pub fn failed_packages(&self) -> Vec<&str> {
        self.packages
            .iter()
            .filter(|(_, outcome)| outcome.is_failure())
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// Run every step of a plan in order
///
/// A package that fails to install is recorded and the run continues. A
/// missing tool, a failed repository clone, or an unwritable destination stops
/// the run.
///
/// # Errors
///
/// Returns an error if:
/// - Packages are listed but no package manager is configured or available
/// - A repository is configured but the version control client is unavailable
/// - Cloning or updating the repository fails
/// - A settings file or the merged MCP configuration cannot be written
pub fn run_setup(
    plan: &SetupPlan,
    package_manager: Option<&dyn PackageManager>,
    version_control: &dyn VersionControl,
    options: SetupOptions,
) -> Result<SetupReport> {
    let mut report = SetupReport::default();

    let required: Vec<&PackageSpec> = plan.required_packages().collect();
    install_packages(&required, package_manager, options, &mut report)?;

    if let Some(ref repository) = plan.repository {
        let outcome = sync_repository(&repository.url, &plan.install_root(), version_control, options)?;
        report.repository = outcome;
    }

    for copy in &plan.copies {
        let source = plan.source_path(&copy.source);
        let destination = expand_home(&copy.destination);
        copy_settings_file(&source, &destination, options, &mut report)?;
    }

    if let Some(ref mcp) = plan.mcp {
        let existing = expand_home(&mcp.existing);
        let incoming = plan.source_path(&mcp.incoming);
        let merge_options = MergeOptions { dry_run: options.dry_run, backup: options.backup };
        let merge_report = merge_config_files(&existing, &incoming, merge_options)?;
        report.warnings.extend(merge_report.warnings.iter().cloned());
        report.merge = Some(merge_report);
    }

    let optional: Vec<&PackageSpec> = plan.optional_packages().collect();
    if options.include_optional {
        install_packages(&optional, package_manager, options, &mut report)?;
    } else {
        report.skipped_packages = optional.iter().map(|p| p.id.clone()).collect();
        if !report.skipped_packages.is_empty() {
            debug!("Skipping optional packages: {}", report.skipped_packages.join(", "));
        }
    }

    Ok(report)
}

fn install_packages(
    packages: &[&PackageSpec],
    package_manager: Option<&dyn PackageManager>,
    options: SetupOptions,
    report: &mut SetupReport,
) -> Result<()> {
    if packages.is_empty() {
        return Ok(());
    }

    let manager = package_manager.ok_or_else(|| {
        DevbootError::Config("packages are listed but no [package-manager] is configured".to_string())
    })?;
    if !manager.is_available() {
        return Err(DevbootError::MissingTool(manager.name().to_string()).into());
    }

    for package in packages {
        if options.dry_run {
            info!("Dry run: would install {}", package.id);
            continue;
        }

        let outcome = match manager.install(&package.id) {
            Ok(outcome) => outcome,
            Err(e) => {
                let message =
                    format!("could not run {} for {}: {e:#}", manager.name(), package.id);
                error!("{message}");
                report.warnings.push(message);
                Outcome::NotStarted
            },
        };

        if outcome.is_failure() {
            error!("{}: {outcome}", package.id);
        } else {
            info!("{}: {outcome}", package.id);
        }
        report.packages.push((package.id.clone(), outcome));
    }

    Ok(())
}

fn sync_repository(
    url: &str,
    dir: &Path,
    version_control: &dyn VersionControl,
    options: SetupOptions,
) -> Result<Option<Outcome>> {
    if !version_control.is_available() {
        return Err(DevbootError::MissingTool(version_control.name().to_string()).into());
    }

    if options.dry_run {
        info!("Dry run: would clone or update {url} in {}", dir.display());
        return Ok(None);
    }

    let outcome = version_control
        .clone_or_update(url, dir)
        .with_context(|| format!("Failed to sync repository {url}"))?;

    if outcome.is_failure() {
        anyhow::bail!("{} could not clone or update {url}: {outcome}", version_control.name());
    }

    info!("Repository {}: {outcome}", dir.display());
    Ok(Some(outcome))
}

fn copy_settings_file(
    source: &Path,
    destination: &Path,
    options: SetupOptions,
    report: &mut SetupReport,
) -> Result<()> {
    if !source.is_file() {
        let message = format!("settings source {} does not exist, skipping", source.display());
        warn!("{message}");
        report.warnings.push(message);
        return Ok(());
    }

    if options.dry_run {
        info!("Dry run: would copy {} to {}", source.display(), destination.display());
        return Ok(());
    }

    if options.backup {
        if let Some(backup) = writer::backup_file(destination)? {
            info!("Backed up {} to {}", destination.display(), backup.display());
        }
    }

    let contents =
        fs::read(source).with_context(|| format!("Failed to read {}", source.display()))?;
    writer::write_atomic(destination, &contents)?;

    info!("Copied {} to {}", source.display(), destination.display());
    report.copied.push(destination.to_path_buf());
    Ok(())
}
