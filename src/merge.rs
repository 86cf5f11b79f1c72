use crate::config::reader::{self, DocumentSource};
use crate::config::{writer, ServerDocument, ServerRegistry};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Keys touched by a registry merge, in incoming order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Keys copied from incoming because existing lacked them.
    pub added: Vec<String>,
    /// Keys present on both sides; the existing value was kept.
    pub preserved: Vec<String>,
}

/// Merge `incoming` into `existing`, never overwriting an existing entry.
///
/// New keys are appended after the existing ones in the order they appear in
/// `incoming`.
pub fn merge_registries(existing: &mut ServerRegistry, incoming: &ServerRegistry) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for (name, server) in incoming {
        if existing.contains_key(name) {
            outcome.preserved.push(name.clone());
        } else {
            existing.insert(name.clone(), server.clone());
            outcome.added.push(name.clone());
        }
    }

    outcome
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Compute the report without touching the filesystem.
    pub dry_run: bool,
    /// Copy the existing file to a timestamped backup before replacing it.
    pub backup: bool,
}

/// Result of merging a template into an on-disk configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub entries_before: usize,
    pub added: Vec<String>,
    pub preserved: Vec<String>,
    /// Recoverable problems, such as a malformed input that was treated as empty.
    pub warnings: Vec<String>,
    pub written: bool,
    pub backup_path: Option<PathBuf>,
}

impl MergeReport {
    #[must_use]
    pub fn entries_after(&self) -> usize {
        self.entries_before + self.added.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExistingState {
    Missing,
    Present,
    Malformed,
}

/// Merge the server registry at `incoming_path` into the file at `existing_path`
///
/// Entries already present in the existing file always win. Missing inputs are
/// treated as empty; malformed inputs are treated as empty and reported as
/// warnings.
///
/// # Errors
///
/// Returns an error if:
/// - A requested backup cannot be created
/// - The merged document cannot be written to `existing_path`; the original
///   file is left untouched in that case
pub fn merge_config_files(
    existing_path: &Path,
    incoming_path: &Path,
    options: MergeOptions,
) -> Result<MergeReport> {
    let mut report = MergeReport::default();

    let (mut document, existing_state) = match reader::load_server_document(existing_path) {
        DocumentSource::Missing => (ServerDocument::default(), ExistingState::Missing),
        DocumentSource::Loaded(document) => (document, ExistingState::Present),
        DocumentSource::Malformed { reason } => {
            warn!("Treating existing configuration as empty: {reason}");
            report.warnings.push(format!("ignoring malformed existing configuration: {reason}"));
            (ServerDocument::default(), ExistingState::Malformed)
        },
    };

    let incoming_source = reader::load_server_document(incoming_path);
    let incoming_loaded = incoming_source.is_loaded();
    let incoming = match incoming_source {
        DocumentSource::Missing => {
            debug!("No template at {}, nothing to add", incoming_path.display());
            ServerRegistry::new()
        },
        DocumentSource::Loaded(template) => template.into_registry(),
        DocumentSource::Malformed { reason } => {
            warn!("Treating template as empty: {reason}");
            report.warnings.push(format!("ignoring malformed template: {reason}"));
            ServerRegistry::new()
        },
    };

    let mut registry = document.mcp_servers.take().unwrap_or_default();
    report.entries_before = registry.len();

    let outcome = merge_registries(&mut registry, &incoming);
    for name in &outcome.added {
        debug!("Adding server '{name}'");
    }
    for name in &outcome.preserved {
        debug!("Keeping existing server '{name}'");
    }
    report.added = outcome.added;
    report.preserved = outcome.preserved;
    document.mcp_servers = Some(registry);

    let should_write = match existing_state {
        ExistingState::Present => true,
        ExistingState::Missing => incoming_loaded,
        // Replacing an unreadable file with nothing new would only destroy it.
        ExistingState::Malformed => !report.added.is_empty(),
    };

    if !should_write {
        info!("Nothing to write to {}", existing_path.display());
        return Ok(report);
    }

    if options.dry_run {
        info!("Dry run: would write {} server(s) to {}", report.entries_after(), existing_path.display());
        return Ok(report);
    }

    if options.backup || existing_state == ExistingState::Malformed {
        report.backup_path = writer::backup_file(existing_path)
            .with_context(|| format!("Failed to back up {}", existing_path.display()))?;
        if let Some(ref backup) = report.backup_path {
            info!("Backed up {} to {}", existing_path.display(), backup.display());
        }
    }

    writer::write_server_document(existing_path, &document)
        .with_context(|| format!("Failed to write merged configuration to {}", existing_path.display()))?;
    report.written = true;

    info!(
        "Merged {} new server(s) into {} ({} preserved)",
        report.added.len(),
        existing_path.display(),
        report.preserved.len()
    );

    Ok(report)
}
