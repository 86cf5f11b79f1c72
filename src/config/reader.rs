use super::ServerDocument;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// What was found at a configuration path.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSource {
    /// Nothing exists at the path.
    Missing,
    Loaded(ServerDocument),
    /// The file exists but could not be read or parsed.
    Malformed { reason: String },
}

impl DocumentSource {
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Read a plugin-server configuration file
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns an error if:
/// - Unable to read the file (when it exists)
/// - Unable to parse the JSON content
pub fn read_server_document<P: AsRef<Path>>(path: P) -> anyhow::Result<Option<ServerDocument>> {
    let path_ref = path.as_ref();

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to read {}: {}", path_ref.display(), e));
        },
    };

    // Windows editors often prefix UTF-8 files with a byte-order mark.
    let json = content.strip_prefix('\u{feff}').unwrap_or(&content);
    let document: ServerDocument = serde_json::from_str(json)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path_ref.display(), e))?;

    Ok(Some(document))
}

/// Load a configuration file without failing.
///
/// Read and parse errors are downgraded to [`DocumentSource::Malformed`] so the
/// caller can warn and continue with an empty registry.
pub fn load_server_document<P: AsRef<Path>>(path: P) -> DocumentSource {
    let path_ref = path.as_ref();

    match read_server_document(path_ref) {
        Ok(Some(document)) => {
            debug!(
                "Loaded {} server(s) from {}",
                document.server_count(),
                path_ref.display()
            );
            DocumentSource::Loaded(document)
        },
        Ok(None) => {
            debug!("No configuration at {}", path_ref.display());
            DocumentSource::Missing
        },
        Err(e) => DocumentSource::Malformed { reason: e.to_string() },
    }
}
