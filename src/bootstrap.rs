use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Example plan written by `devboot init`
pub const EXAMPLE_PLAN: &str = r#"# devboot plan
# Describes how to bootstrap this machine. Paths may start with "~/".
# Relative `source` and `incoming` paths resolve against `install-root`.

install-root = "~/dotfiles"

# Any package manager works as long as it can be driven from the command line.
# "{id}" is replaced by each package id.
[package-manager]
program = "winget"
install-args = ["install", "--id", "{id}", "-e", "--silent", "--accept-package-agreements"]
check-args = ["list", "--id", "{id}", "-e"]

[[packages]]
id = "Git.Git"

[[packages]]
id = "Microsoft.VisualStudioCode"

# Runtime needed by some plugin servers; installed with `devboot setup --include-optional`
[[packages]]
id = "OpenJS.NodeJS.LTS"
optional = true

[repository]
url = "https://github.com/your-name/dotfiles.git"

[[copy]]
source = "vscode/settings.json"
destination = "~/.config/Code/User/settings.json"

# Servers from the template are added; servers you already have are never touched.
[mcp]
incoming = "vscode/mcp.json"
existing = "~/.config/Code/User/mcp.json"
"#;

/// Write the example plan to `path`
///
/// Returns `false` when a plan already exists and `force` is not set.
///
/// # Errors
///
/// Returns an error if the parent directory or the file cannot be created.
pub fn bootstrap_plan(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        info!("Plan already exists at {}", path.display());
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    fs::write(path, EXAMPLE_PLAN)
        .with_context(|| format!("Failed to create plan: {}", path.display()))?;
    info!("Created plan at {}", path.display());

    Ok(true)
}
