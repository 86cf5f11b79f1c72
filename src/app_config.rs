use crate::DevbootError;
use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything one machine's bootstrap needs, read from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct SetupPlan {
    /// Where the configuration repository is cloned. Relative sources resolve here.
    pub install_root: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<PackageManagerConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<PackageSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryConfig>,
    #[serde(default, rename = "copy", skip_serializing_if = "Vec::is_empty")]
    pub copies: Vec<CopySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp: Option<McpMergeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct PackageManagerConfig {
    pub program: String,
    pub install_args: Vec<String>,
    /// Exits zero when the package is already installed. Empty disables the check.
    #[serde(default)]
    pub check_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct PackageSpec {
    pub id: String,
    /// Only installed when explicitly requested.
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RepositoryConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CopySpec {
    pub source: PathBuf,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct McpMergeConfig {
    /// Template shipped in the configuration repository.
    pub incoming: PathBuf,
    /// The user's live configuration file.
    pub existing: PathBuf,
}

/// Expand a leading `~` to the current user's home directory.
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => BaseDirs::new()
            .map_or_else(|| path.to_path_buf(), |dirs| dirs.home_dir().join(rest)),
        Err(_) => path.to_path_buf(),
    }
}

impl SetupPlan {
    /// Load a plan from an explicit path or from the default location
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Unable to determine the config directory
    /// - The plan file does not exist
    /// - Unable to read the file or parse its TOML content
    pub fn load(explicit: Option<&Path>) -> Result<(Self, PathBuf)> {
        let path = match explicit {
            Some(path) => expand_home(path),
            None => Self::config_path()?,
        };

        if !path.exists() {
            return Err(DevbootError::Config(format!(
                "no plan found at {} (run `devboot init` to create one)",
                path.display()
            ))
            .into());
        }

        Ok((Self::load_from(&path)?, path))
    }

    /// Parse the plan at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid plan.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan at {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML plan at {}", path.display()))
    }

    /// Get the path to the default plan file
    ///
    /// # Errors
    ///
    /// Returns an error if unable to determine the config directory
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
            Ok(PathBuf::from(config_home).join("devboot").join("config.toml"))
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", "devboot") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            anyhow::bail!("Could not determine config directory")
        }
    }

    #[must_use]
    pub fn install_root(&self) -> PathBuf {
        expand_home(&self.install_root)
    }

    /// Resolve a path that may be relative to the install root.
    #[must_use]
    pub fn source_path(&self, path: &Path) -> PathBuf {
        let expanded = expand_home(path);
        if expanded.is_absolute() {
            expanded
        } else {
            self.install_root().join(expanded)
        }
    }

    pub fn required_packages(&self) -> impl Iterator<Item = &PackageSpec> {
        self.packages.iter().filter(|p| !p.optional)
    }

    pub fn optional_packages(&self) -> impl Iterator<Item = &PackageSpec> {
        self.packages.iter().filter(|p| p.optional)
    }
}
