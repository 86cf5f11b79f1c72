//! External tools the bootstrap delegates to.
//!
//! Each capability is a trait so the setup runner can be driven by fakes in
//! tests. The process-backed implementations only shell out; they never parse
//! tool output beyond the exit status.

use crate::app_config::PackageManagerConfig;
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, info};

/// Placeholder replaced by the package id in package manager arguments.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Result of asking a tool to make something present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Installed,
    AlreadyPresent,
    /// An existing checkout was brought up to date.
    Updated,
    /// The tool ran and exited unsuccessfully; `None` when killed by a signal.
    Failed(Option<i32>),
    /// The tool could not be launched at all.
    NotStarted,
}

impl Outcome {
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed(_) | Self::NotStarted)
    }

    fn from_status(status: ExitStatus, success: Self) -> Self {
        if status.success() {
            success
        } else {
            Self::Failed(status.code())
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installed => write!(f, "installed"),
            Self::AlreadyPresent => write!(f, "already present"),
            Self::Updated => write!(f, "updated"),
            Self::Failed(Some(code)) => write!(f, "failed (exit code {code})"),
            Self::Failed(None) => write!(f, "failed (terminated by signal)"),
            Self::NotStarted => write!(f, "failed (could not be started)"),
        }
    }
}

pub trait ExternalTool {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;
}

pub trait PackageManager: ExternalTool {
    /// Install a package unless it is already present.
    ///
    /// # Errors
    ///
    /// Returns an error only if the package manager could not be launched.
    fn install(&self, id: &str) -> Result<Outcome>;
}

pub trait VersionControl: ExternalTool {
    /// Clone `url` into `dir`, or update `dir` if it already holds a checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` exists but is not a checkout, or the client
    /// could not be launched.
    fn clone_or_update(&self, url: &str, dir: &Path) -> Result<Outcome>;
}

/// Locate `program` the way a shell would.
///
/// Programs given with a path component are checked directly; bare names are
/// searched for on `PATH`.
#[must_use]
pub fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let direct = dir.join(program);
        if direct.is_file() {
            return Some(direct);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{program}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Substitute the package id into configured arguments.
#[must_use]
pub fn expand_args(args: &[String], id: &str) -> Vec<String> {
    args.iter().map(|arg| arg.replace(ID_PLACEHOLDER, id)).collect()
}

fn quiet_status<I, S>(program: &str, args: I) -> Result<ExitStatus>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("Failed to execute {program}"))
}

fn interactive_status<I, S>(program: &str, args: I) -> Result<ExitStatus>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(program).args(args).status().with_context(|| format!("Failed to execute {program}"))
}

/// A package manager driven entirely by configured command lines.
#[derive(Debug, Clone)]
pub struct CommandPackageManager {
    config: PackageManagerConfig,
}

impl CommandPackageManager {
    #[must_use]
    pub const fn new(config: PackageManagerConfig) -> Self {
        Self { config }
    }

    fn is_installed(&self, id: &str) -> Result<bool> {
        if self.config.check_args.is_empty() {
            return Ok(false);
        }
        let status = quiet_status(&self.config.program, expand_args(&self.config.check_args, id))?;
        Ok(status.success())
    }
}

impl ExternalTool for CommandPackageManager {
    fn name(&self) -> &str {
        &self.config.program
    }

    fn is_available(&self) -> bool {
        find_program(&self.config.program).is_some()
    }
}

impl PackageManager for CommandPackageManager {
    fn install(&self, id: &str) -> Result<Outcome> {
        if self.is_installed(id)? {
            debug!("{id} is already installed");
            return Ok(Outcome::AlreadyPresent);
        }

        info!("Installing {id} with {}", self.config.program);
        let status =
            interactive_status(&self.config.program, expand_args(&self.config.install_args, id))?;
        Ok(Outcome::from_status(status, Outcome::Installed))
    }
}

/// The `git` command line client.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl GitCli {
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("git")
    }

    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl ExternalTool for GitCli {
    fn name(&self) -> &str {
        &self.program
    }

    fn is_available(&self) -> bool {
        find_program(&self.program).is_some()
    }
}

impl VersionControl for GitCli {
    fn clone_or_update(&self, url: &str, dir: &Path) -> Result<Outcome> {
        if dir.join(".git").exists() {
            info!("Updating {}", dir.display());
            let status = interactive_status(
                &self.program,
                [OsStr::new("-C"), dir.as_os_str(), OsStr::new("pull"), OsStr::new("--ff-only")],
            )?;
            return Ok(Outcome::from_status(status, Outcome::Updated));
        }

        if dir.exists() && dir.read_dir().map(|mut d| d.next().is_some()).unwrap_or(true) {
            anyhow::bail!(
                "{} exists and is not a git checkout; refusing to clone into it",
                dir.display()
            );
        }

        info!("Cloning {url} into {}", dir.display());
        let status = interactive_status(
            &self.program,
            [OsStr::new("clone"), OsStr::new(url), dir.as_os_str()],
        )?;
        Ok(Outcome::from_status(status, Outcome::Installed))
    }
}
