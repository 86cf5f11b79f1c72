use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "devboot",
    about = "Developer-machine bootstrap - install packages, clone your config repo, merge editor MCP servers",
    long_about = "devboot bootstraps a developer machine from a single plan file.

It helps you:
  • Install packages through your package manager (winget, brew, apt, ...)
  • Clone or update your configuration repository
  • Copy editor settings out of that repository
  • Merge the repository's MCP server template into your editor configuration
    without ever overwriting servers you already have

The plan is stored in:
  • $XDG_CONFIG_HOME/devboot/config.toml (or ~/.config/devboot/config.toml)",
    version,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug output (shows INFO and DEBUG messages)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Enable trace output (shows all log messages including TRACE)
    #[arg(short = 't', long, global = true)]
    pub trace: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge an MCP server template into an existing configuration file
    #[command(
        name = "merge-config",
        long_about = "Merge an MCP server template into an existing configuration file.

Servers already present in the existing file always win. Servers that only
appear in the template are appended. Nothing is ever removed, and running the
same merge twice changes nothing the second time.

Missing files are treated as empty. Files that cannot be parsed are treated as
empty and reported as warnings.

Examples:
  # Merge a template into the editor configuration
  devboot merge-config --existing ~/.config/Code/User/mcp.json --incoming ./mcp.json

  # Preview without writing
  devboot merge-config --existing mcp.json --incoming template.json --dry-run"
    )]
    MergeConfig {
        /// Configuration file to merge into (rewritten in place)
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        existing: PathBuf,

        /// Template whose servers are added when missing
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        incoming: PathBuf,

        /// Preview changes without writing them
        #[arg(short, long)]
        dry_run: bool,

        /// Create timestamped backup before making changes
        #[arg(short, long)]
        backup: bool,
    },

    /// Run every step of the plan
    #[command(long_about = "Run every step of the plan, in order:
  1. Install required packages
  2. Clone or update the configuration repository into install-root
  3. Copy settings files
  4. Merge the MCP server template
  5. Install optional packages (with --include-optional)

A package that fails to install is reported and the run continues. A missing
package manager or git client stops the run.

Examples:
  # Bootstrap using the default plan
  devboot setup

  # Include optional runtime dependencies
  devboot setup --include-optional

  # Show what would happen
  devboot setup --dry-run")]
    Setup {
        /// Plan file to use instead of the default location
        #[arg(short, long, env = "DEVBOOT_PLAN", value_hint = clap::ValueHint::FilePath)]
        plan: Option<PathBuf>,

        /// Also install packages marked optional
        #[arg(short = 'o', long)]
        include_optional: bool,

        /// Preview actions without running tools or writing files
        #[arg(short, long)]
        dry_run: bool,

        /// Create timestamped backups of files before replacing them
        #[arg(short, long)]
        backup: bool,
    },

    /// Write an example plan file
    #[command(long_about = "Write an example plan file.

By default the plan is created at $XDG_CONFIG_HOME/devboot/config.toml and an
existing plan is preserved. Use --force to overwrite it.

Examples:
  devboot init
  devboot init --path ./plan.toml --force")]
    Init {
        /// Overwrite an existing plan
        #[arg(short, long)]
        force: bool,

        /// Where to write the plan
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        path: Option<PathBuf>,
    },
}
