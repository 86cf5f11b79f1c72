#![allow(missing_docs)]

use std::path::PathBuf;

pub mod app_config;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod merge;
pub mod setup;
pub mod tools;

pub use config::{ServerDocument, ServerRegistry};
pub use merge::{merge_config_files, merge_registries, MergeOptions, MergeReport};

#[derive(Debug, thiserror::Error)]
pub enum DevbootError {
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("required tool `{0}` is not available on PATH")]
    MissingTool(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
