//! Command-line interface components
//!
//! This module contains CLI-specific code for the SIDRA ETL application:
//! argument parsing and command handlers.

pub mod args;
pub mod commands;

pub use args::{CacheAction, CacheArgs, Cli, Commands, DownloadArgs, GlobalArgs, RunArgs};
pub use commands::{handle_cache, handle_download, handle_run};
