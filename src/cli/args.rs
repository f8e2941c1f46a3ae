//! Command-line argument parsing for SIDRA ETL
//!
//! This module defines the CLI structure using clap derive macros:
//! downloading tables into the cache, running job files end to end, and
//! inspecting the cache.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::models::{Classifications, TableQuery, Territories};
use crate::constants::sidra;

/// SIDRA ETL - Load IBGE statistics tables into PostgreSQL
#[derive(Parser, Debug)]
#[command(
    name = "sidra_etl",
    version,
    about = "Download IBGE SIDRA tables and load them into PostgreSQL",
    long_about = "Downloads IBGE SIDRA tables period by period into a deterministic local cache,
skipping responses already cached, then refines and appends them to PostgreSQL tables."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (trace level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory path
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download every period of a table into the cache
    Download(DownloadArgs),

    /// Run a job file: download, refine and load
    Run(RunArgs),

    /// Inspect the response cache
    Cache(CacheArgs),
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// SIDRA table id (e.g. "1612")
    #[arg(short, long)]
    pub table: String,

    /// Territorial filter as LEVEL or LEVEL=id,id (repeatable)
    #[arg(short = 'n', long = "territory", value_name = "LEVEL=IDS", value_parser = parse_level_filter)]
    pub territories: Vec<(String, Vec<String>)>,

    /// Variable codes; every variable when omitted
    #[arg(long, value_delimiter = ',')]
    pub variables: Option<Vec<String>>,

    /// Classification filter as ID=cat,cat (repeatable)
    #[arg(short = 'c', long = "classification", value_name = "ID=CATEGORIES", value_parser = parse_level_filter)]
    pub classifications: Vec<(String, Vec<String>)>,

    /// Download once per concrete category combination
    #[arg(long, conflicts_with = "classifications")]
    pub unnest: bool,
}

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Job definition file
    #[arg(value_name = "JOB")]
    pub job: PathBuf,

    /// Load into an in-memory store instead of the database
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for cache management
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache management actions
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached responses of a table
    List {
        /// SIDRA table id
        #[arg(short, long)]
        table: String,
    },
}

/// Parse `KEY` or `KEY=a,b` into a key and its ids
///
/// `KEY`, `KEY=` and `KEY=all` all mean "no filter" and yield no ids.
pub fn parse_level_filter(raw: &str) -> Result<(String, Vec<String>), String> {
    let (key, ids) = match raw.split_once('=') {
        Some((key, ids)) => (key.trim(), ids.trim()),
        None => (raw.trim(), ""),
    };
    if key.is_empty() {
        return Err(format!("missing key in '{}'", raw));
    }

    let ids = if ids.is_empty() || ids == sidra::ALL {
        Vec::new()
    } else {
        ids.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    };
    Ok((key.to_string(), ids))
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Log level requested by flags, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::TRACE)
        } else if self.global.verbose {
            Some(tracing::Level::DEBUG)
        } else {
            None
        }
    }
}

impl DownloadArgs {
    /// Table query described by the arguments
    pub fn to_query(&self) -> TableQuery {
        let territories: Territories = self.territories.iter().cloned().collect();
        let mut query = TableQuery::new(&self.table, territories);

        if let Some(variables) = &self.variables {
            query = query.with_variables(variables.clone());
        }
        if self.unnest {
            query = query.unnested();
        } else if !self.classifications.is_empty() {
            let classifications: Classifications = self.classifications.iter().cloned().collect();
            query = query.with_classifications(classifications);
        }
        query
    }
}
