//! Command line argument parsing for the cqql CLI using clap.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::QuantumConfig;
use crate::error::{CqqlError, Result};
use crate::index::DocId;

/// cqql - score documents with commuting quantum queries
#[derive(Parser, Debug, Clone)]
#[command(name = "cqql")]
#[command(about = "Normalize, run and explain commuting quantum queries")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct CqqlArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl CqqlArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show every stage of the query pipeline
    Normalize(NormalizeArgs),

    /// Search a JSONL document file
    Search(SearchArgs),

    /// Explain the score of one document
    Explain(ExplainArgs),
}

/// Where the query comes from and how it is prepared.
#[derive(Args, Debug, Clone)]
pub struct QueryInput {
    /// Query DSL as JSON text
    #[arg(value_name = "QUERY", required_unless_present = "query_file")]
    pub query: Option<String>,

    /// Read the query DSL from a file
    #[arg(long, value_name = "QUERY_FILE", conflicts_with = "query")]
    pub query_file: Option<PathBuf>,

    /// Field searched by atomic queries that name none
    #[arg(long, value_name = "FIELD")]
    pub default_field: Option<String>,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

impl QueryInput {
    /// Get the query text.
    pub fn query_text(&self) -> Result<String> {
        match (&self.query, &self.query_file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => Ok(fs::read_to_string(path)?),
            (None, None) => Err(CqqlError::invalid_argument(
                "either QUERY or --query-file is required",
            )),
        }
    }

    /// Load the configuration, falling back to the defaults.
    pub fn load_config(&self) -> Result<QuantumConfig> {
        match &self.config {
            Some(path) => QuantumConfig::from_json_file(path),
            None => Ok(QuantumConfig::default()),
        }
    }
}

/// Arguments for normalizing a query
#[derive(Parser, Debug, Clone)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub input: QueryInput,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Document file (JSONL)
    #[arg(long = "docs", value_name = "DOCUMENT_FILE")]
    pub docs: PathBuf,

    #[command(flatten)]
    pub input: QueryInput,

    /// Maximum number of results to return
    #[arg(short, long, default_value = "10")]
    pub limit: usize,
}

/// Arguments for explaining a score
#[derive(Parser, Debug, Clone)]
pub struct ExplainArgs {
    /// Document file (JSONL)
    #[arg(long = "docs", value_name = "DOCUMENT_FILE")]
    pub docs: PathBuf,

    /// Document to explain
    #[arg(long = "doc", value_name = "DOC_ID")]
    pub doc_id: DocId,

    #[command(flatten)]
    pub input: QueryInput,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
