//! Output formatting for CLI commands.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cli::args::{CqqlArgs, OutputFormat};
use crate::error::Result;
use crate::index::DocId;
use crate::query::Explanation;

/// Every stage of the pipeline for one query.
#[derive(Debug, Serialize, Deserialize)]
pub struct NormalizationResult {
    pub query: String,
    pub formula: String,
    pub normalized: String,
    pub calculation: String,
    pub literals: Vec<String>,
    pub boost: f32,
    pub splits: usize,
}

/// One search hit with its stored fields.
#[derive(Debug, Serialize, Deserialize)]
pub struct HitResult {
    pub doc_id: DocId,
    pub score: f32,
    pub fields: BTreeMap<String, String>,
}

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub hits: Vec<HitResult>,
    pub total_documents: usize,
    pub duration_ms: u64,
}

/// Result structure for explanations.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExplainResult {
    pub query: String,
    pub explanation: Explanation,
}

impl fmt::Display for NormalizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Query:       {}", self.query)?;
        writeln!(f, "Formula:     {}", self.formula)?;
        writeln!(f, "Normalized:  {}", self.normalized)?;
        writeln!(f, "Calculation: {}", self.calculation)?;
        writeln!(f, "Boost:       {}", self.boost)?;
        writeln!(f, "Splits:      {}", self.splits)?;
        writeln!(f, "Literals:")?;
        for literal in &self.literals {
            writeln!(f, "  {literal}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SearchResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Search Results:")?;
        writeln!(f, "═══════════════")?;

        for (i, hit) in self.hits.iter().enumerate() {
            writeln!(f)?;
            writeln!(
                f,
                "Result {}: document {} (Score: {:.3})",
                i + 1,
                hit.doc_id,
                hit.score
            )?;
            writeln!(f, "─────────────")?;
            for (name, value) in &hit.fields {
                writeln!(f, "{name}: {value}")?;
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Hits: {} of {} documents",
            self.hits.len(),
            self.total_documents
        )?;
        writeln!(f, "Search time: {}ms", self.duration_ms)
    }
}

impl fmt::Display for ExplainResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Query: {}", self.query)?;
        write!(f, "{}", self.explanation)
    }
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize + fmt::Display>(result: &T, args: &CqqlArgs) -> Result<()> {
    print!("{}", render(result, args)?);
    Ok(())
}

/// Render a result in the specified format.
pub fn render<T: Serialize + fmt::Display>(result: &T, args: &CqqlArgs) -> Result<String> {
    match args.output_format {
        OutputFormat::Human => Ok(result.to_string()),
        OutputFormat::Json if args.pretty => Ok(serde_json::to_string_pretty(result)? + "\n"),
        OutputFormat::Json => Ok(serde_json::to_string(result)? + "\n"),
    }
}
