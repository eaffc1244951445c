//! Command implementations for the cqql CLI.

use std::time::Instant;

use log::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::error::Result;
use crate::index::MemoryIndex;
use crate::query::{CommutingQuantumQuery, QueryParser, to_query};
use crate::query::occurrence::OccurrenceNode;

/// Execute a CLI command.
pub fn execute_command(args: CqqlArgs) -> Result<()> {
    match &args.command {
        Command::Normalize(normalize_args) => {
            output_result(&normalize_query(normalize_args)?, &args)
        }
        Command::Search(search_args) => output_result(&search_documents(search_args)?, &args),
        Command::Explain(explain_args) => output_result(&explain_document(explain_args)?, &args),
    }
}

/// Parse the query of `input` into an occurrence tree.
fn parse_query(input: &QueryInput) -> Result<OccurrenceNode> {
    let parser = match &input.default_field {
        Some(field) => QueryParser::new().with_default_field(field.clone()),
        None => QueryParser::new(),
    };
    parser.parse(&input.query_text()?)
}

/// Run the preparation pipeline and report every stage.
pub fn normalize_query(args: &NormalizeArgs) -> Result<NormalizationResult> {
    let config = args.input.load_config()?;
    let query = CommutingQuantumQuery::new(parse_query(&args.input)?, &config)?;

    Ok(NormalizationResult {
        query: query.description().to_string(),
        formula: query.formula().to_string(),
        normalized: query.normalized().to_string(),
        calculation: query.expression().to_string(),
        literals: query.literals().iter().map(ToString::to_string).collect(),
        boost: query.boost(),
        splits: query.normalized().split_count(),
    })
}

/// Search a JSONL document file.
pub fn search_documents(args: &SearchArgs) -> Result<SearchResults> {
    let config = args.input.load_config()?;
    let tree = parse_query(&args.input)?;
    let description = tree.description();
    let index = MemoryIndex::from_jsonl_file(&args.docs)?;

    let start_time = Instant::now();
    let query = to_query(tree, &config)?;
    let hits = query.search(&index, args.limit)?;
    let duration = start_time.elapsed();
    info!(
        "Found {} hits for {} in {:?}",
        hits.len(),
        description,
        duration
    );

    let hits = hits
        .into_iter()
        .map(|hit| HitResult {
            doc_id: hit.doc_id,
            score: hit.score,
            fields: index
                .document(hit.doc_id)
                .map(|document| document.fields.clone())
                .unwrap_or_default(),
        })
        .collect();

    Ok(SearchResults {
        query: description,
        hits,
        total_documents: index.len(),
        duration_ms: duration.as_millis() as u64,
    })
}

/// Explain the score of one document.
pub fn explain_document(args: &ExplainArgs) -> Result<ExplainResult> {
    let config = args.input.load_config()?;
    let query = CommutingQuantumQuery::new(parse_query(&args.input)?, &config)?;
    let index = MemoryIndex::from_jsonl_file(&args.docs)?;
    let explanation = query.scorer(&index).explain(args.doc_id)?;

    Ok(ExplainResult {
        query: query.description().to_string(),
        explanation,
    })
}
