//! Tests for the CLI commands over JSONL fixtures.

use std::io::Write;

use clap::Parser;
use tempfile::NamedTempFile;

use cqql::cli::{
    Command, CqqlArgs, explain_document, normalize_query, render, search_documents,
};
use cqql::error::{CqqlError, Result};

fn documents() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"id": 10, "body": "a quick brown fox"}}"#).unwrap();
    writeln!(file, r#"{{"id": 20, "body": "an eagle watches a crocodile"}}"#).unwrap();
    writeln!(file).unwrap();
    writeln!(file, r#"{{"id": 30, "body": "fox eagle crocodile", "year": 2024}}"#).unwrap();
    file
}

fn parse(args: &[&str]) -> CqqlArgs {
    CqqlArgs::try_parse_from(args).unwrap()
}

#[test]
fn test_normalize_command() -> Result<()> {
    let args = parse(&[
        "cqql",
        "normalize",
        r#"{"should": [{"match": "fox"}, {"must": [{"match": "eagle"}, {"match": "crocodile"}]}]}"#,
    ]);
    let Command::Normalize(normalize) = &args.command else {
        panic!("Expected Normalize command");
    };
    let result = normalize_query(normalize)?;
    assert_eq!(
        result.formula,
        "(match$$fox) || ((match$$eagle) && (match$$crocodile))"
    );
    assert_eq!(result.literals.len(), 3);
    assert_eq!(result.boost, 1.0);

    let text = render(&result, &args)?;
    assert!(text.contains("Calculation: match$$fox + match$$eagle * match$$crocodile"));
    Ok(())
}

#[test]
fn test_search_command() -> Result<()> {
    let docs = documents();
    let path = docs.path().to_str().unwrap();
    let args = parse(&[
        "cqql",
        "--format",
        "json",
        "search",
        "--docs",
        path,
        r#"{"must": [{"match": "fox"}]}"#,
        "--limit",
        "5",
    ]);
    let Command::Search(search) = &args.command else {
        panic!("Expected Search command");
    };
    let results = search_documents(search)?;
    let ids: Vec<u64> = results.hits.iter().map(|hit| hit.doc_id).collect();
    assert_eq!(ids, vec![30, 10], "the shorter field ranks first");
    assert_eq!(results.total_documents, 3);
    assert_eq!(results.hits[0].fields.get("year").map(String::as_str), Some("2024"));

    let value: serde_json::Value = serde_json::from_str(&render(&results, &args)?)?;
    assert_eq!(value["hits"][0]["doc_id"], 30);
    Ok(())
}

#[test]
fn test_explain_command_with_query_and_config_files() -> Result<()> {
    let docs = documents();
    let mut query = NamedTempFile::new().unwrap();
    write!(
        query,
        r#"{{"commuting_quantum": {{"must": [{{"match": "fox"}}], "must_not": [{{"match": "eagle"}}]}}}}"#
    )
    .unwrap();
    let mut config = NamedTempFile::new().unwrap();
    write!(config, r#"{{"parallel_matrix": false}}"#).unwrap();

    let args = parse(&[
        "cqql",
        "explain",
        "--docs",
        docs.path().to_str().unwrap(),
        "--doc",
        "30",
        "--query-file",
        query.path().to_str().unwrap(),
        "--config",
        config.path().to_str().unwrap(),
    ]);
    let Command::Explain(explain) = &args.command else {
        panic!("Expected Explain command");
    };
    let result = explain_document(explain)?;
    assert_eq!(result.explanation.doc_id, 30);
    let calculation = "match$$fox * (1 - match$$eagle)";
    assert_eq!(result.explanation.calculation, calculation);
    let text = render(&result, &args)?;
    assert!(text.contains(&format!(
        "The calculation formula used for scoring is: {calculation}"
    )));
    Ok(())
}

#[test]
fn test_explain_unknown_document() {
    let docs = documents();
    let args = parse(&[
        "cqql",
        "explain",
        "--docs",
        docs.path().to_str().unwrap(),
        "--doc",
        "99",
        r#"{"must": [{"match": "fox"}]}"#,
    ]);
    let Command::Explain(explain) = &args.command else {
        panic!("Expected Explain command");
    };
    assert!(matches!(
        explain_document(explain),
        Err(CqqlError::ScoreResolution(_))
    ));
}

#[test]
fn test_malformed_query() {
    let args = parse(&["cqql", "normalize", r#"{"must": 3}"#]);
    let Command::Normalize(normalize) = &args.command else {
        panic!("Expected Normalize command");
    };
    assert!(matches!(
        normalize_query(normalize),
        Err(CqqlError::QueryParse(_))
    ));
}
