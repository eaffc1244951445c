//! End-to-end tests for commuting quantum queries over an in-memory index.

use std::time::Duration;

use cqql::formula::Literal;
use cqql::index::DocId;
use cqql::prelude::*;
use cqql::query::QuantumScorer;

fn animals() -> Result<MemoryIndex> {
    let mut index = MemoryIndex::new();
    for text in [
        "a quick brown fox",
        "an eagle watches a crocodile",
        "the fox and the eagle and the crocodile",
        "a crocodile in the river",
        "nothing to see here",
    ] {
        index.add_document(Document::new().with_field("body", text))?;
    }
    Ok(index)
}

fn prepare(text: &str) -> Result<ExecutableQuery> {
    let tree = QueryParser::new().parse(text)?;
    to_query(tree, &QuantumConfig::default())
}

fn value(scorer: &QuantumScorer<'_>, name: &str, doc_id: DocId) -> Result<f32> {
    scorer.matrix()?.value(&Literal::from_name(name), doc_id)
}

#[test]
fn test_disjunction_with_nested_conjunction() -> Result<()> {
    let index = animals()?;
    let query = prepare(
        r#"{"should": [{"match": "fox"}, {"must": [{"match": "eagle"}, {"match": "crocodile"}]}]}"#,
    )?;
    let quantum = query.as_quantum().expect("quantum query");

    assert_eq!(
        quantum.formula().to_string(),
        "(match$$fox) || ((match$$eagle) && (match$$crocodile))"
    );
    assert!(quantum.normalized().is_overlap_free());
    assert_eq!(
        quantum.expression().to_string(),
        "match$$fox + match$$eagle * match$$crocodile - match$$fox * match$$eagle * match$$crocodile"
    );

    let scorer = quantum.scorer(&index);
    for doc_id in 0..5 {
        let fox = value(&scorer, "match$$fox", doc_id)?;
        let eagle = value(&scorer, "match$$eagle", doc_id)?;
        let crocodile = value(&scorer, "match$$crocodile", doc_id)?;
        let expected = fox + eagle * crocodile - fox * eagle * crocodile;
        assert!((scorer.score(doc_id)? - expected).abs() < 1e-6);
    }

    let hits = query.search(&index, 10)?;
    let ids: Vec<DocId> = hits.iter().map(|hit| hit.doc_id).collect();
    assert!(ids.contains(&0));
    assert!(ids.contains(&1));
    assert!(ids.contains(&2));
    assert!(!ids.contains(&3), "crocodile alone does not satisfy the query");
    assert!(!ids.contains(&4));
    Ok(())
}

#[test]
fn test_weighted_conjunction() -> Result<()> {
    let index = animals()?;
    let query = prepare(
        r#"{"must": [{"match": "fox"}, {"match": {"query": "crocodile", "boost": 0.4}}]}"#,
    )?;
    let quantum = query.as_quantum().expect("quantum query");

    assert_eq!(
        quantum.formula().to_string(),
        "(match$$fox) && ((match$$crocodile) && (w$$0$4))"
    );
    assert_eq!(
        quantum.expression().to_string(),
        "match$$fox * match$$crocodile * w$$0$4"
    );

    let scorer = quantum.scorer(&index);
    let fox = value(&scorer, "match$$fox", 2)?;
    let crocodile = value(&scorer, "match$$crocodile", 2)?;
    assert!((scorer.score(2)? - fox * crocodile * 0.4).abs() < 1e-6);

    let hits = query.search(&index, 10)?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc_id, 2);
    Ok(())
}

#[test]
fn test_empty_query_matches_everything() -> Result<()> {
    let index = animals()?;
    let query = prepare("{}")?;
    assert!(matches!(query, ExecutableQuery::MatchAll { boost } if boost == 1.0));

    let hits = query.search(&index, 10)?;
    assert_eq!(hits.len(), 5);
    assert!(hits.iter().all(|hit| hit.score == 1.0));
    let ids: Vec<DocId> = hits.iter().map(|hit| hit.doc_id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    Ok(())
}

#[test]
fn test_negated_match_none_matches_everything() -> Result<()> {
    let index = animals()?;
    let query = prepare(r#"{"must_not": [{"match_none": {}}]}"#)?;
    assert!(matches!(query, ExecutableQuery::MatchAll { .. }));
    assert_eq!(query.search(&index, 3)?.len(), 3);

    let query = prepare(r#"{"must": [{"match_none": {}}]}"#)?;
    assert!(matches!(query, ExecutableQuery::MatchNone));
    assert!(query.search(&index, 3)?.is_empty());
    Ok(())
}

#[test]
fn test_must_not_lowers_scores() -> Result<()> {
    let index = animals()?;
    let query = prepare(
        r#"{"commuting_quantum": {"should": [{"match": "crocodile"}], "must_not": [{"match": "eagle"}]}}"#,
    )?;
    let hits = query.search(&index, 10)?;
    let ids: Vec<DocId> = hits.iter().map(|hit| hit.doc_id).collect();
    assert_eq!(ids[0], 3, "the only crocodile without an eagle ranks first");
    assert!(!ids.contains(&0));
    assert!(!ids.contains(&4));
    assert!(hits.iter().skip(1).all(|hit| hit.score < hits[0].score));
    Ok(())
}

#[test]
fn test_elapsed_timeout_cancels_the_query() -> Result<()> {
    let index = animals()?;
    let tree = QueryParser::new().parse(
        r#"{"should": [{"match": "fox"}, {"must": [{"match": "eagle"}, {"match": "river"}]}]}"#,
    )?;
    let config = QuantumConfig::default().with_timeout(Duration::ZERO);
    let err = to_query(tree, &config)
        .and_then(|query| query.search(&index, 10))
        .unwrap_err();
    assert!(matches!(err, CqqlError::Cancelled(_)), "{err}");
    Ok(())
}

#[test]
fn test_duplicate_clauses_share_one_literal() -> Result<()> {
    let query = prepare(
        r#"{"should": [{"match": "fox"}, {"must": [{"match": "fox"}, {"match": "eagle"}]}]}"#,
    )?;
    let quantum = query.as_quantum().expect("quantum query");
    assert_eq!(quantum.literals().len(), 2);
    assert_eq!(quantum.expression().to_string(), "match$$fox");
    Ok(())
}

#[test]
fn test_field_restricted_terms() -> Result<()> {
    let mut index = MemoryIndex::new();
    index.add_document(
        Document::new()
            .with_field("title", "fox")
            .with_field("body", "eagle"),
    )?;
    index.add_document(
        Document::new()
            .with_field("title", "eagle")
            .with_field("body", "fox"),
    )?;

    let query = prepare(r#"{"must": [{"term": {"title": "fox"}}]}"#)?;
    let hits = query.search(&index, 10)?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc_id, 0);

    let tree = QueryParser::new()
        .with_default_field("body")
        .parse(r#"{"must": [{"match": "FOX"}]}"#)?;
    let hits = to_query(tree, &QuantumConfig::default())?.search(&index, 10)?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc_id, 1);
    Ok(())
}

#[test]
fn test_unsupported_clause_kind() {
    let err = prepare(r#"{"must": [{"range": {"age": {"gte": 3}}}]}"#).unwrap_err();
    assert!(matches!(err, CqqlError::UnsupportedAtomicKind(_)));
}

#[test]
fn test_builder_and_parser_agree() -> Result<()> {
    let parsed = prepare(r#"{"should": [{"match": "fox"}, {"match": "eagle"}], "boost": 2.0}"#)?;
    let built = to_query(
        CommutingQuantumQueryBuilder::new()
            .should(AtomicQuery::matching("fox"))
            .should(AtomicQuery::matching("eagle"))
            .boost(2.0)
            .build(),
        &QuantumConfig::default(),
    )?;

    let index = animals()?;
    assert_eq!(parsed.search(&index, 10)?, built.search(&index, 10)?);
    assert!(
        parsed
            .as_quantum()
            .expect("quantum query")
            .is_equivalent(built.as_quantum().expect("quantum query"))?
    );
    Ok(())
}

#[test]
fn test_concurrent_queries_are_independent() -> Result<()> {
    let index = animals()?;
    let queries = [
        r#"{"should": [{"match": "fox"}, {"match": "eagle"}]}"#,
        r#"{"must": [{"match": "crocodile"}], "must_not": [{"match": "fox"}]}"#,
        r#"{"should": [{"match": "river"}, {"must": [{"match": "fox"}, {"match": "crocodile"}]}]}"#,
    ];
    let expected: Vec<Vec<SearchHit>> = queries
        .iter()
        .map(|text| prepare(text)?.search(&index, 10))
        .collect::<Result<_>>()?;

    std::thread::scope(|scope| {
        let handles: Vec<_> = queries
            .iter()
            .map(|text| {
                let index = &index;
                scope.spawn(move || prepare(text)?.search(index, 10))
            })
            .collect();
        for (handle, expected) in handles.into_iter().zip(&expected) {
            assert_eq!(&handle.join().unwrap().unwrap(), expected);
        }
    });
    Ok(())
}
