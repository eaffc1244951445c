//! Parser for the JSON query DSL.
//!
//! ```json
//! { "commuting_quantum": {
//!     "must":     [ {"match": "fox"} ],
//!     "should":   [ {"match": {"query": "crocodile", "boost": 0.4}},
//!                   {"must": [ {"term": {"title": "eagle"}} ]} ],
//!     "must_not": {"match_none": {}},
//!     "boost": 2.0 } }
//! ```
//!
//! A clause is either a nested compound (with or without the
//! `commuting_quantum` wrapper) or exactly one atomic clause: `match`, `term`,
//! `match_all` or `match_none`. Clause lists accept a single clause object in
//! place of an array.

use serde_json::{Map, Value};

use crate::error::{CqqlError, Result};
use crate::query::occurrence::{AtomicKind, AtomicQuery, CompoundNode, Occur, OccurrenceNode};

const WRAPPER: &str = "commuting_quantum";

/// Parses commuting quantum queries from JSON.
#[derive(Debug, Default, Clone)]
pub struct QueryParser {
    /// Field applied to `match` and `term` clauses that name none.
    default_field: Option<String>,
}

impl QueryParser {
    /// Create a new query parser that searches all fields by default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field used when a clause does not name one.
    pub fn with_default_field<S: Into<String>>(mut self, field: S) -> Self {
        self.default_field = Some(field.into());
        self
    }

    /// Get the default field.
    pub fn default_field(&self) -> Option<&str> {
        self.default_field.as_deref()
    }

    /// Parse JSON text into an occurrence tree.
    pub fn parse(&self, text: &str) -> Result<OccurrenceNode> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| CqqlError::parse(format!("invalid query JSON: {e}")))?;
        self.parse_value(&value)
    }

    /// Parse a JSON value into an occurrence tree.
    pub fn parse_value(&self, value: &Value) -> Result<OccurrenceNode> {
        let object = as_object(value, "query")?;
        match object.get(WRAPPER) {
            Some(inner) if object.len() == 1 => {
                Ok(OccurrenceNode::Compound(self.parse_compound(inner, WRAPPER)?))
            }
            _ => Ok(OccurrenceNode::Compound(self.parse_compound(value, "query")?)),
        }
    }

    fn parse_compound(&self, value: &Value, path: &str) -> Result<CompoundNode> {
        let object = as_object(value, path)?;
        let mut node = CompoundNode::new();
        for (key, value) in object {
            let occur = match key.as_str() {
                "must" => Occur::Must,
                "should" => Occur::Should,
                "must_not" => Occur::MustNot,
                "boost" => {
                    node.boost = parse_boost(value, &format!("{path}.boost"))?;
                    continue;
                }
                "filter" => {
                    return Err(CqqlError::parse(format!(
                        "{path}: filter clauses are not supported"
                    )));
                }
                other => {
                    return Err(CqqlError::parse(format!("{path}: unknown key \"{other}\"")));
                }
            };
            let clause_path = format!("{path}.{key}");
            match value {
                Value::Array(clauses) => {
                    for (i, clause) in clauses.iter().enumerate() {
                        let clause = self.parse_clause(clause, &format!("{clause_path}[{i}]"))?;
                        node.add_clause(occur, clause);
                    }
                }
                Value::Object(_) => {
                    let clause = self.parse_clause(value, &clause_path)?;
                    node.add_clause(occur, clause);
                }
                _ => {
                    return Err(CqqlError::parse(format!(
                        "{clause_path}: expected a clause or an array of clauses"
                    )));
                }
            }
        }
        Ok(node)
    }

    fn parse_clause(&self, value: &Value, path: &str) -> Result<OccurrenceNode> {
        let object = as_object(value, path)?;

        if let Some(inner) = object.get(WRAPPER) {
            if object.len() != 1 {
                return Err(CqqlError::parse(format!(
                    "{path}: \"{WRAPPER}\" must be the only key of its clause"
                )));
            }
            let inner_path = format!("{path}.{WRAPPER}");
            return Ok(OccurrenceNode::Compound(self.parse_compound(inner, &inner_path)?));
        }
        if object.keys().all(|key| is_compound_key(key)) {
            return Ok(OccurrenceNode::Compound(self.parse_compound(value, path)?));
        }

        let mut entries = object.iter();
        let (Some((name, body)), None) = (entries.next(), entries.next()) else {
            return Err(CqqlError::parse(format!(
                "{path}: an atomic clause must have exactly one kind"
            )));
        };
        let kind: AtomicKind = name
            .parse()
            .map_err(|_| CqqlError::unsupported_kind(format!("{name} at {path}")))?;
        let query = self.parse_atomic(kind, body, &format!("{path}.{name}"))?;
        Ok(OccurrenceNode::Atomic(query))
    }

    fn parse_atomic(&self, kind: AtomicKind, body: &Value, path: &str) -> Result<AtomicQuery> {
        if !kind.takes_value() {
            let mut query = AtomicQuery::new(kind, "");
            if let Value::Object(options) = body {
                for (key, value) in options {
                    match key.as_str() {
                        "boost" => query.set_boost(parse_boost(value, &format!("{path}.boost"))?),
                        other => {
                            return Err(CqqlError::parse(format!(
                                "{path}: unknown key \"{other}\""
                            )));
                        }
                    }
                }
            } else if !body.is_null() {
                return Err(CqqlError::parse(format!("{path}: expected an object")));
            }
            return Ok(query);
        }

        let query = match body {
            Value::Object(options) if is_value_options(kind, options) => {
                self.parse_value_options(kind, options, path)?
            }
            Value::Object(options) => {
                let mut entries = options.iter();
                let (Some((field, inner)), None) = (entries.next(), entries.next()) else {
                    return Err(CqqlError::parse(format!(
                        "{path}: expected a value or a single field"
                    )));
                };
                if is_option_key(field) {
                    return Err(CqqlError::parse(format!("{path}: missing \"query\"")));
                }
                let field_path = format!("{path}.{field}");
                let query = match inner {
                    Value::Object(options) => self.parse_value_options(kind, options, &field_path)?,
                    scalar => AtomicQuery::new(kind, scalar_text(scalar, &field_path)?),
                };
                query.with_field(field.as_str())
            }
            scalar => AtomicQuery::new(kind, scalar_text(scalar, path)?),
        };

        match &self.default_field {
            Some(default_field) if query.field().is_none() => {
                Ok(query.with_field(default_field.as_str()))
            }
            _ => Ok(query),
        }
    }

    /// Parse `{"query": <value>, "boost": <float>}`.
    fn parse_value_options(
        &self,
        kind: AtomicKind,
        options: &Map<String, Value>,
        path: &str,
    ) -> Result<AtomicQuery> {
        let mut value = None;
        let mut boost = None;
        for (key, option) in options {
            match key.as_str() {
                "query" => value = Some(scalar_text(option, &format!("{path}.query"))?),
                "value" if kind == AtomicKind::Term => {
                    value = Some(scalar_text(option, &format!("{path}.value"))?)
                }
                "boost" => boost = Some(parse_boost(option, &format!("{path}.boost"))?),
                other => {
                    return Err(CqqlError::parse(format!("{path}: unknown key \"{other}\"")));
                }
            }
        }
        let value = value.ok_or_else(|| CqqlError::parse(format!("{path}: missing \"query\"")))?;
        let mut query = AtomicQuery::new(kind, value);
        if let Some(boost) = boost {
            query.set_boost(boost);
        }
        Ok(query)
    }
}

fn is_compound_key(key: &str) -> bool {
    matches!(key, "must" | "should" | "must_not" | "boost" | "filter")
}

/// Option names that can never be read as a field name.
fn is_option_key(key: &str) -> bool {
    matches!(key, "query" | "value" | "boost")
}

/// Whether an object holds query options rather than a single field.
fn is_value_options(kind: AtomicKind, options: &Map<String, Value>) -> bool {
    options.contains_key("query") || (kind == AtomicKind::Term && options.contains_key("value"))
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| CqqlError::parse(format!("{path}: expected an object")))
}

fn scalar_text(value: &Value, path: &str) -> Result<String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => Err(CqqlError::parse(format!(
            "{path}: expected a string, number or boolean"
        ))),
    }
}

fn parse_boost(value: &Value, path: &str) -> Result<f32> {
    let boost = value
        .as_f64()
        .ok_or_else(|| CqqlError::parse(format!("{path}: boost must be a number")))?
        as f32;
    if !boost.is_finite() || boost < 0.0 {
        return Err(CqqlError::parse(format!(
            "{path}: boost must be finite and non-negative, got {boost}"
        )));
    }
    Ok(boost)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<OccurrenceNode> {
        QueryParser::new().parse(text)
    }

    #[test]
    fn test_parse_nested_should() {
        let tree = parse(
            r#"{"commuting_quantum": {"should": [
                {"match": "fox"},
                {"must": [{"match": "eagle"}, {"match": "crocodile"}]}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(
            tree.description(),
            "(match(fox) (+match(eagle) +match(crocodile)))"
        );
    }

    #[test]
    fn test_wrapper_is_optional() {
        let wrapped = parse(r#"{"commuting_quantum": {"must": {"match": "fox"}}}"#).unwrap();
        let bare = parse(r#"{"must": {"match": "fox"}}"#).unwrap();
        assert_eq!(wrapped, bare);
    }

    #[test]
    fn test_nested_wrapper() {
        let tree = parse(
            r#"{"must": [{"commuting_quantum": {"should": [{"term": "a"}, {"term": "b"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(tree.description(), "(+(term(a) term(b)))");
    }

    #[test]
    fn test_atomic_shapes() {
        let tree = parse(
            r#"{"must": [
                {"match": {"query": "crocodile", "boost": 0.4}},
                {"match": {"title": "fox"}},
                {"match": {"title": {"query": "eagle", "boost": 2}}},
                {"term": {"value": "exact"}},
                {"term": {"tag": {"value": "x"}}},
                {"term": 42},
                {"match_all": {"boost": 0.5}},
                {"match_none": {}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            tree.description(),
            "(+match(crocodile)^0.4 +match(title:fox) +match(title:eagle)^2 +term(exact) \
             +term(tag:x) +term(42) +match_all^0.5 +match_none)"
        );
    }

    #[test]
    fn test_compound_boost() {
        let tree = parse(r#"{"should": [{"match": "fox"}], "boost": 2.5}"#).unwrap();
        assert_eq!(tree.boost(), 2.5);
    }

    #[test]
    fn test_default_field() {
        let parser = QueryParser::new().with_default_field("body");
        assert_eq!(parser.default_field(), Some("body"));
        let tree = parser
            .parse(r#"{"must": [{"match": "fox"}, {"match": {"title": "eagle"}}]}"#)
            .unwrap();
        assert_eq!(tree.description(), "(+match(body:fox) +match(title:eagle))");
    }

    #[test]
    fn test_empty_query() {
        let tree = parse("{}").unwrap();
        assert_eq!(tree.description(), "()");
        let tree = parse(r#"{"commuting_quantum": {}}"#).unwrap();
        assert_eq!(tree.description(), "()");
    }

    #[test]
    fn test_unsupported_kind() {
        let err = parse(r#"{"must": [{"range": {"year": {"gte": 2000}}}]}"#).unwrap_err();
        assert!(matches!(
            &err,
            CqqlError::UnsupportedAtomicKind(kind) if kind.starts_with("range")
        ));
        assert!(err.to_string().contains("query.must[0]"), "{err}");

        let err = parse(r#"{"should": [{"match": "fox"}, {"bool": {}}]}"#).unwrap_err();
        assert!(matches!(err, CqqlError::UnsupportedAtomicKind(_)));
        assert!(err.to_string().contains("bool at query.should[1]"), "{err}");
    }

    #[test]
    fn test_filter_is_rejected() {
        let err = parse(r#"{"filter": [{"match": "fox"}]}"#).unwrap_err();
        assert!(matches!(err, CqqlError::QueryParse(_)));
        assert!(err.to_string().contains("filter"));
    }

    #[test]
    fn test_malformed_queries() {
        for text in [
            "not json",
            "[]",
            r#"{"must": 3}"#,
            r#"{"should": [{"match": "fox", "term": "fox"}]}"#,
            r#"{"must": [{"match": {"query": "fox", "fuzziness": 2}}]}"#,
            r#"{"must": [{"match": {"title": "fox", "body": "fox"}}]}"#,
            r#"{"must": [{"match": ["fox"]}]}"#,
            r#"{"must": [{"match_all": {"query": "x"}}]}"#,
            r#"{"must": [{"match": "fox"}], "minimum_should_match": 1}"#,
            r#"{"must": [{"match": {"query": "fox", "boost": -1}}]}"#,
            r#"{"boost": "high"}"#,
        ] {
            let err = parse(text).unwrap_err();
            assert!(
                matches!(err, CqqlError::QueryParse(_)),
                "{text}: unexpected error {err:?}"
            );
        }
    }

    #[test]
    fn test_options_without_query_are_rejected() {
        for text in [
            r#"{"must": [{"match": {"boost": 0.4}}]}"#,
            r#"{"must": [{"match": {"value": "fox"}}]}"#,
            r#"{"must": [{"term": {"boost": 2}}]}"#,
        ] {
            let err = parse(text).unwrap_err();
            assert!(matches!(err, CqqlError::QueryParse(_)), "{text}: {err:?}");
            assert!(err.to_string().contains("missing \"query\""), "{text}: {err}");
        }
    }

    #[test]
    fn test_error_names_the_offending_clause() {
        let err =
            parse(r#"{"should": [{"match": "fox"}, {"match": {"query": "x", "boost": -2}}]}"#)
                .unwrap_err();
        assert!(err.to_string().contains("query.should[1].match.boost"));
    }
}
