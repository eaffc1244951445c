//! Occurrence trees: the must/should/must_not structure of a commuting quantum query.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::NEUTRAL_BOOST;
use crate::error::{CqqlError, Result};

/// Occurrence requirements for clauses of a compound node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occur {
    /// The clause must match (equivalent to AND).
    Must,
    /// The clause should match (equivalent to OR).
    Should,
    /// The clause must not match (equivalent to NOT).
    MustNot,
}

/// The atomic query kinds a commuting quantum query can combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomicKind {
    /// Analyzed full-text match.
    Match,
    /// Exact, unanalyzed term.
    Term,
    /// Matches every document.
    MatchAll,
    /// Matches no document.
    MatchNone,
}

impl AtomicKind {
    /// The DSL name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            AtomicKind::Match => "match",
            AtomicKind::Term => "term",
            AtomicKind::MatchAll => "match_all",
            AtomicKind::MatchNone => "match_none",
        }
    }

    /// Whether clauses of this kind carry a value to match against.
    pub fn takes_value(&self) -> bool {
        matches!(self, AtomicKind::Match | AtomicKind::Term)
    }
}

impl FromStr for AtomicKind {
    type Err = CqqlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "match" => Ok(AtomicKind::Match),
            "term" => Ok(AtomicKind::Term),
            "match_all" => Ok(AtomicKind::MatchAll),
            "match_none" => Ok(AtomicKind::MatchNone),
            other => Err(CqqlError::unsupported_kind(other)),
        }
    }
}

impl fmt::Display for AtomicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single atomic condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicQuery {
    kind: AtomicKind,
    field: Option<String>,
    value: String,
    boost: f32,
}

impl AtomicQuery {
    /// Create a new atomic query searching all fields.
    pub fn new<V: Into<String>>(kind: AtomicKind, value: V) -> Self {
        AtomicQuery {
            kind,
            field: None,
            value: value.into(),
            boost: NEUTRAL_BOOST,
        }
    }

    /// Create a `match` query.
    pub fn matching<V: Into<String>>(value: V) -> Self {
        Self::new(AtomicKind::Match, value)
    }

    /// Create a `term` query.
    pub fn term<V: Into<String>>(value: V) -> Self {
        Self::new(AtomicKind::Term, value)
    }

    /// Create a `match_all` query.
    pub fn match_all() -> Self {
        Self::new(AtomicKind::MatchAll, "")
    }

    /// Create a `match_none` query.
    pub fn match_none() -> Self {
        Self::new(AtomicKind::MatchNone, "")
    }

    /// Restrict the query to one field.
    pub fn with_field<F: Into<String>>(mut self, field: F) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Get the kind.
    pub fn kind(&self) -> AtomicKind {
        self.kind
    }

    /// Get the field, if restricted to one.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Get the value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Get the boost factor.
    pub fn boost(&self) -> f32 {
        self.boost
    }

    /// Set the boost factor.
    pub fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    /// Get a human-readable description of this query.
    pub fn description(&self) -> String {
        let base = match (&self.field, self.kind.takes_value()) {
            (_, false) => self.kind.name().to_string(),
            (Some(field), true) => format!("{}({}:{})", self.kind, field, self.value),
            (None, true) => format!("{}({})", self.kind, self.value),
        };
        if self.boost == NEUTRAL_BOOST {
            base
        } else {
            format!("{}^{}", base, self.boost)
        }
    }
}

/// A compound node grouping clauses by occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundNode {
    /// Clauses that must match.
    pub must: Vec<OccurrenceNode>,
    /// Clauses that should match.
    pub should: Vec<OccurrenceNode>,
    /// Clauses that must not match.
    pub must_not: Vec<OccurrenceNode>,
    /// The boost factor.
    pub boost: f32,
}

impl Default for CompoundNode {
    fn default() -> Self {
        CompoundNode {
            must: Vec::new(),
            should: Vec::new(),
            must_not: Vec::new(),
            boost: NEUTRAL_BOOST,
        }
    }
}

impl CompoundNode {
    /// Create a new empty compound node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the clauses of one occurrence type.
    pub fn clauses(&self, occur: Occur) -> &[OccurrenceNode] {
        match occur {
            Occur::Must => &self.must,
            Occur::Should => &self.should,
            Occur::MustNot => &self.must_not,
        }
    }

    /// Add a clause.
    pub fn add_clause(&mut self, occur: Occur, node: OccurrenceNode) {
        match occur {
            Occur::Must => self.must.push(node),
            Occur::Should => self.should.push(node),
            Occur::MustNot => self.must_not.push(node),
        }
    }

    /// Check if this node has no clauses at all.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }
}

/// A node of an occurrence tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceNode {
    /// A nested must/should/must_not group.
    Compound(CompoundNode),
    /// A single atomic condition.
    Atomic(AtomicQuery),
}

impl OccurrenceNode {
    /// Get the boost factor of this node.
    pub fn boost(&self) -> f32 {
        match self {
            OccurrenceNode::Compound(node) => node.boost,
            OccurrenceNode::Atomic(query) => query.boost(),
        }
    }

    /// Set the boost factor of this node.
    pub fn set_boost(&mut self, boost: f32) {
        match self {
            OccurrenceNode::Compound(node) => node.boost = boost,
            OccurrenceNode::Atomic(query) => query.set_boost(boost),
        }
    }

    /// Get a human-readable description of this subtree.
    pub fn description(&self) -> String {
        match self {
            OccurrenceNode::Atomic(query) => query.description(),
            OccurrenceNode::Compound(node) => {
                if node.is_empty() {
                    return "()".to_string();
                }
                let mut parts = Vec::new();
                for occur in [Occur::Must, Occur::Should, Occur::MustNot] {
                    for clause in node.clauses(occur) {
                        parts.push(match occur {
                            Occur::Must => format!("+{}", clause.description()),
                            Occur::Should => clause.description(),
                            Occur::MustNot => format!("-{}", clause.description()),
                        });
                    }
                }
                let result = format!("({})", parts.join(" "));
                if node.boost == NEUTRAL_BOOST {
                    result
                } else {
                    format!("{}^{}", result, node.boost)
                }
            }
        }
    }
}

impl From<AtomicQuery> for OccurrenceNode {
    fn from(query: AtomicQuery) -> Self {
        OccurrenceNode::Atomic(query)
    }
}

impl From<CompoundNode> for OccurrenceNode {
    fn from(node: CompoundNode) -> Self {
        OccurrenceNode::Compound(node)
    }
}

/// Builder for creating commuting quantum occurrence trees.
#[derive(Debug, Default)]
pub struct CommutingQuantumQueryBuilder {
    node: CompoundNode,
}

impl CommutingQuantumQueryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a MUST clause.
    pub fn must<N: Into<OccurrenceNode>>(mut self, node: N) -> Self {
        self.node.add_clause(Occur::Must, node.into());
        self
    }

    /// Add a SHOULD clause.
    pub fn should<N: Into<OccurrenceNode>>(mut self, node: N) -> Self {
        self.node.add_clause(Occur::Should, node.into());
        self
    }

    /// Add a MUST_NOT clause.
    pub fn must_not<N: Into<OccurrenceNode>>(mut self, node: N) -> Self {
        self.node.add_clause(Occur::MustNot, node.into());
        self
    }

    /// Set the boost factor.
    pub fn boost(mut self, boost: f32) -> Self {
        self.node.boost = boost;
        self
    }

    /// Build the compound node.
    pub fn build_node(self) -> CompoundNode {
        self.node
    }

    /// Build the occurrence tree.
    pub fn build(self) -> OccurrenceNode {
        OccurrenceNode::Compound(self.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_kind_parsing() {
        assert_eq!("match".parse::<AtomicKind>().unwrap(), AtomicKind::Match);
        assert_eq!("term".parse::<AtomicKind>().unwrap(), AtomicKind::Term);
        assert_eq!(
            "match_none".parse::<AtomicKind>().unwrap(),
            AtomicKind::MatchNone
        );

        let err = "range".parse::<AtomicKind>().unwrap_err();
        assert!(matches!(err, CqqlError::UnsupportedAtomicKind(kind) if kind == "range"));
    }

    #[test]
    fn test_atomic_query_description() {
        let query = AtomicQuery::matching("fox");
        assert_eq!(query.description(), "match(fox)");

        let query = AtomicQuery::term("fox").with_field("title").with_boost(2.0);
        assert_eq!(query.description(), "term(title:fox)^2");

        assert_eq!(AtomicQuery::match_all().description(), "match_all");
    }

    #[test]
    fn test_builder() {
        let tree = CommutingQuantumQueryBuilder::new()
            .must(AtomicQuery::matching("fox"))
            .should(AtomicQuery::matching("eagle"))
            .must_not(AtomicQuery::matching("crocodile"))
            .boost(2.0)
            .build();

        match &tree {
            OccurrenceNode::Compound(node) => {
                assert_eq!(node.must.len(), 1);
                assert_eq!(node.should.len(), 1);
                assert_eq!(node.must_not.len(), 1);
                assert_eq!(node.boost, 2.0);
            }
            OccurrenceNode::Atomic(_) => panic!("expected compound"),
        }
        assert_eq!(
            tree.description(),
            "(+match(fox) match(eagle) -match(crocodile))^2"
        );
    }

    #[test]
    fn test_set_boost() {
        let mut node = OccurrenceNode::from(AtomicQuery::matching("fox").with_boost(0.4));
        assert_eq!(node.boost(), 0.4);
        node.set_boost(NEUTRAL_BOOST);
        assert_eq!(node.boost(), NEUTRAL_BOOST);
    }

    #[test]
    fn test_empty_compound_description() {
        assert!(CompoundNode::new().is_empty());
        assert_eq!(CommutingQuantumQueryBuilder::new().build().description(), "()");
    }
}
