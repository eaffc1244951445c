//! Commuting quantum queries: occurrence trees, the JSON DSL and execution.

pub mod collector;
pub mod occurrence;
pub mod parser;
pub mod quantum;

use serde::{Deserialize, Serialize};

use crate::index::DocId;

pub use self::collector::{Collector, TopDocsCollector};
pub use self::occurrence::{
    AtomicKind, AtomicQuery, CommutingQuantumQueryBuilder, CompoundNode, Occur, OccurrenceNode,
};
pub use self::parser::QueryParser;
pub use self::quantum::{
    CommutingQuantumQuery, ExecutableQuery, Explanation, QuantumScorer, to_query,
    to_query_with_cancellation,
};

/// A search hit: a document and its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// The document ID.
    pub doc_id: DocId,
    /// The relevance score.
    pub score: f32,
}
