//! # cqql
//!
//! Commuting quantum query scoring for full-text search.
//!
//! A commuting quantum query combines the relevance scores of atomic
//! full-text conditions the way probabilities of independent events
//! combine. Conjunction multiplies, negation complements, and disjunction
//! is only summed once the boolean formula has been rewritten so that its
//! disjuncts are mutually exclusive.
//!
//! ## Pipeline
//!
//! - [`query::QueryParser`] reads the JSON query DSL into an occurrence tree
//! - [`formula::transcribe`] turns the tree into a boolean formula over literals
//! - [`formula::Normalizer`] rewrites it into an overlap-free canonical form
//! - [`calc::compile`] turns that into an arithmetic expression
//! - [`query::QuantumScorer`] evaluates the expression per document over a
//!   score matrix filled by a [`index::SearchIndex`]
//!
//! ```no_run
//! use cqql::config::QuantumConfig;
//! use cqql::index::{Document, MemoryIndex};
//! use cqql::query::{QueryParser, to_query};
//!
//! let mut index = MemoryIndex::new();
//! index.add_document(Document::new().with_field("body", "the quick fox"))?;
//!
//! let tree = QueryParser::new().parse(r#"{"should": [{"match": "fox"}, {"match": "eagle"}]}"#)?;
//! let hits = to_query(tree, &QuantumConfig::default())?.search(&index, 10)?;
//! # Ok::<(), cqql::error::CqqlError>(())
//! ```

pub mod analysis;
pub mod calc;
pub mod cli;
pub mod config;
pub mod error;
pub mod formula;
pub mod index;
pub mod query;
pub mod scoring;
pub mod util;

pub mod prelude {
    pub use crate::config::{NormalizerConfig, QuantumConfig};
    pub use crate::error::{CqqlError, Result};
    pub use crate::index::{Document, MemoryIndex, SearchIndex};
    pub use crate::query::{
        AtomicQuery, CommutingQuantumQuery, CommutingQuantumQueryBuilder, ExecutableQuery,
        QueryParser, SearchHit, to_query,
    };
    pub use crate::util::CancellationToken;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
