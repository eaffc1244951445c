//! The search collaborator a commuting quantum query scores against.
//!
//! The quantum core never reads documents itself. It asks a [`SearchIndex`]
//! for the document axis and for one [`AtomicScorer`] per literal, and keeps
//! only the resulting relevance scores.

pub mod memory;
pub mod scorer;

use std::fmt::Debug;

use crate::error::Result;
use crate::query::occurrence::AtomicQuery;
use crate::util::CancellationToken;

pub use self::memory::{Document, MemoryIndex};
pub use self::scorer::BM25Scorer;

/// Identifier of an indexed document.
pub type DocId = u64;

/// A searchable document collection.
pub trait SearchIndex: Send + Sync + Debug {
    /// List every document in a stable order.
    fn all_documents(&self) -> Result<Vec<DocId>>;

    /// Create a scorer for one atomic condition.
    fn create_scorer(&self, query: &AtomicQuery) -> Result<Box<dyn AtomicScorer>>;
}

/// Relevance scores of one atomic condition.
pub trait AtomicScorer: Send + Debug {
    /// Score a batch of documents.
    ///
    /// Only matching documents are returned; an absent document scores 0.
    /// Implementations poll `cancel` once per document.
    fn score_documents(
        &self,
        documents: &[DocId],
        cancel: &CancellationToken,
    ) -> Result<Vec<(DocId, f32)>>;

    /// Get the name of this scorer.
    fn name(&self) -> &'static str;
}
