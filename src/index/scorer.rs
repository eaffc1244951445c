//! Atomic scorers of the in-memory index.

use ahash::AHashMap;

use crate::error::Result;
use crate::index::{AtomicScorer, DocId};
use crate::util::CancellationToken;

/// One document's occurrence of a term in a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posting {
    /// The document.
    pub doc_id: DocId,
    /// Occurrences of the term in the field.
    pub term_freq: u32,
    /// Number of terms in the field.
    pub field_length: u32,
}

/// Statistics and postings of one term in one field.
#[derive(Debug, Clone)]
pub struct TermStats {
    /// Documents containing the term in the field.
    pub postings: Vec<Posting>,
    /// Average length of the field over documents that have it.
    pub avg_field_length: f64,
}

/// BM25 k1 parameter.
const K1: f32 = 1.2;
/// BM25 b parameter.
const B: f32 = 0.75;

/// BM25 scorer summing over one or more field terms.
#[derive(Debug, Clone)]
pub struct BM25Scorer {
    /// The analyzed terms with their postings.
    terms: Vec<TermStats>,
    /// Total number of documents in the index.
    total_docs: u64,
    /// Boost factor.
    boost: f32,
}

impl BM25Scorer {
    /// Create a new BM25 scorer.
    pub fn new(terms: Vec<TermStats>, total_docs: u64, boost: f32) -> Self {
        BM25Scorer {
            terms,
            total_docs,
            boost,
        }
    }

    /// Calculate the IDF (Inverse Document Frequency) component.
    fn idf(&self, doc_freq: usize) -> f32 {
        if doc_freq == 0 || self.total_docs == 0 {
            return 0.0;
        }

        let n = self.total_docs as f32;
        let df = doc_freq as f32;

        // IDF = ln(1 + (N - df + 0.5) / (df + 0.5))
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Calculate the TF (Term Frequency) component.
    fn tf(&self, term_freq: f32, field_length: f32, avg_field_length: f32) -> f32 {
        if term_freq == 0.0 {
            return 0.0;
        }

        let norm_factor = if avg_field_length > 0.0 {
            1.0 - B + B * (field_length / avg_field_length)
        } else {
            1.0
        };

        // TF = (tf * (k1 + 1)) / (tf + k1 * norm_factor)
        (term_freq * (K1 + 1.0)) / (term_freq + K1 * norm_factor)
    }

    /// Sum the contributions of every term per document.
    fn accumulate(&self) -> AHashMap<DocId, f32> {
        let mut scores: AHashMap<DocId, f32> = AHashMap::new();
        for term in &self.terms {
            let idf = self.idf(term.postings.len());
            let avg_len = term.avg_field_length as f32;
            for posting in &term.postings {
                let tf = self.tf(
                    posting.term_freq as f32,
                    posting.field_length as f32,
                    avg_len,
                );
                *scores.entry(posting.doc_id).or_insert(0.0) += idf * tf;
            }
        }
        scores
    }
}

impl AtomicScorer for BM25Scorer {
    fn score_documents(
        &self,
        documents: &[DocId],
        cancel: &CancellationToken,
    ) -> Result<Vec<(DocId, f32)>> {
        let scores = self.accumulate();
        let mut hits = Vec::new();
        for doc_id in documents {
            cancel.check("BM25 scoring")?;
            if let Some(&score) = scores.get(doc_id) {
                if score > 0.0 {
                    hits.push((*doc_id, self.boost * score));
                }
            }
        }
        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "BM25"
    }
}
