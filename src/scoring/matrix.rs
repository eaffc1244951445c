//! The per-query score matrix: literals × documents.

use std::sync::OnceLock;

use ahash::AHashMap;
use log::{debug, info};
use rayon::prelude::*;

use crate::error::{CqqlError, Result};
use crate::formula::{Literal, LiteralRegistry};
use crate::index::{DocId, SearchIndex};
use crate::query::occurrence::AtomicQuery;
use crate::util::CancellationToken;

/// Relevance scores of every literal for every document, normalized into `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    literals: Vec<Literal>,
    rows: AHashMap<Literal, usize>,
    documents: Vec<DocId>,
    columns: AHashMap<DocId, usize>,
    values: Vec<Vec<f32>>,
    normalizer: f32,
}

impl ScoreMatrix {
    /// Score every registered literal against every document of `index`.
    ///
    /// Each row runs the literal's atomic query over the full document axis;
    /// documents the scorer does not return score 0. All entries are then
    /// divided by `ceil(max entry)`.
    pub fn build(
        index: &dyn SearchIndex,
        registry: &LiteralRegistry,
        parallel: bool,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        cancel.check("score matrix construction")?;

        let documents = index.all_documents()?;
        let columns: AHashMap<DocId, usize> = documents
            .iter()
            .enumerate()
            .map(|(column, doc_id)| (*doc_id, column))
            .collect();
        if columns.len() != documents.len() {
            return Err(CqqlError::resolution(
                "the index listed the same document more than once",
            ));
        }

        let build_row = |(literal, query): (&Literal, &AtomicQuery)| -> Result<Vec<f32>> {
            let scorer = index.create_scorer(query)?;
            let hits = scorer.score_documents(&documents, cancel)?;
            let mut row = vec![0.0; documents.len()];
            for (doc_id, score) in hits {
                let column = columns.get(&doc_id).ok_or_else(|| {
                    CqqlError::resolution(format!(
                        "{} scorer for '{}' returned unknown document {}",
                        scorer.name(),
                        literal,
                        doc_id
                    ))
                })?;
                row[*column] = score;
            }
            debug!("Scored {} for {} documents", literal, documents.len());
            Ok(row)
        };

        let mut values: Vec<Vec<f32>> = if parallel {
            registry
                .iter()
                .collect::<Vec<_>>()
                .into_par_iter()
                .map(build_row)
                .collect::<Result<_>>()?
        } else {
            registry.iter().map(build_row).collect::<Result<_>>()?
        };

        let max = values
            .iter()
            .flatten()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let ceiling = max.ceil();
        let normalizer = if ceiling.is_finite() && ceiling != 0.0 {
            ceiling
        } else {
            1.0
        };
        if normalizer != 1.0 {
            for value in values.iter_mut().flatten() {
                *value /= normalizer;
            }
        }

        let literals = registry.literals().to_vec();
        let rows = literals
            .iter()
            .enumerate()
            .map(|(row, literal)| (literal.clone(), row))
            .collect();

        info!(
            "Built score matrix: {} literals x {} documents, normalized by {}",
            literals.len(),
            documents.len(),
            normalizer
        );

        Ok(ScoreMatrix {
            literals,
            rows,
            documents,
            columns,
            values,
            normalizer,
        })
    }

    /// Get the normalized score of a literal for a document.
    pub fn value(&self, literal: &Literal, doc_id: DocId) -> Result<f32> {
        let row = self.row_index(literal)?;
        let column = self.column(doc_id)?;
        Ok(self.values[row][column])
    }

    /// Get the normalized scores of one literal, in document axis order.
    pub fn row(&self, literal: &Literal) -> Option<&[f32]> {
        self.rows
            .get(literal)
            .map(|row| self.values[*row].as_slice())
    }

    /// Get the column of a document on the document axis.
    pub fn column(&self, doc_id: DocId) -> Result<usize> {
        self.columns.get(&doc_id).copied().ok_or_else(|| {
            CqqlError::resolution(format!(
                "document {doc_id} is not on the score matrix's document axis"
            ))
        })
    }

    fn row_index(&self, literal: &Literal) -> Result<usize> {
        self.rows.get(literal).copied().ok_or_else(|| {
            CqqlError::resolution(format!("literal '{literal}' has no score matrix row"))
        })
    }

    /// Get the literals in row order.
    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    /// Get the documents in column order.
    pub fn documents(&self) -> &[DocId] {
        &self.documents
    }

    /// Get the value every raw score was divided by.
    pub fn normalizer(&self) -> f32 {
        self.normalizer
    }

    /// Get `(literals, documents)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.literals.len(), self.documents.len())
    }
}

/// A score matrix built on first use and kept for the query's lifetime.
#[derive(Debug, Default)]
pub struct LazyScoreMatrix {
    cell: OnceLock<ScoreMatrix>,
}

impl LazyScoreMatrix {
    /// Create an unbuilt matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the matrix, building it with `build` if this is the first request.
    ///
    /// A failed build leaves the matrix unbuilt.
    pub fn get_or_build<F>(&self, build: F) -> Result<&ScoreMatrix>
    where
        F: FnOnce() -> Result<ScoreMatrix>,
    {
        if let Some(matrix) = self.cell.get() {
            return Ok(matrix);
        }
        let matrix = build()?;
        Ok(self.cell.get_or_init(|| matrix))
    }

    /// Get the matrix if it has been built.
    pub fn get(&self) -> Option<&ScoreMatrix> {
        self.cell.get()
    }

    /// Check if the matrix has been built.
    pub fn is_built(&self) -> bool {
        self.cell.get().is_some()
    }
}
