//! Per-document evaluation of compiled expressions.

use ahash::AHashMap;
use log::trace;

use crate::calc::CalcExpression;
use crate::error::{CqqlError, Result};
use crate::formula::Literal;
use crate::index::DocId;
use crate::scoring::matrix::ScoreMatrix;

/// A source of literal values for one document.
pub trait LiteralValues {
    /// Resolve a literal to its relevance score.
    fn literal_value(&self, literal: &Literal) -> Result<f32>;
}

impl LiteralValues for AHashMap<Literal, f32> {
    fn literal_value(&self, literal: &Literal) -> Result<f32> {
        self.get(literal)
            .copied()
            .ok_or_else(|| CqqlError::resolution(format!("no value for literal '{literal}'")))
    }
}

/// One document's column of a [`ScoreMatrix`].
#[derive(Debug, Clone, Copy)]
pub struct DocumentValues<'a> {
    matrix: &'a ScoreMatrix,
    doc_id: DocId,
}

impl<'a> DocumentValues<'a> {
    /// Select a document's column. Fails if the document is not on the axis.
    pub fn new(matrix: &'a ScoreMatrix, doc_id: DocId) -> Result<Self> {
        matrix.column(doc_id)?;
        Ok(DocumentValues { matrix, doc_id })
    }

    /// Get the document.
    pub fn doc_id(&self) -> DocId {
        self.doc_id
    }
}

impl LiteralValues for DocumentValues<'_> {
    fn literal_value(&self, literal: &Literal) -> Result<f32> {
        self.matrix.value(literal, self.doc_id)
    }
}

/// Evaluates compiled expressions against literal values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    /// Evaluate an expression. Weight literals resolve to their boost.
    pub fn score(expression: &CalcExpression, values: &dyn LiteralValues) -> Result<f32> {
        expression.evaluate(&|literal: &Literal| values.literal_value(literal))
    }

    /// Score one document from the matrix.
    pub fn score_document(
        expression: &CalcExpression,
        matrix: &ScoreMatrix,
        doc_id: DocId,
    ) -> Result<f32> {
        let values = DocumentValues::new(matrix, doc_id)?;
        let score = Self::score(expression, &values)?;
        trace!("Document {doc_id} scored {score}");
        Ok(score)
    }
}
