//! Executable commuting quantum queries.
//!
//! [`to_query`] runs the whole preparation pipeline once per query:
//!
//! ```text
//! occurrence tree ─transcribe→ formula ─normalize→ normalized formula
//!                ─compile→ calculation
//! ```
//!
//! Queries whose normalized formula is a constant need no scoring and come
//! back as [`ExecutableQuery::MatchAll`] or [`ExecutableQuery::MatchNone`].
//! Everything else is a [`CommutingQuantumQuery`], scored per document by a
//! [`QuantumScorer`] over a lazily built score matrix.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::calc::{CalcExpression, compile};
use crate::config::{NEUTRAL_BOOST, QuantumConfig};
use crate::error::Result;
use crate::formula::{
    Formula, Literal, LiteralRegistry, NormalizedFormula, Normalizer, Transcription, transcribe,
};
use crate::index::{DocId, SearchIndex};
use crate::query::SearchHit;
use crate::query::collector::{Collector, TopDocsCollector};
use crate::query::occurrence::{AtomicQuery, OccurrenceNode};
use crate::scoring::{LazyScoreMatrix, ScoreMatrix, ScoringEngine};
use crate::util::CancellationToken;

/// Prepare an occurrence tree for execution.
///
/// The time budget of `config` starts now and covers preparation and scoring.
pub fn to_query(tree: OccurrenceNode, config: &QuantumConfig) -> Result<ExecutableQuery> {
    to_query_with_cancellation(tree, config, config.cancellation_token())
}

/// Prepare an occurrence tree for execution under an external cancellation signal.
pub fn to_query_with_cancellation(
    tree: OccurrenceNode,
    config: &QuantumConfig,
    cancel: CancellationToken,
) -> Result<ExecutableQuery> {
    let query = CommutingQuantumQuery::with_cancellation(tree, config, cancel)?;
    if query.normalized.is_true() {
        debug!("Query normalized to True: matching all documents");
        return Ok(ExecutableQuery::MatchAll { boost: query.boost });
    }
    if query.normalized.is_false() {
        debug!("Query normalized to False: matching no documents");
        return Ok(ExecutableQuery::MatchNone);
    }
    Ok(ExecutableQuery::Quantum(Box::new(query)))
}

/// The executable form of a commuting quantum query.
#[derive(Debug)]
pub enum ExecutableQuery {
    /// Every document matches with the given score.
    MatchAll {
        /// The score of every document.
        boost: f32,
    },
    /// No document matches.
    MatchNone,
    /// Documents are scored by the quantum calculation.
    Quantum(Box<CommutingQuantumQuery>),
}

impl ExecutableQuery {
    /// Search `index` for the `limit` best documents with a positive score.
    pub fn search(&self, index: &dyn SearchIndex, limit: usize) -> Result<Vec<SearchHit>> {
        match self {
            ExecutableQuery::MatchAll { boost } => {
                let mut collector = TopDocsCollector::new(limit);
                for doc_id in index.all_documents()? {
                    collector.collect(doc_id, *boost)?;
                }
                Ok(collector.results())
            }
            ExecutableQuery::MatchNone => Ok(Vec::new()),
            ExecutableQuery::Quantum(query) => query.scorer(index).search(limit),
        }
    }

    /// Get the quantum query, if scoring is needed.
    pub fn as_quantum(&self) -> Option<&CommutingQuantumQuery> {
        match self {
            ExecutableQuery::Quantum(query) => Some(query),
            _ => None,
        }
    }

    /// Get a human-readable description of this query.
    pub fn description(&self) -> String {
        match self {
            ExecutableQuery::MatchAll { boost } if *boost == NEUTRAL_BOOST => {
                "match_all".to_string()
            }
            ExecutableQuery::MatchAll { boost } => format!("match_all^{boost}"),
            ExecutableQuery::MatchNone => "match_none".to_string(),
            ExecutableQuery::Quantum(query) => query.to_string(),
        }
    }
}

/// A prepared commuting quantum query.
///
/// Owns every per-query artifact: the literal registry, the formulas and the
/// compiled calculation. Nothing is shared between queries.
#[derive(Debug, Clone)]
pub struct CommutingQuantumQuery {
    description: String,
    formula: Formula,
    normalized: NormalizedFormula,
    expression: CalcExpression,
    registry: LiteralRegistry,
    boost: f32,
    parallel_matrix: bool,
    cancel: CancellationToken,
}

impl CommutingQuantumQuery {
    /// Prepare a query; the time budget of `config` starts now.
    pub fn new(tree: OccurrenceNode, config: &QuantumConfig) -> Result<Self> {
        Self::with_cancellation(tree, config, config.cancellation_token())
    }

    /// Prepare a query under an external cancellation signal.
    pub fn with_cancellation(
        mut tree: OccurrenceNode,
        config: &QuantumConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        config.validate()?;
        let description = tree.description();

        let Transcription {
            formula,
            registry,
            boost,
        } = transcribe(&mut tree)?;
        let normalized = Normalizer::new(config.normalizer.clone())
            .with_cancellation(cancel.clone())
            .normalize(&formula)?;
        let expression = compile(&normalized);
        debug!("Calculation formula for {description}: {expression}");

        Ok(CommutingQuantumQuery {
            description,
            formula,
            normalized,
            expression,
            registry,
            boost,
            parallel_matrix: config.parallel_matrix,
            cancel,
        })
    }

    /// Get the transcribed formula.
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// Get the normalized formula.
    pub fn normalized(&self) -> &NormalizedFormula {
        &self.normalized
    }

    /// Get the compiled calculation.
    pub fn expression(&self) -> &CalcExpression {
        &self.expression
    }

    /// Get the distinct literals in first-seen order.
    pub fn literals(&self) -> &[Literal] {
        self.registry.literals()
    }

    /// Iterate over literals and the atomic queries that score them.
    pub fn atomic_queries(&self) -> impl Iterator<Item = (&Literal, &AtomicQuery)> {
        self.registry.iter()
    }

    /// Get the literal registry.
    pub fn registry(&self) -> &LiteralRegistry {
        &self.registry
    }

    /// Get the boost applied to every score.
    pub fn boost(&self) -> f32 {
        self.boost
    }

    /// Get the description of the occurrence tree this query was built from.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the cancellation signal polled while scoring.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Create a scorer over `index`.
    pub fn scorer<'a>(&'a self, index: &'a dyn SearchIndex) -> QuantumScorer<'a> {
        QuantumScorer {
            query: self,
            index,
            matrix: LazyScoreMatrix::new(),
            cancel: self.cancel.clone(),
        }
    }

    /// Check whether two queries accept exactly the same literal assignments.
    pub fn is_equivalent(&self, other: &CommutingQuantumQuery) -> Result<bool> {
        self.normalized
            .to_formula()
            .is_equivalent(&other.normalized.to_formula())
    }
}

impl fmt::Display for CommutingQuantumQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "commuting_quantum{}", self.description)
    }
}

/// Scores documents of one index for one query.
///
/// The score matrix is built on the first request and reused afterwards.
#[derive(Debug)]
pub struct QuantumScorer<'a> {
    query: &'a CommutingQuantumQuery,
    index: &'a dyn SearchIndex,
    matrix: LazyScoreMatrix,
    cancel: CancellationToken,
}

impl<'a> QuantumScorer<'a> {
    /// Poll `cancel` instead of the query's own signal.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get the query being scored.
    pub fn query(&self) -> &'a CommutingQuantumQuery {
        self.query
    }

    /// Get the score matrix, building it on first use.
    pub fn matrix(&self) -> Result<&ScoreMatrix> {
        self.matrix.get_or_build(|| {
            ScoreMatrix::build(
                self.index,
                &self.query.registry,
                self.query.parallel_matrix,
                &self.cancel,
            )
        })
    }

    /// Score one document.
    pub fn score(&self, doc_id: DocId) -> Result<f32> {
        self.cancel.check("document scoring")?;
        let matrix = self.matrix()?;
        let score = ScoringEngine::score_document(&self.query.expression, matrix, doc_id)?;
        Ok(self.query.boost * score)
    }

    /// Explain how a document's score was calculated.
    pub fn explain(&self, doc_id: DocId) -> Result<Explanation> {
        let score = self.score(doc_id)?;
        let matrix = self.matrix()?;
        let values = self
            .query
            .registry
            .iter()
            .map(|(literal, query)| {
                Ok(LiteralValue {
                    literal: literal.to_string(),
                    query: query.description(),
                    value: matrix.value(literal, doc_id)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Explanation {
            doc_id,
            score,
            boost: self.query.boost,
            normalized: self.query.normalized.to_string(),
            calculation: self.query.expression.to_string(),
            values,
        })
    }

    /// Find the `limit` best documents with a positive score.
    ///
    /// Equal scores are ranked by ascending document id.
    pub fn search(&self, limit: usize) -> Result<Vec<SearchHit>> {
        let matrix = self.matrix()?;
        let mut collector = TopDocsCollector::new(limit);
        for &doc_id in matrix.documents() {
            collector.collect(doc_id, self.score(doc_id)?)?;
        }
        debug!(
            "Scored {} documents for {}",
            collector.total_hits(),
            self.query
        );
        Ok(collector.results())
    }
}

/// The resolved value of one literal for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralValue {
    /// The literal name.
    pub literal: String,
    /// The atomic query that scored it.
    pub query: String,
    /// The normalized score.
    pub value: f32,
}

/// How a document's score was calculated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// The document.
    pub doc_id: DocId,
    /// The final score.
    pub score: f32,
    /// The root boost applied to the calculation.
    pub boost: f32,
    /// The normalized formula.
    pub normalized: String,
    /// The calculation formula.
    pub calculation: String,
    /// Every literal's value for the document.
    pub values: Vec<LiteralValue>,
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "document {} scored {}", self.doc_id, self.score)?;
        writeln!(
            f,
            "The calculation formula used for scoring is: {}",
            self.calculation
        )?;
        if self.boost != NEUTRAL_BOOST {
            writeln!(f, "multiplied by the query boost {}", self.boost)?;
        }
        for value in &self.values {
            writeln!(f, "  {} = {} ({})", value.literal, value.value, value.query)?;
        }
        Ok(())
    }
}
