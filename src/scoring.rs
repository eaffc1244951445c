//! Scoring: the per-query score matrix and expression evaluation.

pub mod engine;
pub mod matrix;

pub use self::engine::{DocumentValues, LiteralValues, ScoringEngine};
pub use self::matrix::{LazyScoreMatrix, ScoreMatrix};
