//! Error types for the cqql library.
//!
//! This module provides error handling for every stage of the quantum query
//! pipeline. All errors are represented by the [`CqqlError`] enum, which keeps
//! syntax errors, resolution errors, resource exhaustion and cancellation
//! apart so callers can react to each of them differently.
//!
//! # Examples
//!
//! ```
//! use cqql::error::{CqqlError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(CqqlError::unsupported_kind("range"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for cqql operations.
///
/// Computation never degrades to a sentinel score: every failure of
/// transcription, normalization, compilation or scoring surfaces as one of
/// these variants and aborts the current query.
#[derive(Error, Debug)]
pub enum CqqlError {
    /// I/O errors (reading query or document files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed boolean formula text.
    #[error("Formula syntax error at position {position}: {message}")]
    FormulaSyntax {
        /// Byte offset in the formula text.
        position: usize,
        /// What the parser expected or found.
        message: String,
    },

    /// An atomic clause kind outside the supported set.
    #[error("Unsupported atomic query kind: {0}")]
    UnsupportedAtomicKind(String),

    /// Malformed query DSL.
    #[error("Query parse error: {0}")]
    QueryParse(String),

    /// A literal or document could not be matched against the score matrix.
    #[error("Score resolution error: {0}")]
    ScoreResolution(String),

    /// Overlap resolution went deeper than the configured bound.
    #[error("Recursion limit exceeded: overlap resolution deeper than {limit}")]
    RecursionLimitExceeded {
        /// The configured depth limit.
        limit: usize,
    },

    /// A configured size bound was exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The surrounding search was cancelled or ran past its deadline.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with CqqlError.
pub type Result<T> = std::result::Result<T, CqqlError>;

impl CqqlError {
    /// Create a new formula syntax error.
    pub fn syntax<S: Into<String>>(position: usize, msg: S) -> Self {
        CqqlError::FormulaSyntax {
            position,
            message: msg.into(),
        }
    }

    /// Create a new unsupported atomic kind error.
    pub fn unsupported_kind<S: Into<String>>(kind: S) -> Self {
        CqqlError::UnsupportedAtomicKind(kind.into())
    }

    /// Create a new query parse error.
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        CqqlError::QueryParse(msg.into())
    }

    /// Create a new score resolution error.
    pub fn resolution<S: Into<String>>(msg: S) -> Self {
        CqqlError::ScoreResolution(msg.into())
    }

    /// Create a new resource exhausted error.
    pub fn exhausted<S: Into<String>>(msg: S) -> Self {
        CqqlError::ResourceExhausted(msg.into())
    }

    /// Create a new cancelled error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        CqqlError::Cancelled(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        CqqlError::InvalidArgument(msg.into())
    }

    /// Whether this error reports cancellation rather than a computation failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, CqqlError::Cancelled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = CqqlError::unsupported_kind("range");
        assert_eq!(error.to_string(), "Unsupported atomic query kind: range");

        let error = CqqlError::syntax(4, "expected ')'");
        assert_eq!(
            error.to_string(),
            "Formula syntax error at position 4: expected ')'"
        );

        let error = CqqlError::RecursionLimitExceeded { limit: 8 };
        assert_eq!(
            error.to_string(),
            "Recursion limit exceeded: overlap resolution deeper than 8"
        );
    }

    #[test]
    fn test_cancellation_is_distinguishable() {
        assert!(CqqlError::cancelled("deadline").is_cancellation());
        assert!(!CqqlError::exhausted("too many disjuncts").is_cancellation());
        assert!(!CqqlError::resolution("missing literal").is_cancellation());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = CqqlError::from(io_error);

        match error {
            CqqlError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
