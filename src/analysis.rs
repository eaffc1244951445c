//! Text analysis for the in-memory index.
//!
//! Text is split on Unicode word boundaries (UAX #29); punctuation and
//! whitespace segments are dropped and the remaining words are lowercased.
//!
//! # Examples
//!
//! ```
//! use cqql::analysis::{Analyzer, StandardAnalyzer};
//!
//! let analyzer = StandardAnalyzer::new();
//! assert_eq!(analyzer.analyze("The quick, brown Fox!"), vec!["the", "quick", "brown", "fox"]);
//! ```

use std::fmt::Debug;

use unicode_segmentation::UnicodeSegmentation;

/// Trait for turning field text into index terms.
pub trait Analyzer: Send + Sync + Debug {
    /// Analyze text into terms, in order of appearance.
    fn analyze(&self, text: &str) -> Vec<String>;

    /// Get the name of this analyzer.
    fn name(&self) -> &'static str;
}

/// Unicode word segmentation followed by lowercasing.
#[derive(Clone, Debug, Default)]
pub struct StandardAnalyzer;

impl StandardAnalyzer {
    /// Create a new standard analyzer.
    pub fn new() -> Self {
        StandardAnalyzer
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Vec<String> {
        text.unicode_words().map(str::to_lowercase).collect()
    }

    fn name(&self) -> &'static str {
        "standard"
    }
}
