//! An in-memory inverted index with BM25 scoring.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::{Analyzer, StandardAnalyzer};
use crate::error::{CqqlError, Result};
use crate::index::scorer::{BM25Scorer, Posting, TermStats};
use crate::index::{AtomicScorer, DocId, SearchIndex};
use crate::query::occurrence::{AtomicKind, AtomicQuery};

/// A document with named text fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Field values by field name.
    pub fields: BTreeMap<String, String>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field.
    pub fn with_field<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a field value.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Debug, Default)]
struct FieldIndex {
    /// Postings per analyzed term.
    postings: AHashMap<String, Vec<Posting>>,
    /// Sum of field lengths over documents that have the field.
    total_length: u64,
    /// Number of documents that have the field.
    doc_count: u64,
}

impl FieldIndex {
    fn avg_length(&self) -> f64 {
        if self.doc_count == 0 {
            0.0
        } else {
            self.total_length as f64 / self.doc_count as f64
        }
    }

    fn stats(&self, term: &str) -> Option<TermStats> {
        self.postings.get(term).map(|postings| TermStats {
            postings: postings.clone(),
            avg_field_length: self.avg_length(),
        })
    }
}

/// An index holding every document in memory.
///
/// Documents are enumerated in ascending id order.
#[derive(Debug)]
pub struct MemoryIndex {
    analyzer: Arc<dyn Analyzer>,
    documents: BTreeMap<DocId, Document>,
    fields: AHashMap<String, FieldIndex>,
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIndex {
    /// Create an empty index with the standard analyzer.
    pub fn new() -> Self {
        Self::with_analyzer(Arc::new(StandardAnalyzer::new()))
    }

    /// Create an empty index with a custom analyzer.
    pub fn with_analyzer(analyzer: Arc<dyn Analyzer>) -> Self {
        MemoryIndex {
            analyzer,
            documents: BTreeMap::new(),
            fields: AHashMap::new(),
        }
    }

    /// Add a document under the next free id.
    pub fn add_document(&mut self, document: Document) -> Result<DocId> {
        let doc_id = self.next_id();
        self.insert_document(doc_id, document)?;
        Ok(doc_id)
    }

    /// Add a document under an explicit id.
    pub fn insert_document(&mut self, doc_id: DocId, document: Document) -> Result<()> {
        if self.documents.contains_key(&doc_id) {
            return Err(CqqlError::invalid_argument(format!(
                "document {doc_id} already exists"
            )));
        }

        for (name, text) in &document.fields {
            let terms = self.analyzer.analyze(text);
            let mut freqs: AHashMap<String, u32> = AHashMap::new();
            for term in &terms {
                *freqs.entry(term.clone()).or_insert(0) += 1;
            }

            let field = self.fields.entry(name.clone()).or_default();
            field.total_length += terms.len() as u64;
            field.doc_count += 1;
            for (term, term_freq) in freqs {
                field.postings.entry(term).or_default().push(Posting {
                    doc_id,
                    term_freq,
                    field_length: terms.len() as u32,
                });
            }
        }

        self.documents.insert(doc_id, document);
        Ok(())
    }

    /// Load documents from JSON lines.
    ///
    /// Each non-blank line is an object whose optional `"id"` is the document
    /// id; every other string, number or boolean member becomes a field.
    pub fn from_jsonl_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut index = Self::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(&line)?;
            let (doc_id, document) = parse_document(value, line_no + 1)?;
            match doc_id {
                Some(doc_id) => index.insert_document(doc_id, document)?,
                None => {
                    index.add_document(document)?;
                }
            }
        }
        info!("Loaded {} documents", index.len());
        Ok(index)
    }

    /// Load documents from a JSON lines file.
    pub fn from_jsonl_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!("Reading documents from {}", path.as_ref().display());
        Self::from_jsonl_reader(BufReader::new(file))
    }

    /// Get a document by id.
    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        self.documents.get(&doc_id)
    }

    /// Get the number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the index holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn next_id(&self) -> DocId {
        self.documents
            .last_key_value()
            .map_or(0, |(doc_id, _)| doc_id + 1)
    }

    /// Collect the postings of `terms` in one field, or in every field.
    fn term_stats(&self, field: Option<&str>, terms: &[String]) -> Vec<TermStats> {
        let mut stats = Vec::new();
        for term in terms {
            match field {
                Some(name) => {
                    if let Some(found) = self.fields.get(name).and_then(|f| f.stats(term)) {
                        stats.push(found);
                    }
                }
                None => stats.extend(self.fields.values().filter_map(|f| f.stats(term))),
            }
        }
        stats
    }
}

fn parse_document(value: Value, line_no: usize) -> Result<(Option<DocId>, Document)> {
    let Value::Object(members) = value else {
        return Err(CqqlError::invalid_argument(format!(
            "line {line_no}: expected a JSON object"
        )));
    };

    let mut doc_id = None;
    let mut document = Document::new();
    for (name, value) in members {
        if name == "id" {
            doc_id = Some(value.as_u64().ok_or_else(|| {
                CqqlError::invalid_argument(format!(
                    "line {line_no}: \"id\" must be a non-negative integer"
                ))
            })?);
            continue;
        }
        let text = match value {
            Value::String(text) => text,
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            Value::Null => continue,
            Value::Array(_) | Value::Object(_) => {
                return Err(CqqlError::invalid_argument(format!(
                    "line {line_no}: field \"{name}\" must be a scalar"
                )));
            }
        };
        document.fields.insert(name, text);
    }
    Ok((doc_id, document))
}

impl SearchIndex for MemoryIndex {
    fn all_documents(&self) -> Result<Vec<DocId>> {
        Ok(self.documents.keys().copied().collect())
    }

    fn create_scorer(&self, query: &AtomicQuery) -> Result<Box<dyn AtomicScorer>> {
        let total_docs = self.documents.len() as u64;
        let scorer: Box<dyn AtomicScorer> = match query.kind() {
            AtomicKind::Match => {
                let terms = self.analyzer.analyze(query.value());
                let stats = self.term_stats(query.field(), &terms);
                Box::new(BM25Scorer::new(stats, total_docs, query.boost()))
            }
            AtomicKind::Term => {
                let stats = self.term_stats(query.field(), &[query.value().to_string()]);
                Box::new(BM25Scorer::new(stats, total_docs, query.boost()))
            }
            // transcribed to constants, never scored
            AtomicKind::MatchAll | AtomicKind::MatchNone => {
                return Err(CqqlError::unsupported_kind(query.kind().name()));
            }
        };
        debug!("Created {} scorer for {}", scorer.name(), query.description());
        Ok(scorer)
    }
}
