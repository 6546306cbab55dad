//! Engine document: the unit of indexed and retrieved content.
//!
//! An [`EngineDocument`] carries an opaque data payload, a term list with
//! within-document frequencies and optional positions, and a set of value
//! slots. Documents are plain owned data: the gateway deep-copies them
//! across handle boundaries instead of sharing live references.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-term indexing information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    /// Within-document frequency.
    pub wdf: u32,
    /// Token positions, present only for positionally indexed terms.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<u32>,
}

/// A single document as the engine stores and returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineDocument {
    data: String,
    terms: BTreeMap<String, TermEntry>,
    values: BTreeMap<u32, String>,
    /// Words recorded for the spelling dictionary while this document was
    /// assembled; merged into the index at add time and cleared.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    spelling: Vec<String>,
}

impl EngineDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        EngineDocument::default()
    }

    /// Set the opaque data payload.
    pub fn set_data<S: Into<String>>(&mut self, data: S) {
        self.data = data.into();
    }

    /// Get the opaque data payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Add a term, increasing its within-document frequency.
    pub fn add_term(&mut self, term: &str, wdf_increment: u32) {
        let entry = self.terms.entry(term.to_string()).or_default();
        entry.wdf += wdf_increment;
    }

    /// Add a boolean term (frequency zero), used for unique id terms and
    /// other filter-only terms.
    pub fn add_boolean_term(&mut self, term: &str) {
        self.terms.entry(term.to_string()).or_default();
    }

    /// Add a positional posting for a term.
    pub fn add_posting(&mut self, term: &str, position: u32, wdf_increment: u32) {
        let entry = self.terms.entry(term.to_string()).or_default();
        entry.wdf += wdf_increment;
        entry.positions.push(position);
    }

    /// Check whether the document carries a term.
    pub fn has_term(&self, term: &str) -> bool {
        self.terms.contains_key(term)
    }

    /// Look up a term entry.
    pub fn term(&self, term: &str) -> Option<&TermEntry> {
        self.terms.get(term)
    }

    /// Iterate the term list in lexical order.
    pub fn term_list(&self) -> impl Iterator<Item = (&str, &TermEntry)> {
        self.terms.iter().map(|(t, e)| (t.as_str(), e))
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Set a value slot.
    pub fn add_value<S: Into<String>>(&mut self, slot: u32, value: S) {
        self.values.insert(slot, value.into());
    }

    /// Read a value slot.
    pub fn value(&self, slot: u32) -> Option<&str> {
        self.values.get(&slot).map(|v| v.as_str())
    }

    /// All populated value slots in slot order.
    pub fn values(&self) -> impl Iterator<Item = (u32, &str)> {
        self.values.iter().map(|(s, v)| (*s, v.as_str()))
    }

    /// Record a word for the spelling dictionary.
    pub fn add_spelling(&mut self, word: &str) {
        self.spelling.push(word.to_string());
    }

    /// Drain the recorded spelling words.
    pub fn take_spelling(&mut self) -> Vec<String> {
        std::mem::take(&mut self.spelling)
    }
}
