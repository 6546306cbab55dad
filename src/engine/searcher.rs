//! Query evaluation over committed revisions.
//!
//! An [`Enquire`] is a search session pinned to a snapshot of a reader's
//! shards. Evaluation produces a ranked match set; every item deep-copies
//! its document so results stay valid after the session (or the index) is
//! gone.

use std::sync::Arc;

use ahash::AHashMap;

use crate::engine::database::{Database, Revision};
use crate::engine::document::EngineDocument;
use crate::engine::query::{Query, QueryOp};
use crate::error::{FalxError, Result};

/// One entry of a ranked match set.
#[derive(Debug, Clone)]
pub struct MatchItem {
    /// Docid, offset so it is unique across shards.
    pub docid: u32,
    /// Zero-based rank in the full match set.
    pub rank: u32,
    /// Relevance weight.
    pub weight: f64,
    /// Weight as a percentage of the best match.
    pub percent: i32,
    /// Collapse key, empty when no collapsing is configured.
    pub collapse_key: String,
    /// Number of other matches collapsed onto this one.
    pub collapse_count: u32,
    /// Human-readable description of the item.
    pub description: String,
    /// A copy of the matched document, owned by this item.
    pub document: EngineDocument,
}

/// A search session over a fixed snapshot of index shards.
#[derive(Debug)]
pub struct Enquire {
    shards: Vec<Arc<Revision>>,
    query: Option<Query>,
}

impl Enquire {
    /// Create a session over the reader's current shards.
    pub fn new(database: &Database) -> Self {
        Enquire {
            shards: database
                .shards()
                .iter()
                .map(|s| s.revision().clone())
                .collect(),
            query: None,
        }
    }

    /// Set the query to evaluate.
    pub fn set_query(&mut self, query: Query) {
        self.query = Some(query);
    }

    /// Evaluate the query and return the `[first, first + max_items)` slice
    /// of the ranked match set.
    pub fn get_mset(&self, first: u32, max_items: u32) -> Result<Vec<MatchItem>> {
        let query = self
            .query
            .as_ref()
            .ok_or_else(|| FalxError::engine("no query set on this session"))?;

        let total_docs: u64 = self.shards.iter().map(|r| r.doc_count()).sum();
        let idf = self.term_idf(query.terms(), total_docs);

        let mut matched: Vec<(u32, f64, &EngineDocument)> = Vec::new();
        let mut docid_offset = 0u32;
        for revision in &self.shards {
            for (docid, doc) in revision.docs() {
                if let Some(weight) = evaluate(query, doc, &idf) {
                    matched.push((docid + docid_offset, weight, doc));
                }
            }
            docid_offset += revision.docid_bound();
        }

        // Rank order: weight descending, docid ascending on ties.
        matched.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let max_weight = matched.first().map(|(_, w, _)| *w).unwrap_or(0.0);
        Ok(matched
            .into_iter()
            .enumerate()
            .skip(first as usize)
            .take(max_items as usize)
            .map(|(rank, (docid, weight, doc))| {
                let rank = rank as u32;
                let percent = if max_weight > 0.0 {
                    ((weight / max_weight) * 100.0).round() as i32
                } else {
                    100
                };
                MatchItem {
                    docid,
                    rank,
                    weight,
                    percent,
                    collapse_key: String::new(),
                    collapse_count: 0,
                    description: format!("MSetItem(rank={rank}, docid={docid})"),
                    document: doc.clone(),
                }
            })
            .collect())
    }

    /// Inverse document frequency per query term, across all shards.
    fn term_idf(&self, terms: &[String], total_docs: u64) -> AHashMap<String, f64> {
        let mut idf = AHashMap::new();
        for term in terms {
            if idf.contains_key(term) {
                continue;
            }
            let df: u64 = self
                .shards
                .iter()
                .map(|r| r.docs().filter(|(_, d)| d.has_term(term)).count() as u64)
                .sum();
            idf.insert(
                term.clone(),
                (1.0 + total_docs as f64 / (1 + df) as f64).ln(),
            );
        }
        idf
    }
}

/// Evaluate a query against one document. Returns the match weight, or
/// `None` if the document does not match.
fn evaluate(query: &Query, doc: &EngineDocument, idf: &AHashMap<String, f64>) -> Option<f64> {
    let terms = query.terms();
    let present: Vec<bool> = terms.iter().map(|t| doc.has_term(t)).collect();
    let hits = present.iter().filter(|p| **p).count();

    let term_weight = |term: &String| -> f64 {
        let wdf = doc.term(term).map(|e| e.wdf).unwrap_or(0);
        (1.0 + f64::from(wdf).ln_1p()) * idf.get(term).copied().unwrap_or(0.0)
    };
    let weight_of_matched = || -> f64 {
        terms
            .iter()
            .zip(&present)
            .filter(|(_, p)| **p)
            .map(|(t, _)| term_weight(t))
            .sum()
    };

    match query.op() {
        QueryOp::And => (hits == terms.len()).then(weight_of_matched),
        QueryOp::Or | QueryOp::EliteSet | QueryOp::Synonym => {
            (hits > 0).then(weight_of_matched)
        }
        QueryOp::AndNot => {
            (present[0] && present[1..].iter().all(|p| !p)).then(|| term_weight(&terms[0]))
        }
        QueryOp::Xor => (hits % 2 == 1).then(weight_of_matched),
        QueryOp::AndMaybe => present[0].then(weight_of_matched),
        QueryOp::Filter => (hits == terms.len()).then(|| term_weight(&terms[0])),
        QueryOp::Near => {
            (hits == terms.len() && within_window(terms, doc, terms.len() as u32))
                .then(weight_of_matched)
        }
        QueryOp::Phrase => {
            (hits == terms.len() && phrase_at_consecutive(terms, doc)).then(weight_of_matched)
        }
    }
}

/// True if some positional window of width `window` covers at least one
/// occurrence of every term.
fn within_window(terms: &[String], doc: &EngineDocument, window: u32) -> bool {
    // (position, term index), sorted by position.
    let mut occurrences: Vec<(u32, usize)> = Vec::new();
    for (i, term) in terms.iter().enumerate() {
        match doc.term(term) {
            Some(entry) if !entry.positions.is_empty() => {
                occurrences.extend(entry.positions.iter().map(|p| (*p, i)));
            }
            _ => return false,
        }
    }
    occurrences.sort_unstable();

    let mut counts = vec![0usize; terms.len()];
    let mut covered = 0;
    let mut lo = 0;
    for hi in 0..occurrences.len() {
        let (pos_hi, term_hi) = occurrences[hi];
        if counts[term_hi] == 0 {
            covered += 1;
        }
        counts[term_hi] += 1;
        while covered == terms.len() {
            let (pos_lo, term_lo) = occurrences[lo];
            if pos_hi - pos_lo <= window {
                return true;
            }
            counts[term_lo] -= 1;
            if counts[term_lo] == 0 {
                covered -= 1;
            }
            lo += 1;
        }
    }
    false
}

/// True if the terms occur at consecutive positions, in order.
fn phrase_at_consecutive(terms: &[String], doc: &EngineDocument) -> bool {
    let first = match doc.term(&terms[0]) {
        Some(entry) => &entry.positions,
        None => return false,
    };
    first.iter().any(|start| {
        terms.iter().enumerate().skip(1).all(|(i, term)| {
            doc.term(term)
                .map(|e| e.positions.contains(&(start + i as u32)))
                .unwrap_or(false)
        })
    })
}
