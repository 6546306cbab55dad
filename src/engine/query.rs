//! Query algebra for the embedded engine.
//!
//! A [`Query`] is one operator applied to a list of terms, mirroring the
//! operator set the engine exposes to hosts. Query evaluation lives in the
//! searcher; this module only models construction and description.

use serde::{Deserialize, Serialize};

use crate::error::{FalxError, Result};

/// Query combination operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOp {
    /// Match documents containing every term.
    And,
    /// Match documents containing any term.
    Or,
    /// Match documents containing the first term and none of the rest.
    AndNot,
    /// Match documents containing an odd number of the terms.
    Xor,
    /// Match on the first term; the rest only contribute weight.
    AndMaybe,
    /// Match documents containing every term; only the first contributes
    /// weight.
    Filter,
    /// Match documents where all terms occur within a positional window.
    Near,
    /// Match documents containing the terms at consecutive positions, in
    /// order.
    Phrase,
    /// Like [`QueryOp::Or`], retained for hosts that pick an elite subset
    /// of expansion terms.
    EliteSet,
    /// Terms treated as synonyms of one another; matches like
    /// [`QueryOp::Or`].
    Synonym,
}

impl QueryOp {
    fn name(&self) -> &'static str {
        match self {
            QueryOp::And => "AND",
            QueryOp::Or => "OR",
            QueryOp::AndNot => "AND_NOT",
            QueryOp::Xor => "XOR",
            QueryOp::AndMaybe => "AND_MAYBE",
            QueryOp::Filter => "FILTER",
            QueryOp::Near => "NEAR",
            QueryOp::Phrase => "PHRASE",
            QueryOp::EliteSet => "ELITE_SET",
            QueryOp::Synonym => "SYNONYM",
        }
    }
}

/// A query over the index: one operator over one or more terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    op: QueryOp,
    terms: Vec<String>,
}

impl Query {
    /// Create a new query. At least one non-empty term is required.
    pub fn new<I, S>(op: QueryOp, terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms: Vec<String> = terms.into_iter().map(Into::into).collect();
        if terms.is_empty() {
            return Err(FalxError::invalid_argument("query requires at least one term"));
        }
        if terms.iter().any(|t| t.is_empty()) {
            return Err(FalxError::invalid_argument("query terms must be non-empty"));
        }
        Ok(Query { op, terms })
    }

    /// The query operator.
    pub fn op(&self) -> QueryOp {
        self.op
    }

    /// The query terms, in construction order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Human-readable description of the query.
    pub fn description(&self) -> String {
        format!("Query(({}))", self.terms.join(&format!(" {} ", self.op.name())))
    }
}
