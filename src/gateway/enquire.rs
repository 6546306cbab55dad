//! Search-session handles and match-set marshaling.
//!
//! An [`EnquireHandle`] pins a snapshot of a reader's committed revisions
//! at construction. `get_mset` runs as one task: the worker evaluates the
//! query, eagerly deep-copies every matched document into a fresh
//! [`DocumentHandle`], and delivers the whole ordered slice at once. On
//! any failure nothing is delivered but the error.

use crate::engine::{Enquire, Query};
use crate::error::Result;
use crate::gateway::database::DatabaseHandle;
use crate::gateway::dispatcher::Dispatcher;
use crate::gateway::document::DocumentHandle;
use crate::gateway::handle::{EngineObject, Handle, open_object};

impl EngineObject for Enquire {}

/// One entry of a marshaled match set, in engine rank order.
pub struct MatchRecord {
    /// Zero-based rank in the full match set.
    pub rank: u32,
    /// A newly owned handle wrapping the engine's copy of the document.
    pub document: DocumentHandle,
    /// Relevance weight.
    pub weight: f64,
    /// Collapse key, empty when no collapsing is configured.
    pub collapse_key: String,
    /// Number of other matches collapsed onto this one.
    pub collapse_count: u32,
    /// Weight as a percentage of the best match.
    pub percent: i32,
    /// Human-readable description of the item.
    pub description: String,
    /// The engine's document identifier.
    pub docid: u32,
}

/// A handle to one search session over a fixed index snapshot.
#[derive(Clone)]
pub struct EnquireHandle {
    handle: Handle<Enquire>,
}

impl EnquireHandle {
    /// Create a session over the reader's current committed revisions.
    /// Synchronous; fails busy if the reader has a task outstanding.
    pub fn new(database: &DatabaseHandle) -> Result<Self> {
        Ok(EnquireHandle {
            handle: Handle::new(database.new_session()?),
        })
    }

    /// Set the query this session evaluates. Synchronous.
    pub fn set_query(&self, query: Query) -> Result<()> {
        self.handle.with_exclusive(|slot| {
            open_object(slot, "search session")?.set_query(query);
            Ok(())
        })
    }

    /// Retrieve the `[first, first + max_items)` slice of the ranked match
    /// set as one task. All-or-nothing: either the whole ordered slice
    /// reaches the continuation, or only the categorized error does.
    pub fn get_mset(
        &self,
        dispatcher: &Dispatcher,
        first: u32,
        max_items: u32,
        continuation: impl FnOnce(Result<Vec<MatchRecord>>) + Send + 'static,
    ) -> Result<()> {
        dispatcher.submit(
            &self.handle,
            move |slot| {
                let session = open_object(slot, "search session")?;
                let items = session.get_mset(first, max_items)?;
                Ok(items
                    .into_iter()
                    .map(|item| MatchRecord {
                        rank: item.rank,
                        document: DocumentHandle::from_engine(item.document),
                        weight: item.weight,
                        collapse_key: item.collapse_key,
                        collapse_count: item.collapse_count,
                        percent: item.percent,
                        description: item.description,
                        docid: item.docid,
                    })
                    .collect())
            },
            continuation,
        )
    }
}
