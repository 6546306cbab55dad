//! Document handles.
//!
//! A [`DocumentHandle`] owns one [`EngineDocument`] copy, either assembled
//! by the pipeline or copied out of a match set. The copy is exclusively
//! owned, so it stays valid however the index it came from evolves.

use crate::engine::EngineDocument;
use crate::error::{FalxError, Result};
use crate::gateway::dispatcher::Dispatcher;
use crate::gateway::handle::{EngineObject, Handle, open_object};

impl EngineObject for EngineDocument {}

/// A handle to one exclusively-owned engine document.
#[derive(Clone)]
pub struct DocumentHandle {
    handle: Handle<EngineDocument>,
}

impl DocumentHandle {
    /// Wrap an engine document the caller already owns.
    pub fn from_engine(document: EngineDocument) -> Self {
        DocumentHandle {
            handle: Handle::new(document),
        }
    }

    /// Fetch the opaque data payload asynchronously.
    pub fn get_data(
        &self,
        dispatcher: &Dispatcher,
        continuation: impl FnOnce(Result<String>) + Send + 'static,
    ) -> Result<()> {
        dispatcher.submit(
            &self.handle,
            |slot| {
                let doc = open_object(slot, "document")?;
                Ok(doc.data().to_string())
            },
            continuation,
        )
    }

    /// Read a value slot. Synchronous; fails busy while a task is
    /// outstanding on this handle.
    pub fn value(&self, slot: u32) -> Result<Option<String>> {
        self.handle.with_exclusive(|object| {
            let doc = open_object(object, "document")?;
            Ok(doc.value(slot).map(|v| v.to_string()))
        })
    }

    /// The document's term list as `(term, wdf)` pairs, in lexical order.
    pub fn term_list(&self) -> Result<Vec<(String, u32)>> {
        self.handle.with_exclusive(|object| {
            let doc = open_object(object, "document")?;
            Ok(doc
                .term_list()
                .map(|(t, e)| (t.to_string(), e.wdf))
                .collect())
        })
    }

    /// Deep-copy the underlying engine document, for embedding this
    /// handle's content into another handle's task at submission time.
    pub(crate) fn cloned_document(&self) -> Result<EngineDocument> {
        self.handle.with_exclusive(|object| {
            object
                .clone()
                .ok_or_else(|| FalxError::invalid_argument("document handle is empty"))
        })
    }
}
