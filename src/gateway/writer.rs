//! Writable index handles.
//!
//! Every mutation is one task, so the busy rule alone serializes writes:
//! a begin/commit transaction pair can never interleave with another task
//! on the same handle, provided the caller issues each call from within
//! the previous call's continuation. Document inputs are deep-copied on
//! the control thread at submission time, so the source handle may be
//! released or reused while the write runs.

use std::path::PathBuf;

use crate::engine::{OpenMode, WritableDatabase};
use crate::error::Result;
use crate::gateway::dispatcher::Dispatcher;
use crate::gateway::document::DocumentHandle;
use crate::gateway::handle::{EngineObject, Handle, open_object};

impl EngineObject for WritableDatabase {
    fn close(&mut self) -> Result<()> {
        WritableDatabase::close(self)
    }
}

/// A handle to a writable index over one directory.
#[derive(Clone)]
pub struct WritableDatabaseHandle {
    handle: Handle<WritableDatabase>,
}

impl WritableDatabaseHandle {
    /// Open or create the index at `path` asynchronously, per `mode`.
    /// `on_open` is the opened notification: invoked once, error-first.
    pub fn open(
        dispatcher: &Dispatcher,
        path: impl Into<PathBuf>,
        mode: OpenMode,
        on_open: impl FnOnce(Result<()>) + Send + 'static,
    ) -> Result<Self> {
        let handle = Handle::empty();
        let path = path.into();
        dispatcher.submit(
            &handle,
            move |slot| {
                *slot = Some(WritableDatabase::open(&path, mode)?);
                Ok(())
            },
            on_open,
        )?;
        Ok(WritableDatabaseHandle { handle })
    }

    /// Add the document, or replace every document carrying `id_term`
    /// when one is given. The continuation receives the new docid.
    pub fn add_or_replace(
        &self,
        dispatcher: &Dispatcher,
        id_term: Option<String>,
        document: &DocumentHandle,
        continuation: impl FnOnce(Result<u32>) + Send + 'static,
    ) -> Result<()> {
        // Copy the input now: the source handle is free to go away while
        // the write runs.
        let document = document.cloned_document()?;
        dispatcher.submit(
            &self.handle,
            move |slot| {
                let db = open_object(slot, "writable database")?;
                match id_term.as_deref() {
                    Some(term) if !term.is_empty() => db.replace_document(term, document),
                    _ => db.add_document(document),
                }
            },
            continuation,
        )
    }

    /// Persist pending changes as the new committed revision.
    pub fn commit(
        &self,
        dispatcher: &Dispatcher,
        continuation: impl FnOnce(Result<()>) + Send + 'static,
    ) -> Result<()> {
        dispatcher.submit(
            &self.handle,
            |slot| open_object(slot, "writable database")?.commit(),
            continuation,
        )
    }

    /// Start a transaction, optionally committing pending changes first.
    pub fn begin_transaction(
        &self,
        dispatcher: &Dispatcher,
        flush_first: bool,
        continuation: impl FnOnce(Result<()>) + Send + 'static,
    ) -> Result<()> {
        dispatcher.submit(
            &self.handle,
            move |slot| open_object(slot, "writable database")?.begin_transaction(flush_first),
            continuation,
        )
    }

    /// Commit the open transaction.
    pub fn commit_transaction(
        &self,
        dispatcher: &Dispatcher,
        continuation: impl FnOnce(Result<()>) + Send + 'static,
    ) -> Result<()> {
        dispatcher.submit(
            &self.handle,
            |slot| open_object(slot, "writable database")?.commit_transaction(),
            continuation,
        )
    }

    /// Live document count, including uncommitted adds. Synchronous.
    pub fn doc_count(&self) -> Result<u64> {
        self.handle
            .with_exclusive(|slot| Ok(open_object(slot, "writable database")?.doc_count()))
    }

    /// Whether the open task has completed successfully.
    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    /// Whether a task is outstanding against this handle.
    pub fn is_busy(&self) -> bool {
        self.handle.is_busy()
    }
}
