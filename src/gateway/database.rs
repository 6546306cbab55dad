//! Read-only index handles.
//!
//! Opening is asynchronous: the handle exists immediately, its engine
//! object arrives when the open task completes, and the caller's `on_open`
//! continuation fires exactly once with the error-first outcome. Reopen
//! follows the same single-flight rule, so a reopen racing an unfinished
//! open fails busy instead of aliasing the object.

use std::path::PathBuf;

use crate::engine::{Database, Enquire};
use crate::error::Result;
use crate::gateway::dispatcher::Dispatcher;
use crate::gateway::handle::{EngineObject, Handle, open_object};

impl EngineObject for Database {
    fn close(&mut self) -> Result<()> {
        Database::close(self);
        Ok(())
    }
}

/// A handle to a read-only index, possibly spanning several shards.
#[derive(Clone)]
pub struct DatabaseHandle {
    handle: Handle<Database>,
}

impl DatabaseHandle {
    /// Open the index at `path` asynchronously. `on_open` is the opened
    /// notification: invoked once, error-first, when the open task
    /// completes.
    pub fn open(
        dispatcher: &Dispatcher,
        path: impl Into<PathBuf>,
        on_open: impl FnOnce(Result<()>) + Send + 'static,
    ) -> Result<Self> {
        let handle = Handle::empty();
        let path = path.into();
        dispatcher.submit(
            &handle,
            move |slot| {
                *slot = Some(Database::open(&path)?);
                Ok(())
            },
            on_open,
        )?;
        Ok(DatabaseHandle { handle })
    }

    /// Re-synchronize to the latest committed revision of every shard.
    pub fn reopen(
        &self,
        dispatcher: &Dispatcher,
        continuation: impl FnOnce(Result<()>) + Send + 'static,
    ) -> Result<()> {
        dispatcher.submit(
            &self.handle,
            |slot| open_object(slot, "database")?.reopen(),
            continuation,
        )
    }

    /// Fold another open reader's shards into this one. Synchronous;
    /// requires both handles to be idle and open.
    pub fn add_database(&self, other: &DatabaseHandle) -> Result<()> {
        self.handle.with_exclusive(|slot| {
            let db = open_object(slot, "database")?;
            other.handle.with_exclusive(|other_slot| {
                let other_db = open_object(other_slot, "database")?;
                db.add_shards(other_db)
            })
        })
    }

    /// Total documents across all shards. Synchronous.
    pub fn doc_count(&self) -> Result<u64> {
        self.handle
            .with_exclusive(|slot| Ok(open_object(slot, "database")?.doc_count()))
    }

    /// Whether the open task has completed successfully.
    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    /// Snapshot the current revisions into a new search session.
    pub(crate) fn new_session(&self) -> Result<Enquire> {
        self.handle
            .with_exclusive(|slot| Ok(Enquire::new(open_object(slot, "database")?)))
    }
}
