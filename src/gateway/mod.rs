//! The concurrency gateway.
//!
//! This module is the crate's core: it lets a single-threaded,
//! callback-driven host drive the blocking engine without ever blocking
//! its own control thread. Handles wrap engine objects with refcounted
//! lifetime and single-flight admission; the dispatcher moves worker
//! bodies onto a pool and completions back to the control thread; the
//! assembly pipeline composes documents from drafts and extracted file
//! text.
//!
//! Conventions, uniform across every handle type:
//! - Admission failures (busy handle, malformed arguments) are returned
//!   synchronously and never reach a continuation.
//! - Every admitted task delivers exactly one error-first outcome to its
//!   continuation, on the thread that pumps the dispatcher.
//! - A handle's busy flag clears when the worker body ends, before its
//!   completion is delivered.
//! - Data crossing between handles is deep-copied at submission time.

pub mod assemble;
pub mod database;
pub mod dispatcher;
pub mod document;
pub mod enquire;
pub mod handle;
pub mod writer;

pub use assemble::{DocumentDraft, TermGeneratorHandle};
pub use database::DatabaseHandle;
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use document::DocumentHandle;
pub use enquire::{EnquireHandle, MatchRecord};
pub use handle::{EngineObject, Handle, TaskPermit};
pub use writer::WritableDatabaseHandle;
