//! # Falx
//!
//! An asynchronous gateway for driving a blocking full-text search engine
//! from a single-threaded, callback-driven host.
//!
//! ## Features
//!
//! - Resource handles with refcounted lifetime and single-flight admission
//! - A worker-pool dispatcher with exactly-once, error-first continuations
//! - Per-handle task serialization without a lock manager
//! - Match-set marshaling with exclusively-owned document copies
//! - A document assembly pipeline combining fields, text, and extracted
//!   file content
//! - An embedded index engine and a pluggable file-text extractor
//!
//! ## Example
//!
//! ```no_run
//! use falx::engine::OpenMode;
//! use falx::gateway::{Dispatcher, DispatcherConfig, WritableDatabaseHandle};
//!
//! let dispatcher = Dispatcher::new(DispatcherConfig::default()).unwrap();
//! let writer = WritableDatabaseHandle::open(
//!     &dispatcher,
//!     "index-dir",
//!     OpenMode::CreateOrOpen,
//!     |outcome| {
//!         if let Err(e) = outcome {
//!             eprintln!("open failed: {e}");
//!         }
//!     },
//! )
//! .unwrap();
//! dispatcher.pump_until_idle();
//! assert!(writer.is_open());
//! ```

pub mod engine;
pub mod error;
pub mod extract;
pub mod gateway;

pub mod prelude {
    //! The commonly used surface, in one import.
    pub use crate::engine::{OpenMode, Query, QueryOp, Stem};
    pub use crate::error::{FalxError, Result};
    pub use crate::extract::{ExtractStatus, SimpleExtractor, TextExtractor};
    pub use crate::gateway::{
        DatabaseHandle, Dispatcher, DispatcherConfig, DocumentDraft, DocumentHandle,
        EnquireHandle, MatchRecord, TermGeneratorHandle, WritableDatabaseHandle,
    };
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
