//! The embedded search engine.
//!
//! Everything in this module is blocking, single-owner code: no interior
//! locking, no threads. The gateway layer (`crate::gateway`) owns the
//! concurrency story and only calls in here from worker bodies, or on the
//! control thread for data it has already copied out.

pub mod database;
pub mod document;
pub mod query;
pub mod searcher;
pub mod stemmer;
pub mod term_generator;

pub use database::{Database, OpenMode, WritableDatabase};
pub use document::{EngineDocument, TermEntry};
pub use query::{Query, QueryOp};
pub use searcher::{Enquire, MatchItem};
pub use stemmer::{Language, Stem};
pub use term_generator::{FLAG_SPELLING, TERMPOS_GAP, TermGenerator};
