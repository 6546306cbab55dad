//! Index storage: writable databases and read-only readers.
//!
//! An index lives in a directory holding one revision file: a JSON
//! serialization of the committed state guarded by a crc32 checksum,
//! written atomically (temp file + rename). A [`WritableDatabase`] owns a
//! directory exclusively and mutates in memory until `commit`; a
//! [`Database`] is a read-only view over one or more such directories
//! ("shards") at their last committed revisions.
//!
//! Every method here may block on I/O. The gateway only ever calls into
//! this module from worker bodies.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::document::EngineDocument;
use crate::error::{FalxError, Result};

/// File name of the committed revision inside an index directory.
const REVISION_FILE: &str = "revision.json";

/// How a writable database treats an existing (or missing) index directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// The index must already exist.
    Open,
    /// The index must not exist yet.
    Create,
    /// Open the index, creating it first if missing.
    CreateOrOpen,
    /// Create a fresh index, truncating any existing one.
    CreateOrOverwrite,
}

/// The committed state of one index directory. Constructed only by
/// `Revision::new` or deserialization, so `next_docid` is always at least 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    next_docid: u32,
    docs: BTreeMap<u32, EngineDocument>,
    spelling: BTreeSet<String>,
}

impl Revision {
    fn new() -> Self {
        Revision {
            next_docid: 1,
            docs: BTreeMap::new(),
            spelling: BTreeSet::new(),
        }
    }

    /// Number of live documents.
    pub fn doc_count(&self) -> u64 {
        self.docs.len() as u64
    }

    /// Iterate documents in docid order.
    pub fn docs(&self) -> impl Iterator<Item = (u32, &EngineDocument)> {
        self.docs.iter().map(|(id, d)| (*id, d))
    }

    /// Look up a document by docid.
    pub fn doc(&self, docid: u32) -> Option<&EngineDocument> {
        self.docs.get(&docid)
    }

    /// Highest docid bound, used to offset docids across shards.
    pub fn docid_bound(&self) -> u32 {
        self.next_docid - 1
    }

    /// Whether a word is in the spelling dictionary.
    pub fn has_spelling(&self, word: &str) -> bool {
        self.spelling.contains(word)
    }
}

/// On-disk envelope around a serialized [`Revision`].
#[derive(Debug, Serialize, Deserialize)]
struct RevisionFile {
    checksum: u32,
    payload: String,
}

fn revision_path(dir: &Path) -> PathBuf {
    dir.join(REVISION_FILE)
}

fn load_revision(dir: &Path) -> Result<Revision> {
    let path = revision_path(dir);
    let raw = fs::read_to_string(&path).map_err(|e| {
        FalxError::engine(format!("cannot read index at {}: {e}", dir.display()))
    })?;
    let file: RevisionFile = serde_json::from_str(&raw)?;
    if crc32fast::hash(file.payload.as_bytes()) != file.checksum {
        return Err(FalxError::engine(format!(
            "index at {} is corrupt: revision checksum mismatch",
            dir.display()
        )));
    }
    Ok(serde_json::from_str(&file.payload)?)
}

fn store_revision(dir: &Path, revision: &Revision) -> Result<()> {
    let payload = serde_json::to_string(revision)?;
    let file = RevisionFile {
        checksum: crc32fast::hash(payload.as_bytes()),
        payload,
    };
    let tmp = dir.join(format!("{REVISION_FILE}.tmp"));
    fs::write(&tmp, serde_json::to_vec(&file)?)?;
    fs::rename(&tmp, revision_path(dir))?;
    Ok(())
}

/// One read-only shard: a directory and its loaded revision.
#[derive(Debug, Clone)]
pub struct Shard {
    path: PathBuf,
    revision: Arc<Revision>,
}

impl Shard {
    /// The shard's committed revision.
    pub fn revision(&self) -> &Arc<Revision> {
        &self.revision
    }
}

/// A read-only database over one or more index shards.
#[derive(Debug)]
pub struct Database {
    shards: Vec<Shard>,
    closed: bool,
}

impl Database {
    /// Open a reader over the index directory at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let revision = Arc::new(load_revision(&path)?);
        Ok(Database {
            shards: vec![Shard { path, revision }],
            closed: false,
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(FalxError::engine("database is closed"))
        } else {
            Ok(())
        }
    }

    /// Re-synchronize every shard to its latest committed revision.
    pub fn reopen(&mut self) -> Result<()> {
        self.check_open()?;
        for shard in &mut self.shards {
            shard.revision = Arc::new(load_revision(&shard.path)?);
        }
        Ok(())
    }

    /// Fold another reader's shards into this one.
    pub fn add_shards(&mut self, other: &Database) -> Result<()> {
        self.check_open()?;
        other.check_open()?;
        self.shards.extend(other.shards.iter().cloned());
        Ok(())
    }

    /// The shards of this reader, in addition order.
    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    /// Total number of documents across all shards.
    pub fn doc_count(&self) -> u64 {
        self.shards.iter().map(|s| s.revision.doc_count()).sum()
    }

    /// Release the loaded revisions. Further operations fail.
    pub fn close(&mut self) {
        self.shards.clear();
        self.closed = true;
    }
}

/// A writable database over exactly one index directory.
#[derive(Debug)]
pub struct WritableDatabase {
    path: PathBuf,
    revision: Revision,
    dirty: bool,
    in_transaction: bool,
    closed: bool,
}

impl WritableDatabase {
    /// Open (or create) the index directory at `path` according to `mode`.
    /// Creating modes write the initial revision file immediately.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let exists = revision_path(&path).exists();

        let revision = match mode {
            OpenMode::Open => {
                if !exists {
                    return Err(FalxError::engine(format!(
                        "no index at {}",
                        path.display()
                    )));
                }
                load_revision(&path)?
            }
            OpenMode::Create => {
                if exists {
                    return Err(FalxError::engine(format!(
                        "index already exists at {}",
                        path.display()
                    )));
                }
                Self::init_directory(&path)?
            }
            OpenMode::CreateOrOpen => {
                if exists {
                    load_revision(&path)?
                } else {
                    Self::init_directory(&path)?
                }
            }
            OpenMode::CreateOrOverwrite => Self::init_directory(&path)?,
        };

        Ok(WritableDatabase {
            path,
            revision,
            dirty: false,
            in_transaction: false,
            closed: false,
        })
    }

    fn init_directory(path: &Path) -> Result<Revision> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        } else if !path.is_dir() {
            return Err(FalxError::engine(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }
        let revision = Revision::new();
        store_revision(path, &revision)?;
        Ok(revision)
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(FalxError::engine("database is closed"))
        } else {
            Ok(())
        }
    }

    /// Add a document, returning its docid. The change is held in memory
    /// until the next commit.
    pub fn add_document(&mut self, mut doc: EngineDocument) -> Result<u32> {
        self.check_open()?;
        for word in doc.take_spelling() {
            self.revision.spelling.insert(word);
        }
        let docid = self.revision.next_docid;
        self.revision.next_docid += 1;
        self.revision.docs.insert(docid, doc);
        self.dirty = true;
        Ok(docid)
    }

    /// Replace every document carrying `id_term` with `doc` (adding it if
    /// none does), returning the new docid.
    pub fn replace_document(&mut self, id_term: &str, doc: EngineDocument) -> Result<u32> {
        self.check_open()?;
        let stale: Vec<u32> = self
            .revision
            .docs
            .iter()
            .filter(|(_, d)| d.has_term(id_term))
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            self.revision.docs.remove(&id);
        }
        self.dirty = true;
        self.add_document(doc)
    }

    /// Persist the current state as the new committed revision.
    pub fn commit(&mut self) -> Result<()> {
        self.check_open()?;
        store_revision(&self.path, &self.revision)?;
        self.dirty = false;
        Ok(())
    }

    /// Start a transaction. With `flush_first`, pending changes are
    /// committed before the transaction opens.
    pub fn begin_transaction(&mut self, flush_first: bool) -> Result<()> {
        self.check_open()?;
        if self.in_transaction {
            return Err(FalxError::engine("transaction already in progress"));
        }
        if flush_first {
            self.commit()?;
        }
        self.in_transaction = true;
        Ok(())
    }

    /// Commit the open transaction and persist its changes.
    pub fn commit_transaction(&mut self) -> Result<()> {
        self.check_open()?;
        if !self.in_transaction {
            return Err(FalxError::engine("no transaction in progress"));
        }
        self.in_transaction = false;
        self.commit()
    }

    /// Number of live documents, including uncommitted ones.
    pub fn doc_count(&self) -> u64 {
        self.revision.doc_count()
    }

    /// Whether uncommitted changes exist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Orderly close: committed state is flushed unless a transaction is
    /// still open, in which case its uncommitted changes are discarded.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if self.dirty && !self.in_transaction {
            self.commit()?;
        }
        self.closed = true;
        Ok(())
    }
}
