//! The document assembly pipeline.
//!
//! Assembly turns a [`DocumentDraft`] (direct field values plus an
//! optional file to extract) into one indexed-ready [`DocumentHandle`],
//! as a single task owned by the [`TermGeneratorHandle`]. The draft is
//! validated synchronously before anything is scheduled; extraction and
//! text indexing happen inside the worker body; the continuation receives
//! either the assembled document or exactly one categorized error, never a
//! partial document.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::{Stem, TERMPOS_GAP, TermGenerator};
use crate::error::{FalxError, Result};
use crate::extract::{ExtractStatus, TextExtractor};
use crate::gateway::dispatcher::Dispatcher;
use crate::gateway::document::DocumentHandle;
use crate::gateway::handle::{EngineObject, Handle, open_object};

impl EngineObject for TermGenerator {}

/// A caller-supplied description of a document to assemble.
#[derive(Debug, Clone, Default)]
pub struct DocumentDraft {
    /// Unique/boolean id term, used for replace semantics downstream.
    pub id_term: Option<String>,
    /// Opaque data payload.
    pub data: Option<String>,
    /// Text blocks, indexed positionally in order, a gap between each.
    pub text: Vec<String>,
    /// Terms added directly with their frequency increments.
    pub terms: BTreeMap<String, u32>,
    /// Value slots.
    pub values: BTreeMap<u32, String>,
    /// File to run through the extraction collaborator.
    pub file_path: Option<PathBuf>,
    /// Mime type hint for the extractor (`.ext` form or a mime type).
    pub file_mime_hint: Option<String>,
}

impl DocumentDraft {
    /// A draft with nothing populated yet.
    pub fn new() -> Self {
        DocumentDraft::default()
    }

    /// Check the draft is well-formed and non-empty. Runs on the control
    /// thread, before any task is scheduled.
    pub fn validate(&self) -> Result<()> {
        let empty = self.id_term.is_none()
            && self.data.is_none()
            && self.text.is_empty()
            && self.terms.is_empty()
            && self.values.is_empty()
            && self.file_path.is_none();
        if empty {
            return Err(FalxError::invalid_argument(
                "document draft has no content",
            ));
        }
        if let Some(id) = &self.id_term {
            if id.is_empty() {
                return Err(FalxError::invalid_argument("id term must be non-empty"));
            }
        }
        if self.terms.keys().any(|t| t.is_empty()) {
            return Err(FalxError::invalid_argument("term keys must be non-empty"));
        }
        if let Some(path) = &self.file_path {
            if path.as_os_str().is_empty() {
                return Err(FalxError::invalid_argument("file path must be non-empty"));
            }
        }
        Ok(())
    }
}

/// A handle to one text indexer (term generator). Owning assembly tasks
/// serializes them, so a shared generator's position state is never
/// mutated concurrently.
#[derive(Clone)]
pub struct TermGeneratorHandle {
    handle: Handle<TermGenerator>,
}

impl Default for TermGeneratorHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl TermGeneratorHandle {
    /// Create a term generator handle with no stemmer and no flags.
    pub fn new() -> Self {
        TermGeneratorHandle {
            handle: Handle::new(TermGenerator::new()),
        }
    }

    /// Set the stemmer applied to indexed words. Synchronous.
    pub fn set_stemmer(&self, stemmer: Stem) -> Result<()> {
        self.handle.with_exclusive(|slot| {
            open_object(slot, "term generator")?.set_stemmer(stemmer);
            Ok(())
        })
    }

    /// Set behavior flags (see [`crate::engine::FLAG_SPELLING`]).
    /// Synchronous.
    pub fn set_flags(&self, flags: u32) -> Result<()> {
        self.handle.with_exclusive(|slot| {
            open_object(slot, "term generator")?.set_flags(flags);
            Ok(())
        })
    }

    /// Assemble `draft` into a new document as one task.
    ///
    /// Validation failures surface synchronously. Inside the worker body,
    /// extraction (when `file_path` is set) runs first; any non-OK status
    /// aborts the task with an extraction error before indexing starts.
    pub fn assemble_document(
        &self,
        dispatcher: &Dispatcher,
        extractor: Arc<dyn TextExtractor>,
        draft: DocumentDraft,
        continuation: impl FnOnce(Result<DocumentHandle>) + Send + 'static,
    ) -> Result<()> {
        draft.validate()?;
        dispatcher.submit(
            &self.handle,
            move |slot| {
                let generator = open_object(slot, "term generator")?;

                let extracted = match &draft.file_path {
                    Some(path) => {
                        let extraction =
                            extractor.extract(path, draft.file_mime_hint.as_deref())?;
                        if extraction.status != ExtractStatus::Ok {
                            return Err(FalxError::extraction(
                                extraction.status,
                                format!("cannot index {}", path.display()),
                            ));
                        }
                        Some(extraction.fields)
                    }
                    None => None,
                };

                let mut doc = crate::engine::EngineDocument::new();
                if let Some(id) = &draft.id_term {
                    doc.add_boolean_term(id);
                }
                if let Some(data) = &draft.data {
                    doc.set_data(data.clone());
                }
                for (term, increment) in &draft.terms {
                    doc.add_term(term, *increment);
                }
                for (slot_number, value) in &draft.values {
                    doc.add_value(*slot_number, value.clone());
                }
                for block in &draft.text {
                    generator.index_text(&mut doc, block, 1);
                    generator.increase_termpos(TERMPOS_GAP);
                }
                if let Some(fields) = extracted {
                    for part in [fields.title, fields.author, fields.keywords, fields.body] {
                        if !part.is_empty() {
                            generator.index_text(&mut doc, &part, 1);
                            generator.increase_termpos(TERMPOS_GAP);
                        }
                    }
                }

                Ok(DocumentHandle::from_engine(doc))
            },
            continuation,
        )
    }
}
