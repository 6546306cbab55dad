//! Positional term generation for free text.
//!
//! The [`TermGenerator`] turns blocks of text into positional postings on an
//! [`EngineDocument`]. It keeps a running term position across calls so a
//! caller can insert a gap between unrelated text blocks, preventing
//! spurious phrase or proximity matches across block boundaries.

use unicode_segmentation::UnicodeSegmentation;

use crate::engine::document::EngineDocument;
use crate::engine::stemmer::Stem;

/// Record indexed words into the spelling dictionary.
pub const FLAG_SPELLING: u32 = 1;

/// Default position advance between unrelated text blocks.
pub const TERMPOS_GAP: u32 = 100;

/// Generates positional terms from text into a document.
#[derive(Debug, Default)]
pub struct TermGenerator {
    stemmer: Option<Stem>,
    flags: u32,
    termpos: u32,
}

impl TermGenerator {
    /// Create a new term generator with no stemmer and no flags.
    pub fn new() -> Self {
        TermGenerator::default()
    }

    /// Set the stemmer applied to every indexed word.
    pub fn set_stemmer(&mut self, stemmer: Stem) {
        self.stemmer = Some(stemmer);
    }

    /// Set behavior flags (see [`FLAG_SPELLING`]).
    pub fn set_flags(&mut self, flags: u32) {
        self.flags = flags;
    }

    /// Current term position.
    pub fn termpos(&self) -> u32 {
        self.termpos
    }

    /// Index a block of text into `doc`, advancing the term position by one
    /// per word and increasing each word's frequency by `wdf_increment`.
    pub fn index_text(&mut self, doc: &mut EngineDocument, text: &str, wdf_increment: u32) {
        for word in text.unicode_words() {
            let word = word.to_lowercase();
            if self.flags & FLAG_SPELLING != 0 {
                doc.add_spelling(&word);
            }
            let term = match &self.stemmer {
                Some(stem) => stem.stem(&word),
                None => word,
            };
            self.termpos += 1;
            doc.add_posting(&term, self.termpos, wdf_increment);
        }
    }

    /// Advance the term position without indexing anything, so the next
    /// text block does not appear adjacent to the previous one.
    pub fn increase_termpos(&mut self, delta: u32) {
        self.termpos += delta;
    }
}
