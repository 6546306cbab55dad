//! Stemming for reducing indexed words to their root forms.
//!
//! [`Stem`] is a small, self-contained English stemmer in the Porter
//! tradition: vowel/consonant measure plus ordered suffix rules. It is
//! cheap to clone, so the gateway passes stemmers by value into term
//! generators instead of wrapping them in a handle.

use crate::error::{FalxError, Result};

/// Languages with stemming support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// Porter-style English stemming.
    English,
    /// No stemming: words pass through unchanged.
    None,
}

/// A word stemmer for a fixed language.
#[derive(Debug, Clone)]
pub struct Stem {
    language: Language,
}

impl Stem {
    /// Create a stemmer for a language name (`"english"`, `"en"`, `"none"`).
    pub fn new(language: &str) -> Result<Self> {
        let language = match language.to_ascii_lowercase().as_str() {
            "english" | "en" => Language::English,
            "none" | "" => Language::None,
            other => {
                return Err(FalxError::invalid_argument(format!(
                    "unsupported stemmer language: {other}"
                )));
            }
        };
        Ok(Stem { language })
    }

    /// The language this stemmer was built for.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Stem a single lowercase word.
    pub fn stem(&self, word: &str) -> String {
        match self.language {
            Language::None => word.to_string(),
            Language::English => stem_english(word),
        }
    }
}

/// Check if the character at `pos` acts as a vowel.
fn is_vowel(chars: &[char], pos: usize) -> bool {
    match chars[pos] {
        'a' | 'e' | 'i' | 'o' | 'u' => true,
        'y' => pos > 0 && !is_vowel(chars, pos - 1),
        _ => false,
    }
}

/// Count VC patterns (the Porter "measure") of a word.
fn measure(word: &str) -> usize {
    let chars: Vec<char> = word.chars().collect();
    let mut m = 0;
    let mut prev_vowel = false;
    for i in 0..chars.len() {
        let v = is_vowel(&chars, i);
        if prev_vowel && !v {
            m += 1;
        }
        prev_vowel = v;
    }
    m
}

fn contains_vowel(word: &str) -> bool {
    let chars: Vec<char> = word.chars().collect();
    (0..chars.len()).any(|i| is_vowel(&chars, i))
}

fn ends_double_consonant(word: &str) -> bool {
    let chars: Vec<char> = word.chars().collect();
    let n = chars.len();
    n >= 2 && chars[n - 1] == chars[n - 2] && !is_vowel(&chars, n - 1)
}

fn stem_english(word: &str) -> String {
    if word.len() <= 2 {
        return word.to_string();
    }
    let mut w = word.to_string();

    // Step 1a: plurals.
    if let Some(stripped) = w.strip_suffix("sses") {
        w = format!("{stripped}ss");
    } else if let Some(stripped) = w.strip_suffix("ies") {
        w = format!("{stripped}i");
    } else if !w.ends_with("ss") && w.ends_with('s') && w.len() > 3 {
        w.truncate(w.len() - 1);
    }

    // Step 1b: -eed / -ed / -ing.
    if let Some(stripped) = w.strip_suffix("eed") {
        if measure(stripped) > 0 {
            w.truncate(w.len() - 1);
        }
    } else {
        let stripped = w
            .strip_suffix("ed")
            .or_else(|| w.strip_suffix("ing"))
            .filter(|s| contains_vowel(s))
            .map(|s| s.to_string());
        if let Some(mut s) = stripped {
            if s.ends_with("at") || s.ends_with("bl") || s.ends_with("iz") {
                s.push('e');
            } else if ends_double_consonant(&s) && !s.ends_with('l') && !s.ends_with('s') && !s.ends_with('z') {
                s.truncate(s.len() - 1);
            }
            w = s;
        }
    }

    // Step 1c: terminal y.
    if w.ends_with('y') {
        let stem = &w[..w.len() - 1];
        if contains_vowel(stem) {
            w = format!("{stem}i");
        }
    }

    w
}
