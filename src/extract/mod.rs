//! File-to-text extraction for document assembly.
//!
//! The assembly pipeline consumes extraction through the [`TextExtractor`]
//! trait: one blocking call per file, returning an [`Extraction`] whose
//! [`ExtractStatus`] decides whether the text proceeds into indexing. Only
//! [`ExtractStatus::Ok`] does; every other status is escalated to an
//! extraction error by the pipeline.
//!
//! [`SimpleExtractor`] is the built-in implementation: an extension→mime
//! map, a policy ignore list, and a filter-command map for formats that
//! need an external converter. Hosts with richer needs implement
//! [`TextExtractor`] themselves.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Outcome classification of one extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractStatus {
    /// Text was extracted and may be indexed.
    Ok,
    /// The file's type could not be resolved.
    TypeUnresolved,
    /// The type is excluded from indexing by policy.
    Ignored,
    /// A meta tag in the file forbids indexing.
    Metatag,
    /// The file name is excluded from indexing.
    Filename,
    /// The type needs an external filter that is not configured.
    FilterMissing,
    /// The configured filter command failed.
    CommandFailed,
    /// Only the content hash was produced for this type.
    HashOnly,
    /// A temporary directory needed by a filter could not be made.
    TempDir,
}

/// The fields an extractor can produce for one file.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFields {
    /// Document title, if the format carries one.
    pub title: String,
    /// Author metadata.
    pub author: String,
    /// Keyword metadata.
    pub keywords: String,
    /// The extracted body text.
    pub body: String,
    /// Hash of the raw file content.
    pub content_hash: String,
    /// The mime type the extractor resolved.
    pub mimetype: String,
    /// The external command used, if any.
    pub command: String,
}

/// Result of one extraction attempt: a status plus whatever fields were
/// produced before the attempt stopped.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Status code; only [`ExtractStatus::Ok`] permits indexing.
    pub status: ExtractStatus,
    /// Extracted fields.
    pub fields: ExtractedFields,
}

impl Extraction {
    fn failed(status: ExtractStatus, mimetype: &str) -> Self {
        Extraction {
            status,
            fields: ExtractedFields {
                mimetype: mimetype.to_string(),
                ..Default::default()
            },
        }
    }
}

/// The extraction collaborator boundary.
///
/// Called from worker bodies only; implementations may block. A non-`Ok`
/// status or an `Err` both abort the assembly task that requested it.
pub trait TextExtractor: Send + Sync {
    /// Extract text and metadata from the file at `path`. A `mime_hint`
    /// starting with `.` is treated as an extension to look up; any other
    /// hint is taken as the mime type itself.
    fn extract(&self, path: &Path, mime_hint: Option<&str>) -> Result<Extraction>;
}

/// Special mime-map target: the type is excluded by policy.
const MIME_IGNORE: &str = "ignore";
/// Special mime-map target: record the content hash, extract nothing.
const MIME_HASH_ONLY: &str = "hash-only";

/// Built-in extractor for plain formats, with a command map for the rest.
pub struct SimpleExtractor {
    mime_map: HashMap<String, String>,
    commands: HashMap<String, String>,
}

impl Default for SimpleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleExtractor {
    /// Create an extractor with the default type map.
    pub fn new() -> Self {
        let mut mime_map = HashMap::new();
        for ext in ["txt", "text", "log"] {
            mime_map.insert(ext.to_string(), "text/plain".to_string());
        }
        mime_map.insert("md".to_string(), "text/plain".to_string());
        for ext in ["html", "htm", "xhtml"] {
            mime_map.insert(ext.to_string(), "text/html".to_string());
        }
        mime_map.insert("csv".to_string(), "text/csv".to_string());
        mime_map.insert("pdf".to_string(), "application/pdf".to_string());
        for ext in ["png", "gif", "jpg", "jpeg", "ico"] {
            mime_map.insert(ext.to_string(), MIME_IGNORE.to_string());
        }
        for ext in ["zip", "gz", "tar"] {
            mime_map.insert(ext.to_string(), MIME_HASH_ONLY.to_string());
        }
        SimpleExtractor {
            mime_map,
            commands: HashMap::new(),
        }
    }

    /// Map a file extension to a mime type (or to the `ignore` /
    /// `hash-only` policies).
    pub fn set_mime_type(&mut self, extension: &str, mimetype: &str) {
        self.mime_map
            .insert(extension.to_lowercase(), mimetype.to_string());
    }

    /// Configure the external filter command for a mime type. The command
    /// is run with the file path as its single argument and its stdout is
    /// taken as the body.
    pub fn set_command(&mut self, mimetype: &str, command: &str) {
        self.commands
            .insert(mimetype.to_string(), command.to_string());
    }

    fn resolve_mimetype(&self, path: &Path, mime_hint: Option<&str>) -> Option<String> {
        match mime_hint {
            Some(hint) if hint.starts_with('.') => {
                self.mime_map.get(&hint[1..].to_lowercase()).cloned()
            }
            Some(hint) => Some(hint.to_string()),
            None => {
                let ext = path.extension()?.to_str()?.to_lowercase();
                self.mime_map.get(&ext).cloned()
            }
        }
    }

    fn run_filter(&self, command: &str, path: &Path, fields: &mut ExtractedFields) -> ExtractStatus {
        fields.command = command.to_string();
        let output = match Command::new(command).arg(path).output() {
            Ok(output) => output,
            Err(_) => return ExtractStatus::CommandFailed,
        };
        if !output.status.success() {
            return ExtractStatus::CommandFailed;
        }
        fields.body = String::from_utf8_lossy(&output.stdout).into_owned();
        ExtractStatus::Ok
    }
}

impl TextExtractor for SimpleExtractor {
    fn extract(&self, path: &Path, mime_hint: Option<&str>) -> Result<Extraction> {
        // Dotfiles are excluded by name before anything is read.
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false);
        if hidden {
            return Ok(Extraction::failed(ExtractStatus::Filename, ""));
        }

        let mimetype = match self.resolve_mimetype(path, mime_hint) {
            Some(m) => m,
            None => return Ok(Extraction::failed(ExtractStatus::TypeUnresolved, "")),
        };
        if mimetype == MIME_IGNORE {
            return Ok(Extraction::failed(ExtractStatus::Ignored, &mimetype));
        }

        let raw = fs::read(path)?;
        let mut fields = ExtractedFields {
            content_hash: format!("{:08x}", crc32fast::hash(&raw)),
            mimetype: mimetype.clone(),
            ..Default::default()
        };

        let status = match mimetype.as_str() {
            MIME_HASH_ONLY => ExtractStatus::HashOnly,
            "text/plain" => {
                fields.body = String::from_utf8_lossy(&raw).into_owned();
                ExtractStatus::Ok
            }
            "text/csv" => {
                let text = String::from_utf8_lossy(&raw);
                fields.body = text.replace(',', " ");
                ExtractStatus::Ok
            }
            "text/html" => scrape_html(&String::from_utf8_lossy(&raw), &mut fields),
            other => match self.commands.get(other) {
                Some(command) => self.run_filter(command, path, &mut fields),
                None => ExtractStatus::FilterMissing,
            },
        };

        Ok(Extraction { status, fields })
    }
}

/// Pull title/author/keywords/body out of an HTML document, honoring a
/// `robots` noindex meta tag.
fn scrape_html(html: &str, fields: &mut ExtractedFields) -> ExtractStatus {
    let lower = html.to_lowercase();

    if let Some(robots) = meta_content(html, &lower, "robots") {
        let robots = robots.to_lowercase();
        if robots.contains("noindex") || robots.contains("none") {
            return ExtractStatus::Metatag;
        }
    }
    if let Some(title) = between(html, &lower, "<title", "</title>") {
        // Skip past the rest of the opening tag.
        fields.title = match title.split_once('>') {
            Some((_, rest)) => rest.trim().to_string(),
            None => String::new(),
        };
    }
    fields.author = meta_content(html, &lower, "author").unwrap_or_default();
    fields.keywords = meta_content(html, &lower, "keywords").unwrap_or_default();
    fields.body = strip_tags(html);
    ExtractStatus::Ok
}

/// Substring of `text` between the first `start` and the following `end`,
/// located case-insensitively via the pre-lowered copy.
fn between<'a>(text: &'a str, lower: &str, start: &str, end: &str) -> Option<&'a str> {
    let s = lower.find(start)? + start.len();
    let e = s + lower.get(s..)?.find(end)?;
    // Indices come from the lowered copy; bail out rather than panic if
    // case folding changed byte lengths.
    text.get(s..e)
}

/// The `content` attribute of `<meta name="..." content="...">`.
fn meta_content(text: &str, lower: &str, name: &str) -> Option<String> {
    let attr = format!("name=\"{name}\"");
    let at = lower.find(&attr)?;
    let end = at + lower.get(at..)?.find('>')?;
    let tag = text.get(at..end)?;
    let tag_lower = lower.get(at..end)?;
    let content_pos = tag_lower.find("content=\"")? + "content=\"".len();
    let rest = tag.get(content_pos..)?;
    let quote = rest.find('"')?;
    Some(rest[..quote].to_string())
}

/// Replace markup with whitespace, keeping the text runs.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_plain_text_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "note.txt", "hello extracted world");

        let extractor = SimpleExtractor::new();
        let extraction = extractor.extract(&path, None).unwrap();
        assert_eq!(extraction.status, ExtractStatus::Ok);
        assert_eq!(extraction.fields.body, "hello extracted world");
        assert_eq!(extraction.fields.mimetype, "text/plain");
        assert!(!extraction.fields.content_hash.is_empty());
    }

    #[test]
    fn test_html_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "page.html",
            "<html><head><title>My Page</title>\
             <meta name=\"author\" content=\"Someone\">\
             <meta name=\"keywords\" content=\"alpha beta\"></head>\
             <body><p>Body text here.</p></body></html>",
        );

        let extractor = SimpleExtractor::new();
        let extraction = extractor.extract(&path, None).unwrap();
        assert_eq!(extraction.status, ExtractStatus::Ok);
        assert_eq!(extraction.fields.title, "My Page");
        assert_eq!(extraction.fields.author, "Someone");
        assert_eq!(extraction.fields.keywords, "alpha beta");
        assert!(extraction.fields.body.contains("Body text here."));
        assert!(!extraction.fields.body.contains('<'));
    }

    #[test]
    fn test_noindex_metatag() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "hidden.html",
            "<html><head><meta name=\"robots\" content=\"noindex\"></head>\
             <body>secret</body></html>",
        );

        let extractor = SimpleExtractor::new();
        let extraction = extractor.extract(&path, None).unwrap();
        assert_eq!(extraction.status, ExtractStatus::Metatag);
    }

    #[test]
    fn test_ignored_by_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "image.png", "not really a png");

        let extractor = SimpleExtractor::new();
        let extraction = extractor.extract(&path, None).unwrap();
        assert_eq!(extraction.status, ExtractStatus::Ignored);
    }

    #[test]
    fn test_unresolved_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "data.zarble", "???");

        let extractor = SimpleExtractor::new();
        let extraction = extractor.extract(&path, None).unwrap();
        assert_eq!(extraction.status, ExtractStatus::TypeUnresolved);
    }

    #[test]
    fn test_filter_missing_for_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "doc.pdf", "%PDF-1.4");

        let extractor = SimpleExtractor::new();
        let extraction = extractor.extract(&path, None).unwrap();
        assert_eq!(extraction.status, ExtractStatus::FilterMissing);
    }

    #[test]
    fn test_hash_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bundle.zip", "PK...");

        let extractor = SimpleExtractor::new();
        let extraction = extractor.extract(&path, None).unwrap();
        assert_eq!(extraction.status, ExtractStatus::HashOnly);
        assert!(!extraction.fields.content_hash.is_empty());
        assert!(extraction.fields.body.is_empty());
    }

    #[test]
    fn test_dotfile_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, ".hidden.txt", "secret");

        let extractor = SimpleExtractor::new();
        let extraction = extractor.extract(&path, None).unwrap();
        assert_eq!(extraction.status, ExtractStatus::Filename);
    }

    #[test]
    fn test_extension_hint() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "blob", "plain contents");

        let extractor = SimpleExtractor::new();
        let extraction = extractor.extract(&path, Some(".txt")).unwrap();
        assert_eq!(extraction.status, ExtractStatus::Ok);
        assert_eq!(extraction.fields.body, "plain contents");
    }

    #[test]
    fn test_command_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "doc.pdf", "%PDF-1.4");

        let mut extractor = SimpleExtractor::new();
        extractor.set_command("application/pdf", "/nonexistent/pdftotext");
        let extraction = extractor.extract(&path, None).unwrap();
        assert_eq!(extraction.status, ExtractStatus::CommandFailed);
    }
}
