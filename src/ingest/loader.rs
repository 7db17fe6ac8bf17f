//! Document loaders, dispatched on file extension.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::{Error, Result};

static TRAILING_SPACES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+\n").expect("valid trailing-space regex"));
static BLANK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank-run regex"));

/// One loaded unit of text: a PDF page or a whole text file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
    /// File name the text was loaded from
    pub source: String,
    /// 1-based page number for paged formats
    pub page: Option<u32>,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page,
        }
    }
}

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    /// Anything else, read as UTF-8 text
    Text,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => DocumentKind::Pdf,
            _ => DocumentKind::Text,
        }
    }
}

/// Load a file into documents. Blocking; call from `spawn_blocking` in async code.
pub fn load_document(path: &Path) -> Result<Vec<Document>> {
    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let docs = match DocumentKind::from_path(path) {
        DocumentKind::Pdf => load_pdf(path, &source)?,
        DocumentKind::Text => load_text(path, &source)?,
    };

    if docs.is_empty() {
        return Err(Error::UnsupportedDocument(format!(
            "{} contains no extractable text",
            source
        )));
    }

    debug!(source = %source, documents = docs.len(), "Loaded document");
    Ok(docs)
}

fn load_pdf(path: &Path, source: &str) -> Result<Vec<Document>> {
    let pdf = lopdf::Document::load(path)?;
    let mut docs = Vec::new();

    for page_number in pdf.get_pages().keys().copied() {
        let raw = pdf.extract_text(&[page_number])?;
        let text = normalize(&raw);
        if text.trim().is_empty() {
            continue;
        }
        docs.push(Document::new(text, source, Some(page_number)));
    }

    Ok(docs)
}

fn load_text(path: &Path, source: &str) -> Result<Vec<Document>> {
    let bytes = std::fs::read(path)?;
    let text = normalize(&String::from_utf8_lossy(&bytes));
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![Document::new(text, source, None)])
}

/// Normalize line endings and squeeze runs of blank lines.
pub fn normalize(text: &str) -> String {
    let unix = text.replace("\r\n", "\n").replace('\r', "\n");
    let no_trailing = TRAILING_SPACES.replace_all(&unix, "\n");
    BLANK_RUNS.replace_all(&no_trailing, "\n\n").into_owned()
}
