use crate::pdf_utils;
use crate::Result;
use lopdf::Document;
use std::path::Path;

// ── KeywordSource ─────────────────────────────────────────────────────────────

/// Reads the ordered keyword list embedded in a document.
///
/// The pipeline calls this once per source file. An `Err` means the
/// document's metadata could not be read at all; a document that simply
/// carries no keywords returns `Ok(vec![])`.
pub trait KeywordSource: Send + Sync {
    fn read_keywords(&self, path: &Path) -> Result<Vec<String>>;
}

impl<F> KeywordSource for F
where
    F: Fn(&Path) -> Result<Vec<String>> + Send + Sync,
{
    fn read_keywords(&self, path: &Path) -> Result<Vec<String>> {
        self(path)
    }
}

// ── PdfKeywordReader ──────────────────────────────────────────────────────────

/// [`KeywordSource`] backed by lopdf.
///
/// Reads `/Keywords` from the trailer's `/Info` dictionary and splits it on
/// commas and semicolons.
///
/// ```no_run
/// use paperless_sorter::{KeywordSource, PdfKeywordReader};
///
/// let keywords = PdfKeywordReader.read_keywords("receipt.pdf".as_ref()).unwrap();
/// for k in keywords {
///     println!("{k}");
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfKeywordReader;

impl PdfKeywordReader {
    /// Read keywords from an already-loaded document.
    pub fn keywords_from_document(document: &Document) -> Vec<String> {
        let info = document
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|v| pdf_utils::resolve_dict(document, v));

        let Some(info) = info else {
            return Vec::new();
        };

        pdf_utils::extract_string_from_dict(document, info, b"Keywords")
            .map(|raw| split_keywords(&raw))
            .unwrap_or_default()
    }
}

impl KeywordSource for PdfKeywordReader {
    fn read_keywords(&self, path: &Path) -> Result<Vec<String>> {
        let document = Document::load(path)?;
        Ok(Self::keywords_from_document(&document))
    }
}

/// Split a raw `/Keywords` value into trimmed, non-empty entries, keeping order.
fn split_keywords(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect()
}
