//! Shared lopdf helpers.

use lopdf::{Dictionary, Document, Object};

/// Follow `value` through an indirect reference if it is one and return the
/// dictionary it designates.
pub fn resolve_dict<'a>(document: &'a Document, value: &'a Object) -> Option<&'a Dictionary> {
    match value.as_reference() {
        Ok(id) => document.get_object(id).ok()?.as_dict().ok(),
        Err(_) => value.as_dict().ok(),
    }
}

/// Decode a PDF text string: UTF-16BE when it starts with the `FE FF`
/// byte-order mark, otherwise lossy UTF-8.
pub fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Extract a decoded text string from a PDF dictionary for a given key.
///
/// Returns `None` if the key is missing, is not a string, or is empty.
pub fn extract_string_from_dict(
    document: &Document,
    dict: &Dictionary,
    key: &[u8],
) -> Option<String> {
    let value = dict.get(key).ok()?;
    let value = match value.as_reference() {
        Ok(id) => document.get_object(id).ok()?,
        Err(_) => value,
    };
    value
        .as_str()
        .ok()
        .map(decode_text_string)
        .filter(|s| !s.is_empty())
}
