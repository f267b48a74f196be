//! Portable JSON interchange format.
//!
//! A text document is the logical content of an automaton (the
//! key/value list, the encoding mode, and for compressed graphs the
//! character map) without any of the binary layout. It exists for
//! interchange and inspection; the binary container is the
//! compatibility-critical path. Readers distinguish the two by
//! sniffing the magic bytes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::alphabet::{Alphabet, EncodingMode};
use crate::error::{DawgError, Result};
use crate::graph::value::Value;
use crate::graph::Dawg;

#[derive(Debug, Serialize, Deserialize)]
struct TextDocument {
    version: u32,
    encoding: TextEncoding,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    char_map: Vec<CharMapEntry>,
    entries: Vec<TextEntry>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum TextEncoding {
    Ascii,
    Compressed,
    Wide,
}

#[derive(Debug, Serialize, Deserialize)]
struct CharMapEntry {
    code_point: u32,
    byte: u8,
}

#[derive(Debug, Serialize, Deserialize)]
struct TextEntry {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

/// Write the interchange document for `dawg`.
pub fn write_file(dawg: &Dawg, path: &Path) -> Result<()> {
    let encoding = match dawg.alphabet().mode() {
        EncodingMode::Ascii => TextEncoding::Ascii,
        EncodingMode::Compressed => TextEncoding::Compressed,
        EncodingMode::Wide => TextEncoding::Wide,
    };
    let char_map = dawg
        .alphabet()
        .char_map()
        .into_iter()
        .map(|(ch, byte)| CharMapEntry {
            code_point: ch as u32,
            byte,
        })
        .collect();
    let entries = dawg
        .collect_pairs()
        .into_iter()
        .map(|(key, value)| TextEntry { key, value })
        .collect();
    let document = TextDocument {
        version: 1,
        encoding,
        char_map,
        entries,
    };
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| DawgError::BadContainer(format!("text serialization: {e}")))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Parse an interchange document into a fresh automaton.
///
/// A compressed document's character map is reused when present so the
/// rebuilt graph keeps the same slot assignment; otherwise the mapping
/// is re-derived as keys are added.
pub fn read_file(path: &Path) -> Result<Dawg> {
    let json = std::fs::read_to_string(path)?;
    let document: TextDocument = serde_json::from_str(&json)
        .map_err(|e| DawgError::BadContainer(format!("text parse: {e}")))?;
    if document.version != 1 {
        return Err(DawgError::BadContainer(format!(
            "unknown text format version {}",
            document.version
        )));
    }
    let mut dawg = match document.encoding {
        TextEncoding::Ascii => Dawg::with_mode(EncodingMode::Ascii),
        TextEncoding::Wide => Dawg::with_mode(EncodingMode::Wide),
        TextEncoding::Compressed => {
            let mapping: Vec<(char, u8)> = document
                .char_map
                .iter()
                .filter_map(|entry| char::from_u32(entry.code_point).map(|ch| (ch, entry.byte)))
                .collect();
            Dawg::with_alphabet(Alphabet::from_mapping(&mapping))
        }
    };
    for entry in document.entries {
        match entry.value {
            Some(value) => dawg.add_with_value(&entry.key, value),
            None => dawg.add(&entry.key),
        }
    }
    Ok(dawg)
}
