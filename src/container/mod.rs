//! The fixed-width binary container.
//!
//! A container file is laid out as contiguous little-endian regions:
//!
//! ```text
//! Header         64 B
//! Node table     node_count × 32 B
//! Edge table     edge_count × 8 B, grouped per node, sorted by unit
//! Value table    u32 count + length-prefixed (key, value) byte strings
//! Character map  compressed graphs only: u32 count + 8 B entries
//! ```
//!
//! Node and edge records are fixed-width so a read-only consumer can
//! traverse the automaton straight out of a mapping with pointer
//! arithmetic; see [`reader`]. Edge records come in a narrow form
//! (1-byte unit, 24-bit target) when the graph is ASCII or compressed,
//! and a wide form (two `u32`s) otherwise.

pub mod reader;
pub mod text;

use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use rustc_hash::FxHashMap;

use crate::alphabet::EncodingMode;
use crate::error::{DawgError, Result};
use crate::graph::Dawg;

/// `D A W G` at offset 0.
pub const MAGIC: [u8; 4] = [0x44, 0x41, 0x57, 0x47];
/// Current container format version.
pub const FORMAT_VERSION: u32 = 1;
/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 64;
/// Fixed node record size in bytes.
pub const NODE_RECORD_SIZE: usize = 32;
/// Fixed edge record size in bytes.
pub const EDGE_RECORD_SIZE: usize = 8;

/// Header flag bit 0: reserved (terminal marker namespace).
pub const FLAG_TERMINAL: u32 = 1;
/// Header flag bit 1: reserved (value marker namespace).
pub const FLAG_HAS_VALUE: u32 = 1 << 1;
/// Header flag bit 2: all units are ASCII code points.
pub const FLAG_ASCII_ONLY: u32 = 1 << 2;
/// Header flag bit 3: units are compressed single bytes.
pub const FLAG_COMPRESSED: u32 = 1 << 3;

/// Node flag bit 0: the state is terminal.
pub const NODE_TERMINAL: u32 = 1;
/// Node flag bit 1: the state carries a value index.
pub const NODE_HAS_VALUE: u32 = 1 << 1;

/// Sentinel for an absent value index in a node record.
pub const NO_VALUE_INDEX: u32 = u32::MAX;

/// Narrow edge records address at most 2^24 nodes.
const NARROW_TARGET_LIMIT: usize = 1 << 24;

/// Serialize the graph into container bytes.
pub fn write_bytes(dawg: &Dawg) -> Result<Vec<u8>> {
    let arena = dawg.arena();
    let alphabet = dawg.alphabet();
    let narrow = alphabet.mode().is_narrow();

    // Dense index assignment: breadth-first from the root so node 0 is
    // the root and the layout is reproducible. The representative key
    // tracked per node labels its value-table entry.
    let mut dense: FxHashMap<u32, u32> = FxHashMap::default();
    let mut order: Vec<u32> = Vec::with_capacity(arena.len());
    let mut rep_key: Vec<String> = Vec::with_capacity(arena.len());
    let mut queue = VecDeque::new();
    dense.insert(dawg.root_slot(), 0);
    order.push(dawg.root_slot());
    rep_key.push(String::new());
    queue.push_back(dawg.root_slot());
    while let Some(slot) = queue.pop_front() {
        let prefix = rep_key[dense[&slot] as usize].clone();
        for &(unit, child) in &arena[slot as usize].edges {
            if !dense.contains_key(&child) {
                dense.insert(child, order.len() as u32);
                order.push(child);
                let mut key = prefix.clone();
                if let Some(ch) = alphabet.decode(unit) {
                    key.push(ch);
                }
                rep_key.push(key);
                queue.push_back(child);
            }
        }
    }

    let node_count = order.len();
    let edge_count: usize = order
        .iter()
        .map(|&slot| arena[slot as usize].edges.len())
        .sum();
    if narrow && node_count > NARROW_TARGET_LIMIT {
        return Err(DawgError::BadContainer(format!(
            "{node_count} nodes exceed the narrow 24-bit target range"
        )));
    }

    // Live value entries renumbered densely in node order.
    let mut value_remap: FxHashMap<u32, u32> = FxHashMap::default();
    let mut value_entries: Vec<(String, String)> = Vec::new();
    for (dense_idx, &slot) in order.iter().enumerate() {
        if let Some(old) = arena[slot as usize].value_index {
            if let Some(value) = dawg.value(old) {
                value_remap.insert(old, value_entries.len() as u32);
                value_entries.push((rep_key[dense_idx].clone(), value.to_text()));
            }
        }
    }

    let edge_base = HEADER_SIZE + node_count * NODE_RECORD_SIZE;
    let value_offset = edge_base + edge_count * EDGE_RECORD_SIZE;

    let mut out = Vec::with_capacity(value_offset + 64);
    out.write_all(&MAGIC)?;
    out.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    let flags = match alphabet.mode() {
        EncodingMode::Ascii => FLAG_ASCII_ONLY,
        EncodingMode::Compressed => FLAG_COMPRESSED,
        EncodingMode::Wide => 0,
    };
    out.write_u32::<LittleEndian>(flags)?;
    out.write_u32::<LittleEndian>(node_count as u32)?;
    out.write_u32::<LittleEndian>(edge_count as u32)?;
    out.write_u32::<LittleEndian>(HEADER_SIZE as u32)?;
    out.write_u32::<LittleEndian>(value_offset as u32)?;
    out.write_u32::<LittleEndian>(value_entries.len() as u32)?;
    out.write_all(&[0u8; 32])?;

    // Node table.
    let mut edges_offset = edge_base;
    for &slot in &order {
        let node = &arena[slot as usize];
        let live_value = node.value_index.and_then(|old| value_remap.get(&old));
        let mut flags = 0u32;
        if node.terminal {
            flags |= NODE_TERMINAL;
        }
        if live_value.is_some() {
            flags |= NODE_HAS_VALUE;
        }
        out.write_u32::<LittleEndian>(flags)?;
        out.write_u32::<LittleEndian>(live_value.copied().unwrap_or(NO_VALUE_INDEX))?;
        out.write_u32::<LittleEndian>(node.edges.len() as u32)?;
        out.write_u32::<LittleEndian>(edges_offset as u32)?;
        out.write_all(&[0u8; 16])?;
        edges_offset += node.edges.len() * EDGE_RECORD_SIZE;
    }

    // Edge table, grouped per node in the same order.
    for &slot in &order {
        for &(unit, child) in &arena[slot as usize].edges {
            let target = dense[&child];
            if narrow {
                out.write_u8(unit as u8)?;
                let bytes = target.to_le_bytes();
                out.write_all(&bytes[..3])?;
                out.write_all(&[0u8; 4])?;
            } else {
                out.write_u32::<LittleEndian>(unit)?;
                out.write_u32::<LittleEndian>(target)?;
            }
        }
    }

    // Value table.
    out.write_u32::<LittleEndian>(value_entries.len() as u32)?;
    let ascii = alphabet.mode() == EncodingMode::Ascii;
    for (key, value) in &value_entries {
        write_text(&mut out, key, ascii)?;
        write_text(&mut out, value, ascii)?;
    }

    // Character map.
    if alphabet.mode() == EncodingMode::Compressed {
        let map = alphabet.char_map();
        out.write_u32::<LittleEndian>(map.len() as u32)?;
        for (ch, byte) in map {
            out.write_u32::<LittleEndian>(ch as u32)?;
            out.write_u8(byte)?;
            out.write_all(&[0u8; 3])?;
        }
    }

    Ok(out)
}

/// Write the container to a file.
pub fn write_file(dawg: &Dawg, path: &Path) -> Result<()> {
    let bytes = write_bytes(dawg)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Length-prefixed character data: narrow bytes in ASCII mode, 4-byte
/// code points otherwise.
fn write_text<W: Write>(out: &mut W, text: &str, ascii: bool) -> Result<()> {
    if ascii {
        out.write_u32::<LittleEndian>(text.len() as u32)?;
        out.write_all(text.as_bytes())?;
    } else {
        let chars: Vec<char> = text.chars().collect();
        out.write_u32::<LittleEndian>((chars.len() * 4) as u32)?;
        for ch in chars {
            out.write_u32::<LittleEndian>(ch as u32)?;
        }
    }
    Ok(())
}

/// True when the file starts with the container magic.
pub fn sniff_binary(path: &Path) -> Result<bool> {
    use std::io::Read;
    let mut file = std::fs::File::open(path)?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == MAGIC),
        // Shorter than four bytes cannot be a container.
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Container size this graph would serialize to, without serializing.
pub fn estimated_size(dawg: &Dawg) -> usize {
    let arena = dawg.arena();
    let edge_count: usize = arena.iter().map(|n| n.edges.len()).sum();
    let ascii = dawg.alphabet().mode() == EncodingMode::Ascii;
    let char_width = if ascii { 1 } else { 4 };
    let mut size = HEADER_SIZE + arena.len() * NODE_RECORD_SIZE + edge_count * EDGE_RECORD_SIZE + 4;
    for (key, value) in dawg.collect_pairs() {
        if let Some(value) = value {
            size += 8
                + key.chars().count() * char_width
                + value.to_text().chars().count() * char_width;
        }
    }
    if dawg.alphabet().mode() == EncodingMode::Compressed {
        size += 4 + dawg.alphabet().mapped_units() * 8;
    }
    size
}

/// Decode length-prefixed character data written by [`write_text`].
pub(crate) fn decode_text(bytes: &[u8], ascii: bool) -> Option<String> {
    if ascii {
        std::str::from_utf8(bytes).ok().map(|s| s.to_string())
    } else {
        if bytes.len() % 4 != 0 {
            return None;
        }
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let cp = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                char::from_u32(cp)
            })
            .collect()
    }
}
