//! Read-only memory-mapped traversal.
//!
//! [`MappedDawg`] maps a container file and serves the full query
//! surface directly out of the mapping: a node cursor is a byte offset,
//! `get_edge` is a binary search over the node's sorted edge records,
//! and nothing is copied out except the small character map decoded at
//! open time. Any number of threads and processes may read the same
//! file concurrently; the file must not be truncated while mapped.

use std::fs::File;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;
use rustc_hash::FxHashMap;

use crate::alphabet::EncodingMode;
use crate::container::{
    decode_text, EDGE_RECORD_SIZE, FLAG_ASCII_ONLY, FLAG_COMPRESSED, FORMAT_VERSION, HEADER_SIZE,
    MAGIC, NODE_HAS_VALUE, NODE_RECORD_SIZE, NODE_TERMINAL, NO_VALUE_INDEX,
};
use crate::error::{DawgError, Result};
use crate::graph::iter::KeyIter;
use crate::graph::value::{Candidate, Entry, Value};
use crate::graph::GraphNode;
use crate::search;

/// A read-only automaton backed by a memory-mapped container file.
///
/// # Example
///
/// ```no_run
/// use wordgraph::MappedDawg;
///
/// let reader = MappedDawg::open("lexicon.dawg")?;
/// assert!(reader.contains("hello"));
/// reader.close();
/// # Ok::<(), wordgraph::DawgError>(())
/// ```
pub struct MappedDawg {
    map: Mmap,
    node_count: u32,
    edge_count: u32,
    root_offset: usize,
    value_offset: usize,
    value_count: u32,
    mode: EncodingMode,
    // Compressed graphs only: decoded character map.
    forward: FxHashMap<char, u32>,
    reverse: Vec<Option<char>>,
}

impl MappedDawg {
    /// Map and validate a container file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };
        Self::from_mapping(map)
    }

    fn from_mapping(map: Mmap) -> Result<Self> {
        let bytes: &[u8] = &map;
        if bytes.len() < HEADER_SIZE {
            return Err(DawgError::BadContainer(format!(
                "{} bytes is shorter than the header",
                bytes.len()
            )));
        }
        if bytes[0..4] != MAGIC {
            return Err(DawgError::BadContainer("magic mismatch".to_string()));
        }
        let version = LittleEndian::read_u32(&bytes[4..8]);
        if version != FORMAT_VERSION {
            return Err(DawgError::BadContainer(format!(
                "unknown format version {version}"
            )));
        }
        let flags = LittleEndian::read_u32(&bytes[8..12]);
        if flags & FLAG_ASCII_ONLY != 0 && flags & FLAG_COMPRESSED != 0 {
            return Err(DawgError::BadContainer(
                "both ascii-only and compressed-unicode flags set".to_string(),
            ));
        }
        let mode = if flags & FLAG_ASCII_ONLY != 0 {
            EncodingMode::Ascii
        } else if flags & FLAG_COMPRESSED != 0 {
            EncodingMode::Compressed
        } else {
            EncodingMode::Wide
        };
        let node_count = LittleEndian::read_u32(&bytes[12..16]);
        let edge_count = LittleEndian::read_u32(&bytes[16..20]);
        let root_offset = LittleEndian::read_u32(&bytes[20..24]) as usize;
        let value_offset = LittleEndian::read_u32(&bytes[24..28]) as usize;
        let value_count = LittleEndian::read_u32(&bytes[28..32]);

        if node_count == 0 {
            return Err(DawgError::BadContainer("no root node".to_string()));
        }
        let node_region = HEADER_SIZE + node_count as usize * NODE_RECORD_SIZE;
        let edge_region_end = node_region + edge_count as usize * EDGE_RECORD_SIZE;
        if bytes.len() < edge_region_end || value_offset != edge_region_end {
            return Err(DawgError::BadContainer(
                "node and edge regions exceed the file".to_string(),
            ));
        }
        if root_offset != HEADER_SIZE {
            return Err(DawgError::BadContainer(format!(
                "root offset {root_offset} is not the first node record"
            )));
        }

        let reader = MappedDawg {
            map,
            node_count,
            edge_count,
            root_offset,
            value_offset,
            value_count,
            mode,
            forward: FxHashMap::default(),
            reverse: vec![None; 256],
        };
        reader.validate_nodes()?;
        let char_map_offset = reader.validate_values()?;
        reader.with_char_map(char_map_offset)
    }

    /// Per-node structural checks: edge ranges inside the edge region,
    /// per-node counts summing to the header count, targets in range,
    /// units sorted.
    fn validate_nodes(&self) -> Result<()> {
        let edge_base = HEADER_SIZE + self.node_count as usize * NODE_RECORD_SIZE;
        let mut total_edges = 0usize;
        for index in 0..self.node_count {
            let record = HEADER_SIZE + index as usize * NODE_RECORD_SIZE;
            let edges = self.read_u32(record + 8) as usize;
            let offset = self.read_u32(record + 12) as usize;
            if offset < edge_base || offset + edges * EDGE_RECORD_SIZE > self.value_offset {
                return Err(DawgError::BadContainer(format!(
                    "node {index} edge range escapes the edge table"
                )));
            }
            let mut last_unit: Option<u32> = None;
            for e in 0..edges {
                let (unit, target) = self.edge_at(offset + e * EDGE_RECORD_SIZE);
                if target >= self.node_count {
                    return Err(DawgError::BadContainer(format!(
                        "edge target {target} out of range"
                    )));
                }
                if let Some(prev) = last_unit {
                    if unit <= prev {
                        return Err(DawgError::BadContainer(format!(
                            "node {index} edges are not sorted by unit"
                        )));
                    }
                }
                last_unit = Some(unit);
            }
            total_edges += edges;
        }
        if total_edges != self.edge_count as usize {
            return Err(DawgError::BadContainer(format!(
                "per-node edge counts sum to {total_edges}, header says {}",
                self.edge_count
            )));
        }
        Ok(())
    }

    /// Walk the value table once, bounds-checking every entry; returns
    /// the offset just past it (the character map position).
    fn validate_values(&self) -> Result<usize> {
        let bytes: &[u8] = &self.map;
        let mut offset = self.value_offset;
        if offset + 4 > bytes.len() {
            return Err(DawgError::BadContainer("truncated value table".to_string()));
        }
        let stored = LittleEndian::read_u32(&bytes[offset..offset + 4]);
        if stored != self.value_count {
            return Err(DawgError::BadContainer(format!(
                "value table holds {stored} entries, header says {}",
                self.value_count
            )));
        }
        offset += 4;
        for _ in 0..self.value_count {
            for _ in 0..2 {
                if offset + 4 > bytes.len() {
                    return Err(DawgError::BadContainer("truncated value entry".to_string()));
                }
                let len = LittleEndian::read_u32(&bytes[offset..offset + 4]) as usize;
                offset += 4;
                if offset + len > bytes.len() {
                    return Err(DawgError::BadContainer("truncated value entry".to_string()));
                }
                offset += len;
            }
        }
        Ok(offset)
    }

    /// Decode the character map (compressed graphs only) into the
    /// in-memory forward/reverse tables.
    fn with_char_map(mut self, offset: usize) -> Result<Self> {
        if self.mode != EncodingMode::Compressed {
            return Ok(self);
        }
        let bytes: &[u8] = &self.map;
        if offset + 4 > bytes.len() {
            return Err(DawgError::BadContainer("missing character map".to_string()));
        }
        let count = LittleEndian::read_u32(&bytes[offset..offset + 4]) as usize;
        if offset + 4 + count * 8 > bytes.len() {
            return Err(DawgError::BadContainer(
                "truncated character map".to_string(),
            ));
        }
        for i in 0..count {
            let entry = offset + 4 + i * 8;
            let cp = LittleEndian::read_u32(&bytes[entry..entry + 4]);
            let byte = bytes[entry + 4];
            let ch = char::from_u32(cp).ok_or_else(|| {
                DawgError::BadContainer(format!("invalid code point {cp:#x} in character map"))
            })?;
            self.forward.insert(ch, byte as u32);
            self.reverse[byte as usize] = Some(ch);
        }
        Ok(self)
    }

    #[inline]
    fn read_u32(&self, offset: usize) -> u32 {
        LittleEndian::read_u32(&self.map[offset..offset + 4])
    }

    /// Decode the edge record at a byte offset into `(unit, target)`.
    #[inline]
    fn edge_at(&self, offset: usize) -> (u32, u32) {
        let bytes: &[u8] = &self.map;
        if self.mode.is_narrow() {
            let unit = bytes[offset] as u32;
            // 24-bit little-endian target; zero names the root, never
            // "absent".
            let target = bytes[offset + 1] as u32
                | (bytes[offset + 2] as u32) << 8
                | (bytes[offset + 3] as u32) << 16;
            (unit, target)
        } else {
            (self.read_u32(offset), self.read_u32(offset + 4))
        }
    }

    #[inline]
    fn encode(&self, ch: char) -> Option<u32> {
        match self.mode {
            EncodingMode::Ascii => ch.is_ascii().then_some(ch as u32),
            EncodingMode::Compressed => self.forward.get(&ch).copied().or_else(|| {
                // Pass-through bytes are not listed in the map; accept
                // them unless remapped out from under a non-ASCII char.
                (ch.is_ascii() && self.reverse[ch as usize].is_none()).then_some(ch as u32)
            }),
            EncodingMode::Wide => Some(ch as u32),
        }
    }

    #[inline]
    fn decode(&self, unit: u32) -> Option<char> {
        match self.mode {
            EncodingMode::Ascii | EncodingMode::Wide => char::from_u32(unit),
            EncodingMode::Compressed => match self.reverse.get(unit as usize) {
                Some(Some(ch)) => Some(*ch),
                _ => char::from_u32(unit),
            },
        }
    }

    /// Cursor for the root record.
    pub fn root(&self) -> MappedNode<'_> {
        MappedNode {
            reader: self,
            offset: self.root_offset,
        }
    }

    /// True iff `key` is accepted.
    pub fn contains(&self, key: &str) -> bool {
        self.root().walk(key).map_or(false, |n| n.is_terminal())
    }

    /// The key echoed back with its stored value, or a miss.
    pub fn lookup(&self, key: &str) -> Option<Entry> {
        let node = self.root().walk(key)?;
        if !node.is_terminal() {
            return None;
        }
        Some(Entry {
            key: key.to_string(),
            value: node.value_index().and_then(|index| self.value(index)),
        })
    }

    /// Decode the value-table entry at `index`.
    pub fn value(&self, index: u32) -> Option<Value> {
        if index >= self.value_count {
            return None;
        }
        let bytes: &[u8] = &self.map;
        let ascii = self.mode == EncodingMode::Ascii;
        let mut offset = self.value_offset + 4;
        for i in 0..=index {
            let key_len = LittleEndian::read_u32(&bytes[offset..offset + 4]) as usize;
            offset += 4 + key_len;
            let value_len = LittleEndian::read_u32(&bytes[offset..offset + 4]) as usize;
            offset += 4;
            if i == index {
                let text = decode_text(&bytes[offset..offset + value_len], ascii)?;
                return Some(Value::from_text(&text));
            }
            offset += value_len;
        }
        None
    }

    /// Lazily enumerate every key starting with `prefix`.
    pub fn find_prefixes(&self, prefix: &str) -> KeyIter<MappedNode<'_>> {
        match self.root().walk(prefix) {
            Some(node) => KeyIter::new(node, prefix.to_string()),
            None => KeyIter::empty(),
        }
    }

    /// All accepted keys in lexicographic unit order.
    pub fn all_keys(&self) -> KeyIter<MappedNode<'_>> {
        self.find_prefixes("")
    }

    /// Keys matching a `?` / `*` pattern, sorted and deduplicated.
    pub fn wildcard(&self, pattern: &str) -> Vec<String> {
        search::wildcard(self.root(), pattern)
    }

    /// Keys within `max_distance` edits of `term`.
    pub fn fuzzy(&self, term: &str, max_distance: usize) -> Vec<Candidate> {
        search::fuzzy(self.root(), term, max_distance)
    }

    /// Up to `limit` nearest keys, widening the bound from 0.
    pub fn closest(&self, term: &str, limit: usize) -> Vec<Candidate> {
        search::closest(self.root(), term, limit)
    }

    /// Spelling suggestions for `word`.
    pub fn spell_check(&self, word: &str) -> Vec<Candidate> {
        search::spell_check(self.root(), word)
    }

    /// Number of node records.
    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    /// Number of edge records.
    pub fn edge_count(&self) -> u32 {
        self.edge_count
    }

    /// Encoding the container was written in.
    pub fn mode(&self) -> EncodingMode {
        self.mode
    }

    /// Non-identity character mappings, sorted by mapped byte.
    pub fn char_map(&self) -> Vec<(char, u8)> {
        let mut entries: Vec<(char, u8)> = self
            .forward
            .iter()
            .map(|(ch, unit)| (*ch, *unit as u8))
            .collect();
        entries.sort_by_key(|(_, byte)| *byte);
        entries
    }

    /// Unmap and close. Outstanding cursors must be gone; the borrow
    /// checker enforces that here.
    pub fn close(self) {}
}

/// Byte-offset cursor over one node record in the mapping.
#[derive(Clone)]
pub struct MappedNode<'a> {
    reader: &'a MappedDawg,
    offset: usize,
}

impl MappedNode<'_> {
    fn edges_range(&self) -> (usize, usize) {
        let count = self.reader.read_u32(self.offset + 8) as usize;
        let offset = self.reader.read_u32(self.offset + 12) as usize;
        (offset, count)
    }

    fn child(&self, target: u32) -> Self {
        MappedNode {
            reader: self.reader,
            offset: HEADER_SIZE + target as usize * NODE_RECORD_SIZE,
        }
    }
}

impl GraphNode for MappedNode<'_> {
    fn node_key(&self) -> u64 {
        self.offset as u64
    }

    fn is_terminal(&self) -> bool {
        self.reader.read_u32(self.offset) & NODE_TERMINAL != 0
    }

    fn value_index(&self) -> Option<u32> {
        if self.reader.read_u32(self.offset) & NODE_HAS_VALUE == 0 {
            return None;
        }
        let index = self.reader.read_u32(self.offset + 4);
        (index != NO_VALUE_INDEX).then_some(index)
    }

    fn transition(&self, ch: char) -> Option<Self> {
        let unit = self.reader.encode(ch)?;
        let (base, count) = self.edges_range();
        let mut lo = 0usize;
        let mut hi = count;
        while lo < hi {
            let mid = (lo + hi) / 2;
            let (mid_unit, target) = self.reader.edge_at(base + mid * EDGE_RECORD_SIZE);
            match mid_unit.cmp(&unit) {
                std::cmp::Ordering::Equal => return Some(self.child(target)),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        None
    }

    fn edges(&self) -> Box<dyn Iterator<Item = (char, Self)> + '_> {
        let (base, count) = self.edges_range();
        Box::new((0..count).filter_map(move |i| {
            let (unit, target) = self.reader.edge_at(base + i * EDGE_RECORD_SIZE);
            self.reader.decode(unit).map(|ch| (ch, self.child(target)))
        }))
    }

    fn edge_count(&self) -> usize {
        self.reader.read_u32(self.offset + 8) as usize
    }
}
