//! The live automaton.
//!
//! A [`Dawg`] owns the node arena, the value table, and the alphabet,
//! and is the single mutation point: one holder calls `add` /
//! `minimize` / `rebuild`, after which the graph can be shared freely
//! for reads. Encoding transitions are internal: an inadmissible
//! character upgrades the alphabet and re-encodes the graph before the
//! insertion walk, never surfacing as an error.

use std::collections::BTreeSet;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::alphabet::{Alphabet, EncodingChoice, EncodingMode};
use crate::container;
use crate::error::{DawgError, Result};
use crate::graph::builder;
use crate::graph::iter::KeyIter;
use crate::graph::node::Node;
use crate::graph::value::{Candidate, Entry, Value};
use crate::graph::GraphNode;
use crate::search;

/// Size and shape report for one automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    /// Reachable states.
    pub node_count: usize,
    /// Total edges.
    pub edge_count: usize,
    /// Whether the graph is currently minimal.
    pub minimized: bool,
    /// Keys carrying a value.
    pub value_count: usize,
    /// Estimated size of the binary container for this graph.
    pub estimated_bytes: usize,
    /// True when every unit is an ASCII code point.
    pub is_ascii_only: bool,
    /// True when non-ASCII code points are remapped into single bytes.
    pub is_compressed: bool,
    /// Non-identity entries in the character map.
    pub mapped_units: usize,
}

/// A minimal-automaton dictionary mapping keys to optional values.
///
/// # Example
///
/// ```
/// use wordgraph::Dawg;
///
/// let mut dawg = Dawg::new();
/// dawg.add("car");
/// dawg.add("cars");
/// dawg.minimize().unwrap();
/// assert!(dawg.contains("car"));
/// assert!(!dawg.contains("ca"));
/// ```
#[derive(Debug, Clone)]
pub struct Dawg {
    nodes: Vec<Node>,
    root: u32,
    alphabet: Alphabet,
    values: Vec<Value>,
    node_by_id: FxHashMap<u32, u32>,
    next_id: u32,
    key_count: usize,
    minimized: bool,
}

impl Dawg {
    /// Empty automaton in ASCII mode.
    pub fn new() -> Self {
        Self::with_alphabet(Alphabet::new(EncodingMode::Ascii))
    }

    /// Empty automaton in an explicit mode.
    pub fn with_mode(mode: EncodingMode) -> Self {
        Self::with_alphabet(Alphabet::new(mode))
    }

    pub(crate) fn with_alphabet(alphabet: Alphabet) -> Self {
        let mut node_by_id = FxHashMap::default();
        node_by_id.insert(0, 0);
        Dawg {
            nodes: vec![Node::new(0)],
            root: 0,
            alphabet,
            values: Vec::new(),
            node_by_id,
            next_id: 1,
            key_count: 0,
            minimized: false,
        }
    }

    /// Build from keys without values.
    #[allow(clippy::should_implement_trait)]
    pub fn from_iter<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dawg = Dawg::new();
        for key in keys {
            dawg.add(key.as_ref());
        }
        dawg
    }

    /// Build from key/value pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        let mut dawg = Dawg::new();
        for (key, value) in pairs {
            dawg.add_with_value(key.as_ref(), value);
        }
        dawg
    }

    /// Batch insertion; returns the number of keys that were new.
    pub fn extend<I, S>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let before = self.key_count;
        for key in keys {
            self.add(key.as_ref());
        }
        self.key_count - before
    }

    /// Insert a key with no value. The empty key is legal and marks the
    /// root terminal.
    pub fn add(&mut self, key: &str) {
        self.add_inner(key, None);
    }

    /// Insert a key with a value, overwriting any previous value.
    pub fn add_with_value(&mut self, key: &str, value: Value) {
        self.add_inner(key, Some(value));
    }

    fn add_inner(&mut self, key: &str, value: Option<Value>) {
        // Editing a minimized graph through shared suffixes would alias
        // unrelated keys; fall back to an equivalent unshared form.
        if self.minimized {
            self.unshare();
        }
        self.ensure_representable(key, value.as_ref());
        self.alphabet.admit_key(key);
        if let Some(Value::Str(s)) = &value {
            self.alphabet.admit_value(s);
        }

        let mut slot = self.root;
        for ch in key.chars() {
            let Some(unit) = self.alphabet.encode(ch) else {
                debug_assert!(false, "admitted character failed to encode");
                return;
            };
            slot = match self.nodes[slot as usize].get_edge(unit) {
                Some(child) => child,
                None => {
                    let child = self.nodes.len() as u32;
                    let id = self.next_id;
                    self.next_id += 1;
                    self.nodes.push(Node::new(id));
                    self.node_by_id.insert(id, child);
                    self.nodes[slot as usize].set_edge(unit, child);
                    child
                }
            };
        }

        let node = &mut self.nodes[slot as usize];
        if !node.terminal {
            node.terminal = true;
            self.key_count += 1;
        }
        match value {
            Some(value) => {
                // Append-only table: the previous entry (if any) goes
                // dead and is compacted on the next rebuild.
                let index = self.values.len() as u32;
                self.values.push(value);
                node.value_index = Some(index);
            }
            None => node.value_index = None,
        }
    }

    /// Upgrade the encoding when the current mode cannot carry `key` or
    /// the string value, re-encoding the whole graph.
    fn ensure_representable(&mut self, key: &str, value: Option<&Value>) {
        let value_str = match value {
            Some(Value::Str(s)) => Some(s.as_str()),
            _ => None,
        };
        let key_ok = key.chars().all(|ch| self.alphabet.accepts_key_char(ch));
        let value_ok = value_str
            .map(|s| s.chars().all(|ch| self.alphabet.accepts_value_char(ch)))
            .unwrap_or(true);
        if key_ok && value_ok {
            return;
        }

        let mut key_chars = self.alphabet.key_chars().clone();
        key_chars.extend(key.chars());
        let mut value_chars = self.alphabet.value_chars().clone();
        if let Some(s) = value_str {
            value_chars.extend(s.chars());
        }
        let mode = Alphabet::choose_mode(&key_chars, &value_chars);
        let alphabet = Alphabet::build_for(mode, &key_chars, &value_chars)
            .unwrap_or_else(|_| Alphabet::wide_for(&key_chars, &value_chars));
        let pairs = self.collect_pairs();
        self.install(pairs, alphabet);
    }

    /// True iff `key` is accepted.
    pub fn contains(&self, key: &str) -> bool {
        match self.walk_slot(key) {
            Some(slot) => self.nodes[slot as usize].terminal,
            None => false,
        }
    }

    /// The key echoed back with its stored value, or a miss.
    pub fn lookup(&self, key: &str) -> Option<Entry> {
        let slot = self.walk_slot(key)?;
        let node = &self.nodes[slot as usize];
        if !node.terminal {
            return None;
        }
        Some(Entry {
            key: key.to_string(),
            value: node
                .value_index
                .map(|index| self.values[index as usize].clone()),
        })
    }

    fn walk_slot(&self, key: &str) -> Option<u32> {
        let mut slot = self.root;
        for ch in key.chars() {
            let unit = self.alphabet.encode(ch)?;
            slot = self.nodes[slot as usize].get_edge(unit)?;
        }
        Some(slot)
    }

    /// Lazily enumerate every key starting with `prefix`, in
    /// lexicographic unit order.
    pub fn find_prefixes(&self, prefix: &str) -> KeyIter<NodeRef<'_>> {
        match self.walk_slot(prefix) {
            Some(slot) => KeyIter::new(NodeRef { dawg: self, slot }, prefix.to_string()),
            None => KeyIter::empty(),
        }
    }

    /// All accepted keys in lexicographic unit order.
    pub fn all_keys(&self) -> KeyIter<NodeRef<'_>> {
        self.find_prefixes("")
    }

    /// Number of accepted keys.
    pub fn len(&self) -> usize {
        self.key_count
    }

    /// True when no key is accepted.
    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Collapse equivalent states. No-op when already minimal.
    ///
    /// The minimized graph is verified against the current accepted key
    /// set before being swapped in; on mismatch the automaton is left
    /// unchanged and [`DawgError::MinimizeConsistency`] is returned.
    pub fn minimize(&mut self) -> Result<()> {
        if self.minimized {
            return Ok(());
        }
        let before = self.collect_pairs();
        let result = builder::minimize(&self.nodes, self.root);
        let after = collect_pairs_from(&result.nodes, result.root, &self.alphabet, &self.values);
        if before != after {
            return Err(DawgError::MinimizeConsistency);
        }
        self.nodes = result.nodes;
        self.root = result.root;
        self.node_by_id = result.node_by_id;
        self.minimized = true;
        Ok(())
    }

    /// Rebuild from scratch in the requested encoding, compacting dead
    /// value entries.
    ///
    /// `EncodingChoice::Auto` picks the smallest mode that fits; an
    /// explicit narrow choice fails with
    /// [`DawgError::EncodingExceeded`] when the data cannot fit. With
    /// `preserve_minimized` the rebuilt graph is re-minimized when the
    /// old one was.
    pub fn rebuild(&mut self, encoding: EncodingChoice, preserve_minimized: bool) -> Result<()> {
        let pairs = self.collect_pairs();
        let mut key_chars = BTreeSet::new();
        let mut value_chars = BTreeSet::new();
        for (key, value) in &pairs {
            key_chars.extend(key.chars());
            if let Some(Value::Str(s)) = value {
                value_chars.extend(s.chars());
            }
        }
        let mode = match encoding {
            EncodingChoice::Auto => Alphabet::choose_mode(&key_chars, &value_chars),
            EncodingChoice::Ascii => EncodingMode::Ascii,
            EncodingChoice::Compressed => EncodingMode::Compressed,
            EncodingChoice::Wide => EncodingMode::Wide,
        };
        let alphabet = Alphabet::build_for(mode, &key_chars, &value_chars)?;
        let was_minimized = self.minimized;
        self.install(pairs, alphabet);
        if preserve_minimized && was_minimized {
            self.minimize()?;
        }
        Ok(())
    }

    /// Replace graph, values, and alphabet with a fresh trie over
    /// `pairs`.
    fn install(&mut self, pairs: Vec<(String, Option<Value>)>, alphabet: Alphabet) {
        *self = Dawg::with_alphabet(alphabet);
        for (key, value) in pairs {
            self.add_inner(&key, value);
        }
    }

    /// Expand a minimized graph back into an editable trie with the
    /// same accepted key set.
    fn unshare(&mut self) {
        let pairs = self.collect_pairs();
        let alphabet = self.alphabet.clone();
        self.install(pairs, alphabet);
    }

    /// Every `(key, value)` in lexicographic unit order.
    pub(crate) fn collect_pairs(&self) -> Vec<(String, Option<Value>)> {
        collect_pairs_from(&self.nodes, self.root, &self.alphabet, &self.values)
    }

    /// Shape report for the current graph.
    pub fn stats(&self) -> Stats {
        let edge_count: usize = self.nodes.iter().map(|n| n.edges.len()).sum();
        let value_count = self
            .nodes
            .iter()
            .filter(|n| n.value_index.is_some())
            .count();
        Stats {
            node_count: self.nodes.len(),
            edge_count,
            minimized: self.minimized,
            value_count,
            estimated_bytes: container::estimated_size(self),
            is_ascii_only: self.alphabet.is_ascii(),
            is_compressed: self.alphabet.is_compressed(),
            mapped_units: self.alphabet.mapped_units(),
        }
    }

    /// Stable id of the root state.
    pub fn root_id(&self) -> u32 {
        self.nodes[self.root as usize].id
    }

    /// Cursor for the state with the given stable id.
    pub fn get_node_by_id(&self, id: u32) -> Option<NodeRef<'_>> {
        self.node_by_id
            .get(&id)
            .map(|&slot| NodeRef { dawg: self, slot })
    }

    /// Cursor for the root state.
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            dawg: self,
            slot: self.root,
        }
    }

    /// Decode a value-table entry.
    pub fn value(&self, index: u32) -> Option<&Value> {
        self.values.get(index as usize)
    }

    /// Keys matching a pattern of literals, `?` (one unit), and `*`
    /// (zero or more units), sorted and deduplicated.
    pub fn wildcard(&self, pattern: &str) -> Vec<String> {
        search::wildcard(self.root(), pattern)
    }

    /// Keys within `max_distance` edits of `term`, sorted by distance
    /// then key.
    pub fn fuzzy(&self, term: &str, max_distance: usize) -> Vec<Candidate> {
        search::fuzzy(self.root(), term, max_distance)
    }

    /// Up to `limit` nearest keys, widening the distance bound from 0.
    pub fn closest(&self, term: &str, limit: usize) -> Vec<Candidate> {
        search::closest(self.root(), term, limit)
    }

    /// Spelling suggestions: empty when `word` is accepted, otherwise
    /// candidates within ⌈chars/3⌉ edits.
    pub fn spell_check(&self, word: &str) -> Vec<Candidate> {
        search::spell_check(self.root(), word)
    }

    /// Write the fixed-width binary container.
    pub fn save_binary<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        container::write_file(self, path.as_ref())
    }

    /// Write the portable JSON interchange document.
    pub fn save_text<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        container::text::write_file(self, path.as_ref())
    }

    /// Load either persisted form, sniffing the magic bytes.
    ///
    /// Binary containers rebuild through the mapped reader; text
    /// documents parse through the interchange format. Either way the
    /// result is an editable (unminimized) automaton.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Dawg> {
        let path = path.as_ref();
        if container::sniff_binary(path)? {
            let reader = crate::container::reader::MappedDawg::open(path)?;
            let alphabet = match reader.mode() {
                EncodingMode::Compressed => Alphabet::from_mapping(&reader.char_map()),
                mode => Alphabet::new(mode),
            };
            let mut dawg = Dawg::with_alphabet(alphabet);
            let keys: Vec<String> = reader.all_keys().collect();
            for key in keys {
                match reader.lookup(&key).and_then(|entry| entry.value) {
                    Some(value) => dawg.add_with_value(&key, value),
                    None => dawg.add(&key),
                }
            }
            Ok(dawg)
        } else {
            container::text::read_file(path)
        }
    }

    pub(crate) fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub(crate) fn arena(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn root_slot(&self) -> u32 {
        self.root
    }

    pub(crate) fn raw_values(&self) -> &[Value] {
        &self.values
    }
}

impl Default for Dawg {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_pairs_from(
    nodes: &[Node],
    root: u32,
    alphabet: &Alphabet,
    values: &[Value],
) -> Vec<(String, Option<Value>)> {
    fn dfs(
        nodes: &[Node],
        slot: u32,
        alphabet: &Alphabet,
        values: &[Value],
        path: &mut String,
        out: &mut Vec<(String, Option<Value>)>,
    ) {
        let node = &nodes[slot as usize];
        if node.terminal {
            let value = node
                .value_index
                .and_then(|index| values.get(index as usize).cloned());
            out.push((path.clone(), value));
        }
        for &(unit, child) in &node.edges {
            if let Some(ch) = alphabet.decode(unit) {
                path.push(ch);
                dfs(nodes, child, alphabet, values, path, out);
                path.pop();
            }
        }
    }
    let mut out = Vec::new();
    let mut path = String::new();
    dfs(nodes, root, alphabet, values, &mut path, &mut out);
    out
}

/// Cursor over one live automaton state.
#[derive(Clone)]
pub struct NodeRef<'a> {
    dawg: &'a Dawg,
    slot: u32,
}

impl NodeRef<'_> {
    /// Stable id of this state.
    pub fn id(&self) -> u32 {
        self.dawg.nodes[self.slot as usize].id
    }
}

impl GraphNode for NodeRef<'_> {
    fn node_key(&self) -> u64 {
        self.slot as u64
    }

    fn is_terminal(&self) -> bool {
        self.dawg.nodes[self.slot as usize].terminal
    }

    fn value_index(&self) -> Option<u32> {
        self.dawg.nodes[self.slot as usize].value_index
    }

    fn transition(&self, ch: char) -> Option<Self> {
        let unit = self.dawg.alphabet.encode(ch)?;
        self.dawg.nodes[self.slot as usize]
            .get_edge(unit)
            .map(|slot| NodeRef {
                dawg: self.dawg,
                slot,
            })
    }

    fn edges(&self) -> Box<dyn Iterator<Item = (char, Self)> + '_> {
        Box::new(
            self.dawg.nodes[self.slot as usize]
                .edges
                .iter()
                .filter_map(|&(unit, slot)| {
                    self.dawg.alphabet.decode(unit).map(|ch| {
                        (
                            ch,
                            NodeRef {
                                dawg: self.dawg,
                                slot,
                            },
                        )
                    })
                }),
        )
    }

    fn edge_count(&self) -> usize {
        self.dawg.nodes[self.slot as usize].edges.len()
    }
}
