//! Bottom-up minimization.
//!
//! Collapses states with equal right-languages into one canonical
//! survivor per equivalence class. The procedure works on a read-only
//! view of the arena and produces a fresh compact arena; the caller
//! verifies the accepted key set before swapping it in, so a failed run
//! leaves the automaton untouched.

use rustc_hash::FxHashMap;

use crate::graph::node::{Node, NO_VALUE};

/// Output of one minimization run.
pub(crate) struct MinimizeResult {
    /// Compact arena containing exactly the surviving states.
    pub nodes: Vec<Node>,
    /// Slot of the canonical root in `nodes`.
    pub root: u32,
    /// Stable-id index over the surviving states.
    pub node_by_id: FxHashMap<u32, u32>,
    /// Number of states merged away.
    pub merge_count: usize,
}

/// Signature of a state's right-language: terminal flag, value index,
/// and the sorted edge list with each child replaced by its interned
/// signature id. Equal signatures mean equal right-languages once every
/// descendant has been processed, hence the bottom-up order.
#[derive(PartialEq, Eq, Hash)]
struct SigKey {
    terminal: bool,
    value_index: u32,
    edges: Vec<(u32, u32)>,
}

const UNVISITED: u8 = 0;
const IN_PROGRESS: u8 = 1;
const DONE: u8 = 2;

struct Minimizer<'a> {
    nodes: &'a [Node],
    state: Vec<u8>,
    canonical: Vec<u32>,
    sig_of: Vec<u32>,
    registry: FxHashMap<SigKey, (u32, u32)>,
    // Old id -> surviving canonical id; scoped to this run.
    id_remap: FxHashMap<u32, u32>,
    next_sig: u32,
    merge_count: usize,
}

/// Minimize the graph reachable from `root`.
pub(crate) fn minimize(nodes: &[Node], root: u32) -> MinimizeResult {
    let mut m = Minimizer {
        nodes,
        state: vec![UNVISITED; nodes.len()],
        canonical: vec![0; nodes.len()],
        sig_of: vec![0; nodes.len()],
        registry: FxHashMap::default(),
        id_remap: FxHashMap::default(),
        next_sig: 0,
        merge_count: 0,
    };
    let canonical_root = m.visit(root);
    m.compact(canonical_root)
}

impl<'a> Minimizer<'a> {
    fn fresh_sig(&mut self) -> u32 {
        let sig = self.next_sig;
        self.next_sig += 1;
        sig
    }

    /// Post-order visit returning the canonical slot for `slot`.
    fn visit(&mut self, slot: u32) -> u32 {
        let idx = slot as usize;
        match self.state[idx] {
            DONE => return self.canonical[idx],
            // A reachable cycle means a malformed builder; deferring the
            // equivalence check keeps the walk terminating.
            IN_PROGRESS => return slot,
            _ => {}
        }
        self.state[idx] = IN_PROGRESS;

        let node = &self.nodes[idx];
        let mut sig_edges = Vec::with_capacity(node.edges.len());
        let mut canon_edges = Vec::with_capacity(node.edges.len());
        let mut deferred = false;
        for &(unit, child) in &node.edges {
            let canon_child = self.visit(child);
            if self.state[canon_child as usize] != DONE {
                deferred = true;
            }
            sig_edges.push((unit, self.sig_of[canon_child as usize]));
            canon_edges.push((unit, canon_child));
        }

        if deferred {
            // At least one descendant is still on the stack; give this
            // state a signature no other state can share.
            let sig = self.fresh_sig();
            self.finish_unique(idx, sig);
            return slot;
        }

        let key = SigKey {
            terminal: node.terminal,
            value_index: node.value_index.unwrap_or(NO_VALUE),
            edges: sig_edges,
        };
        if let Some(&(sig, canon_slot)) = self.registry.get(&key) {
            if self.structurally_equal(node, &canon_edges, canon_slot) {
                self.merge_count += 1;
                self.id_remap.insert(node.id, self.nodes[canon_slot as usize].id);
                self.state[idx] = DONE;
                self.canonical[idx] = canon_slot;
                self.sig_of[idx] = sig;
                return canon_slot;
            }
            // Signature collision: keep the state distinct.
            let sig = self.fresh_sig();
            self.finish_unique(idx, sig);
            return slot;
        }
        let sig = self.fresh_sig();
        self.registry.insert(key, (sig, slot));
        self.finish_unique(idx, sig);
        slot
    }

    fn finish_unique(&mut self, idx: usize, sig: u32) {
        self.state[idx] = DONE;
        self.canonical[idx] = idx as u32;
        self.sig_of[idx] = sig;
    }

    /// Second check behind the signature lookup: field-by-field equality
    /// with pointer-equal (canonical) children.
    fn structurally_equal(&self, node: &Node, canon_edges: &[(u32, u32)], canon_slot: u32) -> bool {
        let other = &self.nodes[canon_slot as usize];
        if node.terminal != other.terminal
            || node.value_index != other.value_index
            || canon_edges.len() != other.edges.len()
        {
            return false;
        }
        canon_edges
            .iter()
            .zip(other.edges.iter())
            .all(|(&(unit, child), &(other_unit, other_child))| {
                unit == other_unit && child == self.canonical[other_child as usize]
            })
    }

    /// Rebuild a dense arena containing only states reachable from the
    /// canonical root, edges redirected to canonical targets.
    fn compact(mut self, canonical_root: u32) -> MinimizeResult {
        let mut old_to_new: FxHashMap<u32, u32> = FxHashMap::default();
        let mut order = Vec::new();
        let mut stack = vec![canonical_root];
        old_to_new.insert(canonical_root, 0);
        order.push(canonical_root);
        while let Some(slot) = stack.pop() {
            for &(_, child) in &self.nodes[slot as usize].edges {
                let canon_child = self.canonical[child as usize];
                if !old_to_new.contains_key(&canon_child) {
                    old_to_new.insert(canon_child, order.len() as u32);
                    order.push(canon_child);
                    stack.push(canon_child);
                }
            }
        }

        let mut new_nodes = Vec::with_capacity(order.len());
        let mut node_by_id = FxHashMap::default();
        for &old_slot in &order {
            let src = &self.nodes[old_slot as usize];
            let mut node = Node::new(src.id);
            node.terminal = src.terminal;
            node.value_index = src.value_index;
            node.edges = src
                .edges
                .iter()
                .map(|&(unit, child)| (unit, old_to_new[&self.canonical[child as usize]]))
                .collect();
            node_by_id.insert(src.id, new_nodes.len() as u32);
            new_nodes.push(node);
        }

        self.id_remap.clear();
        MinimizeResult {
            nodes: new_nodes,
            root: 0,
            node_by_id,
            merge_count: self.merge_count,
        }
    }
}
