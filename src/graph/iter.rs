//! Lazy lexicographic key enumeration.

use crate::graph::GraphNode;

struct Frame<N> {
    edges: Vec<(char, N)>,
    pos: usize,
}

/// Depth-first enumeration of every accepted key below a starting
/// cursor, in ascending unit order.
///
/// The walk is lazy: each `next()` advances the explicit stack just far
/// enough to reach the next terminal, so abandoning the iterator
/// abandons the traversal. A shorter key is emitted before any of its
/// extensions (preorder), which together with the edge ordering gives
/// the deterministic lexicographic output the query surface promises.
pub struct KeyIter<N: GraphNode> {
    stack: Vec<Frame<N>>,
    path: String,
    // Set when a node has been entered but not yet tested for terminal.
    pending: Option<N>,
}

impl<N: GraphNode> KeyIter<N> {
    /// Enumerate all keys below `root`, each prefixed with `prefix`.
    pub fn new(root: N, prefix: String) -> Self {
        KeyIter {
            stack: Vec::new(),
            path: prefix,
            pending: Some(root),
        }
    }

    /// An iterator that yields nothing (the prefix landed on a miss).
    pub fn empty() -> Self {
        KeyIter {
            stack: Vec::new(),
            path: String::new(),
            pending: None,
        }
    }
}

impl<N: GraphNode> Iterator for KeyIter<N> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(node) = self.pending.take() {
                let terminal = node.is_terminal();
                self.stack.push(Frame {
                    edges: node.edges().collect(),
                    pos: 0,
                });
                if terminal {
                    return Some(self.path.clone());
                }
                continue;
            }
            let frame = self.stack.last_mut()?;
            if frame.pos < frame.edges.len() {
                let (ch, child) = frame.edges[frame.pos].clone();
                frame.pos += 1;
                self.path.push(ch);
                self.pending = Some(child);
            } else {
                self.stack.pop();
                if !self.stack.is_empty() {
                    self.path.pop();
                }
            }
        }
    }
}
