//! Bounded edit-distance matching.
//!
//! Row-at-a-time Levenshtein DP threaded through the graph walk: each
//! descent extends the candidate key by one unit and derives the next
//! DP row from the previous one, cutting the branch as soon as the row
//! minimum exceeds the bound.

use smallvec::SmallVec;

use crate::graph::value::Candidate;
use crate::graph::GraphNode;

type Row = SmallVec<[usize; 24]>;

/// All keys within `max_distance` edits of `term`, sorted by distance
/// ascending then key.
pub fn fuzzy<N: GraphNode>(root: N, term: &str, max_distance: usize) -> Vec<Candidate> {
    let target: Vec<char> = term.chars().collect();
    let first_row: Row = (0..=target.len()).collect();

    let mut out = Vec::new();
    let mut path = String::new();
    descend(&root, &target, &first_row, max_distance, &mut path, &mut out);
    out.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.term.cmp(&b.term)));
    out
}

fn descend<N: GraphNode>(
    node: &N,
    target: &[char],
    row: &Row,
    max_distance: usize,
    path: &mut String,
    out: &mut Vec<Candidate>,
) {
    if node.is_terminal() {
        let distance = row[target.len()];
        if distance <= max_distance {
            out.push(Candidate {
                term: path.clone(),
                distance,
            });
        }
    }
    for (ch, child) in node.edges() {
        let mut next: Row = SmallVec::with_capacity(row.len());
        next.push(row[0] + 1);
        for j in 1..=target.len() {
            let cost = if target[j - 1] == ch { 0 } else { 1 };
            let value = (row[j] + 1).min(next[j - 1] + 1).min(row[j - 1] + cost);
            next.push(value);
        }
        if next.iter().min().copied().unwrap_or(usize::MAX) > max_distance {
            continue;
        }
        path.push(ch);
        descend(&child, target, &next, max_distance, path, out);
        path.pop();
    }
}

/// Up to `limit` nearest keys, widening the distance bound from 0 until
/// enough are found or the bound exceeds the target length.
pub fn closest<N: GraphNode>(root: N, term: &str, limit: usize) -> Vec<Candidate> {
    if limit == 0 {
        return Vec::new();
    }
    let widest = term.chars().count();
    let mut best = Vec::new();
    for bound in 0..=widest {
        best = fuzzy(root.clone(), term, bound);
        if best.len() >= limit {
            break;
        }
    }
    best.truncate(limit);
    best
}

/// Spelling suggestions for `word`: empty when the word is accepted,
/// otherwise candidates within ⌈chars/3⌉ edits.
pub fn spell_check<N: GraphNode>(root: N, word: &str) -> Vec<Candidate> {
    if root.walk(word).map_or(false, |n| n.is_terminal()) {
        return Vec::new();
    }
    let threshold = word.chars().count().div_ceil(3);
    fuzzy(root, word, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Dawg;

    fn sample() -> Dawg {
        Dawg::from_iter(["apple", "apply", "hello", "world"])
    }

    #[test]
    fn test_fuzzy_orders_by_distance_then_key() {
        let dawg = sample();
        let results = dawg.fuzzy("aple", 2);
        let pairs: Vec<(&str, usize)> = results
            .iter()
            .map(|c| (c.term.as_str(), c.distance))
            .collect();
        assert_eq!(pairs, vec![("apple", 1), ("apply", 1)]);
    }

    #[test]
    fn test_fuzzy_single_hit() {
        let dawg = sample();
        let results = dawg.fuzzy("wrld", 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].term, "world");
        assert_eq!(results[0].distance, 1);
    }

    #[test]
    fn test_fuzzy_zero_distance_is_exact() {
        let dawg = sample();
        let results = dawg.fuzzy("hello", 0);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].distance, 0);
        assert!(dawg.fuzzy("hellx", 0).is_empty());
    }

    #[test]
    fn test_fuzzy_distance_is_exact_levenshtein() {
        let dawg = Dawg::from_iter(["kitten"]);
        let results = dawg.fuzzy("sitting", 3);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].distance, 3);
        assert!(dawg.fuzzy("sitting", 2).is_empty());
    }

    #[test]
    fn test_fuzzy_empty_query_measures_key_length() {
        let dawg = Dawg::from_iter(["a", "ab"]);
        let results = dawg.fuzzy("", 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].term, "a");
    }

    #[test]
    fn test_closest_widens_until_limit() {
        let dawg = sample();
        let results = dawg.closest("appel", 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].term, "apple");
        // Short queries bound the widening, so nothing within reach
        // means an empty answer.
        let none = dawg.closest("zz", 1);
        assert!(none.is_empty());
    }

    #[test]
    fn test_spell_check_accepts_known_words() {
        let dawg = sample();
        assert!(dawg.spell_check("hello").is_empty());
    }

    #[test]
    fn test_spell_check_suggests_within_threshold() {
        let dawg = sample();
        // ⌈5/3⌉ = 2 edits allowed.
        let suggestions = dawg.spell_check("aplle");
        assert!(suggestions.iter().any(|c| c.term == "apple"));
        assert!(suggestions.iter().all(|c| c.distance <= 2));
    }
}
