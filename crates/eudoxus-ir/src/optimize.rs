//! Edge-list canonicalization.
//!
//! Merges a node's edges so that each `(target, advance)` pair appears at
//! most once, then rewrites each merged edge into its most compact
//! representation: a sorted value vector below 32 values, a bitmap from
//! 32 up. Epsilon edges merge only with other epsilon edges of the same
//! `(target, advance)` pair and are kept after the value edges.
//!
//! The set of reachable `(byte, target, advance)` triples is unchanged;
//! only the representation is normalized. Non-determinism (one byte, two
//! targets) is preserved as separate edges.

use std::collections::{BTreeMap, BTreeSet};

use crate::automata::{Automata, NodeId};
use crate::edge::Edge;

/// Canonicalize one node's edge list in place.
pub fn optimize_edges(automata: &mut Automata, node: NodeId) {
    let edges = std::mem::take(&mut automata.node_mut(node).edges);

    // (target, advance) -> covered value set, in sorted key order so the
    // rebuilt list is deterministic.
    let mut by_target: BTreeMap<(NodeId, bool), [bool; 256]> = BTreeMap::new();
    let mut epsilons: BTreeSet<(NodeId, bool)> = BTreeSet::new();

    for edge in edges {
        if edge.is_epsilon() {
            epsilons.insert((edge.target, edge.advance));
            continue;
        }
        let values = by_target.entry((edge.target, edge.advance)).or_insert([false; 256]);
        for c in edge.iter() {
            values[c as usize] = true;
        }
    }

    let rebuilt = &mut automata.node_mut(node).edges;
    for ((target, advance), values) in by_target {
        let bytes: Vec<u8> = (0..=255u8).filter(|&c| values[c as usize]).collect();
        let mut edge = Edge::from_values(target, advance, bytes);
        if edge.len() >= 32 {
            edge.switch_to_bitmap();
        }
        rebuilt.push(edge);
    }
    for (target, advance) in epsilons {
        rebuilt.push(Edge::new(target, advance));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_edges_with_same_target_and_advance() {
        let mut a = Automata::new();
        let n = a.add_node();
        let ta = a.add_node();
        let tb = a.add_node();
        a.node_mut(n).edges.push(Edge::from_values(ta, true, vec![b'c']));
        a.node_mut(n).edges.push(Edge::from_values(ta, true, vec![b'd']));
        a.node_mut(n).edges.push(Edge::from_values(tb, true, vec![b'd']));

        optimize_edges(&mut a, n);

        let edges = &a.node(n).edges;
        assert_eq!(edges.len(), 2);
        let to_a = edges.iter().find(|e| e.target == ta).unwrap();
        let to_b = edges.iter().find(|e| e.target == tb).unwrap();
        assert_eq!(to_a.len(), 2);
        assert!(to_a.contains(b'c') && to_a.contains(b'd'));
        assert_eq!(to_b.len(), 1);
        assert!(to_b.contains(b'd'));
    }

    #[test]
    fn keeps_nondeterministic_edges_separate() {
        let mut a = Automata::new();
        let n = a.add_node();
        let ta = a.add_node();
        let tb = a.add_node();
        a.node_mut(n).edges.push(Edge::from_values(ta, true, vec![b'c']));
        a.node_mut(n).edges.push(Edge::from_values(tb, true, vec![b'c']));

        optimize_edges(&mut a, n);

        let edges = &a.node(n).edges;
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.contains(b'c') && e.len() == 1));
    }

    #[test]
    fn keeps_advance_and_nonadvance_separate() {
        let mut a = Automata::new();
        let n = a.add_node();
        let t = a.add_node();
        a.node_mut(n).edges.push(Edge::from_values(t, true, vec![b'c']));
        a.node_mut(n).edges.push(Edge::from_values(t, false, vec![b'c']));

        optimize_edges(&mut a, n);

        let edges = &a.node(n).edges;
        assert_eq!(edges.len(), 2);
        assert_ne!(edges[0].advance, edges[1].advance);
    }

    #[test]
    fn wide_merges_become_bitmaps_narrow_stay_vectors() {
        let mut a = Automata::new();
        let n = a.add_node();
        let t = a.add_node();
        for c in 0..200u8 {
            a.node_mut(n).edges.push(Edge::from_values(t, true, vec![c]));
        }
        optimize_edges(&mut a, n);
        assert_eq!(a.node(n).edges.len(), 1);
        assert!(a.node(n).edges[0].as_bitmap().is_some());
        assert_eq!(a.node(n).edges[0].len(), 200);

        let m = a.add_node();
        for c in 0..31u8 {
            a.node_mut(m).edges.push(Edge::from_values(t, true, vec![c]));
        }
        optimize_edges(&mut a, m);
        assert_eq!(a.node(m).edges.len(), 1);
        assert!(a.node(m).edges[0].as_vector().is_some());
        assert_eq!(a.node(m).edges[0].len(), 31);
    }

    #[test]
    fn epsilon_edges_survive_separately() {
        let mut a = Automata::new();
        let n = a.add_node();
        let t = a.add_node();
        a.node_mut(n).edges.push(Edge::new(t, true));
        a.node_mut(n).edges.push(Edge::from_values(t, true, vec![b'c']));

        optimize_edges(&mut a, n);

        let edges = &a.node(n).edges;
        assert_eq!(edges.len(), 2);
        assert!(edges[0].contains(b'c'));
        assert!(edges[1].is_epsilon());
        assert_eq!(edges[1].target, t);
    }

    #[test]
    fn semantics_preserved_for_every_byte() {
        let mut a = Automata::new();
        let n = a.add_node();
        let ta = a.add_node();
        let tb = a.add_node();
        let d = a.add_node();
        a.node_mut(n).default_target = Some(d);
        a.node_mut(n).edges.push(Edge::from_values(ta, true, vec![5, 9, 200]));
        a.node_mut(n).edges.push(Edge::from_values(ta, true, vec![6]));
        a.node_mut(n).edges.push(Edge::from_values(tb, false, vec![9]));
        a.node_mut(n).edges.push(Edge::from_values(ta, false, vec![7]));

        let before: Vec<_> = (0..=255u8).map(|c| {
            let mut t = a.targets_for(n, c);
            t.sort();
            t
        }).collect();

        optimize_edges(&mut a, n);

        let after: Vec<_> = (0..=255u8).map(|c| {
            let mut t = a.targets_for(n, c);
            t.sort();
            t
        }).collect();

        assert_eq!(before, after);
    }
}
