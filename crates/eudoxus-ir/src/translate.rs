//! Non-advancing transition elimination.
//!
//! A non-advancing edge costs the execution engine an extra node visit
//! without consuming input. When its target would produce no output and
//! has at most one continuation for the byte in question, the edge can
//! point straight at the continuation instead. Each rewrite can expose
//! another, so both passes iterate to a fixed point.
//!
//! Two variants:
//! - [`translate_nonadvancing`] rebuilds a node's transitions per input
//!   byte and re-canonicalizes with `optimize_edges`; with
//!   `conservative = false` it also redirects through branching targets.
//! - [`translate_nonadvancing_structural`] rewrites edges in place, only
//!   when a target has one continuation for the edge's whole value set.
//!
//! Both trade node size for fewer indirections per input byte; the
//! caller opts in.

use crate::automata::{Automata, NodeId, TargetInfo};
use crate::optimize::optimize_edges;
use crate::edge::Edge;

/// Would entering `target` fire an output the executor must observe?
fn produces_output(automata: &Automata, target: NodeId) -> bool {
    automata.node(target).first_output.is_some() && !automata.no_advance_no_output
}

/// Eliminate non-advancing transitions byte by byte.
///
/// For every node and every input byte, a non-advancing target with no
/// output of its own is replaced by its continuations for that byte:
/// dropped when it has none, redirected when it has exactly one (or any
/// number when `conservative` is false). Returns rewrites performed.
pub fn translate_nonadvancing(automata: &mut Automata, conservative: bool) -> usize {
    let mut operations_done = 0;

    let mut needs_attention = true;
    while needs_attention {
        needs_attention = false;

        for node in automata.breadth_first() {
            let mut new_targets: Vec<Vec<TargetInfo>> = vec![Vec::new(); 256];
            let mut did_something = false;

            for c in 0..=255u8 {
                for info in automata.targets_for(node, c) {
                    let (target, advance) = info;
                    if advance {
                        new_targets[c as usize].push(info);
                        continue;
                    }
                    if produces_output(automata, target) {
                        new_targets[c as usize].push(info);
                        continue;
                    }
                    let continuations = automata.targets_for(target, c);
                    if continuations.is_empty() {
                        // Dead transition; drop it.
                        did_something = true;
                        operations_done += 1;
                    } else if continuations.len() == 1 || !conservative {
                        new_targets[c as usize].extend(continuations);
                        did_something = true;
                        operations_done += 1;
                    } else {
                        new_targets[c as usize].push(info);
                    }
                }
            }

            if did_something {
                let n = automata.node_mut(node);
                n.edges.clear();
                n.default_target = None;
                for (c, targets) in new_targets.iter().enumerate() {
                    for &(target, advance) in targets {
                        n.edges.push(Edge::from_values(target, advance, vec![c as u8]));
                    }
                }
                optimize_edges(automata, node);
                needs_attention = true;
            }
        }
    }

    operations_done
}

/// Continuation shared by every input in `inputs`, if `target` has
/// exactly one per input, they all agree, and entering `target` fires no
/// output. Empty `inputs` yields `None`.
fn find_next_target(
    automata: &Automata,
    inputs: &[u8],
    target: NodeId,
) -> Option<TargetInfo> {
    if produces_output(automata, target) {
        return None;
    }
    let mut result: Option<TargetInfo> = None;
    for &c in inputs {
        let continuations = automata.targets_for(target, c);
        if continuations.len() != 1 {
            return None;
        }
        let candidate = continuations[0];
        match result {
            Some((node, _)) if node != candidate.0 => return None,
            Some(_) => {}
            None => result = Some(candidate),
        }
    }
    result
}

/// Structural variant: redirect a non-advancing edge (or default) in
/// place when its target has a unique continuation for the edge's whole
/// value set. Cheaper than the per-byte pass; never drops transitions.
pub fn translate_nonadvancing_structural(automata: &mut Automata) -> usize {
    let mut operations_done = 0;

    let mut needs_attention = true;
    while needs_attention {
        needs_attention = false;

        for node in automata.breadth_first() {
            let mut default_inputs = [true; 256];
            let mut edge_rewrites: Vec<(usize, TargetInfo)> = Vec::new();

            for (i, edge) in automata.node(node).edges.iter().enumerate() {
                let inputs: Vec<u8> = edge.iter().collect();
                for &c in &inputs {
                    default_inputs[c as usize] = false;
                }
                if edge.advance {
                    continue;
                }
                if let Some(next) = find_next_target(automata, &inputs, edge.target) {
                    edge_rewrites.push((i, next));
                }
            }

            for (i, (target, advance)) in edge_rewrites {
                let edge = &mut automata.node_mut(node).edges[i];
                edge.target = target;
                edge.advance = advance;
                operations_done += 1;
                needs_attention = true;
            }

            let n = automata.node(node);
            if let Some(default) = n.default_target
                && !n.advance_on_default
            {
                let inputs: Vec<u8> = (0..=255u8)
                    .filter(|&c| default_inputs[c as usize])
                    .collect();
                if !inputs.is_empty()
                    && let Some((target, advance)) = find_next_target(automata, &inputs, default)
                {
                    let n = automata.node_mut(node);
                    n.default_target = Some(target);
                    n.advance_on_default = advance;
                    operations_done += 1;
                    needs_attention = true;
                }
            }
        }
    }

    operations_done
}

#[cfg(test)]
mod tests {
    use super::*;

    /// start --'a' (non-advancing)--> hop --'a'--> end
    fn hop_graph(hop_output: bool) -> (Automata, NodeId, NodeId, NodeId) {
        let mut a = Automata::new();
        let start = a.add_node();
        let hop = a.add_node();
        let end = a.add_node();
        a.set_start(start);
        a.node_mut(start).edges.push(Edge::from_values(hop, false, vec![b'a']));
        a.node_mut(hop).edges.push(Edge::from_values(end, true, vec![b'a']));
        if hop_output {
            let out = a.add_output(b"hop".to_vec());
            a.node_mut(hop).first_output = Some(out);
        }
        (a, start, hop, end)
    }

    #[test]
    fn hop_is_bypassed() {
        let (mut a, start, _hop, end) = hop_graph(false);
        let ops = translate_nonadvancing(&mut a, true);
        assert_eq!(ops, 1);
        assert_eq!(a.targets_for(start, b'a'), vec![(end, true)]);
    }

    #[test]
    fn output_blocks_bypass() {
        let (mut a, start, hop, _end) = hop_graph(true);
        let ops = translate_nonadvancing(&mut a, true);
        assert_eq!(ops, 0);
        assert_eq!(a.targets_for(start, b'a'), vec![(hop, false)]);
    }

    #[test]
    fn no_advance_no_output_permits_bypass() {
        let (mut a, start, _hop, end) = hop_graph(true);
        a.no_advance_no_output = true;
        let ops = translate_nonadvancing(&mut a, true);
        assert_eq!(ops, 1);
        assert_eq!(a.targets_for(start, b'a'), vec![(end, true)]);
    }

    #[test]
    fn dead_nonadvancing_edge_is_dropped() {
        let mut a = Automata::new();
        let start = a.add_node();
        let dead = a.add_node();
        a.set_start(start);
        a.node_mut(start).edges.push(Edge::from_values(dead, false, vec![b'a']));

        let ops = translate_nonadvancing(&mut a, true);
        assert_eq!(ops, 1);
        assert!(a.targets_for(start, b'a').is_empty());
    }

    #[test]
    fn chains_collapse_to_fixed_point() {
        // start -'a'(na)-> h1 -'a'(na)-> h2 -'a'-> end
        let mut a = Automata::new();
        let start = a.add_node();
        let h1 = a.add_node();
        let h2 = a.add_node();
        let end = a.add_node();
        a.set_start(start);
        a.node_mut(start).edges.push(Edge::from_values(h1, false, vec![b'a']));
        a.node_mut(h1).edges.push(Edge::from_values(h2, false, vec![b'a']));
        a.node_mut(h2).edges.push(Edge::from_values(end, true, vec![b'a']));

        let ops = translate_nonadvancing(&mut a, true);
        assert!(ops >= 2);
        assert_eq!(a.targets_for(start, b'a'), vec![(end, true)]);
    }

    #[test]
    fn conservative_keeps_branching_targets() {
        // hop is non-deterministic for 'a': two continuations.
        let mut a = Automata::new();
        let start = a.add_node();
        let hop = a.add_node();
        let e1 = a.add_node();
        let e2 = a.add_node();
        a.set_start(start);
        a.node_mut(start).edges.push(Edge::from_values(hop, false, vec![b'a']));
        a.node_mut(hop).edges.push(Edge::from_values(e1, true, vec![b'a']));
        a.node_mut(hop).edges.push(Edge::from_values(e2, true, vec![b'a']));

        assert_eq!(translate_nonadvancing(&mut a, true), 0);
        assert_eq!(a.targets_for(start, b'a'), vec![(hop, false)]);

        let ops = translate_nonadvancing(&mut a, false);
        assert_eq!(ops, 1);
        let targets = a.targets_for(start, b'a');
        assert!(targets.contains(&(e1, true)));
        assert!(targets.contains(&(e2, true)));
    }

    #[test]
    fn structural_redirects_edge_in_place() {
        let (mut a, start, _hop, end) = hop_graph(false);
        let ops = translate_nonadvancing_structural(&mut a);
        assert_eq!(ops, 1);
        assert_eq!(a.targets_for(start, b'a'), vec![(end, true)]);
        // Edge list itself was rewritten, not rebuilt.
        assert_eq!(a.node(start).edges.len(), 1);
    }

    #[test]
    fn structural_requires_agreement_across_values() {
        // Edge covers 'a' and 'b' but hop continues differently per byte.
        let mut a = Automata::new();
        let start = a.add_node();
        let hop = a.add_node();
        let e1 = a.add_node();
        let e2 = a.add_node();
        a.set_start(start);
        a.node_mut(start)
            .edges
            .push(Edge::from_values(hop, false, vec![b'a', b'b']));
        a.node_mut(hop).edges.push(Edge::from_values(e1, true, vec![b'a']));
        a.node_mut(hop).edges.push(Edge::from_values(e2, true, vec![b'b']));

        assert_eq!(translate_nonadvancing_structural(&mut a), 0);
        assert_eq!(a.targets_for(start, b'a'), vec![(hop, false)]);
    }

    #[test]
    fn structural_rewrites_nonadvancing_default() {
        let mut a = Automata::new();
        let start = a.add_node();
        let hop = a.add_node();
        let end = a.add_node();
        a.set_start(start);
        a.node_mut(start).default_target = Some(hop);
        a.node_mut(start).advance_on_default = false;
        a.node_mut(hop).edges.push(Edge::new(end, true)); // epsilon: all bytes

        let ops = translate_nonadvancing_structural(&mut a);
        assert_eq!(ops, 1);
        assert_eq!(a.node(start).default_target, Some(end));
        assert!(a.node(start).advance_on_default);
    }

    #[test]
    fn observable_behavior_is_preserved() {
        // Run a tiny executor over all 2-byte inputs on a graph with a
        // bypassable hop and compare before/after traces.
        fn run(a: &Automata, input: &[u8]) -> (Vec<Vec<u8>>, usize) {
            let mut outputs = Vec::new();
            let mut node = a.start().unwrap();
            let mut pos = 0;
            let mut steps = 0;
            let mut emit = |a: &Automata, id: NodeId, outputs: &mut Vec<Vec<u8>>| {
                let mut cur = a.node(id).first_output;
                while let Some(o) = cur {
                    outputs.push(a.output(o).content.clone());
                    cur = a.output(o).next_output;
                }
            };
            emit(a, node, &mut outputs);
            while pos < input.len() {
                steps += 1;
                if steps > 64 {
                    break; // cycle guard
                }
                let targets = a.targets_for(node, input[pos]);
                let Some(&(next, advance)) = targets.first() else {
                    break;
                };
                if advance {
                    pos += 1;
                }
                node = next;
                emit(a, node, &mut outputs);
            }
            (outputs, pos)
        }

        let mut a = Automata::new();
        let start = a.add_node();
        let hop = a.add_node();
        let end = a.add_node();
        let other = a.add_node();
        a.set_start(start);
        a.node_mut(start).edges.push(Edge::from_values(hop, false, vec![b'a']));
        a.node_mut(start).edges.push(Edge::from_values(other, true, vec![b'b']));
        a.node_mut(hop).edges.push(Edge::from_values(end, true, vec![b'a']));
        let out = a.add_output(b"end".to_vec());
        a.node_mut(end).first_output = Some(out);
        let out2 = a.add_output(b"other".to_vec());
        a.node_mut(other).first_output = Some(out2);

        let inputs: Vec<Vec<u8>> = [b"aa", b"ab", b"ba", b"bb"]
            .iter()
            .map(|s| s.to_vec())
            .collect();
        let before: Vec<_> = inputs.iter().map(|i| run(&a, i)).collect();

        let ops = translate_nonadvancing(&mut a, true);
        assert!(ops > 0);

        let after: Vec<_> = inputs.iter().map(|i| run(&a, i)).collect();
        assert_eq!(before, after);
    }
}
