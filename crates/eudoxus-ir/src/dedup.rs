//! Output deduplication.
//!
//! Two outputs are structurally equal when their content bytes match and
//! their `next_output` references are the same output. Merging one output
//! can make its parents newly equal (their keys contain the merged
//! output's identity), so the pass runs in waves to a fixed point: every
//! merge enqueues the merged output's parents for re-examination.
//!
//! The canonical representative for a key is the first structurally
//! equal output encountered in wave order, which derives from
//! breadth-first collection order — deterministic for a given arena,
//! independent of hash iteration.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::automata::{Automata, NodeId, OutputId};

/// A live reference slot pointing at an output.
#[derive(Clone, Copy, Debug)]
enum Slot {
    /// A node's `first_output` field.
    NodeFirst(NodeId),
    /// An output's `next_output` field.
    OutputNext(OutputId),
}

/// Merge structurally identical outputs; returns how many were removed.
///
/// After this pass no two reachable outputs are structurally equal, and
/// every reference resolves to equivalent content. Idempotent.
pub fn deduplicate_outputs(automata: &mut Automata) -> usize {
    // Reachable outputs in first-seen order, plus the reference and
    // parent maps the merge step needs.
    let mut order: Vec<OutputId> = Vec::new();
    let mut seen: HashSet<OutputId> = HashSet::new();
    let mut refs: HashMap<OutputId, Vec<Slot>> = HashMap::new();
    let mut parents: HashMap<OutputId, BTreeSet<OutputId>> = HashMap::new();

    for node in automata.breadth_first() {
        let Some(first) = automata.node(node).first_output else {
            continue;
        };
        refs.entry(first).or_default().push(Slot::NodeFirst(node));
        let mut cur = first;
        while seen.insert(cur) {
            order.push(cur);
            let Some(next) = automata.output(cur).next_output else {
                break;
            };
            parents.entry(next).or_default().insert(cur);
            refs.entry(next).or_default().push(Slot::OutputNext(cur));
            cur = next;
        }
    }

    // Canonical map: (content, next identity) -> representative. The
    // BTreeMap key order is lexicographic content first (shorter content
    // sorts before its extensions), then next-output id.
    let mut canonical: BTreeMap<(Vec<u8>, Option<u32>), OutputId> = BTreeMap::new();
    let mut merged: HashSet<OutputId> = HashSet::new();
    let mut removed = 0;
    let mut todo = order;

    while !todo.is_empty() {
        let mut next_wave: BTreeSet<OutputId> = BTreeSet::new();

        for id in todo {
            if merged.contains(&id) {
                continue;
            }
            let output = automata.output(id);
            let key = (output.content.clone(), output.next_output.map(|o| o.0));
            let rep = match canonical.entry(key) {
                Entry::Vacant(entry) => {
                    entry.insert(id);
                    continue;
                }
                Entry::Occupied(entry) => *entry.get(),
            };
            if rep == id {
                continue;
            }

            // Redirect every reference to `id` onto the representative.
            let slots = refs.remove(&id).unwrap_or_default();
            for slot in &slots {
                match *slot {
                    Slot::NodeFirst(node) => automata.node_mut(node).first_output = Some(rep),
                    Slot::OutputNext(parent) => {
                        automata.output_mut(parent).next_output = Some(rep)
                    }
                }
            }
            refs.entry(rep).or_default().extend(slots);

            // The parents' equality keys contained `id`; re-examine them.
            let ps = parents.remove(&id).unwrap_or_default();
            for &parent in &ps {
                if !merged.contains(&parent) {
                    next_wave.insert(parent);
                }
            }
            parents.entry(rep).or_default().extend(ps);

            merged.insert(id);
            removed += 1;
        }

        todo = next_wave.into_iter().collect();
    }

    removed
}
