//! Per-node encoding cost model.
//!
//! Before a node is emitted the oracle resolves its per-byte transitions,
//! validates them (deterministic, no epsilon edges), and prices the low
//! and high encodings exactly. The driver later checks that the bytes
//! actually emitted match the chosen prediction, so any drift between
//! this model and the encoder is caught immediately.

use eudoxus_bytecode::{BITMAP256_LEN, IdWidth};
use eudoxus_ir::{Automata, NodeId, TargetInfo};

use crate::error::CompileError;

/// High node target tables switch to run-length (ALI) compression when
/// more than this many inputs repeat the previous target.
pub(crate) const ALI_THRESHOLD: usize = 32;

/// Resolved transition table and encoding costs for one node.
#[derive(Debug)]
pub(crate) struct NodeOracle {
    /// Unique (target, advance) per input byte, default applied.
    pub resolved: Vec<Option<TargetInfo>>,
    /// The node's default behavior, for telling explicit entries apart.
    pub default_info: Option<TargetInfo>,
    /// Any explicit entry that does not advance (default excluded).
    pub has_nonadvancing: bool,
    /// Number of explicit entries: inputs whose (target, advance) pair
    /// differs from the default behavior.
    pub out_degree: usize,
    /// Explicit entries whose target repeats the previous explicit
    /// entry's target.
    pub num_consecutive: usize,
    /// Whether a high node encoding would carry an ALI bitmap.
    pub use_ali: bool,
    /// Exact serialized size of the low node encoding.
    pub low_cost: usize,
    /// Exact serialized size of the high node encoding.
    pub high_cost: usize,
}

impl NodeOracle {
    pub fn build(
        automata: &Automata,
        node: NodeId,
        width: IdWidth,
    ) -> Result<Self, CompileError> {
        let n = automata.node(node);
        if n.edges.iter().any(|edge| edge.is_epsilon()) {
            return Err(CompileError::EpsilonEdge { node });
        }

        let by_input = automata.targets_by_input(node);
        let mut resolved: Vec<Option<TargetInfo>> = Vec::with_capacity(256);
        for (c, targets) in by_input.iter().enumerate() {
            if targets.len() > 1 {
                return Err(CompileError::NonDeterministic {
                    node,
                    input: c as u8,
                });
            }
            resolved.push(targets.first().copied());
        }

        let default_info = n.default_target.map(|d| (d, n.advance_on_default));

        let mut has_nonadvancing = false;
        let mut out_degree = 0;
        let mut num_consecutive = 0;
        let mut previous_target: Option<NodeId> = None;
        for info in resolved.iter().flatten() {
            if Some(*info) == default_info {
                continue;
            }
            out_degree += 1;
            if !info.1 {
                has_nonadvancing = true;
            }
            if previous_target == Some(info.0) {
                num_consecutive += 1;
            }
            previous_target = Some(info.0);
        }

        let use_ali = num_consecutive > ALI_THRESHOLD;
        let w = width.bytes();

        let mut low_cost = 1;
        if n.first_output.is_some() {
            low_cost += w;
        }
        if out_degree > 0 {
            low_cost += 1 + (1 + w) * out_degree;
        }
        if n.default_target.is_some() {
            low_cost += w;
        }
        if has_nonadvancing {
            low_cost += out_degree.div_ceil(8);
        }

        let mut high_cost = 1;
        if n.first_output.is_some() {
            high_cost += w;
        }
        if n.default_target.is_some() {
            high_cost += w;
        }
        if has_nonadvancing {
            high_cost += BITMAP256_LEN;
        }
        if out_degree < 256 {
            high_cost += BITMAP256_LEN;
        }
        if use_ali {
            high_cost += BITMAP256_LEN + w * (out_degree - num_consecutive);
        } else {
            high_cost += w * out_degree;
        }

        Ok(Self {
            resolved,
            default_info,
            has_nonadvancing,
            out_degree,
            num_consecutive,
            use_ali,
            low_cost,
            high_cost,
        })
    }

    /// Does input `c` need its own entry, as opposed to falling through
    /// to the default?
    pub fn is_explicit(&self, c: u8) -> bool {
        let info = self.resolved[c as usize];
        info.is_some() && info != self.default_info
    }

    /// Explicit entries in ascending input order.
    pub fn explicit_entries(&self) -> impl Iterator<Item = (u8, TargetInfo)> + '_ {
        (0..=255u8).filter_map(|c| match self.resolved[c as usize] {
            Some(info) if Some(info) != self.default_info => Some((c, info)),
            _ => None,
        })
    }
}
