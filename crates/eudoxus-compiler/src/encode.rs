//! Node emission.
//!
//! Each reachable node is emitted as one of three encodings:
//! - low: explicit (byte, target) entries, cheap at small degree
//! - high: bitmap-indexed target table, constant-time dispatch
//! - pc: a path-compressed byte string for straight-line runs
//!
//! Targets are emitted as reserved id slots and patched by the driver
//! once every node's offset is known.

use std::collections::BTreeSet;

use eudoxus_bytecode::{
    Assembler, BITMAP256_LEN, IdWidth, NODE_HIGH, NODE_LOW, NODE_PC, bitmap256_set, encode_pc_len,
    high, low, pc,
};
use eudoxus_ir::{Automata, NodeId, OutputId};

use crate::config::Stats;
use crate::error::CompileError;
use crate::oracle::NodeOracle;

/// A straight-line run eligible for path compression: `bytes` consumed
/// one by one land on `end`.
pub(crate) struct PcChain {
    pub end: NodeId,
    pub bytes: Vec<u8>,
    pub advance_on_final: bool,
}

/// Shared emission state threaded through the driver.
pub(crate) struct Emitter<'a> {
    pub automata: &'a Automata,
    pub width: IdWidth,
    pub high_node_weight: f64,
    pub asm: Assembler,
    /// Reserved id slots awaiting node offsets, in emission order.
    pub node_refs: Vec<(usize, NodeId)>,
    /// Reserved id slots awaiting output offsets, in emission order.
    pub output_refs: Vec<(usize, OutputId)>,
    /// Outputs referenced so far; transitively closed before the output
    /// section is emitted.
    pub outputs_seen: BTreeSet<OutputId>,
    pub stats: Stats,
}

impl<'a> Emitter<'a> {
    pub fn new(automata: &'a Automata, width: IdWidth, high_node_weight: f64) -> Self {
        Self {
            automata,
            width,
            high_node_weight,
            asm: Assembler::new(),
            node_refs: Vec::new(),
            output_refs: Vec::new(),
            outputs_seen: BTreeSet::new(),
            stats: Stats::default(),
        }
    }

    fn append_node_ref(&mut self, node: NodeId) {
        let at = self.asm.reserve_id(self.width);
        self.node_refs.push((at, node));
    }

    fn append_output_ref(&mut self, output: OutputId) {
        let at = self.asm.reserve_id(self.width);
        self.output_refs.push((at, output));
        self.outputs_seen.insert(output);
    }

    /// Emit `node` as a demux node, choosing low or high by weighted
    /// cost. Ties go to the high encoding; a zero weight forces it.
    pub fn demux_node(&mut self, node: NodeId) -> Result<(), CompileError> {
        let oracle = NodeOracle::build(self.automata, node, self.width)?;
        let use_low =
            oracle.high_cost as f64 * self.high_node_weight > oracle.low_cost as f64;
        let predicted = if use_low {
            oracle.low_cost
        } else {
            oracle.high_cost
        };

        let before = self.asm.len();
        if use_low {
            self.low_node(node, &oracle)?;
        } else {
            self.high_node(node, &oracle);
        }
        let emitted = self.asm.len() - before;

        if emitted != predicted {
            return Err(CompileError::CostPrediction {
                node,
                predicted,
                emitted,
            });
        }
        if use_low {
            self.stats.low_nodes += 1;
            self.stats.low_nodes_bytes += emitted as u64;
        } else {
            self.stats.high_nodes += 1;
            self.stats.high_nodes_bytes += emitted as u64;
        }
        Ok(())
    }

    fn low_node(&mut self, node: NodeId, oracle: &NodeOracle) -> Result<(), CompileError> {
        if oracle.out_degree > u8::MAX as usize {
            return Err(CompileError::LowDegreeOverflow {
                node,
                degree: oracle.out_degree,
            });
        }
        let n = self.automata.node(node);

        let mut header = NODE_LOW;
        if n.first_output.is_some() {
            header |= low::HAS_OUTPUT;
        }
        if oracle.has_nonadvancing {
            header |= low::HAS_NONADVANCING;
        }
        if n.default_target.is_some() {
            header |= low::HAS_DEFAULT;
        }
        if n.advance_on_default {
            header |= low::ADVANCE_ON_DEFAULT;
        }
        if oracle.out_degree > 0 {
            header |= low::HAS_EDGES;
        }
        self.asm.append_u8(header);

        if let Some(output) = n.first_output {
            self.append_output_ref(output);
        }
        if oracle.out_degree > 0 {
            self.asm.append_u8(oracle.out_degree as u8);
        }
        if let Some(default) = n.default_target {
            self.append_node_ref(default);
        }
        if oracle.has_nonadvancing {
            // One bit per entry, set when the entry advances.
            let mut bits = vec![0u8; oracle.out_degree.div_ceil(8)];
            for (i, (_, (_, advance))) in oracle.explicit_entries().enumerate() {
                if advance {
                    bits[i / 8] |= 1 << (i % 8);
                }
            }
            self.asm.append_bytes(&bits);
        }
        for (c, (target, _)) in oracle.explicit_entries() {
            self.asm.append_u8(c);
            self.append_node_ref(target);
        }
        Ok(())
    }

    fn high_node(&mut self, node: NodeId, oracle: &NodeOracle) {
        let n = self.automata.node(node);

        let mut header = NODE_HIGH;
        if n.first_output.is_some() {
            header |= high::HAS_OUTPUT;
        }
        if oracle.has_nonadvancing {
            header |= high::HAS_NONADVANCING;
        }
        if n.default_target.is_some() {
            header |= high::HAS_DEFAULT;
        }
        if n.advance_on_default {
            header |= high::ADVANCE_ON_DEFAULT;
        }
        if oracle.out_degree < 256 {
            header |= high::HAS_TARGET_BM;
        }
        if oracle.use_ali {
            header |= high::HAS_ALI_BM;
        }
        self.asm.append_u8(header);

        if let Some(output) = n.first_output {
            self.append_output_ref(output);
        }
        if let Some(default) = n.default_target {
            self.append_node_ref(default);
        }

        if oracle.has_nonadvancing {
            // Advance bits cover every input with a target, default
            // fall-throughs included.
            let mut bm = [0u8; BITMAP256_LEN];
            for c in 0..=255u8 {
                if let Some((_, advance)) = oracle.resolved[c as usize]
                    && advance
                {
                    bitmap256_set(&mut bm, c);
                }
            }
            self.asm.append_bytes(&bm);
        }
        if oracle.out_degree < 256 {
            let mut bm = [0u8; BITMAP256_LEN];
            for (c, _) in oracle.explicit_entries() {
                bitmap256_set(&mut bm, c);
            }
            self.asm.append_bytes(&bm);
        }
        if oracle.use_ali {
            // ALI bit marks the start of a new target run; the table
            // then stores one id per run.
            let mut bm = [0u8; BITMAP256_LEN];
            let mut previous: Option<NodeId> = None;
            for (c, (target, _)) in oracle.explicit_entries() {
                if previous.is_some() && previous != Some(target) {
                    bitmap256_set(&mut bm, c);
                }
                previous = Some(target);
            }
            self.asm.append_bytes(&bm);

            let mut previous: Option<NodeId> = None;
            for (_, (target, _)) in oracle.explicit_entries() {
                if previous != Some(target) {
                    self.append_node_ref(target);
                }
                previous = Some(target);
            }
        } else {
            for (_, (target, _)) in oracle.explicit_entries() {
                self.append_node_ref(target);
            }
        }
    }

    /// Emit `node` and the chain it heads as one path compression node.
    pub fn pc_node(&mut self, node: NodeId, chain: &PcChain) {
        let before = self.asm.len();
        let n = self.automata.node(node);
        let (len_bits, long_len) = encode_pc_len(chain.bytes.len());

        let mut header = NODE_PC | len_bits;
        if n.first_output.is_some() {
            header |= pc::HAS_OUTPUT;
        }
        if n.default_target.is_some() {
            header |= pc::HAS_DEFAULT;
        }
        if n.advance_on_default {
            header |= pc::ADVANCE_ON_DEFAULT;
        }
        if chain.advance_on_final {
            header |= pc::ADVANCE_ON_FINAL;
        }
        self.asm.append_u8(header);
        self.append_node_ref(chain.end);

        if let Some(output) = n.first_output {
            self.append_output_ref(output);
        }
        if let Some(default) = n.default_target {
            self.append_node_ref(default);
        }
        if let Some(long_len) = long_len {
            self.asm.append_u8(long_len);
        }
        self.asm.append_bytes(&chain.bytes);

        self.stats.pc_nodes += 1;
        self.stats.pc_nodes_bytes += (self.asm.len() - before) as u64;
    }
}
