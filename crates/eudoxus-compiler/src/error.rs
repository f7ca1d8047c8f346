//! Compiler error taxonomy.
//!
//! Three operationally distinct classes: structural errors mean the input
//! graph must be fixed; `IdWidthTooSmall` for an explicitly configured
//! width means the caller can relax a setting (the auto-width path widens
//! instead of failing); `CostPrediction` indicates a compiler bug, never
//! bad input.

use eudoxus_ir::NodeId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("automata has no start node")]
    NoStartNode,

    #[error("node {node:?} has more than one target for input {input:#04x}")]
    NonDeterministic { node: NodeId, input: u8 },

    #[error("node {node:?} has an epsilon edge, which the encoder does not support")]
    EpsilonEdge { node: NodeId },

    #[error("id width of {width} byte(s) is too small for this automata")]
    IdWidthTooSmall { width: usize },

    #[error("invalid configured id width {0}; expected 0 (auto), 1, 2, 4 or 8")]
    InvalidConfiguredWidth(u8),

    #[error("align_to must be at least 1")]
    InvalidAlignment,

    #[error("high_node_weight must be a non-negative number, got {0}")]
    InvalidWeight(f64),

    #[error("node {node:?} has out-degree {degree}, too large for a low node encoding")]
    LowDegreeOverflow { node: NodeId, degree: usize },

    #[error(
        "cost prediction mismatch on node {node:?}: predicted {predicted}, emitted {emitted}; \
         please report as a bug"
    )]
    CostPrediction {
        node: NodeId,
        predicted: usize,
        emitted: usize,
    },
}
