//! Compiler configuration and results.

/// Compilation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Identifier width in bytes: 1, 2, 4 or 8, or 0 to pick the
    /// smallest width that fits automatically.
    pub id_width: u8,
    /// Node start offsets are padded to multiples of this. 1 = no padding.
    pub align_to: u32,
    /// Cost multiplier applied to the high node encoding before
    /// comparison. 1.0 optimizes purely for space; below 1.0 favors
    /// table-driven high nodes (0 forces them); above 1.0 favors low and
    /// path-compression nodes.
    pub high_node_weight: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_width: 0,
            align_to: 1,
            high_node_weight: 1.0,
        }
    }
}

/// Per-compile statistics, for diagnostic reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Identifier slots written (node references, output references, and
    /// pooled output contents).
    pub ids_used: u64,
    /// Alignment padding bytes inserted.
    pub padding: u64,
    pub low_nodes: u64,
    pub low_nodes_bytes: u64,
    pub high_nodes: u64,
    pub high_nodes_bytes: u64,
    pub pc_nodes: u64,
    pub pc_nodes_bytes: u64,
}

impl Stats {
    /// Nodes emitted across all encodings.
    pub fn total_nodes(&self) -> u64 {
        self.low_nodes + self.high_nodes + self.pc_nodes
    }
}

/// A successful compilation.
#[derive(Debug, Clone)]
pub struct Compiled {
    /// The finished buffer: header, node table, outputs, metadata.
    pub buffer: Vec<u8>,
    /// Effective settings; `id_width` holds the width actually used.
    pub config: Config,
    pub stats: Stats,
}
