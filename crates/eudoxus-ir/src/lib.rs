//! In-memory intermediate representation for Eudoxus automata.
//!
//! An automaton is built here by a producer (trie builder, pattern
//! generator, or by hand), normalized, and handed to the compiler:
//! - `automata` - arena graph: nodes, edges, outputs, metadata
//! - `edge` - byte-set transitions with vector/bitmap storage
//! - `optimize` - edge-list canonicalization
//! - `dedup` - structural output deduplication
//! - `translate` - non-advancing transition elimination
//! - `logger` - severity/callback collaborator interface
//!
//! Everything references nodes and outputs by arena index, which is also
//! how the compiled binary format addresses them.

pub mod automata;
pub mod dedup;
pub mod edge;
pub mod logger;
pub mod optimize;
pub mod translate;

pub use automata::{Automata, Node, NodeId, Output, OutputId, TargetInfo};
pub use dedup::deduplicate_outputs;
pub use edge::Edge;
pub use logger::{LogFn, Severity, nop_logger};
pub use optimize::optimize_edges;
pub use translate::{translate_nonadvancing, translate_nonadvancing_structural};
