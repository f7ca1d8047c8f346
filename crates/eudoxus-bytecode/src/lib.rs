//! Eudoxus binary automata format.
//!
//! The compiled form of an automaton is a single pointer-free buffer:
//! a fixed header followed by node encodings, output records, and
//! metadata, all cross-referenced by `id_width`-sized integer offsets.
//! This crate defines that contract:
//! - `format` - node type tags, flag bits, bitmaps, id widths
//! - `header` - the fixed automata header
//! - `assembler` - offset-addressed buffer assembly

pub mod assembler;
pub mod format;
pub mod header;

pub use assembler::Assembler;
pub use format::{
    BITMAP256_LEN, IdWidth, MAGIC, NODE_HIGH, NODE_LOW, NODE_PC, NODE_TYPE_MASK, PC_MAX_PATH,
    PC_MIN_PATH, VERSION, bitmap256_get, bitmap256_set, decode_pc_len, encode_pc_len, high, low,
    pc,
};
pub use header::{HEADER_LEN, Header, HeaderError};
