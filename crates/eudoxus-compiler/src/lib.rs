//! Compiler from the Eudoxus intermediate representation to the binary
//! automata format.
//!
//! The pipeline per compile:
//! - `oracle` - per-node transition resolution and encoding cost model
//! - `encode` - low / high / path-compression node emission
//! - `compiler` - driver: breadth-first emission, id-width resolution,
//!   output pooling, reference patching, header finalization
//!
//! The input graph is read-only here; normalization passes
//! (`optimize_edges`, `deduplicate_outputs`, `translate_nonadvancing`)
//! live in `eudoxus-ir` and run before compilation at the producer's
//! discretion.

pub mod compiler;
pub mod config;
pub mod error;

mod encode;
mod oracle;


pub use compiler::{compile, compile_with_logger};
pub use config::{Compiled, Config, Stats};
pub use error::CompileError;
