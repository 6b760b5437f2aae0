//! Executable tree consumed by the evaluator.
//!
//! The grammar parser that builds these nodes lives upstream; this module
//! only defines the shapes it produces and the per-word expansion data.

mod types;

pub use types::*;
