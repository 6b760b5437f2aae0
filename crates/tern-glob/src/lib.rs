//! tern-glob: shell wildcard matching.
//!
//! Provides [`glob_match`], the whole-string pattern matcher the evaluator
//! uses for `case` arms: `*`, `?`, `[...]` and `\` escapes.
//!
//! Matching is work-bounded so adversarial patterns cannot stall the shell.

pub mod glob;

pub use glob::{glob_match, MAX_MATCH_CALLS};
