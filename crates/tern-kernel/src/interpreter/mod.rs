//! Scope, exit status and tree evaluation.

mod eval;
mod scope;
mod status;

pub use eval::{CommandSubstituter, EvalError, EvalResult, Evaluator, NoSubstitution};
pub use scope::{FrameGuard, Scope, VarScope};
pub use status::ExitStatus;
