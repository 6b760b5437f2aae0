//! Arithmetic expression evaluation for `$(( ))` and `(( ))`.
//!
//! A Pratt (top-down operator precedence) parser over 64-bit signed
//! integers. Supports:
//! - Arithmetic: `+ - * / %` (wrapping; division truncates toward zero)
//! - Bitwise: `~ & ^ | << >>` (shift amounts use their low six bits)
//! - Comparison and logic: `< <= > >= == != ! && ||`, yielding 1 or 0
//! - Ternary `a ? b : c`
//! - Assignment: `=` and `*= /= %= += -= <<= >>= &= ^= |=`
//! - Variables as bare `name`, `$name` or `${name}`; unset or empty reads as 0
//!
//! `&&`, `||` and `?:` always evaluate every operand. Assignments are
//! staged: later reads in the same expression see them, except that the
//! second branch of `?:` does not see writes from the first. The writes are
//! committed in order only if the whole expression succeeds.

mod error;
mod lexer;
mod node;
mod parser;

pub use error::{ArithError, ArithResult};
pub use parser::MAX_NESTING_DEPTH;

use crate::interpreter::Scope;
use parser::ArithParser;

/// Evaluate an arithmetic expression against `scope`.
///
/// The expression is the text between `$((` and `))`.
///
/// # Example
/// ```
/// use tern_kernel::arithmetic::evaluate;
/// use tern_kernel::interpreter::{Scope, VarScope};
///
/// let mut scope = VarScope::new();
/// scope.set("x", "5".to_string());
/// assert_eq!(evaluate("x * 2 + 1", &mut scope).unwrap(), 11);
/// assert_eq!(evaluate("x += 3", &mut scope).unwrap(), 8);
/// assert_eq!(scope.get("x"), Some("8"));
/// ```
pub fn evaluate<S: Scope + ?Sized>(expr: &str, scope: &mut S) -> ArithResult<i64> {
    let (value, writes) = {
        let mut parser = ArithParser::new(expr, &*scope)?;
        let value = parser.expression(0)?;
        parser.expect_end()?;
        (value, parser.into_writes())
    };

    for (name, assigned) in writes {
        scope.set(&name, assigned.to_string());
    }
    Ok(value)
}
