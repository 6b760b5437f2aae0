use thiserror::Error;

/// Every fault an arithmetic evaluation can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithError {
    #[error("unexpected character {text:?} at offset {pos}")]
    UnknownToken { text: String, pos: usize },

    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("expected {expected} but found {found}")]
    Expected { expected: String, found: String },

    #[error("variable '{name}' cannot be used as a number: {value:?}")]
    NotANumber { name: String, value: String },

    #[error("assignment target is not a variable: '{op}'")]
    AssignToNonVariable { op: String },

    #[error("'{token}' cannot start an expression")]
    NoPrefixHandler { token: String },

    #[error("'{token}' cannot follow an operand")]
    NoInfixHandler { token: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("expression nested too deeply (max {max})")]
    NestingTooDeep { max: usize },
}

pub type ArithResult<T> = Result<T, ArithError>;
