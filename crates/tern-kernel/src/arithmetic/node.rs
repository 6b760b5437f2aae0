//! Pratt nodes and the binding-power table.

use std::fmt;

use super::error::{ArithError, ArithResult};
use super::lexer::ArithToken;

pub(crate) const UNARY_SIGN_BP: i32 = 150;
pub(crate) const GROUP_BP: i32 = 140;
pub(crate) const COMPLEMENT_BP: i32 = 130;
pub(crate) const MULTIPLICATIVE_BP: i32 = 120;
pub(crate) const ADDITIVE_BP: i32 = 110;
pub(crate) const SHIFT_BP: i32 = 100;
pub(crate) const BIT_AND_BP: i32 = 90;
pub(crate) const BIT_XOR_BP: i32 = 80;
pub(crate) const BIT_OR_BP: i32 = 70;
pub(crate) const COMPARISON_BP: i32 = 60;
pub(crate) const ASSIGNMENT_BP: i32 = 60;
pub(crate) const NOT_BP: i32 = 50;
pub(crate) const AND_BP: i32 = 40;
pub(crate) const OR_BP: i32 = 30;
pub(crate) const TERNARY_BP: i32 = 20;
pub(crate) const END_BP: i32 = -1;

/// Canonical truth value.
pub(crate) fn truth(value: bool) -> i64 {
    i64::from(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    BitAnd,
    BitXor,
    BitOr,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
}

impl BinaryOp {
    pub(crate) fn lbp(self) -> i32 {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => MULTIPLICATIVE_BP,
            BinaryOp::Add | BinaryOp::Sub => ADDITIVE_BP,
            BinaryOp::Shl | BinaryOp::Shr => SHIFT_BP,
            BinaryOp::BitAnd => BIT_AND_BP,
            BinaryOp::BitXor => BIT_XOR_BP,
            BinaryOp::BitOr => BIT_OR_BP,
            BinaryOp::Less
            | BinaryOp::LessEq
            | BinaryOp::Greater
            | BinaryOp::GreaterEq
            | BinaryOp::Eq
            | BinaryOp::NotEq => COMPARISON_BP,
        }
    }

    pub(crate) fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
        }
    }

    /// Apply to two operands. Shift amounts use their low six bits.
    pub(crate) fn apply(self, l: i64, r: i64) -> ArithResult<i64> {
        Ok(match self {
            BinaryOp::Mul => l.wrapping_mul(r),
            BinaryOp::Div if r == 0 => return Err(ArithError::DivisionByZero),
            BinaryOp::Div => l.wrapping_div(r),
            BinaryOp::Rem if r == 0 => return Err(ArithError::DivisionByZero),
            BinaryOp::Rem => l.wrapping_rem(r),
            BinaryOp::Add => l.wrapping_add(r),
            BinaryOp::Sub => l.wrapping_sub(r),
            BinaryOp::Shl => l.wrapping_shl(r as u32),
            BinaryOp::Shr => l.wrapping_shr(r as u32),
            BinaryOp::BitAnd => l & r,
            BinaryOp::BitXor => l ^ r,
            BinaryOp::BitOr => l | r,
            BinaryOp::Less => truth(l < r),
            BinaryOp::LessEq => truth(l <= r),
            BinaryOp::Greater => truth(l > r),
            BinaryOp::GreaterEq => truth(l >= r),
            BinaryOp::Eq => truth(l == r),
            BinaryOp::NotEq => truth(l != r),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub(crate) fn lbp(self) -> i32 {
        match self {
            LogicalOp::And => AND_BP,
            LogicalOp::Or => OR_BP,
        }
    }

    pub(crate) fn apply(self, l: i64, r: i64) -> i64 {
        match self {
            LogicalOp::And => truth(l != 0 && r != 0),
            LogicalOp::Or => truth(l != 0 || r != 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrefixOp {
    Complement,
    Not,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Closer {
    RightParen,
    Colon,
}

/// One lookahead node. Behavior lives in the parser's `nud`/`led`
/// dispatch; the node itself only knows its binding power.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ArithNode {
    Literal(i64),
    Variable(String),
    /// Binary operator; `+` and `-` also act as unary signs.
    Infix(BinaryOp),
    InfixRight(LogicalOp),
    /// `=` when `None`, otherwise the compound form of the operator.
    InfixAssign(Option<BinaryOp>),
    Prefix(PrefixOp),
    Ternary,
    End,
    Noop(Closer),
}

impl ArithNode {
    pub(crate) fn lbp(&self) -> i32 {
        match self {
            ArithNode::Literal(_) | ArithNode::Variable(_) | ArithNode::Noop(_) => 0,
            ArithNode::Infix(op) => op.lbp(),
            ArithNode::InfixRight(op) => op.lbp(),
            ArithNode::InfixAssign(_) => ASSIGNMENT_BP,
            ArithNode::Prefix(PrefixOp::Group) => GROUP_BP,
            ArithNode::Prefix(PrefixOp::Complement) => COMPLEMENT_BP,
            ArithNode::Prefix(PrefixOp::Not) => NOT_BP,
            ArithNode::Ternary => TERNARY_BP,
            ArithNode::End => END_BP,
        }
    }
}

impl From<ArithToken> for ArithNode {
    fn from(token: ArithToken) -> Self {
        use ArithToken as T;
        match token {
            T::Number(n) => ArithNode::Literal(n),
            T::Name(name) => ArithNode::Variable(name),
            T::Plus => ArithNode::Infix(BinaryOp::Add),
            T::Minus => ArithNode::Infix(BinaryOp::Sub),
            T::Star => ArithNode::Infix(BinaryOp::Mul),
            T::Slash => ArithNode::Infix(BinaryOp::Div),
            T::Percent => ArithNode::Infix(BinaryOp::Rem),
            T::ShiftLeft => ArithNode::Infix(BinaryOp::Shl),
            T::ShiftRight => ArithNode::Infix(BinaryOp::Shr),
            T::Amp => ArithNode::Infix(BinaryOp::BitAnd),
            T::Caret => ArithNode::Infix(BinaryOp::BitXor),
            T::Pipe => ArithNode::Infix(BinaryOp::BitOr),
            T::Less => ArithNode::Infix(BinaryOp::Less),
            T::LessEq => ArithNode::Infix(BinaryOp::LessEq),
            T::Greater => ArithNode::Infix(BinaryOp::Greater),
            T::GreaterEq => ArithNode::Infix(BinaryOp::GreaterEq),
            T::EqEq => ArithNode::Infix(BinaryOp::Eq),
            T::NotEq => ArithNode::Infix(BinaryOp::NotEq),
            T::AndAnd => ArithNode::InfixRight(LogicalOp::And),
            T::OrOr => ArithNode::InfixRight(LogicalOp::Or),
            T::Assign => ArithNode::InfixAssign(None),
            T::StarAssign => ArithNode::InfixAssign(Some(BinaryOp::Mul)),
            T::SlashAssign => ArithNode::InfixAssign(Some(BinaryOp::Div)),
            T::PercentAssign => ArithNode::InfixAssign(Some(BinaryOp::Rem)),
            T::PlusAssign => ArithNode::InfixAssign(Some(BinaryOp::Add)),
            T::MinusAssign => ArithNode::InfixAssign(Some(BinaryOp::Sub)),
            T::ShiftLeftAssign => ArithNode::InfixAssign(Some(BinaryOp::Shl)),
            T::ShiftRightAssign => ArithNode::InfixAssign(Some(BinaryOp::Shr)),
            T::AmpAssign => ArithNode::InfixAssign(Some(BinaryOp::BitAnd)),
            T::CaretAssign => ArithNode::InfixAssign(Some(BinaryOp::BitXor)),
            T::PipeAssign => ArithNode::InfixAssign(Some(BinaryOp::BitOr)),
            T::Tilde => ArithNode::Prefix(PrefixOp::Complement),
            T::Bang => ArithNode::Prefix(PrefixOp::Not),
            T::LParen => ArithNode::Prefix(PrefixOp::Group),
            T::RParen => ArithNode::Noop(Closer::RightParen),
            T::Question => ArithNode::Ternary,
            T::Colon => ArithNode::Noop(Closer::Colon),
        }
    }
}

impl fmt::Display for ArithNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithNode::Literal(n) => write!(f, "{n}"),
            ArithNode::Variable(name) => f.write_str(name),
            ArithNode::Infix(op) => f.write_str(op.symbol()),
            ArithNode::InfixRight(LogicalOp::And) => f.write_str("&&"),
            ArithNode::InfixRight(LogicalOp::Or) => f.write_str("||"),
            ArithNode::InfixAssign(None) => f.write_str("="),
            ArithNode::InfixAssign(Some(op)) => write!(f, "{}=", op.symbol()),
            ArithNode::Prefix(PrefixOp::Complement) => f.write_str("~"),
            ArithNode::Prefix(PrefixOp::Not) => f.write_str("!"),
            ArithNode::Prefix(PrefixOp::Group) => f.write_str("("),
            ArithNode::Ternary => f.write_str("?"),
            ArithNode::End => f.write_str("end of expression"),
            ArithNode::Noop(Closer::RightParen) => f.write_str(")"),
            ArithNode::Noop(Closer::Colon) => f.write_str(":"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_power_ordering() {
        let order = [
            ArithNode::Prefix(PrefixOp::Group),
            ArithNode::Prefix(PrefixOp::Complement),
            ArithNode::Infix(BinaryOp::Mul),
            ArithNode::Infix(BinaryOp::Add),
            ArithNode::Infix(BinaryOp::Shl),
            ArithNode::Infix(BinaryOp::BitAnd),
            ArithNode::Infix(BinaryOp::BitXor),
            ArithNode::Infix(BinaryOp::BitOr),
            ArithNode::Infix(BinaryOp::Eq),
            ArithNode::Prefix(PrefixOp::Not),
            ArithNode::InfixRight(LogicalOp::And),
            ArithNode::InfixRight(LogicalOp::Or),
            ArithNode::Ternary,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].lbp() > pair[1].lbp(), "{} vs {}", pair[0], pair[1]);
        }
        assert_eq!(ArithNode::InfixAssign(None).lbp(), COMPARISON_BP);
        assert!(ArithNode::End.lbp() < 0);
    }

    #[test]
    fn shifts_mask_amount() {
        assert_eq!(BinaryOp::Shl.apply(1, 64).unwrap(), 1);
        assert_eq!(BinaryOp::Shl.apply(1, 65).unwrap(), 2);
        assert_eq!(BinaryOp::Shr.apply(-16, 2).unwrap(), -4);
        assert_eq!(BinaryOp::Shl.apply(1, -1).unwrap(), i64::MIN);
    }

    #[test]
    fn division_edges() {
        assert_eq!(BinaryOp::Div.apply(1, 0), Err(ArithError::DivisionByZero));
        assert_eq!(BinaryOp::Rem.apply(1, 0), Err(ArithError::DivisionByZero));
        assert_eq!(BinaryOp::Div.apply(i64::MIN, -1).unwrap(), i64::MIN);
        assert_eq!(BinaryOp::Div.apply(-7, 2).unwrap(), -3);
        assert_eq!(BinaryOp::Rem.apply(-7, 2).unwrap(), -1);
    }
}
