//! Top-down operator precedence parser that evaluates as it parses.

use std::ops::Range;

use logos::{Lexer, Logos};

use crate::interpreter::Scope;

use super::error::{ArithError, ArithResult};
use super::lexer::{parse_integer, ArithLexError, ArithToken};
use super::node::{
    truth, ArithNode, BinaryOp, Closer, PrefixOp, COMPLEMENT_BP, NOT_BP, UNARY_SIGN_BP,
};

/// Maximum recursion depth of `expression`.
/// Prevents stack overflow from inputs like `((((((...`.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parse state threaded through every `nud`/`led` call.
///
/// Assignments are recorded in `writes` and only reach the scope through
/// [`ArithParser::into_writes`]. Reads see the newest visible pending write
/// before falling back to `scope`.
pub(crate) struct ArithParser<'a, S: Scope + ?Sized> {
    lexer: Lexer<'a, ArithToken>,
    scope: &'a S,
    lookahead: ArithNode,
    writes: Vec<(String, i64)>,
    /// Ranges of `writes` made by a ternary's first branch, hidden from
    /// reads in its second branch.
    hidden: Vec<Range<usize>>,
    depth: usize,
}

impl<'a, S: Scope + ?Sized> ArithParser<'a, S> {
    pub(crate) fn new(input: &'a str, scope: &'a S) -> ArithResult<Self> {
        let mut parser = Self {
            lexer: ArithToken::lexer(input),
            scope,
            lookahead: ArithNode::End,
            writes: Vec::new(),
            hidden: Vec::new(),
            depth: 0,
        };
        parser.advance()?;
        Ok(parser)
    }

    /// Replace the lookahead with the next node, returning the old one.
    fn advance(&mut self) -> ArithResult<ArithNode> {
        let next = match self.lexer.next() {
            None => ArithNode::End,
            Some(Ok(token)) => ArithNode::from(token),
            Some(Err(ArithLexError::InvalidNumber)) => {
                return Err(ArithError::InvalidNumber(self.lexer.slice().to_string()));
            }
            Some(Err(ArithLexError::UnexpectedCharacter)) => {
                return Err(ArithError::UnknownToken {
                    text: self.lexer.slice().to_string(),
                    pos: self.lexer.span().start,
                });
            }
        };
        Ok(std::mem::replace(&mut self.lookahead, next))
    }

    fn consume(&mut self, closer: Closer) -> ArithResult<()> {
        let expected = ArithNode::Noop(closer);
        if self.lookahead != expected {
            return Err(ArithError::Expected {
                expected: format!("'{expected}'"),
                found: self.lookahead.to_string(),
            });
        }
        self.advance()?;
        Ok(())
    }

    pub(crate) fn expect_end(&self) -> ArithResult<()> {
        if self.lookahead != ArithNode::End {
            return Err(ArithError::Expected {
                expected: ArithNode::End.to_string(),
                found: self.lookahead.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn expression(&mut self, rbp: i32) -> ArithResult<i64> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ArithError::NestingTooDeep {
                max: MAX_NESTING_DEPTH,
            });
        }
        self.depth += 1;
        let result = self.expression_inner(rbp);
        self.depth -= 1;
        result
    }

    fn expression_inner(&mut self, rbp: i32) -> ArithResult<i64> {
        let node = self.advance()?;
        // Only a lone variable reference may be assigned to.
        let mut target = match &node {
            ArithNode::Variable(name) => Some(name.clone()),
            _ => None,
        };
        let mut left = self.nud(node)?;

        while rbp < self.lookahead.lbp() {
            let node = self.advance()?;
            left = self.led(node, left, target.take())?;
        }
        Ok(left)
    }

    fn nud(&mut self, node: ArithNode) -> ArithResult<i64> {
        match node {
            ArithNode::Literal(value) => Ok(value),
            ArithNode::Variable(name) => self.read(&name),
            ArithNode::Infix(BinaryOp::Add) => self.expression(UNARY_SIGN_BP),
            ArithNode::Infix(BinaryOp::Sub) => {
                Ok(self.expression(UNARY_SIGN_BP)?.wrapping_neg())
            }
            ArithNode::Prefix(PrefixOp::Complement) => Ok(!self.expression(COMPLEMENT_BP)?),
            ArithNode::Prefix(PrefixOp::Not) => Ok(truth(self.expression(NOT_BP)? == 0)),
            ArithNode::Prefix(PrefixOp::Group) => {
                let inner = self.expression(0)?;
                self.consume(Closer::RightParen)?;
                Ok(inner)
            }
            other => Err(ArithError::NoPrefixHandler {
                token: other.to_string(),
            }),
        }
    }

    fn led(&mut self, node: ArithNode, left: i64, target: Option<String>) -> ArithResult<i64> {
        match node {
            ArithNode::Infix(op) => {
                let right = self.expression(op.lbp())?;
                op.apply(left, right)
            }
            // Both sides are always evaluated.
            ArithNode::InfixRight(op) => {
                let right = self.expression(op.lbp() - 1)?;
                Ok(op.apply(left, right))
            }
            ArithNode::InfixAssign(op) => {
                let Some(name) = target else {
                    return Err(ArithError::AssignToNonVariable {
                        op: ArithNode::InfixAssign(op).to_string(),
                    });
                };
                let right = self.expression(0)?;
                let value = match op {
                    None => right,
                    Some(op) => op.apply(left, right)?,
                };
                tracing::trace!(%name, value, "arithmetic assignment staged");
                self.writes.push((name, value));
                Ok(value)
            }
            // Both branches are always evaluated, then one is selected.
            // The second branch does not see writes made by the first.
            ArithNode::Ternary => {
                let mark = self.writes.len();
                let if_true = self.expression(0)?;
                self.consume(Closer::Colon)?;
                self.hidden.push(mark..self.writes.len());
                let if_false = self.expression(0);
                self.hidden.pop();
                let if_false = if_false?;
                Ok(if left != 0 { if_true } else { if_false })
            }
            other => Err(ArithError::NoInfixHandler {
                token: other.to_string(),
            }),
        }
    }

    /// Absent and empty variables read as zero.
    fn read(&self, name: &str) -> ArithResult<i64> {
        let pending = self
            .writes
            .iter()
            .enumerate()
            .rev()
            .filter(|(index, _)| !self.hidden.iter().any(|range| range.contains(index)))
            .find(|(_, (written, _))| written == name);
        if let Some((_, (_, value))) = pending {
            return Ok(*value);
        }

        match self.scope.get(name) {
            None => Ok(0),
            Some(value) if value.trim().is_empty() => Ok(0),
            Some(value) => parse_integer(value).ok_or_else(|| ArithError::NotANumber {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub(crate) fn into_writes(self) -> Vec<(String, i64)> {
        self.writes
    }
}
