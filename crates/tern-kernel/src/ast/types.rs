//! AST type definitions.

use std::fmt;

/// Placeholder character standing in for a pending substitution inside
/// [`Arg::raw`]. The tokenizer strips any literal occurrence from its input.
pub const SUBSTITUTION_MARKER: char = '\u{1}';

/// One pending substitution recorded by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Substitution {
    /// `$name`, `${name}`, or a special parameter such as `$?`.
    Variable(String),
    /// `$(( expr ))`; holds the expression text.
    Arithmetic(String),
    /// `$( script )` or `` `script` ``; holds the script text.
    Command(String),
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Substitution::Variable(name) => write!(f, "${{{name}}}"),
            Substitution::Arithmetic(expr) => write!(f, "$(({expr}))"),
            Substitution::Command(script) => write!(f, "$({script})"),
        }
    }
}

/// One shell word before expansion.
///
/// `raw` holds the literal text with one [`SUBSTITUTION_MARKER`] per entry in
/// `subs`, in the same left-to-right order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Arg {
    pub raw: String,
    pub subs: Vec<Substitution>,
}

impl Arg {
    /// A word with no substitutions.
    pub fn literal(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            subs: Vec::new(),
        }
    }

    /// A word with pending substitutions.
    ///
    /// Panics if the marker count in `raw` differs from `subs.len()`; that is
    /// a bug in whatever built the word.
    pub fn new(raw: impl Into<String>, subs: Vec<Substitution>) -> Self {
        let raw = raw.into();
        let markers = raw.matches(SUBSTITUTION_MARKER).count();
        assert_eq!(
            markers,
            subs.len(),
            "word has {markers} substitution markers but {} substitutions",
            subs.len()
        );
        Self { raw, subs }
    }

    /// True when expansion would return `raw` unchanged.
    pub fn is_literal(&self) -> bool {
        self.subs.is_empty()
    }
}

impl From<&str> for Arg {
    fn from(raw: &str) -> Self {
        Arg::literal(raw)
    }
}

/// `NAME=value` prefix of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub name: String,
    pub value: Arg,
}

impl Assignment {
    pub fn new(name: impl Into<String>, value: impl Into<Arg>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Split literal `NAME=value` text. Returns `None` if there is no `=` or
    /// the name is not a valid variable name.
    pub fn parse(text: &str) -> Option<Self> {
        let (name, value) = text.split_once('=')?;
        if !is_name(name) {
            return None;
        }
        Some(Self::new(name, value))
    }
}

/// True if `s` is a valid shell variable name.
pub fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// `&&` or `||` between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOp {
    And,
    Or,
}

/// `while` runs the body while the condition succeeds, `until` while it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    While,
    Until,
}

/// One link of an `if`/`elif`/`else` chain.
///
/// A link without a condition is the terminal `else`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub condition: Option<Box<ShellNode>>,
    pub body: Box<ShellNode>,
    pub else_branch: Option<Box<IfNode>>,
}

/// One `pattern | pattern ) body ;;` arm of a case statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    pub patterns: Vec<Arg>,
    pub body: ShellNode,
}

/// A simple command: prefix assignments followed by argument words.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandNode {
    pub assignments: Vec<Assignment>,
    pub args: Vec<Arg>,
    pub line: usize,
}

/// `a | b | c`, optionally followed by `&`.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineNode {
    pub stages: Vec<ShellNode>,
    pub background: bool,
}

/// An executable construct.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellNode {
    /// Sequence of nodes run in order.
    List(Vec<ShellNode>),
    /// `left && right` / `left || right`
    AndOr {
        op: ChainOp,
        left: Box<ShellNode>,
        right: Box<ShellNode>,
    },
    /// `! node`
    Negate(Box<ShellNode>),
    /// `while`/`until` loop.
    Loop {
        kind: LoopKind,
        condition: Box<ShellNode>,
        body: Box<ShellNode>,
    },
    /// `for var in items; do body; done`
    For {
        var: String,
        items: Vec<Arg>,
        body: Box<ShellNode>,
    },
    If(IfNode),
    /// `case subject in arms esac`
    Case { subject: Arg, arms: Vec<CaseArm> },
    Command(CommandNode),
    /// `(( expr ))`
    Arithmetic(String),
    Pipeline(PipelineNode),
    /// End of input.
    Eof,
}

impl ShellNode {
    /// Short name of the variant, for logs and errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ShellNode::List(_) => "list",
            ShellNode::AndOr { op: ChainOp::And, .. } => "and",
            ShellNode::AndOr { op: ChainOp::Or, .. } => "or",
            ShellNode::Negate(_) => "negate",
            ShellNode::Loop { kind: LoopKind::While, .. } => "while",
            ShellNode::Loop { kind: LoopKind::Until, .. } => "until",
            ShellNode::For { .. } => "for",
            ShellNode::If(_) => "if",
            ShellNode::Case { .. } => "case",
            ShellNode::Command(_) => "command",
            ShellNode::Arithmetic(_) => "arithmetic",
            ShellNode::Pipeline(_) => "pipeline",
            ShellNode::Eof => "eof",
        }
    }

    /// Command node with literal argument words and no assignments.
    pub fn command<I, A>(args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        ShellNode::Command(CommandNode {
            assignments: Vec::new(),
            args: args.into_iter().map(Into::into).collect(),
            line: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_parse() {
        let a = Assignment::parse("FOO=bar=baz").expect("valid assignment");
        assert_eq!(a.name, "FOO");
        assert_eq!(a.value, Arg::literal("bar=baz"));
        assert_eq!(Assignment::parse("1X=2"), None);
        assert_eq!(Assignment::parse("noequals"), None);
        assert_eq!(Assignment::parse("=x"), None);
    }

    #[test]
    fn names() {
        assert!(is_name("_x1"));
        assert!(is_name("PATH"));
        assert!(!is_name(""));
        assert!(!is_name("9a"));
        assert!(!is_name("a-b"));
    }

    #[test]
    #[should_panic(expected = "substitution markers")]
    fn arg_marker_mismatch_panics() {
        let _ = Arg::new("no markers", vec![Substitution::Variable("x".into())]);
    }

    #[test]
    fn substitution_display() {
        assert_eq!(Substitution::Variable("x".into()).to_string(), "${x}");
        assert_eq!(Substitution::Arithmetic("1+2".into()).to_string(), "$((1+2))");
        assert_eq!(Substitution::Command("ls".into()).to_string(), "$(ls)");
    }
}
