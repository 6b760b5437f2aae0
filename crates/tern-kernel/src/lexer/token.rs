//! Token model shared by the scanner and the token stream.

use std::fmt;

use crate::ast::{Arg, Substitution};

/// Lexical category of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Word,
    Eof,
    NewLine,

    // Operators
    /// `&&`
    And,
    /// `||`
    Or,
    /// `&`
    Background,
    /// `|`
    Pipe,
    /// `;`
    Semicolon,
    /// `;;`
    EndCase,
    LeftParen,
    RightParen,

    // Reserved words
    If,
    Then,
    Else,
    Elif,
    Fi,
    Do,
    Done,
    Case,
    Esac,
    While,
    Until,
    For,
    In,
    /// `!`
    Bang,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
}

/// Reserved words, matched exactly against unquoted plain words.
pub const KEYWORDS: &[(&str, Token)] = &[
    ("if", Token::If),
    ("then", Token::Then),
    ("else", Token::Else),
    ("elif", Token::Elif),
    ("fi", Token::Fi),
    ("do", Token::Do),
    ("done", Token::Done),
    ("case", Token::Case),
    ("esac", Token::Esac),
    ("while", Token::While),
    ("until", Token::Until),
    ("for", Token::For),
    ("in", Token::In),
    ("!", Token::Bang),
    ("{", Token::LeftBrace),
    ("}", Token::RightBrace),
];

impl Token {
    /// Look up the reserved word spelled `word`.
    pub fn keyword(word: &str) -> Option<Token> {
        KEYWORDS
            .iter()
            .find(|(spelling, _)| *spelling == word)
            .map(|(_, token)| *token)
    }

    /// True for reserved-word tokens.
    pub fn is_keyword(self) -> bool {
        KEYWORDS.iter().any(|(_, token)| *token == self)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Token::Word => "WORD",
            Token::Eof => "EOF",
            Token::NewLine => "NEWLINE",
            Token::And => "AND",
            Token::Or => "OR",
            Token::Background => "BACKGROUND",
            Token::Pipe => "PIPE",
            Token::Semicolon => "SEMI",
            Token::EndCase => "ENDCASE",
            Token::LeftParen => "LPAREN",
            Token::RightParen => "RPAREN",
            Token::If => "IF",
            Token::Then => "THEN",
            Token::Else => "ELSE",
            Token::Elif => "ELIF",
            Token::Fi => "FI",
            Token::Do => "DO",
            Token::Done => "DONE",
            Token::Case => "CASE",
            Token::Esac => "ESAC",
            Token::While => "WHILE",
            Token::Until => "UNTIL",
            Token::For => "FOR",
            Token::In => "IN",
            Token::Bang => "BANG",
            Token::LeftBrace => "LBRACE",
            Token::RightBrace => "RBRACE",
        };
        f.write_str(name)
    }
}

/// One token with its position and accumulated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexItem {
    pub token: Token,
    /// Byte offset of the token's first character.
    pub pos: usize,
    /// 1-based line on which the token starts.
    pub line: usize,
    /// Accumulated text. Empty for `Eof` and `NewLine`.
    pub value: String,
    /// Whether quoting or escaping occurred anywhere in the word.
    pub quoted: bool,
    /// Pending substitutions, one per marker in `value`.
    pub subs: Vec<Substitution>,
}

impl LexItem {
    pub fn new(token: Token, pos: usize, line: usize) -> Self {
        Self {
            token,
            pos,
            line,
            value: String::new(),
            quoted: false,
            subs: Vec::new(),
        }
    }

    /// True for a word that keyword and alias resolution may rewrite.
    pub fn is_plain_word(&self) -> bool {
        self.token == Token::Word && !self.quoted && self.subs.is_empty()
    }

    /// Convert a word item into an unexpanded argument.
    pub fn into_arg(self) -> Arg {
        Arg {
            raw: self.value,
            subs: self.subs,
        }
    }
}

impl fmt::Display for LexItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token {
            Token::Eof | Token::NewLine => write!(f, "{}", self.token),
            _ => write!(f, "{}({})", self.token, self.value.escape_debug()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup() {
        assert_eq!(Token::keyword("while"), Some(Token::While));
        assert_eq!(Token::keyword("!"), Some(Token::Bang));
        assert_eq!(Token::keyword("While"), None);
        assert_eq!(Token::keyword("echo"), None);
        assert!(Token::Esac.is_keyword());
        assert!(!Token::Word.is_keyword());
    }
}
