//! Shell tokenizer.
//!
//! Splits shell text into [`LexItem`]s: words (with quoting removed and
//! substitutions recorded), operators and newlines. Scanning runs on a
//! producer thread that hands items to the consumer one at a time, so the
//! parser only pays for the tokens it actually pulls.
//!
//! ```text
//! echo "hi $USER" && ls   →   WORD(echo) WORD(hi \u{1}) AND WORD(ls) EOF
//! ```
//!
//! Keyword and alias resolution happen on the consumer side and can be
//! switched off between pulls through [`TokenStream::options`].

mod scanner;
mod stream;
mod token;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use scanner::Scanner;
pub use stream::{AliasHook, CancelHandle, TokenStream};
pub use token::{LexItem, Token, KEYWORDS};

/// Which quoting construct was left open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    Single,
    Double,
    Back,
}

impl fmt::Display for QuoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuoteKind::Single => "single",
            QuoteKind::Double => "double",
            QuoteKind::Back => "back",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated {quote} quote starting at line {line}")]
    UnterminatedQuote {
        quote: QuoteKind,
        pos: usize,
        line: usize,
    },
    #[error("unterminated substitution starting at line {line}")]
    UnterminatedSubstitution { pos: usize, line: usize },
}

impl LexError {
    /// Byte offset where the unterminated construct began.
    pub fn pos(&self) -> usize {
        match self {
            LexError::UnterminatedQuote { pos, .. }
            | LexError::UnterminatedSubstitution { pos, .. } => *pos,
        }
    }
}

pub type LexResult<T> = Result<T, LexError>;

/// Consumer-side switches, adjustable between pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexerOptions {
    /// Drop `NewLine` items instead of returning them.
    pub suppress_newlines: bool,
    /// Turn plain words spelled like reserved words into keyword tokens.
    pub resolve_keywords: bool,
    /// Offer plain words to the alias hook, if one is installed.
    pub resolve_aliases: bool,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self {
            suppress_newlines: false,
            resolve_keywords: true,
            resolve_aliases: true,
        }
    }
}

/// Start tokenizing `text` on a producer thread.
pub fn tokenize(text: impl Into<String>, options: LexerOptions) -> TokenStream {
    TokenStream::new(text, options)
}

/// Tokenize `text` completely, stopping at the first error.
///
/// The returned vector always ends with an `Eof` item.
pub fn tokenize_all(text: impl Into<String>, options: LexerOptions) -> LexResult<Vec<LexItem>> {
    tokenize(text, options).collect()
}
