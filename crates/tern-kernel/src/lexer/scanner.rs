//! Character-level state machine producing raw lexical items.
//!
//! The scanner knows nothing about keywords, aliases or newline suppression;
//! those are applied by the consumer ([`super::TokenStream`]) at pull time.

use crate::ast::{Substitution, SUBSTITUTION_MARKER};

use super::token::{LexItem, Token};
use super::{LexError, LexResult, QuoteKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Word,
    SingleQuote,
    DoubleQuote,
    Substitution,
    BackQuote,
    Done,
}

/// Scanner over an owned input string.
///
/// Yields items left to right, ending with exactly one `Eof` item, or with
/// the first error.
#[derive(Debug)]
pub struct Scanner {
    input: String,
    pos: usize,
    line: usize,
    state: State,
    /// State to return to once a substitution or back-quote closes.
    resume: State,
    start_pos: usize,
    start_line: usize,
    /// Opening position and line of the double quote being scanned.
    quote_open: (usize, usize),
    buf: String,
    quoted: bool,
    subs: Vec<Substitution>,
}

impl Scanner {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            pos: 0,
            line: 1,
            state: State::Start,
            resume: State::Word,
            start_pos: 0,
            start_line: 1,
            quote_open: (0, 1),
            buf: String::new(),
            quoted: false,
            subs: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Consume the next character only if it is `c`.
    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn begin_token(&mut self) {
        self.start_pos = self.pos;
        self.start_line = self.line;
    }

    fn emit(&mut self, token: Token) -> LexItem {
        let mut item = LexItem::new(token, self.start_pos, self.start_line);
        item.value = std::mem::take(&mut self.buf);
        item.quoted = std::mem::take(&mut self.quoted);
        item.subs = std::mem::take(&mut self.subs);
        tracing::trace!(token = %item.token, pos = item.pos, line = item.line, "lex item");
        item
    }

    fn emit_operator(&mut self, token: Token, spelling: &str) -> LexItem {
        self.buf.push_str(spelling);
        self.emit(token)
    }

    fn push_sub(&mut self, sub: Substitution) {
        self.buf.push(SUBSTITUTION_MARKER);
        self.subs.push(sub);
    }

    fn start(&mut self) -> LexResult<Option<LexItem>> {
        loop {
            self.begin_token();
            let Some(c) = self.peek() else {
                self.state = State::Done;
                return Ok(Some(self.emit(Token::Eof)));
            };

            match c {
                ' ' | '\t' | SUBSTITUTION_MARKER => {
                    self.bump();
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '\\' if self.input[self.pos..].starts_with("\\\n") => {
                    self.bump();
                    self.bump();
                }
                '\n' => {
                    self.bump();
                    return Ok(Some(self.emit(Token::NewLine)));
                }
                '&' => {
                    self.bump();
                    let item = if self.eat('&') {
                        self.emit_operator(Token::And, "&&")
                    } else {
                        self.emit_operator(Token::Background, "&")
                    };
                    return Ok(Some(item));
                }
                '|' => {
                    self.bump();
                    let item = if self.eat('|') {
                        self.emit_operator(Token::Or, "||")
                    } else {
                        self.emit_operator(Token::Pipe, "|")
                    };
                    return Ok(Some(item));
                }
                ';' => {
                    self.bump();
                    let item = if self.eat(';') {
                        self.emit_operator(Token::EndCase, ";;")
                    } else {
                        self.emit_operator(Token::Semicolon, ";")
                    };
                    return Ok(Some(item));
                }
                '(' => {
                    self.bump();
                    return Ok(Some(self.emit_operator(Token::LeftParen, "(")));
                }
                ')' => {
                    self.bump();
                    return Ok(Some(self.emit_operator(Token::RightParen, ")")));
                }
                _ => {
                    self.state = State::Word;
                    return Ok(None);
                }
            }
        }
    }

    fn word(&mut self) -> LexResult<Option<LexItem>> {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\n' | ';' | '&' | '|' | '(' | ')' => break,
                '\\' => {
                    self.bump();
                    match self.bump() {
                        None => self.buf.push('\\'),
                        Some('\n') => {}
                        Some(escaped) => {
                            self.quoted = true;
                            self.buf.push(escaped);
                        }
                    }
                }
                '\'' => {
                    self.bump();
                    self.quoted = true;
                    self.state = State::SingleQuote;
                    return Ok(None);
                }
                '"' => {
                    self.quote_open = (self.pos, self.line);
                    self.bump();
                    self.quoted = true;
                    self.state = State::DoubleQuote;
                    return Ok(None);
                }
                '`' => {
                    self.bump();
                    self.resume = State::Word;
                    self.state = State::BackQuote;
                    return Ok(None);
                }
                '$' => {
                    self.bump();
                    self.resume = State::Word;
                    self.state = State::Substitution;
                    return Ok(None);
                }
                SUBSTITUTION_MARKER => {
                    self.bump();
                }
                other => {
                    self.bump();
                    self.buf.push(other);
                }
            }
        }

        self.state = State::Start;
        Ok(Some(self.emit(Token::Word)))
    }

    fn single_quote(&mut self) -> LexResult<Option<LexItem>> {
        let (pos, line) = (self.pos - 1, self.line);
        loop {
            match self.bump() {
                None => {
                    return Err(LexError::UnterminatedQuote {
                        quote: QuoteKind::Single,
                        pos,
                        line,
                    });
                }
                Some('\'') => {
                    self.state = State::Word;
                    return Ok(None);
                }
                Some(SUBSTITUTION_MARKER) => {}
                Some(c) => self.buf.push(c),
            }
        }
    }

    fn double_quote(&mut self) -> LexResult<Option<LexItem>> {
        loop {
            match self.bump() {
                None => {
                    let (pos, line) = self.quote_open;
                    return Err(LexError::UnterminatedQuote {
                        quote: QuoteKind::Double,
                        pos,
                        line,
                    });
                }
                Some('"') => {
                    self.state = State::Word;
                    return Ok(None);
                }
                Some('\\') => match self.peek() {
                    Some(c @ ('$' | '`' | '"' | '\\')) => {
                        self.bump();
                        self.buf.push(c);
                    }
                    Some('\n') => {
                        self.bump();
                    }
                    _ => self.buf.push('\\'),
                },
                Some('$') => {
                    self.resume = State::DoubleQuote;
                    self.state = State::Substitution;
                    return Ok(None);
                }
                Some('`') => {
                    self.resume = State::DoubleQuote;
                    self.state = State::BackQuote;
                    return Ok(None);
                }
                Some(SUBSTITUTION_MARKER) => {}
                Some(c) => self.buf.push(c),
            }
        }
    }

    /// Entered with the `$` already consumed.
    fn substitution(&mut self) -> LexResult<Option<LexItem>> {
        let (pos, line) = (self.pos - 1, self.line);
        let unterminated = LexError::UnterminatedSubstitution { pos, line };

        let sub = match self.peek() {
            Some('(') => {
                self.bump();
                if self.eat('(') {
                    Substitution::Arithmetic(self.scan_arithmetic().ok_or(unterminated)?)
                } else {
                    Substitution::Command(self.scan_command().ok_or(unterminated)?)
                }
            }
            Some('{') => {
                self.bump();
                let mut name = String::new();
                loop {
                    match self.bump() {
                        None => return Err(unterminated),
                        Some('}') => break,
                        Some(c) => name.push(c),
                    }
                }
                Substitution::Variable(name)
            }
            Some(c) if is_special_parameter(c) => {
                self.bump();
                Substitution::Variable(c.to_string())
            }
            Some(c) if c == '_' || c.is_ascii_alphabetic() => {
                let mut name = String::new();
                while let Some(c) = self.peek() {
                    if c != '_' && !c.is_ascii_alphanumeric() {
                        break;
                    }
                    self.bump();
                    name.push(c);
                }
                Substitution::Variable(name)
            }
            _ => {
                self.buf.push('$');
                self.state = self.resume;
                return Ok(None);
            }
        };

        self.push_sub(sub);
        self.state = self.resume;
        Ok(None)
    }

    /// Scan the body of `$(( ... ))`, consuming the closing `))`.
    fn scan_arithmetic(&mut self) -> Option<String> {
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            match self.bump()? {
                '(' => {
                    depth += 1;
                    text.push('(');
                }
                ')' if depth == 0 => {
                    return self.eat(')').then_some(text);
                }
                ')' => {
                    depth -= 1;
                    text.push(')');
                }
                c => text.push(c),
            }
        }
    }

    /// Scan the body of `$( ... )`, consuming the closing `)`.
    fn scan_command(&mut self) -> Option<String> {
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            let c = self.bump()?;
            match c {
                '\'' => {
                    text.push(c);
                    loop {
                        let q = self.bump()?;
                        text.push(q);
                        if q == '\'' {
                            break;
                        }
                    }
                }
                '"' => {
                    text.push(c);
                    loop {
                        let q = self.bump()?;
                        text.push(q);
                        if q == '\\' {
                            text.push(self.bump()?);
                        } else if q == '"' {
                            break;
                        }
                    }
                }
                '\\' => {
                    text.push(c);
                    text.push(self.bump()?);
                }
                '(' => {
                    depth += 1;
                    text.push(c);
                }
                ')' if depth == 0 => return Some(text),
                ')' => {
                    depth -= 1;
                    text.push(c);
                }
                _ => text.push(c),
            }
        }
    }

    /// Entered with the opening back-quote already consumed.
    fn back_quote(&mut self) -> LexResult<Option<LexItem>> {
        let (pos, line) = (self.pos - 1, self.line);
        let mut script = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(LexError::UnterminatedQuote {
                        quote: QuoteKind::Back,
                        pos,
                        line,
                    });
                }
                Some('`') => break,
                Some('\\') => match self.peek() {
                    Some(c @ ('`' | '\\' | '$')) => {
                        self.bump();
                        script.push(c);
                    }
                    _ => script.push('\\'),
                },
                Some(c) => script.push(c),
            }
        }

        self.push_sub(Substitution::Command(script));
        self.state = self.resume;
        Ok(None)
    }
}

fn is_special_parameter(c: char) -> bool {
    matches!(c, '?' | '#' | '$' | '!' | '@' | '*' | '-') || c.is_ascii_digit()
}

impl Iterator for Scanner {
    type Item = LexResult<LexItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = match self.state {
                State::Done => return None,
                State::Start => self.start(),
                State::Word => self.word(),
                State::SingleQuote => self.single_quote(),
                State::DoubleQuote => self.double_quote(),
                State::Substitution => self.substitution(),
                State::BackQuote => self.back_quote(),
            };
            match step {
                Ok(Some(item)) => return Some(Ok(item)),
                Ok(None) => continue,
                Err(err) => {
                    self.state = State::Done;
                    return Some(Err(err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(input: &str) -> Vec<LexItem> {
        Scanner::new(input)
            .collect::<LexResult<Vec<_>>>()
            .expect("scan should succeed")
    }

    fn tokens(input: &str) -> Vec<Token> {
        scan(input).into_iter().map(|i| i.token).collect()
    }

    #[test]
    fn ends_with_single_eof() {
        assert_eq!(tokens(""), vec![Token::Eof]);
        assert_eq!(tokens("   \t "), vec![Token::Eof]);
        let mut scanner = Scanner::new("x");
        assert!(scanner.next().is_some());
        assert!(scanner.next().is_some());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn positions_and_lines() {
        let items = scan("echo hi\n  foo");
        assert_eq!(items[0].pos, 0);
        assert_eq!(items[1].pos, 5);
        assert_eq!(items[2].token, Token::NewLine);
        assert_eq!(items[2].line, 1);
        assert_eq!(items[3].value, "foo");
        assert_eq!(items[3].pos, 10);
        assert_eq!(items[3].line, 2);
    }

    #[test]
    fn scanner_does_not_resolve_keywords() {
        assert_eq!(tokens("if"), vec![Token::Word, Token::Eof]);
    }

    #[test]
    fn line_continuation_counts_lines() {
        let items = scan("a \\\nb");
        assert_eq!(items[1].value, "b");
        assert_eq!(items[1].line, 2);
    }

    #[test]
    fn quoted_newlines_advance_line() {
        let items = scan("'a\nb' c");
        assert_eq!(items[0].value, "a\nb");
        assert_eq!(items[1].line, 2);
    }

    #[test]
    fn raw_marker_characters_are_dropped() {
        let items = scan("a\u{1}b '\u{1}'");
        assert_eq!(items[0].value, "ab");
        assert_eq!(items[1].value, "");
        assert!(items[0].subs.is_empty());
    }

    #[test]
    fn raw_marker_between_words_is_blank() {
        let items = scan("\u{1} x");
        assert_eq!(tokens("\u{1} x"), vec![Token::Word, Token::Eof]);
        assert_eq!(items[0].value, "x");
        assert_eq!(tokens("\u{1}"), vec![Token::Eof]);
        assert_eq!(tokens("a \u{1}\u{1} b"), vec![Token::Word, Token::Word, Token::Eof]);
    }

    #[test]
    fn nested_arithmetic_parens() {
        let items = scan("$(( (1+2)*3 ))");
        assert_eq!(
            items[0].subs,
            vec![Substitution::Arithmetic(" (1+2)*3 ".into())]
        );
    }

    #[test]
    fn command_substitution_respects_quotes() {
        let items = scan("$(echo ')' \"(\")");
        assert_eq!(
            items[0].subs,
            vec![Substitution::Command("echo ')' \"(\"".into())]
        );
    }
}
