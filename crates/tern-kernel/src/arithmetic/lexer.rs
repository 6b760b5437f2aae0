//! Token definitions for `$(( ))` bodies.

use logos::{Lexer, Logos};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ArithLexError {
    #[default]
    UnexpectedCharacter,
    InvalidNumber,
}

/// Arithmetic tokens.
///
/// Compound operators are listed as single tokens so the lexer's longest
/// match picks `<<=` over `<<` over `<`.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(error = ArithLexError)]
#[logos(skip r"[ \t\r\n]+")]
pub enum ArithToken {
    #[regex(r"[0-9][0-9A-Za-z_]*", parse_literal)]
    Number(i64),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    #[regex(r"\$[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice()[1..].to_string())]
    #[regex(r"\$\{[A-Za-z_][A-Za-z0-9_]*\}", |lex| {
        let s = lex.slice();
        s[2..s.len() - 1].to_string()
    })]
    Name(String),

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<<")]
    ShiftLeft,
    #[token(">>")]
    ShiftRight,
    #[token("&")]
    Amp,
    #[token("^")]
    Caret,
    #[token("|")]
    Pipe,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEq,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,

    #[token("=")]
    Assign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("<<=")]
    ShiftLeftAssign,
    #[token(">>=")]
    ShiftRightAssign,
    #[token("&=")]
    AmpAssign,
    #[token("^=")]
    CaretAssign,
    #[token("|=")]
    PipeAssign,

    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
}

fn parse_literal(lex: &mut Lexer<ArithToken>) -> Result<i64, ArithLexError> {
    parse_integer(lex.slice()).ok_or(ArithLexError::InvalidNumber)
}

/// Parse shell integer text: optional sign, then `0x` hex, leading-`0`
/// octal, or decimal. Surrounding whitespace is ignored.
pub(crate) fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.strip_prefix('+').unwrap_or(text)),
    };

    let (radix, digits) = if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        (16, hex)
    } else if unsigned.len() > 1 && unsigned.starts_with('0') {
        (8, &unsigned[1..])
    } else {
        (10, unsigned)
    };

    // from_str_radix would accept a second sign here.
    if !digits.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return None;
    }
    i64::from_str_radix(&format!("{sign}{digits}"), radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lex(input: &str) -> Vec<Result<ArithToken, ArithLexError>> {
        ArithToken::lexer(input).collect()
    }

    #[rstest]
    #[case::decimal("42", Some(42))]
    #[case::hex("0x1F", Some(31))]
    #[case::upper_hex("0XfF", Some(255))]
    #[case::octal("017", Some(15))]
    #[case::zero("0", Some(0))]
    #[case::negative("-12", Some(-12))]
    #[case::negative_hex("-0x10", Some(-16))]
    #[case::plus("+7", Some(7))]
    #[case::padded(" 9 ", Some(9))]
    #[case::min("-9223372036854775808", Some(i64::MIN))]
    #[case::bad_octal("08", None)]
    #[case::double_sign("--5", None)]
    #[case::words("abc", None)]
    #[case::overflow("9223372036854775808", None)]
    #[case::empty("", None)]
    fn integers(#[case] text: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_integer(text), expected);
    }

    #[test]
    fn longest_operator_wins() {
        assert_eq!(
            lex("a<<=1<<2<3"),
            vec![
                Ok(ArithToken::Name("a".into())),
                Ok(ArithToken::ShiftLeftAssign),
                Ok(ArithToken::Number(1)),
                Ok(ArithToken::ShiftLeft),
                Ok(ArithToken::Number(2)),
                Ok(ArithToken::Less),
                Ok(ArithToken::Number(3)),
            ]
        );
    }

    #[test]
    fn variable_spellings() {
        assert_eq!(
            lex("x $y ${z}"),
            vec![
                Ok(ArithToken::Name("x".into())),
                Ok(ArithToken::Name("y".into())),
                Ok(ArithToken::Name("z".into())),
            ]
        );
    }

    #[test]
    fn bad_literal_and_character() {
        assert_eq!(lex("12ab"), vec![Err(ArithLexError::InvalidNumber)]);
        assert_eq!(lex("@"), vec![Err(ArithLexError::UnexpectedCharacter)]);
    }
}
