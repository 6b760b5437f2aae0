//! Glob pattern matching for case statements.
//!
//! Implements the POSIX shell pattern notation:
//! - `*` matches zero or more characters
//! - `?` matches exactly one character
//! - `[abc]` matches any character in the set
//! - `[a-z]` matches any character in the range
//! - `[!abc]` or `[^abc]` matches any character NOT in the set
//! - `\c` matches the character `c` literally

use std::cell::Cell;

/// Maximum number of recursive calls for one match. Patterns like
/// `*a*a*a*...*a` backtrack in O(n^k); past this budget the match fails.
pub const MAX_MATCH_CALLS: usize = 100_000;

/// Match a string against a glob pattern.
///
/// Returns true if the pattern matches the entire input string.
///
/// # Examples
/// ```
/// use tern_glob::glob_match;
///
/// assert!(glob_match("*.rs", "main.rs"));
/// assert!(glob_match("test?", "test1"));
/// assert!(glob_match("[abc]", "b"));
/// assert!(!glob_match("*.txt", "main.rs"));
/// ```
pub fn glob_match(pattern: &str, input: &str) -> bool {
    let pat_chars: Vec<char> = pattern.chars().collect();
    let input_chars: Vec<char> = input.chars().collect();
    let calls = Cell::new(0usize);
    match_bounded(&pat_chars, 0, &input_chars, 0, &calls)
}

/// Work-bounded recursive matching with backtracking for `*`.
fn match_bounded(
    pattern: &[char],
    pi: usize,
    input: &[char],
    ii: usize,
    calls: &Cell<usize>,
) -> bool {
    let count = calls.get() + 1;
    calls.set(count);
    if count > MAX_MATCH_CALLS {
        return false;
    }

    if pi >= pattern.len() {
        return ii >= input.len();
    }

    match pattern[pi] {
        '*' => {
            let mut next_pi = pi;
            while next_pi < pattern.len() && pattern[next_pi] == '*' {
                next_pi += 1;
            }
            if next_pi >= pattern.len() {
                return true;
            }
            (ii..=input.len()).any(|start| match_bounded(pattern, next_pi, input, start, calls))
        }

        '?' => ii < input.len() && match_bounded(pattern, pi + 1, input, ii + 1, calls),

        '[' => {
            if ii >= input.len() {
                return false;
            }
            match parse_char_class(&pattern[pi..], input[ii]) {
                Some((true, len)) => match_bounded(pattern, pi + len, input, ii + 1, calls),
                Some((false, _)) => false,
                // Unclosed bracket is an ordinary character.
                None => input[ii] == '[' && match_bounded(pattern, pi + 1, input, ii + 1, calls),
            }
        }

        '\\' if pi + 1 < pattern.len() => {
            ii < input.len()
                && pattern[pi + 1] == input[ii]
                && match_bounded(pattern, pi + 2, input, ii + 1, calls)
        }

        c => ii < input.len() && c == input[ii] && match_bounded(pattern, pi + 1, input, ii + 1, calls),
    }
}

/// Parse a character class `[...]` at the start of `pattern` and test `ch`.
///
/// Returns `(matched, consumed_len)`, or `None` when the bracket never closes.
fn parse_char_class(pattern: &[char], ch: char) -> Option<(bool, usize)> {
    let mut idx = 1;
    let mut negate = false;

    if idx < pattern.len() && (pattern[idx] == '!' || pattern[idx] == '^') {
        negate = true;
        idx += 1;
    }

    // `]` directly after the opening (or negation) is literal.
    let first = idx;
    let mut matched = false;

    while idx < pattern.len() {
        let c = pattern[idx];

        if c == ']' && idx > first {
            return Some((matched != negate, idx + 1));
        }

        if idx + 2 < pattern.len() && pattern[idx + 1] == '-' && pattern[idx + 2] != ']' {
            if (c..=pattern[idx + 2]).contains(&ch) {
                matched = true;
            }
            idx += 3;
            continue;
        }

        if c == ch {
            matched = true;
        }
        idx += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_matches() {
        assert!(glob_match("hello", "hello"));
        assert!(glob_match("", ""));
        assert!(!glob_match("hello", "world"));
        assert!(!glob_match("hello", "hell"));
        assert!(!glob_match("hello", "helloo"));
    }

    #[test]
    fn star_wildcard() {
        assert!(glob_match("*", ""));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("*.rs", "main.rs"));
        assert!(glob_match("*.rs", ".rs"));
        assert!(glob_match("a*b*c", "aXXXbYYYc"));
        assert!(!glob_match("*.rs", "main.txt"));
        assert!(!glob_match("test*", "mytest"));
    }

    #[test]
    fn question_wildcard() {
        assert!(glob_match("?", "a"));
        assert!(glob_match("test?", "test1"));
        assert!(!glob_match("?", ""));
        assert!(!glob_match("???", "ab"));
    }

    #[test]
    fn char_classes() {
        assert!(glob_match("[abc]", "b"));
        assert!(!glob_match("[abc]", "d"));
        assert!(glob_match("[a-z]", "m"));
        assert!(!glob_match("[a-z]", "A"));
        assert!(glob_match("[!abc]", "d"));
        assert!(glob_match("[^abc]", "d"));
        assert!(!glob_match("[!abc]", "a"));
        assert!(glob_match("[]x]", "]"));
    }

    #[test]
    fn unclosed_bracket_is_literal() {
        assert!(glob_match("[abc", "[abc"));
        assert!(!glob_match("[abc", "a"));
    }

    #[test]
    fn escaped_metacharacters() {
        assert!(glob_match("\\*", "*"));
        assert!(glob_match("test\\?", "test?"));
        assert!(!glob_match("\\*", "a"));
    }

    #[test]
    fn braces_are_not_special() {
        assert!(glob_match("{a,b}", "{a,b}"));
        assert!(!glob_match("{a,b}", "a"));
    }

    #[test]
    fn case_statement_patterns() {
        assert!(glob_match("[Yy]*", "Yes"));
        assert!(glob_match("[Yy]*", "y"));
        assert!(!glob_match("[Yy]*", "no"));
        assert!(glob_match("*", "anything"));
    }

    #[test]
    fn pathological_pattern_is_bounded() {
        let pattern = "*a".repeat(30) + "b";
        let input = "a".repeat(60);
        assert!(!glob_match(&pattern, &input));
    }

    #[test]
    fn multibyte_characters() {
        assert!(glob_match("?", "é"));
        assert!(glob_match("caf?", "café"));
        assert!(glob_match("[é]", "é"));
    }
}
