//! Tokenizer for the configuration dialect.
//!
//! Raw tokens come from a logos lexer. A layout pass then turns physical
//! newlines into logical `Newline`/`Indent`/`Dedent` tokens the way the
//! dialect's indentation rules require: newlines inside brackets are dropped,
//! blank and comment-only lines produce nothing.

use logos::{Lexer, Logos};
use std::ops::Range;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f\r]+")]
#[logos(skip r"#[^\n]*")]
#[logos(skip r"\\\r?\n")]
pub enum Token {
    #[token("\n")]
    Newline,
    /// Produced by the layout pass only.
    Indent,
    /// Produced by the layout pass only.
    Dedent,
    /// Produced by the layout pass only.
    Eof,

    // Keywords
    #[token("and")]
    And,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("def")]
    Def,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("if")]
    If,
    #[token("in")]
    In,
    #[token("lambda")]
    Lambda,
    #[token("load")]
    Load,
    #[token("not")]
    Not,
    #[token("or")]
    Or,
    #[token("pass")]
    Pass,
    #[token("return")]
    Return,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// `None` when the literal does not fit in 64 bits.
    #[regex(r"[0-9]+", |lex| Some(lex.slice().parse::<i64>().ok()))]
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| Some(i64::from_str_radix(&lex.slice()[2..], 16).ok()))]
    #[regex(r"0[oO][0-7]+", |lex| Some(i64::from_str_radix(&lex.slice()[2..], 8).ok()))]
    Int(Option<i64>),

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r#"([rR][bB]?|[bB][rR]?)?["']"#, lex_string)]
    Str(String),

    // Brackets
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    // Punctuation
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token("->")]
    Arrow,

    // Operators
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("//=")]
    SlashSlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("&=")]
    AmpAssign,
    #[token("|=")]
    PipeAssign,
    #[token("^=")]
    CaretAssign,
    #[token("<<=")]
    ShlAssign,
    #[token(">>=")]
    ShrAssign,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    #[token("/")]
    Slash,
    #[token("//")]
    SlashSlash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
}

impl Token {
    fn opens_bracket(&self) -> bool {
        matches!(self, Token::LParen | Token::LBracket | Token::LBrace)
    }

    fn closes_bracket(&self) -> bool {
        matches!(self, Token::RParen | Token::RBracket | Token::RBrace)
    }
}

/// A token together with its byte range in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

/// Tokenization failure at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub offset: usize,
    pub message: String,
}

/// Tokenize `source` into a layout-resolved token stream ending in `Eof`.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, LexError> {
    let mut out: Vec<Spanned> = Vec::new();
    let mut indents: Vec<usize> = vec![0];
    let mut depth = 0usize;
    let mut at_line_start = true;

    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let token = match result {
            Ok(token) => token,
            Err(()) => return Err(describe_error(source, span.start)),
        };

        if token == Token::Newline {
            if depth == 0 && !at_line_start {
                out.push(Spanned { token, span });
                at_line_start = true;
            }
            continue;
        }

        if at_line_start && depth == 0 {
            let column = indentation_of(source, span.start);
            let current = indents.last().copied().unwrap_or(0);
            if column > current {
                indents.push(column);
                out.push(Spanned { token: Token::Indent, span: span.start..span.start });
            } else {
                while column < indents.last().copied().unwrap_or(0) {
                    indents.pop();
                    out.push(Spanned { token: Token::Dedent, span: span.start..span.start });
                }
                if column != indents.last().copied().unwrap_or(0) {
                    return Err(LexError {
                        offset: span.start,
                        message: "unindent does not match any outer indentation level".to_string(),
                    });
                }
            }
            at_line_start = false;
        }

        if token.opens_bracket() {
            depth += 1;
        } else if token.closes_bracket() {
            depth = depth.saturating_sub(1);
        }
        out.push(Spanned { token, span });
    }

    let end = source.len();
    if !at_line_start {
        out.push(Spanned { token: Token::Newline, span: end..end });
    }
    for _ in 1..indents.len() {
        out.push(Spanned { token: Token::Dedent, span: end..end });
    }
    out.push(Spanned { token: Token::Eof, span: end..end });
    Ok(out)
}

/// Visual column of `offset`, counting tabs to the next multiple of 8.
fn indentation_of(source: &str, offset: usize) -> usize {
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    source[line_start..offset].chars().fold(0, |col, c| match c {
        '\t' => (col / 8 + 1) * 8,
        '\x0c' => 0,
        _ => col + 1,
    })
}

fn describe_error(source: &str, offset: usize) -> LexError {
    let rest = &source[offset..];
    let message = match rest.chars().next() {
        Some('"' | '\'' | 'r' | 'R' | 'b' | 'B') if rest.contains(&['"', '\''][..]) => {
            "unterminated string literal".to_string()
        }
        Some(c) if c.is_ascii_digit() => "invalid numeric literal".to_string(),
        Some(c) => format!("unexpected character {:?}", c),
        None => "unexpected end of input".to_string(),
    };
    LexError { offset, message }
}

/// Scan the body of a string literal whose prefix and opening quote were just
/// matched. Handles triple quotes; raw strings keep their backslashes.
fn lex_string(lex: &mut Lexer<Token>) -> Option<String> {
    let prefix = lex.slice();
    let quote = prefix.chars().last()?;
    let raw = prefix.contains(&['r', 'R'][..]);
    let rest = lex.remainder();

    let single = quote.to_string();
    let tripled = single.repeat(3);
    let triple = rest.starts_with(&single.repeat(2));
    let (delim, body_start) = if triple { (tripled.as_str(), 2) } else { (single.as_str(), 0) };

    let body = &rest[body_start..];
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
            continue;
        }
        if c == '\n' && !triple {
            return None;
        }
        if c == quote && body[i..].starts_with(delim) {
            let text = &body[..i];
            let value = if raw { text.to_string() } else { unescape(text) };
            let consumed = body_start + i + delim.len();
            lex.bump(consumed);
            return Some(value);
        }
    }
    None
}

/// Decode backslash escapes. Unknown escapes are kept verbatim.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            None => out.push('\\'),
            Some('\n') => {}
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\x0b'),
            Some(d @ '0'..='7') => {
                let mut value = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(v) => {
                            value = value * 8 + v;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.extend(char::from_u32(value));
            }
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.clone().take(width).collect();
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if digits.len() == width => {
                        out.push(decoded);
                        for _ in 0..width {
                            chars.next();
                        }
                    }
                    _ => {
                        out.push('\\');
                        out.push(kind);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn simple_assignment() {
        assert_eq!(
            tokens("x = 1\n"),
            vec![
                Token::Ident("x".into()),
                Token::Assign,
                Token::Int(Some(1)),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn keywords_take_priority_over_identifiers() {
        assert_eq!(
            tokens("def define"),
            vec![Token::Def, Token::Ident("define".into()), Token::Newline, Token::Eof]
        );
    }

    #[test]
    fn indentation_produces_indent_and_dedent() {
        let toks = tokens("def f():\n  pass\nx = 1\n");
        assert_eq!(
            toks,
            vec![
                Token::Def,
                Token::Ident("f".into()),
                Token::LParen,
                Token::RParen,
                Token::Colon,
                Token::Newline,
                Token::Indent,
                Token::Pass,
                Token::Newline,
                Token::Dedent,
                Token::Ident("x".into()),
                Token::Assign,
                Token::Int(Some(1)),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn newlines_inside_brackets_are_ignored() {
        let toks = tokens("x = [\n  1,\n  2,\n]\n");
        assert!(!toks.contains(&Token::Indent));
        assert_eq!(toks.iter().filter(|t| **t == Token::Newline).count(), 1);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let toks = tokens("# header\n\nx = 1  # trailing\n\n   # indented comment\ny = 2\n");
        assert!(!toks.contains(&Token::Indent));
        assert_eq!(toks.iter().filter(|t| **t == Token::Newline).count(), 2);
    }

    #[test]
    fn triple_quoted_string_spans_lines() {
        let toks = tokens("\"\"\"Summary.\n\nMore.\"\"\"\n");
        assert_eq!(toks[0], Token::Str("Summary.\n\nMore.".into()));
    }

    #[test]
    fn string_escapes() {
        let toks = tokens(r#"'a\'b' "c\n\x41" r"\d""#);
        assert_eq!(toks[0], Token::Str("a'b".into()));
        assert_eq!(toks[1], Token::Str("c\nA".into()));
        assert_eq!(toks[2], Token::Str("\\d".into()));
    }

    #[test]
    fn empty_string_is_not_triple_quoted() {
        let toks = tokens("x = \"\"\n");
        assert_eq!(toks[2], Token::Str(String::new()));
    }

    #[test]
    fn numeric_literals() {
        let toks = tokens("10 0x1F 0o17 1.5");
        assert_eq!(&toks[..4], &[Token::Int(Some(10)), Token::Int(Some(31)), Token::Int(Some(15)), Token::Float(1.5)]);
    }

    #[test]
    fn oversized_integer_has_no_value() {
        let toks = tokens("MAX = 18446744073709551615\n");
        assert_eq!(toks[2], Token::Int(None));
        assert_eq!(tokens("0xFFFFFFFFFFFFFFFFFF")[0], Token::Int(None));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = tokenize("x = \"abc\n").unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
        assert_eq!(err.offset, 4);
    }

    #[test]
    fn inconsistent_dedent_is_an_error() {
        let err = tokenize("def f():\n    pass\n  pass\n").unwrap_err();
        assert!(err.message.contains("unindent"));
    }
}
