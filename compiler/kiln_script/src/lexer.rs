//! Tokenizer.
//!
//! Tokens carry no payload; consumers slice the source with the token span.
//! Comments and directive markers are real tokens so highlighting can see
//! them; the parser skips comments and rejects directives.

use std::ops::Range;

use logos::Logos;

/// Byte range into the source.
pub type Span = Range<usize>;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[regex(r"//[^\n]*")]
    Comment,

    /// `#r` and friends. Only meaningful to the evaluator.
    #[regex(r"#[A-Za-z]+")]
    Directive,

    #[token("let")]
    Let,
    #[token("use")]
    Use,
    #[token("true")]
    True,
    #[token("false")]
    False,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(";")]
    Semi,
    #[token("=")]
    Eq,

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
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,

    #[regex(r"[0-9]+")]
    Int,

    // No unescaped newlines inside strings.
    #[regex(r#""([^"\\\n\r]|\\.)*""#)]
    Str,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

impl Token {
    pub fn is_keyword(self) -> bool {
        matches!(self, Token::Let | Token::Use | Token::True | Token::False)
    }

    pub fn is_operator(self) -> bool {
        matches!(
            self,
            Token::Eq
                | Token::Plus
                | Token::Minus
                | Token::Star
                | Token::Slash
                | Token::Percent
                | Token::EqEq
                | Token::NotEq
                | Token::Lt
                | Token::LtEq
                | Token::Gt
                | Token::GtEq
                | Token::AndAnd
                | Token::OrOr
                | Token::Bang
        )
    }
}

/// Output of [`lex`]: tokens plus the spans logos could not match.
#[derive(Debug, Default)]
pub struct LexOutput {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<Span>,
}

/// Tokenize `source`, collecting unmatched spans instead of stopping.
pub fn lex(source: &str) -> LexOutput {
    let mut output = LexOutput::default();
    for (token, span) in Token::lexer(source).spanned() {
        match token {
            Ok(token) => output.tokens.push((token, span)),
            Err(()) => output.errors.push(span),
        }
    }
    output
}

/// Decode the contents of a string literal token (quotes included).
pub fn unescape(literal: &str) -> String {
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
