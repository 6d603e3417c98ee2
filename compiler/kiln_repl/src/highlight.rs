//! Classified spans for syntax highlighting.
//!
//! Classification is lexical plus one semantic step: in a dotted path, the
//! longest prefix that names a module or namespace known to the document's
//! project is highlighted as a module. Everything after a `use` is a module
//! path regardless of what the project knows.

use std::fmt;

use kiln_script::lexer::{lex, Span, Token};
use kiln_script::ModuleTable;

use crate::workspace::AnalysisDocument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HighlightKind {
    Keyword,
    Identifier,
    Module,
    Number,
    String,
    Operator,
    Punctuation,
    Directive,
    Comment,
}

impl fmt::Display for HighlightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HighlightKind::Keyword => "keyword",
            HighlightKind::Identifier => "identifier",
            HighlightKind::Module => "module",
            HighlightKind::Number => "number",
            HighlightKind::String => "string",
            HighlightKind::Operator => "operator",
            HighlightKind::Punctuation => "punctuation",
            HighlightKind::Directive => "directive",
            HighlightKind::Comment => "comment",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightSpan {
    pub span: Span,
    pub kind: HighlightKind,
}

/// Spans for the document text, in source order. Unlexable text is skipped.
pub fn highlight(document: &AnalysisDocument) -> Vec<HighlightSpan> {
    let text = document.text();
    let modules = document.project().modules();
    let tokens = lex(text).tokens;

    let mut spans = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let (token, span) = &tokens[i];
        if *token == Token::Ident {
            let after_use = i > 0 && tokens[i - 1].0 == Token::Use;
            i = classify_path(text, &tokens, i, modules, after_use, &mut spans);
            continue;
        }
        spans.push(HighlightSpan {
            span: span.clone(),
            kind: lexical_kind(*token),
        });
        i += 1;
    }
    spans
}

fn lexical_kind(token: Token) -> HighlightKind {
    match token {
        Token::Comment => HighlightKind::Comment,
        Token::Directive => HighlightKind::Directive,
        Token::Int => HighlightKind::Number,
        Token::Str => HighlightKind::String,
        Token::Ident => HighlightKind::Identifier,
        token if token.is_keyword() => HighlightKind::Keyword,
        token if token.is_operator() => HighlightKind::Operator,
        _ => HighlightKind::Punctuation,
    }
}

/// Classify the dotted path starting at `start`; returns the index after it.
fn classify_path(
    text: &str,
    tokens: &[(Token, Span)],
    start: usize,
    modules: &ModuleTable,
    after_use: bool,
    spans: &mut Vec<HighlightSpan>,
) -> usize {
    // Identifier token indices of `a.b.c`.
    let mut segments = vec![start];
    let mut end = start + 1;
    while end + 1 < tokens.len() && tokens[end].0 == Token::Dot && tokens[end + 1].0 == Token::Ident {
        segments.push(end + 1);
        end += 2;
    }

    let module_segments = if after_use {
        segments.len()
    } else {
        let mut path = String::new();
        let mut longest = 0;
        for (count, &index) in segments.iter().enumerate() {
            if count > 0 {
                path.push('.');
            }
            path.push_str(&text[tokens[index].1.clone()]);
            if modules.is_namespace(&path) {
                longest = count + 1;
            }
        }
        longest
    };

    for index in start..end {
        let (token, span) = &tokens[index];
        let kind = match segments.iter().position(|&s| s == index) {
            Some(segment) if segment < module_segments => HighlightKind::Module,
            Some(_) => HighlightKind::Identifier,
            None => lexical_kind(*token),
        };
        spans.push(HighlightSpan {
            span: span.clone(),
            kind,
        });
    }
    end
}
