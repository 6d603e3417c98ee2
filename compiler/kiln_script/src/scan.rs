//! Lightweight token scans over raw submission text.
//!
//! These run on text that may not parse (partial input, candidate edits),
//! so they only look at token sequences and never fail.

use crate::lexer::{lex, Token};

/// Module paths named by `use` statements, in first-seen order, deduplicated.
pub fn scan_imports(text: &str) -> Vec<String> {
    let tokens = lex(text).tokens;
    let mut imports: Vec<String> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].0 != Token::Use {
            i += 1;
            continue;
        }
        i += 1;
        let mut segments = Vec::new();
        while let Some((Token::Ident, span)) = tokens.get(i) {
            segments.push(&text[span.clone()]);
            i += 1;
            if tokens.get(i).map(|(t, _)| *t) == Some(Token::Dot)
                && tokens.get(i + 1).map(|(t, _)| *t) == Some(Token::Ident)
            {
                i += 1;
            } else {
                break;
            }
        }
        if !segments.is_empty() {
            let path = segments.join(".");
            if !imports.contains(&path) {
                imports.push(path);
            }
        }
    }
    imports
}

/// Names introduced by `let`, in first-seen order, deduplicated.
pub fn declared_bindings(text: &str) -> Vec<String> {
    let tokens = lex(text).tokens;
    let mut names: Vec<String> = Vec::new();
    for pair in tokens.windows(2) {
        if let [(Token::Let, _), (Token::Ident, span)] = pair {
            let name = &text[span.clone()];
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}
