//! Recursive descent parser with precedence climbing for binary operators.
//!
//! ```text
//! script := (stmt? ';')* stmt?
//! stmt   := 'let' IDENT '=' expr | 'use' path | expr
//! expr   := unary (BINOP unary)*
//! unary  := ('-' | '!') unary | atom
//! atom   := INT | STR | 'true' | 'false' | '(' expr ')'
//!         | IDENT '(' args ')' | path
//! path   := IDENT ('.' IDENT)*
//! ```
//!
//! The first error stops parsing.

use crate::ast::{BinaryOp, Expr, ExprKind, Literal, Script, Stmt, StmtKind, UnaryOp};
use crate::error::{CompileError, Position};
use crate::lexer::{lex, unescape, Span, Token};
use crate::stack::ensure_sufficient_stack;

/// Parse a whole submission.
pub fn parse(source: &str) -> Result<Script, CompileError> {
    let output = lex(source);
    if let Some(span) = output.errors.first() {
        let text = &source[span.clone()];
        return Err(CompileError::single(
            Position::of(source, span.start),
            format!("unexpected character '{text}'"),
        ));
    }
    let tokens = output
        .tokens
        .into_iter()
        .filter(|(token, _)| *token != Token::Comment)
        .collect();
    Parser {
        source,
        tokens,
        pos: 0,
    }
    .script()
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

/// Binding power of a binary operator token; higher binds tighter.
fn binary_op(token: Token) -> Option<(BinaryOp, u8)> {
    let op = match token {
        Token::OrOr => (BinaryOp::Or, 1),
        Token::AndAnd => (BinaryOp::And, 2),
        Token::EqEq => (BinaryOp::Eq, 3),
        Token::NotEq => (BinaryOp::NotEq, 3),
        Token::Lt => (BinaryOp::Lt, 4),
        Token::LtEq => (BinaryOp::LtEq, 4),
        Token::Gt => (BinaryOp::Gt, 4),
        Token::GtEq => (BinaryOp::GtEq, 4),
        Token::Plus => (BinaryOp::Add, 5),
        Token::Minus => (BinaryOp::Sub, 5),
        Token::Star => (BinaryOp::Mul, 6),
        Token::Slash => (BinaryOp::Div, 6),
        Token::Percent => (BinaryOp::Rem, 6),
        _ => return None,
    };
    Some(op)
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(token, _)| *token)
    }

    fn span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, span)) => span.clone(),
            None => self.source.len()..self.source.len(),
        }
    }

    fn text(&self, span: &Span) -> &'src str {
        &self.source[span.clone()]
    }

    fn bump(&mut self) -> Span {
        let span = self.span();
        self.pos += 1;
        span
    }

    fn eat(&mut self, token: Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::single(Position::of(self.source, self.span().start), message)
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        match self.peek() {
            None => self.error(format!("expected {expected}, found end of input")),
            Some(Token::Directive) => {
                let span = self.span();
                self.error(format!("unknown directive '{}'", self.text(&span)))
            }
            Some(_) => {
                let span = self.span();
                self.error(format!("expected {expected}, found '{}'", self.text(&span)))
            }
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<Span, CompileError> {
        if self.peek() == Some(token) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn script(mut self) -> Result<Script, CompileError> {
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            if self.eat(Token::Semi) {
                continue;
            }
            let mut stmt = self.stmt()?;
            stmt.terminated = self.eat(Token::Semi);
            if !stmt.terminated && self.peek().is_some() {
                return Err(self.unexpected("';'"));
            }
            stmts.push(stmt);
        }
        Ok(Script { stmts })
    }

    fn stmt(&mut self) -> Result<Stmt, CompileError> {
        let start = self.span().start;
        let kind = match self.peek() {
            Some(Token::Let) => {
                self.bump();
                let name_span = self.expect(Token::Ident, "a binding name")?;
                let name = self.text(&name_span).to_string();
                self.expect(Token::Eq, "'='")?;
                let value = self.expr(0)?;
                StmtKind::Let { name, value }
            }
            Some(Token::Use) => {
                self.bump();
                let (path, _) = self.path()?;
                StmtKind::Use(path)
            }
            _ => StmtKind::Expr(self.expr(0)?),
        };
        let end = self.tokens[..self.pos]
            .last()
            .map_or(start, |(_, span)| span.end);
        Ok(Stmt {
            kind,
            span: start..end,
            terminated: false,
        })
    }

    fn expr(&mut self, min_power: u8) -> Result<Expr, CompileError> {
        ensure_sufficient_stack(|| self.expr_inner(min_power))
    }

    fn expr_inner(&mut self, min_power: u8) -> Result<Expr, CompileError> {
        let mut lhs = self.unary()?;
        while let Some((op, power)) = self.peek().and_then(binary_op) {
            if power <= min_power {
                break;
            }
            self.bump();
            let rhs = self.expr(power)?;
            let span = lhs.span.start..rhs.span.end;
            lhs = Expr {
                kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
                span,
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        ensure_sufficient_stack(|| self.unary_inner())
    }

    fn unary_inner(&mut self) -> Result<Expr, CompileError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Bang) => UnaryOp::Not,
            _ => return self.atom(),
        };
        let start = self.bump().start;

        // `-9223372036854775808` is only representable as a negated literal.
        if op == UnaryOp::Neg && self.peek() == Some(Token::Int) {
            let span = self.span();
            if let Ok(value) = format!("-{}", self.text(&span)).parse::<i64>() {
                self.bump();
                return Ok(Expr {
                    kind: ExprKind::Literal(Literal::Int(value)),
                    span: start..span.end,
                });
            }
        }

        let operand = self.unary()?;
        let span = start..operand.span.end;
        Ok(Expr {
            kind: ExprKind::Unary(op, Box::new(operand)),
            span,
        })
    }

    fn atom(&mut self) -> Result<Expr, CompileError> {
        let span = self.span();
        let kind = match self.peek() {
            Some(Token::Int) => {
                let text = self.text(&span);
                let value = text
                    .parse::<i64>()
                    .map_err(|_| self.error(format!("integer literal '{text}' out of range")))?;
                self.bump();
                ExprKind::Literal(Literal::Int(value))
            }
            Some(Token::Str) => {
                self.bump();
                ExprKind::Literal(Literal::Str(unescape(self.text(&span))))
            }
            Some(Token::True) => {
                self.bump();
                ExprKind::Literal(Literal::Bool(true))
            }
            Some(Token::False) => {
                self.bump();
                ExprKind::Literal(Literal::Bool(false))
            }
            Some(Token::LParen) => {
                self.bump();
                let mut inner = self.expr(0)?;
                let close = self.expect(Token::RParen, "')'")?;
                inner.span = span.start..close.end;
                return Ok(inner);
            }
            Some(Token::Ident) => {
                let (path, path_span) = self.path()?;
                if path.len() == 1 && self.eat(Token::LParen) {
                    let args = self.args()?;
                    let end = self.tokens[self.pos - 1].1.end;
                    let name = path.into_iter().next().unwrap_or_default();
                    return Ok(Expr {
                        kind: ExprKind::Call(name, args),
                        span: span.start..end,
                    });
                }
                return Ok(Expr {
                    kind: ExprKind::Path(path),
                    span: path_span,
                });
            }
            _ => return Err(self.unexpected("an expression")),
        };
        Ok(Expr { kind, span })
    }

    /// Arguments after `(`, through the closing `)`.
    fn args(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut args = Vec::new();
        if self.eat(Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr(0)?);
            if self.eat(Token::Comma) {
                continue;
            }
            self.expect(Token::RParen, "',' or ')'")?;
            return Ok(args);
        }
    }

    fn path(&mut self) -> Result<(Vec<String>, Span), CompileError> {
        let first = self.expect(Token::Ident, "a name")?;
        let mut end = first.end;
        let mut segments = vec![self.text(&first).to_string()];
        while self.eat(Token::Dot) {
            let next = self.expect(Token::Ident, "a name after '.'")?;
            end = next.end;
            segments.push(self.text(&next).to_string());
        }
        Ok((segments, first.start..end))
    }
}
