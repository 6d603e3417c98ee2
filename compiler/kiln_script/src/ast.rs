//! Syntax tree.

use crate::lexer::Span;
use crate::stack::ensure_sufficient_stack;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Str(String),
    Bool(bool),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprKind {
    Literal(Literal),
    /// `x` or `Module.Path.export`.
    Path(Vec<String>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Builtin call; only plain identifiers are callable.
    Call(String, Vec<Expr>),
}

impl Drop for Expr {
    fn drop(&mut self) {
        // Children are dropped one nesting level at a time, each with stack to spare.
        let kind = std::mem::replace(&mut self.kind, ExprKind::Literal(Literal::Bool(false)));
        if matches!(kind, ExprKind::Unary(..) | ExprKind::Binary(..) | ExprKind::Call(..)) {
            ensure_sufficient_stack(move || drop(kind));
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
    /// Followed by `;`.
    pub terminated: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StmtKind {
    Let { name: String, value: Expr },
    Use(Vec<String>),
    Expr(Expr),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Script {
    pub stmts: Vec<Stmt>,
}
