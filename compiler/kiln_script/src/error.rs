//! Script engine errors.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// 1-based line and column of a source position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Position of byte `offset` in `source`. Offsets past the end clamp.
    pub fn of(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
            + 1;
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One compile diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub position: Position,
    pub message: String,
}

impl Diagnostic {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Diagnostic {
            position,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}): error: {}", self.position, self.message)
    }
}

/// The submission did not compile. Nothing was executed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{}", Lines(.diagnostics))]
pub struct CompileError {
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    pub fn single(position: Position, message: impl Into<String>) -> Self {
        CompileError {
            diagnostics: vec![Diagnostic::new(position, message)],
        }
    }
}

struct Lines<'a>(&'a [Diagnostic]);

impl fmt::Display for Lines<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

/// What went wrong while executing.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FaultKind {
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in '{0}'")]
    Overflow(&'static str),
    #[error("panic: {0}")]
    Panic(String),
    #[error("argument index {index} out of range ({count} arguments)")]
    ArgOutOfRange { index: i64, count: usize },
}

/// The submission compiled but faulted while running.
///
/// Statements before the faulting one have taken effect.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("({position}): runtime fault: {kind}")]
pub struct RuntimeFault {
    pub position: Position,
    pub kind: FaultKind,
}

/// A referenced module file could not be loaded.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ModuleError {
    #[error("cannot read module '{}': {message}", .path.display())]
    Io { path: PathBuf, message: String },
    #[error("'{}' is not a managed module (missing header)", .path.display())]
    MissingHeader { path: PathBuf },
    #[error("{}:{line}: malformed export: {text}", .path.display())]
    MalformedExport {
        path: PathBuf,
        line: usize,
        text: String,
    },
}

/// Why [`ScriptEngine::run`](crate::ScriptEngine::run) produced no state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error("evaluation cancelled")]
    Cancelled,
}
