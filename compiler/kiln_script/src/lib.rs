//! Kiln Script - the execution engine behind the Kiln evaluator.
//!
//! A small statically typed expression language: `int`, `str`, `bool` and
//! `unit` values, `let` bindings, `use` imports and qualified access to the
//! exports of referenced module files. Each submission is parsed, checked
//! against the prior state, then interpreted.
//!
//! # Architecture
//!
//! ```text
//! lexer (logos) ──► parser ──► check ──► interp
//!                                 ▲          │
//!                            ModuleTable     ▼
//!                                 └──── ScriptState (immutable snapshot)
//! ```
//!
//! [`ScriptEngine::run`] is the entry point; [`scan`] offers token-level
//! helpers that work on text which does not parse.

pub mod ast;
pub mod cancel;
pub mod check;
pub mod engine;
pub mod error;
mod interp;
pub mod lexer;
pub mod module;
pub mod parser;
pub mod print_handler;
pub mod scan;
mod stack;
pub mod value;

pub use cancel::CancellationToken;
pub use check::BUILTINS;
pub use engine::{FinalStatement, ScriptEngine, ScriptOptions, ScriptState};
pub use error::{CompileError, Diagnostic, EngineError, FaultKind, ModuleError, Position, RuntimeFault};
pub use module::{Module, ModuleTable};
pub use print_handler::{buffer_handler, silent_handler, stdout_handler, PrintHandler, SharedPrintHandler};
pub use scan::{declared_bindings, scan_imports};
pub use value::{Type, Value};

/// Keywords, for completion and highlighting.
pub const KEYWORDS: &[&str] = &["false", "let", "true", "use"];
