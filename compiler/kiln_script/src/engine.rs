//! Script engine: compile and run one submission against a prior state.
//!
//! # Architecture
//!
//! ```text
//! references ──► ModuleTable (carried from prior, new paths loaded)
//!                    │
//! text ──► parse ──► check (prior bindings + imports) ──► interpret
//!                                                          │
//!                                   ScriptState (new, prior untouched)
//! ```
//!
//! A compile error or cancellation produces no state. A runtime fault
//! produces a state that records the fault and keeps every binding made
//! before it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::cancel::CancellationToken;
use crate::check::Checker;
use crate::error::{CompileError, EngineError, Position, RuntimeFault};
use crate::interp::Interpreter;
use crate::module::{Admission, ModuleTable};
use crate::parser::parse;
use crate::print_handler::{stdout_handler, SharedPrintHandler};
use crate::value::{Type, Value};

/// Inputs accumulated by the caller for one submission.
#[derive(Clone, Debug, Default)]
pub struct ScriptOptions {
    /// Module files to load, in priority order.
    pub references: Vec<PathBuf>,
    /// Imports in effect before the first statement.
    pub imports: Vec<String>,
    /// Values of `arg(i)` / `argc()`.
    pub args: Vec<String>,
}

/// Static shape of a submission's last statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FinalStatement {
    pub ty: Type,
    pub terminated: bool,
}

impl FinalStatement {
    /// An unterminated statement of non-unit type yields a value to display.
    pub fn produces_value(self) -> bool {
        !self.terminated && self.ty != Type::Unit
    }
}

/// Everything evaluated so far. Never mutated once returned.
#[derive(Clone, Debug, Default)]
pub struct ScriptState {
    bindings: FxHashMap<String, Value>,
    modules: ModuleTable,
    imports: BTreeSet<String>,
    final_value: Option<Value>,
    final_statement: Option<FinalStatement>,
    fault: Option<RuntimeFault>,
    executed_len: usize,
    generation: usize,
}

impl ScriptState {
    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Binding names, sorted.
    pub fn binding_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.bindings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn modules(&self) -> &ModuleTable {
        &self.modules
    }

    pub fn imports(&self) -> &BTreeSet<String> {
        &self.imports
    }

    /// Value of the last statement, when the submission ran to completion.
    pub fn final_value(&self) -> Option<&Value> {
        self.final_value.as_ref()
    }

    pub fn final_statement(&self) -> Option<FinalStatement> {
        self.final_statement
    }

    /// The value to display for this submission, if any.
    pub fn return_value(&self) -> Option<&Value> {
        self.final_statement
            .filter(|stmt| stmt.produces_value())
            .and(self.final_value.as_ref())
    }

    pub fn fault(&self) -> Option<&RuntimeFault> {
        self.fault.as_ref()
    }

    /// Bytes of the submission ahead of the faulting statement; all of it
    /// when the submission ran to completion.
    pub fn executed_len(&self) -> usize {
        self.executed_len
    }

    /// Number of submissions folded into this state.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Files of every module this state has loaded.
    pub fn referenced_paths(&self) -> Vec<&Path> {
        let mut paths: Vec<_> = self.modules.module_paths().collect();
        paths.sort();
        paths
    }
}

/// Compiles and runs submissions. Holds no session state of its own.
pub struct ScriptEngine {
    print: SharedPrintHandler,
}

impl Default for ScriptEngine {
    fn default() -> Self {
        ScriptEngine::new(stdout_handler())
    }
}

impl ScriptEngine {
    pub fn new(print: SharedPrintHandler) -> Self {
        ScriptEngine { print }
    }

    pub fn print_handler(&self) -> &SharedPrintHandler {
        &self.print
    }

    /// Run `text`, continuing from `prior` when given.
    ///
    /// `prior` is never modified; the returned state is new.
    pub fn run(
        &self,
        text: &str,
        options: &ScriptOptions,
        prior: Option<&ScriptState>,
        cancel: &CancellationToken,
    ) -> Result<ScriptState, EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let modules = load_references(prior, &options.references)?;
        let script = parse(text)?;

        let mut imports: BTreeSet<String> =
            prior.map(|p| p.imports.clone()).unwrap_or_default();
        imports.extend(options.imports.iter().cloned());

        let prior_bindings = prior.map(|p| &p.bindings);
        let checked = Checker::new(
            text,
            &modules,
            prior_bindings
                .into_iter()
                .flatten()
                .map(|(name, value)| (name.clone(), value.ty())),
            imports.iter().cloned(),
        )
        .check(&script)?;

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let interpreter = Interpreter {
            source: text,
            resolutions: &checked.resolutions,
            args: &options.args,
            print: &self.print,
        };
        let outcome = interpreter
            .run(
                &script,
                prior.map(|p| p.bindings.clone()).unwrap_or_default(),
                cancel,
            )
            .map_err(|_| EngineError::Cancelled)?;

        imports.extend(checked.imports);
        let final_statement = script.stmts.last().zip(checked.stmt_types.last()).map(
            |(stmt, ty)| FinalStatement {
                ty: *ty,
                terminated: stmt.terminated,
            },
        );
        let executed_len = match &outcome.fault {
            Some(_) => script
                .stmts
                .get(outcome.completed)
                .map_or(text.len(), |stmt| stmt.span.start),
            None => text.len(),
        };
        let generation = prior.map_or(0, |p| p.generation) + 1;
        tracing::debug!(
            generation,
            statements = script.stmts.len(),
            completed = outcome.completed,
            faulted = outcome.fault.is_some(),
            "submission executed"
        );

        Ok(ScriptState {
            bindings: outcome.bindings,
            modules,
            imports,
            final_value: if outcome.fault.is_some() {
                None
            } else {
                outcome.last
            },
            final_statement,
            fault: outcome.fault,
            executed_len,
            generation,
        })
    }
}

/// The prior module table extended with any references not yet loaded.
fn load_references(
    prior: Option<&ScriptState>,
    references: &[PathBuf],
) -> Result<ModuleTable, EngineError> {
    let mut modules = prior.map(|p| p.modules.clone()).unwrap_or_default();
    for path in references {
        match modules.load(path)? {
            Admission::Added => tracing::trace!(path = %path.display(), "module loaded"),
            Admission::AlreadyLoaded => {}
            Admission::Conflict { loaded } => {
                return Err(CompileError::single(
                    Position { line: 1, column: 1 },
                    format!(
                        "module '{}' conflicts with already loaded '{loaded}'",
                        path.display()
                    ),
                )
                .into());
            }
        }
    }
    Ok(modules)
}
