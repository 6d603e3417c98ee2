//! Static checking.
//!
//! Every statement is type checked and every name resolved before anything
//! runs. Errors are accumulated; a `let` whose initializer failed binds a
//! poisoned name so later uses do not report again.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ast::{BinaryOp, Expr, ExprKind, Literal, Script, StmtKind, UnaryOp};
use crate::error::{CompileError, Diagnostic, Position};
use crate::module::{Module, ModuleTable};
use crate::stack::ensure_sufficient_stack;
use crate::value::Type;

/// What a path expression refers to.
#[derive(Clone, Debug)]
pub enum Resolution {
    Binding(String),
    Export(Arc<Module>, String),
}

/// Result of a successful check.
#[derive(Debug, Default)]
pub struct Checked {
    /// Type of each statement; `unit` for `let` and `use`.
    pub stmt_types: Vec<Type>,
    /// Path expressions by span start.
    pub resolutions: FxHashMap<usize, Resolution>,
    /// Imports in effect after the last statement.
    pub imports: Vec<String>,
}

/// Signature of a builtin: parameter types (`None` accepts any) and result.
pub(crate) fn builtin_signature(name: &str) -> Option<(&'static [Option<Type>], Type)> {
    let signature: (&'static [Option<Type>], Type) = match name {
        "print" => (&[None], Type::Unit),
        "panic" => (&[Some(Type::Str)], Type::Unit),
        "len" => (&[Some(Type::Str)], Type::Int),
        "str" => (&[None], Type::Str),
        "arg" => (&[Some(Type::Int)], Type::Str),
        "argc" => (&[], Type::Int),
        _ => return None,
    };
    Some(signature)
}

/// Names of all builtins, for completion.
pub const BUILTINS: &[&str] = &["arg", "argc", "len", "panic", "print", "str"];

pub(crate) struct Checker<'a> {
    source: &'a str,
    modules: &'a ModuleTable,
    /// `None` marks a binding whose initializer did not check.
    bindings: FxHashMap<String, Option<Type>>,
    imports: Vec<String>,
    resolutions: FxHashMap<usize, Resolution>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Checker<'a> {
    pub(crate) fn new(
        source: &'a str,
        modules: &'a ModuleTable,
        bindings: impl IntoIterator<Item = (String, Type)>,
        imports: impl IntoIterator<Item = String>,
    ) -> Self {
        Checker {
            source,
            modules,
            bindings: bindings.into_iter().map(|(n, t)| (n, Some(t))).collect(),
            imports: imports.into_iter().collect(),
            resolutions: FxHashMap::default(),
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn check(mut self, script: &Script) -> Result<Checked, CompileError> {
        let mut stmt_types = Vec::with_capacity(script.stmts.len());
        for stmt in &script.stmts {
            let ty = match &stmt.kind {
                StmtKind::Let { name, value } => {
                    let ty = self.expr(value);
                    self.bindings.insert(name.clone(), ty);
                    Type::Unit
                }
                StmtKind::Use(path) => {
                    let name = path.join(".");
                    if self.modules.is_namespace(&name) {
                        if !self.imports.contains(&name) {
                            self.imports.push(name);
                        }
                    } else {
                        self.report(stmt.span.start, format!("unknown module or namespace '{name}'"));
                    }
                    Type::Unit
                }
                StmtKind::Expr(expr) => self.expr(expr).unwrap_or(Type::Unit),
            };
            stmt_types.push(ty);
        }

        if self.diagnostics.is_empty() {
            Ok(Checked {
                stmt_types,
                resolutions: self.resolutions,
                imports: self.imports,
            })
        } else {
            Err(CompileError {
                diagnostics: self.diagnostics,
            })
        }
    }

    fn report(&mut self, offset: usize, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::new(Position::of(self.source, offset), message));
    }

    /// Type of `expr`, or `None` after reporting.
    fn expr(&mut self, expr: &Expr) -> Option<Type> {
        ensure_sufficient_stack(|| self.expr_inner(expr))
    }

    fn expr_inner(&mut self, expr: &Expr) -> Option<Type> {
        match &expr.kind {
            ExprKind::Literal(Literal::Int(_)) => Some(Type::Int),
            ExprKind::Literal(Literal::Str(_)) => Some(Type::Str),
            ExprKind::Literal(Literal::Bool(_)) => Some(Type::Bool),
            ExprKind::Path(path) => self.path(expr.span.start, path),
            ExprKind::Unary(op, operand) => {
                let ty = self.expr(operand)?;
                let expected = match op {
                    UnaryOp::Neg => Type::Int,
                    UnaryOp::Not => Type::Bool,
                };
                if ty == expected {
                    Some(ty)
                } else {
                    let symbol = if *op == UnaryOp::Neg { "-" } else { "!" };
                    self.report(expr.span.start, format!("cannot apply '{symbol}' to {ty}"));
                    None
                }
            }
            ExprKind::Binary(op, lhs, rhs) => {
                let lhs_ty = self.expr(lhs);
                let rhs_ty = self.expr(rhs);
                let (lhs_ty, rhs_ty) = (lhs_ty?, rhs_ty?);
                let result = binary_result(*op, lhs_ty, rhs_ty);
                if result.is_none() {
                    self.report(
                        expr.span.start,
                        format!("cannot apply '{}' to {lhs_ty} and {rhs_ty}", op.symbol()),
                    );
                }
                result
            }
            ExprKind::Call(name, args) => self.call(expr.span.start, name, args),
        }
    }

    fn call(&mut self, offset: usize, name: &str, args: &[Expr]) -> Option<Type> {
        let arg_types: Vec<_> = args.iter().map(|arg| self.expr(arg)).collect();
        let Some((params, result)) = builtin_signature(name) else {
            self.report(offset, format!("unknown function '{name}'"));
            return None;
        };
        if params.len() != args.len() {
            self.report(
                offset,
                format!(
                    "'{name}' takes {} argument(s), {} given",
                    params.len(),
                    args.len()
                ),
            );
            return None;
        }
        let mut ok = true;
        for ((param, arg), arg_ty) in params.iter().zip(args).zip(arg_types) {
            match (param, arg_ty) {
                (_, None) => ok = false,
                (Some(expected), Some(actual)) if *expected != actual => {
                    self.report(
                        arg.span.start,
                        format!("'{name}' expects {expected}, found {actual}"),
                    );
                    ok = false;
                }
                _ => {}
            }
        }
        ok.then_some(result)
    }

    fn path(&mut self, offset: usize, path: &[String]) -> Option<Type> {
        match self.resolve(path) {
            Ok(Some((resolution, ty))) => {
                self.resolutions.insert(offset, resolution);
                Some(ty)
            }
            // Poisoned binding; already reported.
            Ok(None) => None,
            Err(message) => {
                self.report(offset, message);
                None
            }
        }
    }

    fn resolve(&self, path: &[String]) -> Result<Option<(Resolution, Type)>, String> {
        let Some((last, qualifier)) = path.split_last() else {
            return Err("empty name".to_string());
        };

        if qualifier.is_empty() {
            if let Some(ty) = self.bindings.get(last) {
                return Ok(ty.map(|ty| (Resolution::Binding(last.clone()), ty)));
            }
            return self.resolve_imported(last).map(Some);
        }

        let module_name = qualifier.join(".");
        let Some(module) = self.find_module(&module_name) else {
            if qualifier.len() == 1 && self.bindings.contains_key(&qualifier[0]) {
                return Err(format!("'{}' has no members", qualifier[0]));
            }
            return Err(format!("unknown module '{module_name}'"));
        };
        match module.exports.get(last) {
            Some(value) => Ok(Some((
                Resolution::Export(Arc::clone(module), last.clone()),
                value.ty(),
            ))),
            None => Err(format!("module '{}' has no export '{last}'", module.name())),
        }
    }

    /// A module by full name, or relative to an import.
    fn find_module(&self, name: &str) -> Option<&Arc<Module>> {
        self.modules.get(name).or_else(|| {
            self.imports
                .iter()
                .find_map(|import| self.modules.get(&format!("{import}.{name}")))
        })
    }

    fn resolve_imported(&self, name: &str) -> Result<(Resolution, Type), String> {
        let mut candidates: Vec<&Arc<Module>> = Vec::new();
        for import in &self.imports {
            for module in self.modules.imported_by(import) {
                if module.exports.contains_key(name)
                    && !candidates.iter().any(|c| c.name() == module.name())
                {
                    candidates.push(module);
                }
            }
        }
        candidates.sort_by(|a, b| a.name().cmp(b.name()));

        match candidates.as_slice() {
            [module] => {
                let ty = module.exports.get(name).map_or(Type::Unit, |v| v.ty());
                Ok((Resolution::Export(Arc::clone(module), name.to_string()), ty))
            }
            [] if self.modules.is_namespace(name) => {
                Err(format!("'{name}' is a module, not a value"))
            }
            [] => Err(format!("unknown name '{name}'")),
            many => {
                let names: Vec<_> = many.iter().map(|m| format!("{}.{name}", m.name())).collect();
                Err(format!("'{name}' is ambiguous between {}", names.join(" and ")))
            }
        }
    }
}

fn binary_result(op: BinaryOp, lhs: Type, rhs: Type) -> Option<Type> {
    use BinaryOp::{Add, And, Div, Eq, Gt, GtEq, Lt, LtEq, Mul, NotEq, Or, Rem, Sub};
    match (op, lhs, rhs) {
        (Add, Type::Int, Type::Int) | (Sub | Mul | Div | Rem, Type::Int, Type::Int) => {
            Some(Type::Int)
        }
        (Add, Type::Str, Type::Str) => Some(Type::Str),
        (Eq | NotEq, l, r) if l == r => Some(Type::Bool),
        (Lt | LtEq | Gt | GtEq, Type::Int, Type::Int)
        | (Lt | LtEq | Gt | GtEq, Type::Str, Type::Str)
        | (And | Or, Type::Bool, Type::Bool) => Some(Type::Bool),
        _ => None,
    }
}
