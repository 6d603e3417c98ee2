//! Tree-walking interpreter over checked scripts.
//!
//! Runs after [`Checker`](crate::check::Checker) has accepted the script, so
//! every type mismatch has already been ruled out; the remaining failures are
//! runtime faults. Cancellation is polled between statements.

use rustc_hash::FxHashMap;

use crate::ast::{BinaryOp, Expr, ExprKind, Literal, Script, StmtKind, UnaryOp};
use crate::cancel::CancellationToken;
use crate::check::Resolution;
use crate::error::{FaultKind, Position, RuntimeFault};
use crate::print_handler::PrintHandler;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

/// Result of running a script to completion or to its first fault.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub bindings: FxHashMap<String, Value>,
    /// Value of the last statement that completed.
    pub last: Option<Value>,
    /// Number of statements that completed.
    pub completed: usize,
    pub fault: Option<RuntimeFault>,
}

/// Marker for a run stopped by its cancellation token.
#[derive(Debug)]
pub(crate) struct Interrupted;

pub(crate) struct Interpreter<'a> {
    pub source: &'a str,
    pub resolutions: &'a FxHashMap<usize, Resolution>,
    pub args: &'a [String],
    pub print: &'a PrintHandler,
}

type Eval = Result<Value, RuntimeFault>;

impl Interpreter<'_> {
    pub(crate) fn run(
        &self,
        script: &Script,
        mut bindings: FxHashMap<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<Outcome, Interrupted> {
        let mut last = None;
        for (completed, stmt) in script.stmts.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(Interrupted);
            }
            let result = match &stmt.kind {
                StmtKind::Let { name, value } => self.eval(value, &bindings).map(|value| {
                    bindings.insert(name.clone(), value);
                    Value::Unit
                }),
                StmtKind::Use(_) => Ok(Value::Unit),
                StmtKind::Expr(expr) => self.eval(expr, &bindings),
            };
            match result {
                Ok(value) => last = Some(value),
                Err(fault) => {
                    tracing::debug!(%fault, "script faulted");
                    return Ok(Outcome {
                        bindings,
                        last,
                        completed,
                        fault: Some(fault),
                    });
                }
            }
        }
        Ok(Outcome {
            bindings,
            last,
            completed: script.stmts.len(),
            fault: None,
        })
    }

    fn fault(&self, expr: &Expr, kind: FaultKind) -> RuntimeFault {
        RuntimeFault {
            position: Position::of(self.source, expr.span.start),
            kind,
        }
    }

    fn eval(&self, expr: &Expr, bindings: &FxHashMap<String, Value>) -> Eval {
        ensure_sufficient_stack(|| self.eval_inner(expr, bindings))
    }

    fn eval_inner(&self, expr: &Expr, bindings: &FxHashMap<String, Value>) -> Eval {
        match &expr.kind {
            ExprKind::Literal(Literal::Int(n)) => Ok(Value::Int(*n)),
            ExprKind::Literal(Literal::Str(s)) => Ok(Value::str(s.as_str())),
            ExprKind::Literal(Literal::Bool(b)) => Ok(Value::Bool(*b)),
            ExprKind::Path(_) => Ok(self.lookup(expr, bindings)),
            ExprKind::Unary(op, operand) => {
                let value = self.eval(operand, bindings)?;
                match (op, value) {
                    (UnaryOp::Neg, Value::Int(n)) => n
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| self.fault(expr, FaultKind::Overflow("-"))),
                    (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (_, other) => Ok(other),
                }
            }
            ExprKind::Binary(op, lhs, rhs) => self.binary(expr, *op, lhs, rhs, bindings),
            ExprKind::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, bindings))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(expr, name, &args)
            }
        }
    }

    fn lookup(&self, expr: &Expr, bindings: &FxHashMap<String, Value>) -> Value {
        match self.resolutions.get(&expr.span.start) {
            Some(Resolution::Binding(name)) => bindings.get(name).cloned(),
            Some(Resolution::Export(module, name)) => module.exports.get(name).cloned(),
            None => None,
        }
        .unwrap_or(Value::Unit)
    }

    fn binary(
        &self,
        expr: &Expr,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        bindings: &FxHashMap<String, Value>,
    ) -> Eval {
        let left = self.eval(lhs, bindings)?;
        // Short-circuit before evaluating the right operand.
        match (op, &left) {
            (BinaryOp::And, Value::Bool(false)) => return Ok(Value::Bool(false)),
            (BinaryOp::Or, Value::Bool(true)) => return Ok(Value::Bool(true)),
            _ => {}
        }
        let right = self.eval(rhs, bindings)?;

        let overflow = || self.fault(expr, FaultKind::Overflow(op.symbol()));
        let value = match (op, left, right) {
            (BinaryOp::Add, Value::Int(a), Value::Int(b)) => {
                Value::Int(a.checked_add(b).ok_or_else(overflow)?)
            }
            (BinaryOp::Sub, Value::Int(a), Value::Int(b)) => {
                Value::Int(a.checked_sub(b).ok_or_else(overflow)?)
            }
            (BinaryOp::Mul, Value::Int(a), Value::Int(b)) => {
                Value::Int(a.checked_mul(b).ok_or_else(overflow)?)
            }
            (BinaryOp::Div | BinaryOp::Rem, Value::Int(_), Value::Int(0)) => {
                return Err(self.fault(expr, FaultKind::DivisionByZero));
            }
            (BinaryOp::Div, Value::Int(a), Value::Int(b)) => {
                Value::Int(a.checked_div(b).ok_or_else(overflow)?)
            }
            (BinaryOp::Rem, Value::Int(a), Value::Int(b)) => {
                Value::Int(a.checked_rem(b).ok_or_else(overflow)?)
            }
            (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Value::str(format!("{a}{b}")),
            (BinaryOp::Eq, a, b) => Value::Bool(a == b),
            (BinaryOp::NotEq, a, b) => Value::Bool(a != b),
            (BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq, a, b) => {
                let ordering = match (a, b) {
                    (Value::Int(a), Value::Int(b)) => a.cmp(&b),
                    (Value::Str(a), Value::Str(b)) => a.cmp(&b),
                    _ => return Ok(Value::Bool(false)),
                };
                Value::Bool(match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::LtEq => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                })
            }
            (BinaryOp::And | BinaryOp::Or, _, right) => right,
            (_, left, _) => left,
        };
        Ok(value)
    }

    fn call(&self, expr: &Expr, name: &str, args: &[Value]) -> Eval {
        match (name, args) {
            ("print", [value]) => {
                self.print.println(&value.to_string());
                Ok(Value::Unit)
            }
            ("panic", [message]) => Err(self.fault(expr, FaultKind::Panic(message.to_string()))),
            ("len", [Value::Str(s)]) => Ok(Value::Int(
                i64::try_from(s.chars().count()).unwrap_or(i64::MAX),
            )),
            ("str", [value]) => Ok(Value::str(value.to_string())),
            ("argc", []) => Ok(Value::Int(
                i64::try_from(self.args.len()).unwrap_or(i64::MAX),
            )),
            ("arg", [Value::Int(index)]) => usize::try_from(*index)
                .ok()
                .and_then(|i| self.args.get(i))
                .map(|arg| Value::str(arg.as_str()))
                .ok_or_else(|| {
                    self.fault(
                        expr,
                        FaultKind::ArgOutOfRange {
                            index: *index,
                            count: self.args.len(),
                        },
                    )
                }),
            _ => Ok(Value::Unit),
        }
    }
}

#[cfg(test)]
mod tests;
