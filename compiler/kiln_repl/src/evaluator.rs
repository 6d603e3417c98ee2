//! Incremental evaluation.
//!
//! The evaluator is a pure step function over session state: given the
//! current [`EvaluatorState`] and a submission it returns a result and, when
//! the chain advances, the next state. Holding the current state is the
//! caller's job.
//!
//! # Step
//!
//! ```text
//! text ──► #r directives ──► ResolverChain ──► + references
//!      ──► `use` paths   ──────────────────────► + imports
//!      ──► ExecutionEngine (fresh | continue from prior)
//!              │ ok
//!              ▼
//!      ReferenceService: record + reconcile ──► fold into references
//! ```
//!
//! Compile errors, resolution errors and cancellation leave the chain where
//! it was. A runtime fault advances it, and the statements that completed
//! before the fault are committed like a success.

use std::collections::BTreeSet;
use std::sync::Arc;

use kiln_refs::{ArtifactSet, ReferenceService};
use kiln_script::{scan_imports, CancellationToken};

use crate::directive::{blank_lines, scan_directives};
use crate::engine::{EngineFailure, EngineRequest, ExecutionEngine};
use crate::error::{EvalFailure, ResolveFailure};
use crate::resolve::ResolverChain;

/// One link of the session chain. Immutable.
#[derive(Debug)]
pub struct EvaluationState<S> {
    engine_state: S,
    references: ArtifactSet,
    imports: BTreeSet<String>,
    generation: usize,
}

impl<S> EvaluationState<S> {
    pub fn engine_state(&self) -> &S {
        &self.engine_state
    }

    /// Accumulated references offered to the next submission.
    pub fn references(&self) -> &ArtifactSet {
        &self.references
    }

    pub fn imports(&self) -> &BTreeSet<String> {
        &self.imports
    }

    /// Submissions folded in so far, faulted ones included.
    pub fn generation(&self) -> usize {
        self.generation
    }
}

/// Where the session chain stands.
#[derive(Debug)]
pub enum EvaluatorState<S> {
    Empty,
    Continuing(Arc<EvaluationState<S>>),
}

impl<S> Clone for EvaluatorState<S> {
    fn clone(&self) -> Self {
        match self {
            EvaluatorState::Empty => EvaluatorState::Empty,
            EvaluatorState::Continuing(state) => EvaluatorState::Continuing(Arc::clone(state)),
        }
    }
}

impl<S> EvaluatorState<S> {
    pub fn current(&self) -> Option<&Arc<EvaluationState<S>>> {
        match self {
            EvaluatorState::Empty => None,
            EvaluatorState::Continuing(state) => Some(state),
        }
    }

    /// Whether both refer to the same link (or are both empty).
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (EvaluatorState::Empty, EvaluatorState::Empty) => true,
            (EvaluatorState::Continuing(a), EvaluatorState::Continuing(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A successful submission.
#[derive(Clone, Debug)]
pub struct Success {
    pub text: String,
    /// Display form of the value, when the last statement produces one.
    pub return_value: Option<String>,
    /// Analysis artifacts after reconciliation.
    pub artifacts: ArtifactSet,
    /// Imports accumulated through this submission.
    pub imports: BTreeSet<String>,
}

#[derive(Clone, Debug)]
pub enum EvaluationResult {
    Success(Success),
    Error(EvalFailure),
    Cancelled,
}

impl EvaluationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, EvaluationResult::Success(_))
    }
}

/// Result plus the next chain link, if the chain advanced.
#[derive(Debug)]
pub struct Evaluation<S> {
    pub result: EvaluationResult,
    pub next: Option<Arc<EvaluationState<S>>>,
    /// What the analysis document takes in whenever `next` is set: the
    /// success itself, or the completed part of a faulted submission.
    pub commit: Option<Success>,
}

impl<S> Evaluation<S> {
    fn stalled(result: EvaluationResult) -> Self {
        Evaluation {
            result,
            next: None,
            commit: None,
        }
    }
}

pub struct IncrementalEvaluator<E> {
    engine: E,
    resolvers: ResolverChain,
    service: Arc<ReferenceService>,
    /// References and imports in effect before the first submission.
    initial_references: ArtifactSet,
    initial_imports: BTreeSet<String>,
}

impl<E: ExecutionEngine> IncrementalEvaluator<E> {
    pub fn new(
        engine: E,
        resolvers: ResolverChain,
        service: Arc<ReferenceService>,
        initial_references: ArtifactSet,
        initial_imports: BTreeSet<String>,
    ) -> Self {
        IncrementalEvaluator {
            engine,
            resolvers,
            service,
            initial_references,
            initial_imports,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// References in effect while the chain is empty.
    pub fn initial_references(&self) -> &ArtifactSet {
        &self.initial_references
    }

    /// Evaluate `text` on top of `current`.
    pub fn evaluate(
        &self,
        current: &EvaluatorState<E::State>,
        text: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Evaluation<E::State> {
        // Any failure observed after cancellation was requested is reported
        // as cancellation, whatever error it surfaced as.
        let fail = |failure: EvalFailure| {
            if cancel.is_cancelled() {
                Evaluation::stalled(EvaluationResult::Cancelled)
            } else {
                Evaluation::stalled(EvaluationResult::Error(failure))
            }
        };
        if cancel.is_cancelled() {
            return Evaluation::stalled(EvaluationResult::Cancelled);
        }

        let prior = current.current();
        let mut references = prior.map_or_else(
            || self.initial_references.clone(),
            |p| p.references.clone(),
        );
        let mut imports =
            prior.map_or_else(|| self.initial_imports.clone(), |p| p.imports.clone());

        // 1. Reference directives.
        let mut resolved_lines = Vec::new();
        for directive in scan_directives(text) {
            let Some(outcome) = self.resolvers.resolve(&directive, cancel) else {
                continue;
            };
            match outcome {
                Ok(artifacts) => {
                    references.extend(artifacts);
                    resolved_lines.push(directive.line);
                }
                Err(ResolveFailure::Cancelled) => {
                    return Evaluation::stalled(EvaluationResult::Cancelled);
                }
                Err(ResolveFailure::Resolution(err)) => {
                    tracing::debug!(%err, "reference directive failed");
                    return fail(EvalFailure::Resolution(err));
                }
            }
        }
        let code = blank_lines(text, &resolved_lines);

        // 2. Imports.
        imports.extend(scan_imports(&code));

        // 3. Execute.
        let request = EngineRequest {
            text: &code,
            references: &references,
            imports: &imports,
            args,
        };
        let executed = match self
            .engine
            .execute(request, prior.map(|p| &p.engine_state), cancel)
        {
            Ok(executed) => executed,
            Err(EngineFailure::Cancelled) => {
                return Evaluation::stalled(EvaluationResult::Cancelled);
            }
            Err(EngineFailure::Compile(message)) => return fail(EvalFailure::Compile(message)),
        };

        // 4. Reconcile what the compilation referenced and fold it back.
        let recorded = self.service.record_execution_artifacts(&executed.referenced);
        let reconciled = self.service.reconcile(&executed.referenced);
        references.extend(reconciled.iter().cloned());
        tracing::debug!(
            recorded,
            reconciled = reconciled.len(),
            references = references.len(),
            "references reconciled"
        );

        // 5. Advance.
        let generation = prior.map_or(0, |p| p.generation) + 1;
        let next = Arc::new(EvaluationState {
            engine_state: executed.state,
            references,
            imports: imports.clone(),
            generation,
        });

        let artifacts = self.service.analysis_artifacts();
        let (result, commit) = match executed.fault {
            Some(fault) => {
                let completed = code.get(..executed.executed_len).unwrap_or(&code);
                let commit = Success {
                    text: completed.trim().to_string(),
                    return_value: None,
                    artifacts,
                    imports,
                };
                (EvaluationResult::Error(EvalFailure::Runtime(fault)), commit)
            }
            None => {
                let success = Success {
                    text: text.to_string(),
                    return_value: executed
                        .final_value
                        .filter(|_| executed.produces_value),
                    artifacts,
                    imports,
                };
                (EvaluationResult::Success(success.clone()), success)
            }
        };
        Evaluation {
            result,
            next: Some(next),
            commit: Some(commit),
        }
    }
}

#[cfg(test)]
mod tests;
