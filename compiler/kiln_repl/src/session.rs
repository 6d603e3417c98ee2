//! The session orchestrator.
//!
//! A [`Session`] owns the pieces and holds the only mutable handles: the
//! current evaluation state and (inside the workspace) the current analysis
//! document. Evaluation is serialized by a busy flag; analysis queries never
//! touch it and run on the snapshot they capture.
//!
//! ```text
//! start(config)
//!   ├─ ReferenceService::load_framework      (fatal on failure)
//!   ├─ resolve config references             (fatal on failure)
//!   └─ WorkspaceManager::initialize
//!
//! evaluate(text) ── busy? ──► IncrementalEvaluator::evaluate
//!                               ├─ next state  ──► swap evaluation state
//!                               └─ commit      ──► update analysis document
//! ```

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kiln_refs::{ArtifactSet, ReferenceService};
use kiln_script::{CancellationToken, ScriptEngine};
use parking_lot::RwLock;

use crate::cache::{CacheKey, ResultCache};
use crate::completion::{complete, CompletionItem};
use crate::config::SessionConfig;
use crate::directive::ReferenceDirective;
use crate::engine::ExecutionEngine;
use crate::error::{EvalFailure, ResolveFailure, StartupError};
use crate::evaluator::{EvaluationResult, EvaluatorState, IncrementalEvaluator};
use crate::highlight::{highlight, HighlightSpan};
use crate::resolve::ResolverChain;
use crate::workspace::{AnalysisDocument, WorkspaceManager};

pub struct Session<E: ExecutionEngine = ScriptEngine> {
    evaluator: IncrementalEvaluator<E>,
    service: Arc<ReferenceService>,
    workspace: WorkspaceManager,
    state: RwLock<EvaluatorState<E::State>>,
    busy: AtomicBool,
    args: Vec<String>,
    completions: ResultCache<Arc<[CompletionItem]>>,
    highlights: ResultCache<Arc<[HighlightSpan]>>,
}

impl Session<ScriptEngine> {
    /// Start a session running the built-in script engine.
    pub fn start(config: SessionConfig) -> Result<Self, StartupError> {
        Session::with_engine(config, ScriptEngine::default())
    }
}

impl<E: ExecutionEngine> Session<E> {
    #[tracing::instrument(level = "debug", skip_all, fields(framework = %config.framework))]
    pub fn with_engine(config: SessionConfig, engine: E) -> Result<Self, StartupError> {
        let service = Arc::new(ReferenceService::new());
        service
            .load_framework(&config.framework, &config.search_paths)
            .map_err(StartupError::Framework)?;

        let resolvers = ResolverChain::standard(&config, Arc::clone(&service));
        let mut references = service.execution_artifacts();
        let never = CancellationToken::new();
        for reference in &config.references {
            let directive = ReferenceDirective::detached(reference.clone());
            let startup_error = |source: ResolveFailure| StartupError::Reference {
                reference: reference.clone(),
                source,
            };
            // The chain ends in a resolver that claims everything.
            let resolved = resolvers
                .resolve(&directive, &never)
                .unwrap_or_else(|| Ok(Vec::new()))
                .map_err(startup_error)?;
            service.record_execution_artifacts(&resolved);
            let reconciled = service.reconcile(&resolved);
            references.extend(resolved);
            references.extend(reconciled.iter().cloned());
        }

        let imports: BTreeSet<String> = config.imports.iter().cloned().collect();
        let workspace = WorkspaceManager::initialize(service.analysis_artifacts(), imports.clone());
        tracing::info!(
            references = references.len(),
            imports = imports.len(),
            "session started"
        );

        Ok(Session {
            evaluator: IncrementalEvaluator::new(engine, resolvers, Arc::clone(&service), references, imports),
            service,
            workspace,
            state: RwLock::new(EvaluatorState::Empty),
            busy: AtomicBool::new(false),
            args: config.args,
            completions: ResultCache::new(config.cache_capacity, config.cache_ttl),
            highlights: ResultCache::new(config.cache_capacity, config.cache_ttl),
        })
    }

    /// Evaluate one submission with the configured script arguments.
    pub fn evaluate(&self, text: &str, cancel: &CancellationToken) -> EvaluationResult {
        self.evaluate_with_args(text, &self.args, cancel)
    }

    /// Evaluate one submission.
    ///
    /// Only one evaluation runs at a time; a concurrent call is rejected with
    /// [`EvalFailure::Busy`] and changes nothing.
    #[tracing::instrument(level = "debug", skip_all, fields(len = text.len()))]
    pub fn evaluate_with_args(
        &self,
        text: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> EvaluationResult {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return EvaluationResult::Error(EvalFailure::Busy);
        }
        let _release = BusyGuard(&self.busy);

        let current = self.state.read().clone();
        let evaluation = self.evaluator.evaluate(&current, text, args, cancel);
        if let Some(next) = evaluation.next {
            tracing::debug!(generation = next.generation(), "evaluation state advanced");
            *self.state.write() = EvaluatorState::Continuing(next);
        }
        if let Some(commit) = &evaluation.commit {
            self.workspace.update_current_document(commit);
        }
        evaluation.result
    }

    /// Completion items for `text` with the caret at byte offset `caret`.
    pub fn complete(&self, text: &str, caret: usize) -> Arc<[CompletionItem]> {
        let document = self.workspace.with_text(text);
        let key = CacheKey::new(document.project().id(), text, Some(caret));
        self.completions
            .get_or_insert_with(key, || complete(&document, caret).into())
    }

    /// Highlight spans for `text`.
    pub fn highlight(&self, text: &str) -> Arc<[HighlightSpan]> {
        let document = self.workspace.with_text(text);
        let key = CacheKey::new(document.project().id(), text, None);
        self.highlights
            .get_or_insert_with(key, || highlight(&document).into())
    }

    /// Snapshot of the evaluation chain.
    pub fn current_state(&self) -> EvaluatorState<E::State> {
        self.state.read().clone()
    }

    pub fn current_document(&self) -> Arc<AnalysisDocument> {
        self.workspace.current_document()
    }

    pub fn service(&self) -> &Arc<ReferenceService> {
        &self.service
    }

    pub fn workspace(&self) -> &WorkspaceManager {
        &self.workspace
    }

    pub fn engine(&self) -> &E {
        self.evaluator.engine()
    }

    /// References the next submission starts from.
    pub fn references(&self) -> ArtifactSet {
        match self.state.read().current() {
            Some(state) => state.references().clone(),
            None => self.evaluator.initial_references().clone(),
        }
    }

    pub fn completion_cache(&self) -> &ResultCache<Arc<[CompletionItem]>> {
        &self.completions
    }
}

/// Clears the busy flag when the evaluation ends, panics included.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
