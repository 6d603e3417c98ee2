//! Kiln REPL - incremental evaluation with a synchronized analysis view.
//!
//! A [`Session`] accepts submissions one at a time. Each submission may
//! reference modules (`#r "..."`), import namespaces (`use A.B;`) and run
//! code that sees every earlier binding. Alongside the evaluation chain the
//! session keeps an analysis document for completion and highlighting that
//! advances whenever the chain does: with the whole text of a success, or
//! with the statements that ran before a runtime fault.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────────── Session ────────────────┐
//! text ────► │ IncrementalEvaluator                     │
//!            │   ├─ ResolverChain (package/project/dll) │
//!            │   ├─ ExecutionEngine (kiln_script)       │
//!            │   └─ ReferenceService (kiln_refs)        │
//!            │ WorkspaceManager ──► AnalysisDocument    │ ◄──── complete / highlight
//!            └──────────────────────────────────────────┘        (ResultCache)
//! ```

pub mod cache;
pub mod completion;
pub mod config;
pub mod directive;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod highlight;
pub mod resolve;
pub mod session;
pub mod workspace;

#[cfg(test)]
mod fixture;

use std::sync::Once;

pub use cache::{CacheKey, ResultCache};
pub use completion::{CompletionItem, CompletionKind};
pub use config::SessionConfig;
pub use engine::{EngineFailure, EngineRequest, Executed, ExecutionEngine};
pub use error::{EvalFailure, ResolveFailure, StartupError};
pub use evaluator::{
    Evaluation, EvaluationResult, EvaluationState, EvaluatorState, IncrementalEvaluator, Success,
};
pub use highlight::{HighlightKind, HighlightSpan};
pub use kiln_script::CancellationToken;
pub use session::Session;
pub use workspace::{AnalysisDocument, AnalysisProject, DocumentId, ProjectId, WorkspaceManager};

static TRACING_INIT: Once = Once::new();

/// Install a tracing subscriber, once per process.
///
/// Does nothing unless `RUST_LOG` is set. Output is an indented span tree on
/// stderr, filtered by `RUST_LOG`:
///
/// ```bash
/// RUST_LOG=kiln_repl=debug,kiln_refs=debug kiln
/// ```
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .with(filter)
                .init();
        }
    });
}
