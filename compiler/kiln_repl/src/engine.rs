//! The seam between the evaluator and whatever runs submissions.

use std::collections::BTreeSet;
use std::sync::Arc;

use kiln_refs::{ArtifactPath, ArtifactRole, ArtifactSet, ReferenceArtifact};
use kiln_script::{CancellationToken, EngineError, ScriptEngine, ScriptOptions, ScriptState};

/// Everything the engine sees for one submission.
#[derive(Clone, Copy, Debug)]
pub struct EngineRequest<'a> {
    /// Submission text with resolved directive lines blanked.
    pub text: &'a str,
    pub references: &'a ArtifactSet,
    pub imports: &'a BTreeSet<String>,
    pub args: &'a [String],
}

/// A submission that compiled and ran (possibly into a fault).
#[derive(Debug)]
pub struct Executed<S> {
    pub state: S,
    /// Artifacts the compilation actually referenced.
    pub referenced: Vec<Arc<ReferenceArtifact>>,
    /// Display form of the last statement's value, if it completed.
    pub final_value: Option<String>,
    /// The last statement is unterminated and has a non-unit type.
    pub produces_value: bool,
    /// Runtime fault message; the state still includes prior effects.
    pub fault: Option<String>,
    /// Bytes of the request text whose statements completed.
    pub executed_len: usize,
}

/// Why the engine produced no state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineFailure {
    Compile(String),
    Cancelled,
}

/// Runs submissions, continuing from an opaque prior state.
pub trait ExecutionEngine: Send + Sync {
    type State: Send + Sync;

    /// Start fresh when `prior` is `None`; never mutate `prior`.
    fn execute(
        &self,
        request: EngineRequest<'_>,
        prior: Option<&Self::State>,
        cancel: &CancellationToken,
    ) -> Result<Executed<Self::State>, EngineFailure>;
}

impl ExecutionEngine for ScriptEngine {
    type State = ScriptState;

    fn execute(
        &self,
        request: EngineRequest<'_>,
        prior: Option<&ScriptState>,
        cancel: &CancellationToken,
    ) -> Result<Executed<ScriptState>, EngineFailure> {
        // Analysis-only artifacts never run.
        let options = ScriptOptions {
            references: request
                .references
                .iter()
                .filter(|artifact| artifact.role().serves_execution())
                .filter_map(|artifact| artifact.path())
                .map(|path| path.as_path().to_path_buf())
                .collect(),
            imports: request.imports.iter().cloned().collect(),
            args: request.args.to_vec(),
        };

        let state = self
            .run(request.text, &options, prior, cancel)
            .map_err(|err| match err {
                EngineError::Cancelled => EngineFailure::Cancelled,
                other => EngineFailure::Compile(other.to_string()),
            })?;

        let referenced = state
            .referenced_paths()
            .into_iter()
            .map(|path| {
                request
                    .references
                    .get(&ArtifactPath::new(path))
                    .cloned()
                    .unwrap_or_else(|| {
                        Arc::new(ReferenceArtifact::from_file(path, ArtifactRole::ExecutionOnly))
                    })
            })
            .collect();

        Ok(Executed {
            referenced,
            final_value: state.final_value().map(kiln_script::Value::render),
            produces_value: state.final_statement().is_some_and(|s| s.produces_value()),
            fault: state.fault().map(ToString::to_string),
            executed_len: state.executed_len(),
            state,
        })
    }
}
