//! Errors surfaced by the evaluator and session.

use kiln_refs::ResolutionError;
use thiserror::Error;

/// A resolver could not produce artifacts for a directive.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveFailure {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("reference resolution cancelled")]
    Cancelled,
}

/// Why a submission did not succeed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EvalFailure {
    /// A reference directive could not be resolved; state unchanged.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    /// The submission did not compile; state unchanged.
    #[error("{0}")]
    Compile(String),
    /// The submission faulted while running; state advanced.
    #[error("{0}")]
    Runtime(String),
    /// Another submission is still being evaluated.
    #[error("an evaluation is already in progress")]
    Busy,
}

/// The session could not be created.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("cannot start session: {0}")]
    Framework(#[source] ResolutionError),
    #[error("cannot resolve initial reference '{reference}': {source}")]
    Reference {
        reference: String,
        #[source]
        source: ResolveFailure,
    },
}
