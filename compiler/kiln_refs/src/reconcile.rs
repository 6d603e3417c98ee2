//! Reference reconciliation.
//!
//! The execution engine and the analysis model disagree on what a reference
//! is: the engine wants implementation modules, analysis wants reference
//! modules. [`ReferenceService`] owns both accumulated sets and one
//! authoritative table, keyed by normalized path, that maps every execution
//! artifact it has seen to its analysis counterpart (or to a recorded drop).
//!
//! # Dispositions
//!
//! ```text
//! path under a reference directory          -> AlreadyAnalysis (returned as is)
//! same file name + identity in ref index    -> Promote (reference module wins)
//! path under a framework execution dir      -> Drop (never reaches analysis)
//! anything else                             -> Synthesize (file serves both)
//! ```
//!
//! Outcomes are cached; a cached path never touches the filesystem again.
//! Every filesystem touch made while classifying is counted by
//! [`ReferenceService::probe_count`].

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::artifact::{ArtifactPath, ArtifactRole, ArtifactSet, ReferenceArtifact};
use crate::error::ResolutionError;
use crate::framework::{self, FrameworkRequest, FrameworkSearchPaths, SharedFrameworkDescriptor};
use crate::identity::{
    read_identity, reference_file_name, sibling_documentation, ModuleIdentity, MODULE_EXTENSION,
};

/// Cached result of reconciling one execution artifact.
#[derive(Clone, Debug)]
pub enum Reconciled {
    /// The analysis-side artifact to use.
    Analysis(Arc<ReferenceArtifact>),
    /// The artifact has no analysis counterpart and is excluded.
    Dropped,
}

impl Reconciled {
    pub fn artifact(&self) -> Option<&Arc<ReferenceArtifact>> {
        match self {
            Reconciled::Analysis(artifact) => Some(artifact),
            Reconciled::Dropped => None,
        }
    }
}

/// How an uncached execution artifact maps onto the analysis side.
#[derive(Debug)]
enum Disposition {
    AlreadyAnalysis,
    Promote(Arc<ReferenceArtifact>),
    Drop,
    Synthesize(ReferenceArtifact),
}

/// A reference module known through a framework layer.
#[derive(Debug)]
struct IndexedReference {
    artifact: Arc<ReferenceArtifact>,
    depth: usize,
    /// Execution directory of the framework that declared the module.
    declaring_execution_dir: ArtifactPath,
}

#[derive(Debug, Default)]
struct ServiceState {
    frameworks: Vec<Arc<SharedFrameworkDescriptor>>,
    reference_dirs: Vec<ArtifactPath>,
    execution_only_dirs: Vec<ArtifactPath>,
    /// Lower-cased reference file name → candidates.
    reference_index: FxHashMap<String, Vec<IndexedReference>>,
    cache: FxHashMap<ArtifactPath, Reconciled>,
    execution: ArtifactSet,
    analysis: ArtifactSet,
    /// Directories holding recorded execution artifacts, in first-seen order.
    execution_dirs: Vec<ArtifactPath>,
}

/// Owner of the accumulated artifact sets and the reconciliation cache.
///
/// All mutation goes through `&self` behind a `parking_lot::RwLock`, so the
/// service can be shared (`Arc`) between the evaluator and concurrent
/// analysis readers. Entries are only ever added.
#[derive(Debug, Default)]
pub struct ReferenceService {
    state: RwLock<ServiceState>,
    probes: AtomicUsize,
}

impl ReferenceService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover a framework and seed both artifact sets with its layers.
    pub fn load_framework(
        &self,
        request: &FrameworkRequest,
        paths: &FrameworkSearchPaths,
    ) -> Result<Arc<SharedFrameworkDescriptor>, ResolutionError> {
        let descriptor = framework::discover(request, paths)?;
        let mut state = self.state.write();
        for layer in descriptor.layers() {
            if state.reference_dirs.contains(&layer.reference_dir) {
                continue;
            }
            state.register_layer(layer);
        }
        state.frameworks.push(Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Map execution artifacts to the analysis artifacts that stand for them.
    ///
    /// Dropped artifacts are absent from the result. Anonymous artifacts
    /// cannot be keyed and pass through unchanged.
    pub fn reconcile<'a, I>(&self, artifacts: I) -> ArtifactSet
    where
        I: IntoIterator<Item = &'a Arc<ReferenceArtifact>>,
    {
        let mut result = ArtifactSet::new();
        for artifact in artifacts {
            let Some(path) = artifact.path() else {
                result.insert(Arc::clone(artifact));
                continue;
            };
            if let Some(reconciled) = self.reconcile_path(path, artifact).artifact() {
                result.insert(Arc::clone(reconciled));
            }
        }
        result
    }

    fn reconcile_path(&self, path: &ArtifactPath, source: &Arc<ReferenceArtifact>) -> Reconciled {
        if let Some(hit) = self.state.read().cache.get(path) {
            tracing::trace!(path = %path, "reconciliation cache hit");
            return hit.clone();
        }

        let disposition = {
            let state = self.state.read();
            self.classify(&state, path, source)
        };
        tracing::debug!(path = %path, ?disposition, "reconciled execution artifact");

        let outcome = match disposition {
            Disposition::AlreadyAnalysis => Reconciled::Analysis(Arc::clone(source)),
            Disposition::Promote(reference) => Reconciled::Analysis(reference),
            Disposition::Drop => Reconciled::Dropped,
            Disposition::Synthesize(artifact) => Reconciled::Analysis(Arc::new(artifact)),
        };

        let mut state = self.state.write();
        // Another reconciliation may have raced us; the first insert wins.
        let outcome = state.cache.entry(path.clone()).or_insert(outcome).clone();
        if let Some(artifact) = outcome.artifact() {
            state.analysis.insert(Arc::clone(artifact));
        }
        outcome
    }

    fn classify(
        &self,
        state: &ServiceState,
        path: &ArtifactPath,
        source: &ReferenceArtifact,
    ) -> Disposition {
        if state.reference_dirs.iter().any(|dir| path.is_under(dir)) {
            return Disposition::AlreadyAnalysis;
        }

        let identity = source
            .identity()
            .cloned()
            .or_else(|| self.probe(|| read_identity(path.as_path())));

        // Indexed reference modules had their sibling documentation attached
        // when the framework was enumerated, so promotion needs no probe.
        if let Some(reference) = promotion_candidate(state, path, identity.as_ref()) {
            return Disposition::Promote(reference);
        }

        if state.execution_only_dirs.iter().any(|dir| path.is_under(dir)) {
            return Disposition::Drop;
        }

        let documentation = source
            .documentation()
            .map(Path::to_path_buf)
            .or_else(|| self.probe(|| sibling_documentation(path.as_path())));
        Disposition::Synthesize(
            ReferenceArtifact::from_file(path, ArtifactRole::Both)
                .with_identity(identity)
                .with_documentation(documentation),
        )
    }

    /// Run a filesystem probe, counting it.
    fn probe<T>(&self, f: impl FnOnce() -> T) -> T {
        self.probes.fetch_add(1, Ordering::Relaxed);
        f()
    }

    /// Add artifacts observed by a completed evaluation.
    ///
    /// Returns how many were not already recorded.
    pub fn record_execution_artifacts<'a, I>(&self, artifacts: I) -> usize
    where
        I: IntoIterator<Item = &'a Arc<ReferenceArtifact>>,
    {
        let mut state = self.state.write();
        let mut added = 0;
        for artifact in artifacts {
            if let Some(dir) = artifact.path().and_then(ArtifactPath::parent) {
                if !state.execution_dirs.contains(&dir) {
                    state.execution_dirs.push(dir);
                }
            }
            if state.execution.insert(Arc::clone(artifact)) {
                added += 1;
            }
        }
        added
    }

    /// Find an execution module by short name (`CoreLib` or `CoreLib.dll`).
    ///
    /// Recorded artifacts are consulted first, then every directory that has
    /// held a recorded artifact.
    pub fn find_execution_artifact(&self, short_name: &str) -> Option<Arc<ReferenceArtifact>> {
        let stem = short_name
            .strip_suffix(&format!(".{MODULE_EXTENSION}"))
            .unwrap_or(short_name);
        let state = self.state.read();

        let known = state.execution.iter().find(|artifact| {
            artifact
                .identity()
                .is_some_and(|id| id.name.eq_ignore_ascii_case(stem))
                || artifact.path().and_then(ArtifactPath::file_name).is_some_and(|name| {
                    name.eq_ignore_ascii_case(&format!("{stem}.{MODULE_EXTENSION}"))
                })
        });
        if let Some(known) = known {
            return Some(Arc::clone(known));
        }

        state.execution_dirs.iter().find_map(|dir| {
            let candidate = dir.as_path().join(format!("{stem}.{MODULE_EXTENSION}"));
            let identity = self.probe(|| read_identity(&candidate))?;
            Some(Arc::new(
                ReferenceArtifact::from_file(&candidate, ArtifactRole::ExecutionOnly)
                    .with_identity(Some(identity)),
            ))
        })
    }

    /// Snapshot of the accumulated analysis set.
    pub fn analysis_artifacts(&self) -> ArtifactSet {
        self.state.read().analysis.clone()
    }

    /// Snapshot of the accumulated execution set.
    pub fn execution_artifacts(&self) -> ArtifactSet {
        self.state.read().execution.clone()
    }

    /// Frameworks loaded so far, in load order.
    pub fn frameworks(&self) -> Vec<Arc<SharedFrameworkDescriptor>> {
        self.state.read().frameworks.clone()
    }

    /// Number of filesystem probes made while classifying.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::Relaxed)
    }

    /// Number of paths with a cached outcome.
    pub fn cached_len(&self) -> usize {
        self.state.read().cache.len()
    }
}

impl ServiceState {
    fn register_layer(&mut self, layer: &SharedFrameworkDescriptor) {
        self.reference_dirs.push(layer.reference_dir.clone());
        self.execution_only_dirs.push(layer.execution_dir.clone());
        self.execution_dirs.push(layer.execution_dir.clone());

        for reference in &layer.reference_artifacts {
            if let Some(name) = reference.path().and_then(ArtifactPath::file_name) {
                self.reference_index
                    .entry(name.to_ascii_lowercase())
                    .or_default()
                    .push(IndexedReference {
                        artifact: Arc::clone(reference),
                        depth: layer.depth,
                        declaring_execution_dir: layer.execution_dir.clone(),
                    });
            }
        }
        self.analysis.extend(layer.reference_artifacts.iter().cloned());
        self.execution.extend(layer.execution_artifacts.iter().cloned());
    }
}

/// Find the reference module standing in for an execution module.
///
/// Candidates must share the expected file name and the strong identity.
/// The framework whose execution directory holds `path` is preferred, then
/// deeper (more specific) layers before their ancestors.
fn promotion_candidate(
    state: &ServiceState,
    path: &ArtifactPath,
    identity: Option<&ModuleIdentity>,
) -> Option<Arc<ReferenceArtifact>> {
    let identity = identity?;
    let file_name = reference_file_name(path.as_path())?;
    let candidates = state.reference_index.get(&file_name.to_ascii_lowercase())?;

    candidates
        .iter()
        .filter(|c| c.artifact.identity() == Some(identity))
        .max_by_key(|c| (path.is_under(&c.declaring_execution_dir), c.depth))
        .map(|c| Arc::clone(&c.artifact))
}
