//! Analysis workspace.
//!
//! Editor-style queries read an [`AnalysisDocument`] that mirrors the
//! session: the committed text of every submission that advanced the
//! evaluation chain, the reconciled analysis artifacts, and the accumulated
//! imports. Each commit replaces the current document with a new one in a new
//! project chained to the previous project. A project keeps only its own
//! submission; the joined body lives in the current document. Published
//! projects and documents are never mutated, so a query keeps working on the
//! snapshot it captured.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kiln_refs::ArtifactSet;
use kiln_script::module::Admission;
use kiln_script::ModuleTable;
use parking_lot::RwLock;

use crate::evaluator::Success;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Identity of one analysis project. Never reused within a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(u64);

impl ProjectId {
    pub(crate) fn fresh() -> Self {
        ProjectId(next_id())
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project#{}", self.0)
    }
}

/// Identity of one analysis document. Never reused within a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    pub(crate) fn fresh() -> Self {
        DocumentId(next_id())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document#{}", self.0)
    }
}

/// The analysis view after some number of committed submissions.
#[derive(Debug)]
pub struct AnalysisProject {
    id: ProjectId,
    artifacts: ArtifactSet,
    imports: BTreeSet<String>,
    /// Modules loaded from the analysis artifacts.
    modules: Arc<ModuleTable>,
    submission: Arc<str>,
    previous: Option<Arc<AnalysisProject>>,
}

impl AnalysisProject {
    fn new(
        artifacts: ArtifactSet,
        imports: BTreeSet<String>,
        submission: Arc<str>,
        previous: Option<Arc<AnalysisProject>>,
    ) -> Self {
        // The module table is shared with the previous project until an
        // artifact it has not seen shows up.
        let modules = match &previous {
            Some(p) if analysis_paths(&artifacts).all(|path| p.modules.contains_path(path)) => {
                Arc::clone(&p.modules)
            }
            _ => {
                let inherited = previous.as_ref().map(|p| ModuleTable::clone(&p.modules));
                Arc::new(load_analysis_modules(inherited.unwrap_or_default(), &artifacts))
            }
        };
        AnalysisProject {
            id: ProjectId::fresh(),
            artifacts,
            imports,
            modules,
            submission,
            previous,
        }
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    pub fn imports(&self) -> &BTreeSet<String> {
        &self.imports
    }

    pub fn modules(&self) -> &ModuleTable {
        &self.modules
    }

    /// The text this project added to its predecessor.
    pub fn submission(&self) -> &str {
        &self.submission
    }

    /// Every committed submission from the start of the chain, joined.
    pub fn committed_text(&self) -> String {
        let mut segments: Vec<&str> =
            std::iter::successors(Some(self), |p| p.previous.as_deref())
                .map(AnalysisProject::submission)
                .collect();
        segments.reverse();
        let mut text = String::new();
        for segment in segments {
            append_segment(&mut text, segment);
        }
        text
    }

    pub fn previous(&self) -> Option<&Arc<AnalysisProject>> {
        self.previous.as_ref()
    }

    /// Length of the chain behind this project.
    pub fn ancestor_count(&self) -> usize {
        std::iter::successors(self.previous.as_deref(), |p| p.previous.as_deref()).count()
    }
}

impl Drop for AnalysisProject {
    fn drop(&mut self) {
        // Unlink the chain iteratively; a long session would otherwise drop
        // one recursion level per submission.
        let mut previous = self.previous.take();
        while let Some(project) = previous {
            previous = match Arc::try_unwrap(project) {
                Ok(mut project) => project.previous.take(),
                Err(_) => None,
            };
        }
    }
}

/// Append a committed submission to a document body, one per line.
fn append_segment(text: &mut String, segment: &str) {
    if segment.is_empty() {
        return;
    }
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(segment);
}

fn analysis_paths(artifacts: &ArtifactSet) -> impl Iterator<Item = &Path> {
    artifacts
        .iter()
        .filter(|artifact| artifact.role().serves_analysis())
        .filter_map(|artifact| artifact.path())
        .map(|path| path.as_path())
}

/// Load every analysis-serving artifact not already in `modules`.
///
/// Files that are not readable modules are skipped; analysis degrades to
/// whatever did load.
fn load_analysis_modules(mut modules: ModuleTable, artifacts: &ArtifactSet) -> ModuleTable {
    for path in analysis_paths(artifacts) {
        match modules.load(path) {
            Ok(Admission::Added | Admission::AlreadyLoaded) => {}
            Ok(Admission::Conflict { loaded }) => {
                tracing::warn!(path = %path.display(), %loaded, "analysis module conflicts with a loaded module");
            }
            Err(err) => tracing::warn!(%err, "skipping analysis artifact"),
        }
    }
    modules
}

/// Text analyzed against a project.
#[derive(Debug)]
pub struct AnalysisDocument {
    id: DocumentId,
    project: Arc<AnalysisProject>,
    text: String,
    committed: bool,
}

impl AnalysisDocument {
    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn project(&self) -> &Arc<AnalysisProject> {
        &self.project
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether this is the session's document rather than a candidate.
    pub fn is_committed(&self) -> bool {
        self.committed
    }
}

/// Owner of the session's current analysis document.
#[derive(Debug)]
pub struct WorkspaceManager {
    current: RwLock<Arc<AnalysisDocument>>,
}

impl WorkspaceManager {
    /// An empty document in a project seeded with the startup artifacts.
    pub fn initialize(artifacts: ArtifactSet, imports: BTreeSet<String>) -> Self {
        let project = Arc::new(AnalysisProject::new(artifacts, imports, Arc::from(""), None));
        tracing::debug!(project = %project.id, modules = project.modules.len(), "workspace initialized");
        WorkspaceManager {
            current: RwLock::new(Arc::new(AnalysisDocument {
                id: DocumentId::fresh(),
                project,
                text: String::new(),
                committed: true,
            })),
        }
    }

    /// Snapshot of the current document.
    pub fn current_document(&self) -> Arc<AnalysisDocument> {
        Arc::clone(&*self.current.read())
    }

    /// Fold a committed submission into a new current document.
    ///
    /// An empty submission still starts a new project, since the artifacts
    /// and imports may have moved.
    pub fn update_current_document(&self, success: &Success) -> Arc<AnalysisDocument> {
        let mut current = self.current.write();
        let previous = Arc::clone(&current.project);

        let mut text = current.text.clone();
        append_segment(&mut text, &success.text);

        let project = Arc::new(AnalysisProject::new(
            success.artifacts.clone(),
            success.imports.clone(),
            Arc::from(success.text.as_str()),
            Some(previous),
        ));
        let document = Arc::new(AnalysisDocument {
            id: DocumentId::fresh(),
            project,
            text,
            committed: true,
        });
        tracing::debug!(
            project = %document.project.id,
            document = %document.id,
            artifacts = document.project.artifacts.len(),
            "workspace document updated"
        );
        *current = Arc::clone(&document);
        document
    }

    /// A throwaway document holding `candidate` in the current project.
    pub fn with_text(&self, candidate: &str) -> AnalysisDocument {
        let project = Arc::clone(&self.current.read().project);
        AnalysisDocument {
            id: DocumentId::fresh(),
            project,
            text: candidate.to_string(),
            committed: false,
        }
    }
}
