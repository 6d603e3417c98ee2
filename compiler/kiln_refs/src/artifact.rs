//! Reference artifacts and artifact sets.
//!
//! An artifact is one compiled module file. Identity is the *normalized*
//! display path, never object identity: two artifacts that resolve to the
//! same path are the same artifact, whichever role or documentation they
//! carry.

use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::identity::ModuleIdentity;

/// A lexically normalized artifact path.
///
/// `.` components are dropped and `..` pops the previous component. No
/// filesystem access happens here, so building a key never counts as a probe.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactPath(PathBuf);

impl ArtifactPath {
    pub fn new(path: impl AsRef<Path>) -> Self {
        ArtifactPath(normalize_path(path.as_ref()))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Whether this path lies at or below `dir` (also normalized).
    pub fn is_under(&self, dir: &ArtifactPath) -> bool {
        self.0.starts_with(&dir.0)
    }

    /// The normalized parent directory.
    pub fn parent(&self) -> Option<ArtifactPath> {
        self.0.parent().map(|p| ArtifactPath(p.to_path_buf()))
    }

    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|n| n.to_str())
    }
}

impl AsRef<Path> for ArtifactPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Normalize a path by resolving `.` and `..` components.
fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => result.push(component),
        }
    }
    result
}

/// Which side of the session an artifact serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactRole {
    /// Implementation module; runs code but is not fit for analysis.
    ExecutionOnly,
    /// Reference module; may lack method bodies.
    AnalysisOnly,
    /// The same file serves execution and analysis.
    Both,
}

impl ArtifactRole {
    pub fn serves_analysis(self) -> bool {
        matches!(self, ArtifactRole::AnalysisOnly | ArtifactRole::Both)
    }

    pub fn serves_execution(self) -> bool {
        matches!(self, ArtifactRole::ExecutionOnly | ArtifactRole::Both)
    }
}

/// One dependency unit.
#[derive(Clone, Debug)]
pub struct ReferenceArtifact {
    path: Option<ArtifactPath>,
    role: ArtifactRole,
    documentation: Option<PathBuf>,
    identity: Option<ModuleIdentity>,
}

impl ReferenceArtifact {
    /// An artifact backed by a file on disk.
    pub fn from_file(path: impl AsRef<Path>, role: ArtifactRole) -> Self {
        ReferenceArtifact {
            path: Some(ArtifactPath::new(path)),
            role,
            documentation: None,
            identity: None,
        }
    }

    /// An artifact with no display path (e.g. an in-memory module).
    pub fn anonymous(role: ArtifactRole) -> Self {
        ReferenceArtifact {
            path: None,
            role,
            documentation: None,
            identity: None,
        }
    }

    #[must_use]
    pub fn with_documentation(mut self, documentation: Option<PathBuf>) -> Self {
        self.documentation = documentation;
        self
    }

    #[must_use]
    pub fn with_identity(mut self, identity: Option<ModuleIdentity>) -> Self {
        self.identity = identity;
        self
    }

    pub fn path(&self) -> Option<&ArtifactPath> {
        self.path.as_ref()
    }

    pub fn role(&self) -> ArtifactRole {
        self.role
    }

    pub fn documentation(&self) -> Option<&Path> {
        self.documentation.as_deref()
    }

    pub fn identity(&self) -> Option<&ModuleIdentity> {
        self.identity.as_ref()
    }

    /// Display string: the normalized path, or `<anonymous>`.
    pub fn display(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| "<anonymous>".to_string(), ToString::to_string)
    }
}

impl PartialEq for ReferenceArtifact {
    fn eq(&self, other: &Self) -> bool {
        match (&self.path, &other.path) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ReferenceArtifact {}

impl Hash for ReferenceArtifact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

/// Insertion-ordered set of artifacts, deduplicated by normalized path.
///
/// Anonymous artifacts cannot be deduplicated and are kept as given.
#[derive(Clone, Debug, Default)]
pub struct ArtifactSet {
    items: Vec<Arc<ReferenceArtifact>>,
    keys: FxHashSet<ArtifactPath>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an artifact. Returns `false` if its path was already present.
    pub fn insert(&mut self, artifact: Arc<ReferenceArtifact>) -> bool {
        if let Some(path) = artifact.path() {
            if !self.keys.insert(path.clone()) {
                return false;
            }
        }
        self.items.push(artifact);
        true
    }

    /// Insert every artifact of `other`; returns how many were new.
    pub fn extend(&mut self, other: impl IntoIterator<Item = Arc<ReferenceArtifact>>) -> usize {
        other
            .into_iter()
            .map(|a| usize::from(self.insert(a)))
            .sum()
    }

    /// Union of two sets; `self` keeps its order, new entries are appended.
    #[must_use]
    pub fn union(&self, other: &ArtifactSet) -> ArtifactSet {
        let mut result = self.clone();
        result.extend(other.iter().cloned());
        result
    }

    pub fn contains(&self, path: &ArtifactPath) -> bool {
        self.keys.contains(path)
    }

    /// Whether every keyed artifact of `other` is present here.
    pub fn is_superset_of(&self, other: &ArtifactSet) -> bool {
        other.keys.iter().all(|k| self.keys.contains(k))
    }

    pub fn get(&self, path: &ArtifactPath) -> Option<&Arc<ReferenceArtifact>> {
        if !self.keys.contains(path) {
            return None;
        }
        self.items.iter().find(|a| a.path() == Some(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ReferenceArtifact>> {
        self.items.iter()
    }

    /// Paths of all keyed artifacts, in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &ArtifactPath> {
        self.items.iter().filter_map(|a| a.path())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Arc<ReferenceArtifact>> for ArtifactSet {
    fn from_iter<I: IntoIterator<Item = Arc<ReferenceArtifact>>>(iter: I) -> Self {
        let mut set = ArtifactSet::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a ArtifactSet {
    type Item = &'a Arc<ReferenceArtifact>;
    type IntoIter = std::slice::Iter<'a, Arc<ReferenceArtifact>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests;
