//! Shared framework discovery.
//!
//! A shared framework is a named, versioned bundle of execution and reference
//! modules. Two on-disk layouts are understood, tried in order:
//!
//! ```text
//! <install-root>/shared/<Name>/<version>/            execution modules
//! <install-root>/packs/<Name>.Ref/<version>/ref/     reference modules
//!
//! <package-cache>/<name>.runtime/<version>/lib/      execution modules
//! <package-cache>/<name>.ref/<version>/ref/          reference modules
//! ```
//!
//! Every framework other than [`BASE_FRAMEWORK`] is layered on the base one,
//! which is loaded first at the same major.minor.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use rayon::prelude::*;

use crate::artifact::{ArtifactPath, ArtifactRole, ArtifactSet, ReferenceArtifact};
use crate::error::ResolutionError;
use crate::identity::{has_module_extension, read_identity, sibling_documentation};
use crate::version::{select_version, FrameworkVersion};

/// Name of the base runtime framework every other framework depends on.
pub const BASE_FRAMEWORK: &str = "Kiln.Core";

/// A framework request: `Name` or `Name/Major.Minor.Patch`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameworkRequest {
    pub name: String,
    pub version: Option<FrameworkVersion>,
}

impl FrameworkRequest {
    pub fn new(name: impl Into<String>, version: Option<FrameworkVersion>) -> Self {
        FrameworkRequest {
            name: name.into(),
            version,
        }
    }

    /// The base framework at no particular version.
    pub fn base() -> Self {
        FrameworkRequest::new(BASE_FRAMEWORK, None)
    }

    pub fn is_base(&self) -> bool {
        self.name.eq_ignore_ascii_case(BASE_FRAMEWORK)
    }
}

impl FromStr for FrameworkRequest {
    type Err = ResolutionError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || ResolutionError::InvalidFrameworkRequest(text.to_string());
        let (name, version) = match text.trim().split_once('/') {
            Some((name, version)) => {
                let version = FrameworkVersion::parse(version).ok_or_else(invalid)?;
                (name.trim(), Some(version))
            }
            None => (text.trim(), None),
        };
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(invalid());
        }
        Ok(FrameworkRequest::new(name, version))
    }
}

impl fmt::Display for FrameworkRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}/{version}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Where to look for installed frameworks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameworkSearchPaths {
    /// Global runtime install roots, tried in order.
    pub install_roots: Vec<PathBuf>,
    /// Package-manager cache, tried after every install root.
    pub package_cache: Option<PathBuf>,
}

/// One discovered framework layer. Immutable once built.
#[derive(Debug)]
pub struct SharedFrameworkDescriptor {
    pub name: String,
    pub version: FrameworkVersion,
    pub reference_dir: ArtifactPath,
    pub execution_dir: ArtifactPath,
    pub reference_artifacts: ArtifactSet,
    pub execution_artifacts: ArtifactSet,
    /// 0 for the base framework, 1 for a framework layered on it.
    pub depth: usize,
    pub base: Option<Arc<SharedFrameworkDescriptor>>,
}

impl SharedFrameworkDescriptor {
    /// This layer followed by its ancestors, most specific first.
    pub fn layers(&self) -> impl Iterator<Item = &SharedFrameworkDescriptor> {
        std::iter::successors(Some(self), |layer| layer.base.as_deref())
    }
}

/// Candidate directory pair for one layout under one root.
struct Location {
    execution_dir: PathBuf,
    reference_dir: PathBuf,
    version: FrameworkVersion,
}

/// Discover a framework (and, transitively, its base).
pub fn discover(
    request: &FrameworkRequest,
    paths: &FrameworkSearchPaths,
) -> Result<Arc<SharedFrameworkDescriptor>, ResolutionError> {
    let mut tried = Vec::new();
    let Some(location) = locate(request, paths, &mut tried) else {
        return Err(ResolutionError::FrameworkNotFound {
            request: request.to_string(),
            tried,
        });
    };

    let base = if request.is_base() {
        None
    } else {
        let base_version = FrameworkVersion::parse(&location.version.major_minor());
        let base_request = FrameworkRequest::new(BASE_FRAMEWORK, base_version);
        Some(discover(&base_request, paths)?)
    };
    let depth = base.as_ref().map_or(0, |b| b.depth + 1);

    let reference_artifacts = enumerate_modules(&location.reference_dir, ArtifactRole::AnalysisOnly)?;
    let execution_artifacts = enumerate_modules(&location.execution_dir, ArtifactRole::ExecutionOnly)?;

    tracing::info!(
        framework = %request.name,
        version = %location.version,
        references = reference_artifacts.len(),
        executables = execution_artifacts.len(),
        "loaded shared framework"
    );

    Ok(Arc::new(SharedFrameworkDescriptor {
        name: request.name.clone(),
        version: location.version,
        reference_dir: ArtifactPath::new(&location.reference_dir),
        execution_dir: ArtifactPath::new(&location.execution_dir),
        reference_artifacts,
        execution_artifacts,
        depth,
        base,
    }))
}

/// Try every install root, then the package cache.
fn locate(
    request: &FrameworkRequest,
    paths: &FrameworkSearchPaths,
    tried: &mut Vec<PathBuf>,
) -> Option<Location> {
    for root in &paths.install_roots {
        let execution_parent = root.join("shared").join(&request.name);
        let reference_parent = root.join("packs").join(format!("{}.Ref", request.name));
        if let Some(location) =
            locate_pair(request, &execution_parent, &reference_parent, Path::new("ref"), tried)
        {
            return Some(location);
        }
    }

    if let Some(cache) = &paths.package_cache {
        let lower = request.name.to_ascii_lowercase();
        let execution_parent = cache.join(format!("{lower}.runtime"));
        let reference_parent = cache.join(format!("{lower}.ref"));
        let location = locate_pair(request, &execution_parent, &reference_parent, Path::new("ref"), tried)
            .map(|mut loc| {
                loc.execution_dir = loc.execution_dir.join("lib");
                loc
            });
        if location.as_ref().is_some_and(|loc| loc.execution_dir.is_dir()) {
            return location;
        }
        if let Some(loc) = location {
            tried.push(loc.execution_dir);
        }
    }

    None
}

/// Select an execution version, then a reference version with the same major.minor.
fn locate_pair(
    request: &FrameworkRequest,
    execution_parent: &Path,
    reference_parent: &Path,
    reference_leaf: &Path,
    tried: &mut Vec<PathBuf>,
) -> Option<Location> {
    tried.push(execution_parent.to_path_buf());
    let execution_versions = subdirectory_names(execution_parent);
    let version = select_version(
        execution_versions.iter().map(String::as_str),
        request.version.as_ref(),
    )?;

    tried.push(reference_parent.to_path_buf());
    let reference_versions = subdirectory_names(reference_parent);
    let prefix = FrameworkVersion::parse(&version.major_minor())?;
    let reference_version = select_version(reference_versions.iter().map(String::as_str), Some(&prefix))?;

    let reference_dir = reference_parent.join(reference_version.as_str()).join(reference_leaf);
    if !reference_dir.is_dir() {
        tried.push(reference_dir);
        return None;
    }

    tracing::debug!(
        framework = %request.name,
        execution = %execution_parent.display(),
        reference = %reference_dir.display(),
        "framework directories located"
    );

    Some(Location {
        execution_dir: execution_parent.join(version.as_str()),
        reference_dir,
        version,
    })
}

fn subdirectory_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect()
}

/// Enumerate the managed modules directly inside `dir`.
///
/// Classification reads each candidate's header, so it runs on the rayon
/// pool; the resulting set is ordered by file name.
pub fn enumerate_modules(dir: &Path, role: ArtifactRole) -> Result<ArtifactSet, ResolutionError> {
    let entries = fs::read_dir(dir).map_err(|e| ResolutionError::io(dir, &e))?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_module_extension(path))
        .collect();
    candidates.sort();

    let artifacts: Vec<Arc<ReferenceArtifact>> = candidates
        .par_iter()
        .filter_map(|path| {
            let Some(identity) = read_identity(path) else {
                tracing::warn!(path = %path.display(), "skipping file without module header");
                return None;
            };
            let documentation = if role.serves_analysis() {
                sibling_documentation(path)
            } else {
                None
            };
            Some(Arc::new(
                ReferenceArtifact::from_file(path, role)
                    .with_identity(Some(identity))
                    .with_documentation(documentation),
            ))
        })
        .collect();

    Ok(artifacts.into_iter().collect())
}

#[cfg(test)]
mod tests;
