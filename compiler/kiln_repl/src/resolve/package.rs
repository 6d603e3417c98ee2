//! Package directives against a local feed.
//!
//! Feed layout:
//!
//! ```text
//! <feed>/<name-lowercase>/<version>/lib/*.dll
//! <feed>/<name-lowercase>/<version>/package.deps   (optional, one `Name[, version]` per line)
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_refs::framework::enumerate_modules;
use kiln_refs::{select_version, ArtifactRole, ReferenceArtifact, ResolutionError};
use kiln_script::CancellationToken;
use rustc_hash::FxHashSet;

use super::ReferenceResolver;
use crate::directive::ReferenceDirective;
use crate::error::ResolveFailure;

const SCHEME: &str = "package";
const DEPENDENCY_FILE: &str = "package.deps";

/// A package name and optional exact version.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PackageSpec {
    pub name: String,
    pub version: Option<String>,
}

impl PackageSpec {
    /// `Name` or `Name, version`.
    pub fn parse(text: &str) -> Option<Self> {
        let (name, version) = match text.split_once(',') {
            Some((name, version)) => (name.trim(), Some(version.trim())),
            None => (text.trim(), None),
        };
        if name.is_empty() || name.contains(char::is_whitespace) {
            return None;
        }
        Some(PackageSpec {
            name: name.to_string(),
            version: version.filter(|v| !v.is_empty()).map(str::to_string),
        })
    }
}

pub struct PackageResolver {
    feed: Option<PathBuf>,
}

impl PackageResolver {
    pub fn new(feed: Option<PathBuf>) -> Self {
        PackageResolver { feed }
    }

    fn not_found(&self, spec: &PackageSpec) -> ResolveFailure {
        ResolutionError::PackageNotFound {
            name: spec.name.clone(),
            version: spec.version.clone(),
            feed: self.feed.clone(),
        }
        .into()
    }

    /// Resolve `spec` and its dependencies depth first, skipping packages seen before.
    fn resolve_into(
        &self,
        feed: &Path,
        spec: &PackageSpec,
        seen: &mut FxHashSet<String>,
        artifacts: &mut Vec<Arc<ReferenceArtifact>>,
        cancel: &CancellationToken,
    ) -> Result<(), ResolveFailure> {
        if cancel.is_cancelled() {
            return Err(ResolveFailure::Cancelled);
        }
        if !seen.insert(spec.name.to_ascii_lowercase()) {
            return Ok(());
        }

        let package_dir = feed.join(spec.name.to_ascii_lowercase());
        let version = self.pick_version(&package_dir, spec)?;
        let version_dir = package_dir.join(&version);
        tracing::debug!(package = %spec.name, %version, "package resolved");

        let lib = version_dir.join("lib");
        if lib.is_dir() {
            let modules = enumerate_modules(&lib, ArtifactRole::ExecutionOnly)?;
            artifacts.extend(modules.iter().cloned());
        }

        for dependency in read_dependencies(&version_dir.join(DEPENDENCY_FILE))? {
            self.resolve_into(feed, &dependency, seen, artifacts, cancel)?;
        }
        Ok(())
    }

    fn pick_version(&self, package_dir: &Path, spec: &PackageSpec) -> Result<String, ResolveFailure> {
        if let Some(version) = &spec.version {
            return if package_dir.join(version).is_dir() {
                Ok(version.clone())
            } else {
                Err(self.not_found(spec))
            };
        }
        let Ok(entries) = fs::read_dir(package_dir) else {
            return Err(self.not_found(spec));
        };
        let versions: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        select_version(versions.iter().map(String::as_str), None)
            .map(|version| version.as_str().to_string())
            .ok_or_else(|| self.not_found(spec))
    }
}

fn read_dependencies(path: &Path) -> Result<Vec<PackageSpec>, ResolutionError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path).map_err(|e| ResolutionError::io(path, &e))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(PackageSpec::parse)
        .collect())
}

impl ReferenceResolver for PackageResolver {
    fn name(&self) -> &'static str {
        "package"
    }

    fn recognizes(&self, directive: &ReferenceDirective) -> bool {
        directive.strip_scheme(SCHEME).is_some()
    }

    fn resolve(
        &self,
        directive: &ReferenceDirective,
        cancel: &CancellationToken,
    ) -> Result<Vec<Arc<ReferenceArtifact>>, ResolveFailure> {
        let text = directive.strip_scheme(SCHEME).unwrap_or_default();
        let Some(spec) = PackageSpec::parse(text) else {
            return Err(ResolutionError::PackageNotFound {
                name: text.to_string(),
                version: None,
                feed: self.feed.clone(),
            }
            .into());
        };
        let Some(feed) = &self.feed else {
            return Err(self.not_found(&spec));
        };

        let mut artifacts = Vec::new();
        self.resolve_into(feed, &spec, &mut FxHashSet::default(), &mut artifacts, cancel)?;
        Ok(artifacts)
    }
}
