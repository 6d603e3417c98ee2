//! Plain assembly directives: a module file path or a short module name.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_refs::identity::{has_module_extension, read_identity};
use kiln_refs::{ArtifactRole, ReferenceArtifact, ReferenceService, ResolutionError, MODULE_EXTENSION};
use kiln_script::CancellationToken;

use super::ReferenceResolver;
use crate::directive::ReferenceDirective;
use crate::error::ResolveFailure;

/// Fallback resolver; recognizes every directive.
pub struct AssemblyResolver {
    service: Arc<ReferenceService>,
    base_dir: PathBuf,
}

impl AssemblyResolver {
    pub fn new(service: Arc<ReferenceService>, base_dir: PathBuf) -> Self {
        AssemblyResolver { service, base_dir }
    }

    fn artifact(path: PathBuf) -> Arc<ReferenceArtifact> {
        let identity = read_identity(&path);
        Arc::new(ReferenceArtifact::from_file(&path, ArtifactRole::ExecutionOnly).with_identity(identity))
    }
}

impl ReferenceResolver for AssemblyResolver {
    fn name(&self) -> &'static str {
        "assembly"
    }

    fn recognizes(&self, _directive: &ReferenceDirective) -> bool {
        true
    }

    fn resolve(
        &self,
        directive: &ReferenceDirective,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Arc<ReferenceArtifact>>, ResolveFailure> {
        let value = directive.value.trim();
        let not_found = || ResolveFailure::from(ResolutionError::AssemblyNotFound(value.to_string()));
        if value.is_empty() {
            return Err(not_found());
        }

        let looks_like_path = value.contains(['/', '\\']) || has_module_extension(Path::new(value));
        if looks_like_path {
            let path = self.base_dir.join(value);
            return if path.is_file() {
                Ok(vec![Self::artifact(path)])
            } else {
                Err(not_found())
            };
        }

        if let Some(known) = self.service.find_execution_artifact(value) {
            return Ok(vec![known]);
        }
        let local = self.base_dir.join(format!("{value}.{MODULE_EXTENSION}"));
        if local.is_file() {
            return Ok(vec![Self::artifact(local)]);
        }
        Err(not_found())
    }
}
