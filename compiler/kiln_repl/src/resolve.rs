//! Reference resolvers.
//!
//! Each resolver claims a class of `#r` directives and turns them into
//! execution artifacts. The chain asks resolvers in a fixed order and the
//! first one that recognizes a directive owns it:
//!
//! ```text
//! package: Name[, version]   ──► PackageResolver   (local feed)
//! *.kproj | *.ksln | project: ──► ProjectResolver   (build subprocess)
//! anything else               ──► AssemblyResolver  (file or short name)
//! ```

mod assembly;
mod package;
mod project;

use std::sync::Arc;

use kiln_refs::{ReferenceArtifact, ReferenceService};
use kiln_script::CancellationToken;

pub use assembly::AssemblyResolver;
pub use package::PackageResolver;
pub use project::ProjectResolver;

use crate::config::SessionConfig;
use crate::directive::ReferenceDirective;
use crate::error::ResolveFailure;

/// Turns one class of reference directive into execution artifacts.
pub trait ReferenceResolver: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn recognizes(&self, directive: &ReferenceDirective) -> bool;

    /// Resolve a recognized directive. Long-running work polls `cancel`.
    fn resolve(
        &self,
        directive: &ReferenceDirective,
        cancel: &CancellationToken,
    ) -> Result<Vec<Arc<ReferenceArtifact>>, ResolveFailure>;
}

/// Resolvers in priority order.
pub struct ResolverChain {
    resolvers: Vec<Box<dyn ReferenceResolver>>,
}

impl ResolverChain {
    pub fn new(resolvers: Vec<Box<dyn ReferenceResolver>>) -> Self {
        ResolverChain { resolvers }
    }

    /// Package, then project build, then plain assembly.
    pub fn standard(config: &SessionConfig, service: Arc<ReferenceService>) -> Self {
        ResolverChain::new(vec![
            Box::new(PackageResolver::new(config.package_feed.clone())),
            Box::new(ProjectResolver::new(
                config.build_command.clone(),
                config.base_dir.clone(),
            )),
            Box::new(AssemblyResolver::new(service, config.base_dir.clone())),
        ])
    }

    /// The first resolver that recognizes `directive`.
    pub fn find(&self, directive: &ReferenceDirective) -> Option<&dyn ReferenceResolver> {
        self.resolvers
            .iter()
            .find(|resolver| resolver.recognizes(directive))
            .map(|resolver| &**resolver)
    }

    /// Resolve with the owning resolver; `None` when nobody claims it.
    pub fn resolve(
        &self,
        directive: &ReferenceDirective,
        cancel: &CancellationToken,
    ) -> Option<Result<Vec<Arc<ReferenceArtifact>>, ResolveFailure>> {
        let resolver = self.find(directive)?;
        tracing::debug!(
            resolver = resolver.name(),
            value = %directive.value,
            "resolving reference directive"
        );
        Some(resolver.resolve(directive, cancel))
    }
}
