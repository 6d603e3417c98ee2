//! Session configuration.
//!
//! Built with `with_*` methods on top of [`SessionConfig::default`] or
//! [`SessionConfig::from_env`]. The front end applies command-line flags on
//! top of the environment.

use std::path::PathBuf;
use std::time::Duration;

use kiln_refs::{FrameworkRequest, FrameworkSearchPaths};

/// Install root override.
pub const ROOT_VAR: &str = "KILN_ROOT";
/// Package-manager cache override.
pub const PACKAGES_VAR: &str = "KILN_PACKAGES";
/// Local package feed.
pub const FEED_VAR: &str = "KILN_FEED";
/// Build command, whitespace separated.
pub const BUILD_VAR: &str = "KILN_BUILD";

/// Build command used when none is configured.
pub const DEFAULT_BUILD_COMMAND: &str = "kiln-build";

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub framework: FrameworkRequest,
    /// Imports in effect from the first submission.
    pub imports: Vec<String>,
    /// Reference directive values resolved at startup.
    pub references: Vec<String>,
    /// Script arguments (`arg(i)` / `argc()`).
    pub args: Vec<String>,
    pub search_paths: FrameworkSearchPaths,
    pub package_feed: Option<PathBuf>,
    /// Program and leading arguments; the project path is appended.
    pub build_command: Vec<String>,
    /// Relative reference paths resolve against this directory.
    pub base_dir: PathBuf,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            framework: FrameworkRequest::base(),
            imports: Vec::new(),
            references: Vec::new(),
            args: Vec::new(),
            search_paths: FrameworkSearchPaths::default(),
            package_feed: None,
            build_command: vec![DEFAULT_BUILD_COMMAND.to_string()],
            base_dir: PathBuf::from("."),
            cache_capacity: 256,
            cache_ttl: Duration::from_secs(2),
        }
    }
}

impl SessionConfig {
    /// Defaults, overridden by `KILN_*` variables.
    ///
    /// Without overrides the install root is `~/.kiln` and the package cache
    /// `~/.kiln/packages`.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let home = dirs::home_dir().map(|home| home.join(".kiln"));
        let install_root = var(ROOT_VAR).map(PathBuf::from).or_else(|| home.clone());
        let package_cache = var(PACKAGES_VAR)
            .map(PathBuf::from)
            .or_else(|| home.map(|home| home.join("packages")));

        let mut config = SessionConfig {
            search_paths: FrameworkSearchPaths {
                install_roots: install_root.into_iter().collect(),
                package_cache,
            },
            package_feed: var(FEED_VAR).map(PathBuf::from),
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            ..SessionConfig::default()
        };
        if let Some(command) = var(BUILD_VAR) {
            let command: Vec<String> = command.split_whitespace().map(str::to_string).collect();
            if !command.is_empty() {
                config.build_command = command;
            }
        }
        config
    }

    #[must_use]
    pub fn with_framework(mut self, framework: FrameworkRequest) -> Self {
        self.framework = framework;
        self
    }

    #[must_use]
    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.imports.push(import.into());
        self
    }

    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_install_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_paths.install_roots.push(root.into());
        self
    }

    #[must_use]
    pub fn with_package_cache(mut self, cache: impl Into<PathBuf>) -> Self {
        self.search_paths.package_cache = Some(cache.into());
        self
    }

    #[must_use]
    pub fn with_package_feed(mut self, feed: impl Into<PathBuf>) -> Self {
        self.package_feed = Some(feed.into());
        self
    }

    #[must_use]
    pub fn with_build_command(mut self, command: Vec<String>) -> Self {
        self.build_command = command;
        self
    }

    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_cache(mut self, capacity: usize, ttl: Duration) -> Self {
        self.cache_capacity = capacity;
        self.cache_ttl = ttl;
        self
    }
}
