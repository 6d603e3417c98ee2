//! Resolution errors.
//!
//! A `ResolutionError` means a requested framework, package, project or
//! assembly could not be turned into artifacts. At directive level it fails
//! only that submission; during the initial framework load it is fatal.

use std::fmt;
use std::path::PathBuf;

/// Something a reference directive or framework request asked for could not be found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// No install root or package cache held a usable framework pair.
    #[error("could not locate shared framework '{request}'; tried:{}", TriedList(.tried))]
    FrameworkNotFound {
        request: String,
        tried: Vec<PathBuf>,
    },

    /// The framework request string was malformed.
    #[error("invalid framework request '{0}': expected `Name` or `Name/Major.Minor.Patch`")]
    InvalidFrameworkRequest(String),

    /// A package directive named a package (or version) the feed does not have.
    #[error("package '{name}'{} could not be resolved{}", VersionSuffix(.version.as_deref()), FeedSuffix(.feed.as_ref()))]
    PackageNotFound {
        name: String,
        version: Option<String>,
        feed: Option<PathBuf>,
    },

    /// A project or solution build did not produce usable artifacts.
    #[error("build of '{}' failed: {message}", .project.display())]
    BuildFailed { project: PathBuf, message: String },

    /// A plain assembly directive named a file or module that does not exist.
    #[error("assembly '{0}' could not be found")]
    AssemblyNotFound(String),

    /// Reading a directory or file failed while resolving.
    #[error("could not read '{}': {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

impl ResolutionError {
    /// Wrap an I/O failure with the path that caused it.
    #[cold]
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        ResolutionError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

struct TriedList<'a>(&'a [PathBuf]);

impl fmt::Display for TriedList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, " (no candidate directories)");
        }
        for path in self.0 {
            write!(f, "\n  {}", path.display())?;
        }
        Ok(())
    }
}

struct VersionSuffix<'a>(Option<&'a str>);

impl fmt::Display for VersionSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(version) => write!(f, " version {version}"),
            None => Ok(()),
        }
    }
}

struct FeedSuffix<'a>(Option<&'a PathBuf>);

impl fmt::Display for FeedSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(feed) => write!(f, " from feed '{}'", feed.display()),
            None => write!(f, " (no package feed configured)"),
        }
    }
}
