//! Strong module identity.
//!
//! Every managed module starts with a header line:
//!
//! ```text
//! kmod CoreLib, Version=6.0.0.0
//! ```
//!
//! The header is the module's strong identity: two files with equal identity
//! are interchangeable for analysis purposes. Files without a parseable header
//! are not managed modules and are skipped during enumeration.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// File extension of managed module files.
pub const MODULE_EXTENSION: &str = "dll";

/// File extension of documentation files that sit next to a module.
pub const DOCUMENTATION_EXTENSION: &str = "xml";

/// Leading keyword of a module header line.
pub const HEADER_KEYWORD: &str = "kmod";

/// Name and version that together identify a module.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleIdentity {
    pub name: String,
    pub version: String,
}

impl ModuleIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        ModuleIdentity {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parse the body of a header line, e.g. `CoreLib, Version=6.0.0.0`.
    ///
    /// The `kmod` keyword may be present or absent.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let text = text
            .strip_prefix(HEADER_KEYWORD)
            .map_or(text, str::trim_start);
        let (name, rest) = text.split_once(',')?;
        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return None;
        }
        let version = rest.trim().strip_prefix("Version=")?.trim();
        if version.is_empty() || !version.split('.').all(|part| part.parse::<u32>().is_ok()) {
            return None;
        }
        Some(ModuleIdentity::new(name, version))
    }

    /// Render the header line that [`read_identity`] recognizes.
    pub fn header_line(&self) -> String {
        format!("{HEADER_KEYWORD} {self}")
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Version={}", self.name, self.version)
    }
}

/// Whether the path carries the managed module extension.
pub fn has_module_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MODULE_EXTENSION))
}

/// Read the strong identity of a module file.
///
/// Returns `None` for files that are unreadable or carry no header; those
/// are simply not managed modules.
pub fn read_identity(path: &Path) -> Option<ModuleIdentity> {
    let file = File::open(path).ok()?;
    let mut first = String::new();
    BufReader::new(file).read_line(&mut first).ok()?;
    if !first.trim_start().starts_with(HEADER_KEYWORD) {
        return None;
    }
    ModuleIdentity::parse(&first)
}

/// The documentation file that would accompany `module`, if it exists.
pub fn sibling_documentation(module: &Path) -> Option<std::path::PathBuf> {
    let doc = module.with_extension(DOCUMENTATION_EXTENSION);
    doc.is_file().then_some(doc)
}

/// File name a reference module is expected to have for an execution module.
///
/// Native images carry a `.ni` infix (`Foo.ni.dll`); their reference
/// counterpart is `Foo.dll`.
pub fn reference_file_name(execution: &Path) -> Option<String> {
    let name = execution.file_name()?.to_str()?;
    let lower = name.to_ascii_lowercase();
    let suffix = format!(".ni.{MODULE_EXTENSION}");
    if lower.ends_with(&suffix) {
        let stem = &name[..name.len() - suffix.len()];
        return Some(format!("{stem}.{MODULE_EXTENSION}"));
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests;
