//! Managed module files and the table of loaded modules.
//!
//! A module file is a header line followed by exports:
//!
//! ```text
//! kmod Kiln.Text, Version=1.0.0.0
//! // comments and blank lines are ignored
//! export greeting = "hello"
//! export width = 80
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_refs::identity::HEADER_KEYWORD;
use kiln_refs::ModuleIdentity;
use rustc_hash::FxHashMap;

use crate::error::ModuleError;
use crate::lexer::{lex, unescape, Token};
use crate::value::Value;

/// One loaded module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Module {
    pub identity: ModuleIdentity,
    pub path: PathBuf,
    pub exports: BTreeMap<String, Value>,
}

impl Module {
    pub fn name(&self) -> &str {
        &self.identity.name
    }
}

/// Load and parse a module file.
pub fn load_module(path: &Path) -> Result<Module, ModuleError> {
    let text = fs::read_to_string(path).map_err(|err| ModuleError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    parse_module(path, &text)
}

fn parse_module(path: &Path, text: &str) -> Result<Module, ModuleError> {
    let mut lines = text.lines().enumerate();
    let identity = lines
        .next()
        .filter(|(_, first)| first.trim_start().starts_with(HEADER_KEYWORD))
        .and_then(|(_, first)| ModuleIdentity::parse(first))
        .ok_or_else(|| ModuleError::MissingHeader {
            path: path.to_path_buf(),
        })?;

    let mut exports = BTreeMap::new();
    for (index, line) in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let (name, value) = parse_export(line).ok_or_else(|| ModuleError::MalformedExport {
            path: path.to_path_buf(),
            line: index + 1,
            text: line.to_string(),
        })?;
        exports.insert(name, value);
    }

    Ok(Module {
        identity,
        path: path.to_path_buf(),
        exports,
    })
}

/// `export <ident> = <literal>`
fn parse_export(line: &str) -> Option<(String, Value)> {
    let rest = line.strip_prefix("export")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (name, literal) = rest.split_once('=')?;
    let name = name.trim();
    let output = lex(name);
    if output.tokens.len() != 1 || output.tokens[0].0 != Token::Ident {
        return None;
    }
    Some((name.to_string(), parse_literal(literal.trim())?))
}

fn parse_literal(text: &str) -> Option<Value> {
    let output = lex(text);
    if !output.errors.is_empty() {
        return None;
    }
    let value = match output.tokens.as_slice() {
        [(Token::Int, span)] => Value::Int(text[span.clone()].parse().ok()?),
        [(Token::Minus, _), (Token::Int, span)] => {
            Value::Int(format!("-{}", &text[span.clone()]).parse().ok()?)
        }
        [(Token::Str, span)] => Value::str(unescape(&text[span.clone()])),
        [(Token::True, _)] => Value::Bool(true),
        [(Token::False, _)] => Value::Bool(false),
        _ => return None,
    };
    Some(value)
}

/// Modules visible to a script, keyed by module name.
///
/// Tables are carried forward between submissions; loading a path that is
/// already present is a no-op.
#[derive(Clone, Debug, Default)]
pub struct ModuleTable {
    by_name: FxHashMap<String, Arc<Module>>,
    /// Every path that has been offered, including same-identity duplicates.
    paths: FxHashMap<PathBuf, String>,
}

/// Outcome of offering one path to a [`ModuleTable`].
#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    /// New module added under its name.
    Added,
    /// Path seen before, or another path with the same identity is loaded.
    AlreadyLoaded,
    /// A module with this name but a different version is already loaded.
    Conflict { loaded: ModuleIdentity },
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path` unless it is already known.
    pub fn load(&mut self, path: &Path) -> Result<Admission, ModuleError> {
        if self.paths.contains_key(path) {
            return Ok(Admission::AlreadyLoaded);
        }
        let module = load_module(path)?;
        Ok(self.admit(module))
    }

    /// Add an already-parsed module.
    pub fn admit(&mut self, module: Module) -> Admission {
        if let Some(existing) = self.by_name.get(module.name()) {
            if existing.identity != module.identity {
                return Admission::Conflict {
                    loaded: existing.identity.clone(),
                };
            }
            self.paths.insert(module.path, module.identity.name);
            return Admission::AlreadyLoaded;
        }
        let name = module.name().to_string();
        self.paths.insert(module.path.clone(), name.clone());
        self.by_name.insert(name, Arc::new(module));
        Admission::Added
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Module>> {
        self.by_name.get(name)
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.paths.contains_key(path)
    }

    /// Modules sorted by name.
    pub fn modules(&self) -> Vec<&Arc<Module>> {
        let mut modules: Vec<_> = self.by_name.values().collect();
        modules.sort_by(|a, b| a.name().cmp(b.name()));
        modules
    }

    /// Paths of loaded modules (the file each name was loaded from).
    pub fn module_paths(&self) -> impl Iterator<Item = &Path> {
        self.by_name.values().map(|module| module.path.as_path())
    }

    /// Modules matching an import: the module itself or any module below it.
    pub fn imported_by<'a>(&'a self, import: &'a str) -> impl Iterator<Item = &'a Arc<Module>> {
        self.by_name.values().filter(move |module| {
            let name = module.name();
            name == import
                || name
                    .strip_prefix(import)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// Whether `name` is a module or a namespace prefix of one.
    pub fn is_namespace(&self, name: &str) -> bool {
        self.imported_by(name).next().is_some()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
