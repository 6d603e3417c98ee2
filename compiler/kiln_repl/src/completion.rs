//! Completion over an analysis document.
//!
//! The word before the caret selects what is offered:
//!
//! ```text
//! wi|            keywords, builtins, bindings, top-level namespaces,
//!                exports of imported modules
//! Kiln.|         modules directly below the namespace `Kiln`
//! Kiln.Text.wi|  exports of module `Kiln.Text`
//! ```
//!
//! Candidates are filtered by prefix, deduplicated by label (the first kind
//! offered wins) and sorted by label.

use std::collections::BTreeMap;
use std::fmt;

use kiln_script::{declared_bindings, scan_imports, ModuleTable, Value, BUILTINS, KEYWORDS};

use crate::workspace::AnalysisDocument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompletionKind {
    Keyword,
    Builtin,
    Binding,
    Module,
    Export,
}

impl fmt::Display for CompletionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompletionKind::Keyword => "keyword",
            CompletionKind::Builtin => "builtin",
            CompletionKind::Binding => "binding",
            CompletionKind::Module => "module",
            CompletionKind::Export => "export",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    pub detail: Option<String>,
}

impl CompletionItem {
    fn new(label: impl Into<String>, kind: CompletionKind) -> Self {
        CompletionItem {
            label: label.into(),
            kind,
            detail: None,
        }
    }

    #[must_use]
    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Completion items for `caret` (a byte offset into the document text).
pub fn complete(document: &AnalysisDocument, caret: usize) -> Vec<CompletionItem> {
    let text = document.text();
    let caret = floor_char_boundary(text, caret);
    let word = word_before(&text[..caret]);
    let modules = document.project().modules();

    let mut items = Completions::default();
    if let Some((qualifier, partial)) = word.rsplit_once('.') {
        if let Some(module) = modules.get(qualifier) {
            for (name, value) in &module.exports {
                items.offer(partial, export_item(module.name(), name, value));
            }
        }
        for segment in child_segments(modules, Some(qualifier)) {
            items.offer(partial, CompletionItem::new(segment, CompletionKind::Module));
        }
        return items.finish();
    }

    for keyword in KEYWORDS {
        items.offer(word, CompletionItem::new(*keyword, CompletionKind::Keyword));
    }
    for builtin in BUILTINS {
        items.offer(word, CompletionItem::new(*builtin, CompletionKind::Builtin));
    }

    let project = document.project();
    let mut bindings = declared_bindings(&project.committed_text());
    let mut imports: Vec<String> = project.imports().iter().cloned().collect();
    if !document.is_committed() {
        bindings.extend(declared_bindings(text));
        imports.extend(scan_imports(text));
    }
    for binding in bindings {
        items.offer(word, CompletionItem::new(binding, CompletionKind::Binding));
    }
    for segment in child_segments(modules, None) {
        items.offer(word, CompletionItem::new(segment, CompletionKind::Module));
    }
    for import in &imports {
        for module in modules.imported_by(import) {
            for (name, value) in &module.exports {
                items.offer(word, export_item(module.name(), name, value));
            }
        }
    }
    items.finish()
}

fn export_item(module: &str, name: &str, value: &Value) -> CompletionItem {
    CompletionItem::new(name, CompletionKind::Export).with_detail(format!("{module}.{name}: {}", value.ty()))
}

/// Deduplicating collector.
#[derive(Default)]
struct Completions {
    by_label: BTreeMap<String, CompletionItem>,
}

impl Completions {
    fn offer(&mut self, prefix: &str, item: CompletionItem) {
        if item.label.starts_with(prefix) && !self.by_label.contains_key(&item.label) {
            self.by_label.insert(item.label.clone(), item);
        }
    }

    fn finish(self) -> Vec<CompletionItem> {
        self.by_label.into_values().collect()
    }
}

/// The identifier-and-dot run that ends at the end of `text`.
fn word_before(text: &str) -> &str {
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
        .last()
        .map_or(text.len(), |(index, _)| index);
    &text[start..]
}

/// Distinct next path segments of module names below `namespace`.
fn child_segments(modules: &ModuleTable, namespace: Option<&str>) -> Vec<String> {
    let mut segments: Vec<String> = modules
        .modules()
        .iter()
        .filter_map(|module| {
            let rest = match namespace {
                Some(namespace) => module.name().strip_prefix(namespace)?.strip_prefix('.')?,
                None => module.name(),
            };
            rest.split('.').next().map(str::to_string)
        })
        .collect();
    segments.dedup();
    segments
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests;
