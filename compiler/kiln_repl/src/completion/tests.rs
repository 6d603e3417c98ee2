use super::*;
use crate::evaluator::Success;
use crate::fixture::write_module;
use crate::workspace::WorkspaceManager;
use kiln_refs::{ArtifactRole, ArtifactSet, ReferenceArtifact};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn workspace(dir: &Path, imports: &[&str]) -> WorkspaceManager {
    let modules = [
        write_module(&dir.join("Kiln.Core.dll"), "Kiln.Core", "1.0.0.0", &[("version", "\"1.0\"")]),
        write_module(
            &dir.join("Kiln.Text.dll"),
            "Kiln.Text",
            "1.0.0.0",
            &[("width", "80"), ("wrap", "true")],
        ),
        write_module(&dir.join("Extra.dll"), "Extra", "1.0.0.0", &[("answer", "42")]),
    ];
    let artifacts: ArtifactSet = modules
        .iter()
        .map(|path| Arc::new(ReferenceArtifact::from_file(path, ArtifactRole::AnalysisOnly)))
        .collect();
    WorkspaceManager::initialize(artifacts, imports.iter().map(ToString::to_string).collect())
}

fn labels(items: &[CompletionItem]) -> Vec<&str> {
    items.iter().map(|item| item.label.as_str()).collect()
}

fn at_end(workspace: &WorkspaceManager, text: &str) -> Vec<CompletionItem> {
    complete(&workspace.with_text(text), text.len())
}

#[test]
fn prefix_filters_keywords_and_builtins() {
    let dir = tempdir().unwrap();
    let workspace = workspace(dir.path(), &[]);
    assert_eq!(labels(&at_end(&workspace, "le")), vec!["len", "let"]);

    let items = at_end(&workspace, "pr");
    assert_eq!(items, vec![CompletionItem::new("print", CompletionKind::Builtin)]);
}

#[test]
fn namespaces_and_modules_by_segment() {
    let dir = tempdir().unwrap();
    let workspace = workspace(dir.path(), &[]);
    assert_eq!(labels(&at_end(&workspace, "Ki")), vec!["Kiln"]);
    assert_eq!(labels(&at_end(&workspace, "Kiln.")), vec!["Core", "Text"]);
    assert_eq!(labels(&at_end(&workspace, "1 + Kiln.T")), vec!["Text"]);
}

#[test]
fn module_members_with_type_detail() {
    let dir = tempdir().unwrap();
    let workspace = workspace(dir.path(), &[]);
    let items = at_end(&workspace, "Kiln.Text.w");
    assert_eq!(labels(&items), vec!["width", "wrap"]);
    assert_eq!(items[0].kind, CompletionKind::Export);
    assert_eq!(items[0].detail.as_deref(), Some("Kiln.Text.width: int"));
    assert_eq!(items[1].detail.as_deref(), Some("Kiln.Text.wrap: bool"));
}

#[test]
fn imported_exports_are_offered_unqualified() {
    let dir = tempdir().unwrap();
    let workspace = workspace(dir.path(), &["Kiln"]);
    assert_eq!(labels(&at_end(&workspace, "w")), vec!["width", "wrap"]);
    assert_eq!(labels(&at_end(&workspace, "ve")), vec!["version"]);
    // Not imported.
    assert!(at_end(&workspace, "ans").is_empty());
    // Imported by the candidate itself.
    assert_eq!(labels(&at_end(&workspace, "use Extra;\nans")), vec!["answer"]);
}

#[test]
fn bindings_from_committed_and_candidate_text() {
    let dir = tempdir().unwrap();
    let workspace = workspace(dir.path(), &[]);
    workspace.update_current_document(&Success {
        text: "let total = 1;".to_string(),
        return_value: None,
        artifacts: ArtifactSet::new(),
        imports: BTreeSet::new(),
    });

    let items = at_end(&workspace, "let tally = 2;\nt");
    assert_eq!(labels(&items), vec!["tally", "total", "true"]);
    assert_eq!(items[0].kind, CompletionKind::Binding);
    assert_eq!(items[2].kind, CompletionKind::Keyword);
}

#[test]
fn caret_in_the_middle_uses_the_word_before_it() {
    let dir = tempdir().unwrap();
    let workspace = workspace(dir.path(), &[]);
    let document = workspace.with_text("argc() + Kiln.Te");
    assert_eq!(labels(&complete(&document, 3)), vec!["arg", "argc"]);
    // Past the end clamps to the end.
    assert_eq!(labels(&complete(&document, 99)), vec!["Text"]);
}
