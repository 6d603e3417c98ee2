use super::*;

fn artifact(path: &str, role: ArtifactRole) -> Arc<ReferenceArtifact> {
    Arc::new(ReferenceArtifact::from_file(path, role))
}

#[test]
fn normalization_resolves_dot_segments() {
    let a = ArtifactPath::new("/runtime/impl/../ref/./CoreLib.dll");
    assert_eq!(a, ArtifactPath::new("/runtime/ref/CoreLib.dll"));
    assert_eq!(a.file_name(), Some("CoreLib.dll"));
}

#[test]
fn is_under_compares_whole_components() {
    let dir = ArtifactPath::new("/runtime/ref");
    assert!(ArtifactPath::new("/runtime/ref/CoreLib.dll").is_under(&dir));
    assert!(!ArtifactPath::new("/runtime/refs/CoreLib.dll").is_under(&dir));
}

#[test]
fn equality_ignores_role_and_documentation() {
    let a = ReferenceArtifact::from_file("/x/A.dll", ArtifactRole::ExecutionOnly);
    let b = ReferenceArtifact::from_file("/x/./A.dll", ArtifactRole::AnalysisOnly)
        .with_documentation(Some(PathBuf::from("/x/A.xml")));
    assert_eq!(a, b);
}

#[test]
fn anonymous_artifacts_never_compare_equal() {
    let a = ReferenceArtifact::anonymous(ArtifactRole::Both);
    let b = ReferenceArtifact::anonymous(ArtifactRole::Both);
    assert_ne!(a, b);
    assert_eq!(a.display(), "<anonymous>");
}

#[test]
fn set_deduplicates_by_path_and_keeps_order() {
    let mut set = ArtifactSet::new();
    assert!(set.insert(artifact("/b/B.dll", ArtifactRole::Both)));
    assert!(set.insert(artifact("/a/A.dll", ArtifactRole::Both)));
    assert!(!set.insert(artifact("/b/../b/B.dll", ArtifactRole::ExecutionOnly)));

    let paths: Vec<String> = set.paths().map(ToString::to_string).collect();
    assert_eq!(paths, vec!["/b/B.dll".to_string(), "/a/A.dll".to_string()]);
}

#[test]
fn union_and_superset() {
    let left: ArtifactSet = [artifact("/a/A.dll", ArtifactRole::Both)].into_iter().collect();
    let right: ArtifactSet = [
        artifact("/a/A.dll", ArtifactRole::Both),
        artifact("/c/C.dll", ArtifactRole::Both),
    ]
    .into_iter()
    .collect();

    let union = left.union(&right);
    assert_eq!(union.len(), 2);
    assert!(union.is_superset_of(&left));
    assert!(union.is_superset_of(&right));
    assert!(!left.is_superset_of(&right));
}

#[test]
fn get_returns_stored_artifact() {
    let mut set = ArtifactSet::new();
    set.insert(artifact("/a/A.dll", ArtifactRole::AnalysisOnly));
    let found = set.get(&ArtifactPath::new("/a/A.dll")).unwrap();
    assert_eq!(found.role(), ArtifactRole::AnalysisOnly);
    assert!(set.get(&ArtifactPath::new("/a/B.dll")).is_none());
}
