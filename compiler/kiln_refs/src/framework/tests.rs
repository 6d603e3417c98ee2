use super::*;
use crate::fixture::{install_framework, write_module};
use crate::identity::ModuleIdentity;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn search(root: &Path) -> FrameworkSearchPaths {
    FrameworkSearchPaths {
        install_roots: vec![root.to_path_buf()],
        package_cache: None,
    }
}

#[test]
fn parse_request_forms() {
    let plain: FrameworkRequest = "Kiln.Web".parse().unwrap();
    assert_eq!(plain.name, "Kiln.Web");
    assert!(plain.version.is_none());

    let versioned: FrameworkRequest = "Kiln.Core/6.0.1".parse().unwrap();
    assert!(versioned.is_base());
    assert_eq!(versioned.version.unwrap().as_str(), "6.0.1");

    assert!("Kiln.Core/latest".parse::<FrameworkRequest>().is_err());
    assert!("".parse::<FrameworkRequest>().is_err());
}

#[test]
fn discover_base_framework() {
    let root = tempdir().unwrap();
    install_framework(root.path(), BASE_FRAMEWORK, "6.0.5", &["CoreLib", "Collections"]);

    let fw = discover(&FrameworkRequest::base(), &search(root.path())).unwrap();
    assert_eq!(fw.version.as_str(), "6.0.5");
    assert_eq!(fw.depth, 0);
    assert!(fw.base.is_none());
    assert_eq!(fw.reference_artifacts.len(), 2);
    assert_eq!(fw.execution_artifacts.len(), 2);

    let core = fw.reference_artifacts.iter().next().unwrap();
    assert_eq!(core.role(), ArtifactRole::AnalysisOnly);
    assert!(core.documentation().is_some());
    assert_eq!(
        core.identity(),
        Some(&ModuleIdentity::new("Collections", "6.0.5.0"))
    );
}

#[test]
fn discover_picks_version_by_prefix() {
    let root = tempdir().unwrap();
    install_framework(root.path(), BASE_FRAMEWORK, "6.0.5", &["CoreLib"]);
    install_framework(root.path(), BASE_FRAMEWORK, "6.0.12", &["CoreLib"]);
    install_framework(root.path(), BASE_FRAMEWORK, "7.0.0", &["CoreLib"]);

    let request: FrameworkRequest = "Kiln.Core/6.0.0".parse().unwrap();
    let fw = discover(&request, &search(root.path())).unwrap();
    assert_eq!(fw.version.as_str(), "6.0.12");
}

#[test]
fn layered_framework_loads_base_first() {
    let root = tempdir().unwrap();
    install_framework(root.path(), BASE_FRAMEWORK, "6.0.5", &["CoreLib"]);
    install_framework(root.path(), "Kiln.Web", "6.0.3", &["Routing"]);

    let fw = discover(&"Kiln.Web".parse().unwrap(), &search(root.path())).unwrap();
    assert_eq!(fw.depth, 1);
    let names: Vec<&str> = fw.layers().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Kiln.Web", BASE_FRAMEWORK]);
}

#[test]
fn falls_back_to_package_cache() {
    let cache = tempdir().unwrap();
    let exec = cache.path().join("kiln.core.runtime/6.0.2/lib");
    let refs = cache.path().join("kiln.core.ref/6.0.0/ref");
    write_module(&exec.join("CoreLib.dll"), "CoreLib", "6.0.0.0");
    write_module(&refs.join("CoreLib.dll"), "CoreLib", "6.0.0.0");

    let paths = FrameworkSearchPaths {
        install_roots: vec![cache.path().join("no-such-root")],
        package_cache: Some(cache.path().to_path_buf()),
    };
    let fw = discover(&FrameworkRequest::base(), &paths).unwrap();
    assert_eq!(fw.version.as_str(), "6.0.2");
    assert_eq!(fw.execution_dir, ArtifactPath::new(&exec));
    assert_eq!(fw.reference_dir, ArtifactPath::new(&refs));
}

#[test]
fn missing_framework_names_every_directory_tried() {
    let root = tempdir().unwrap();
    let cache = tempdir().unwrap();
    let paths = FrameworkSearchPaths {
        install_roots: vec![root.path().to_path_buf()],
        package_cache: Some(cache.path().to_path_buf()),
    };

    let err = discover(&FrameworkRequest::base(), &paths).unwrap_err();
    let ResolutionError::FrameworkNotFound { tried, .. } = &err else {
        panic!("unexpected error {err:?}");
    };
    assert!(tried.contains(&root.path().join("shared").join(BASE_FRAMEWORK)));
    assert!(tried.contains(&cache.path().join("kiln.core.runtime")));

    let message = err.to_string();
    assert!(message.contains("could not locate shared framework 'Kiln.Core'"));
    assert!(message.contains(&root.path().join("shared").join(BASE_FRAMEWORK).display().to_string()));
}

#[test]
fn enumeration_skips_unmanaged_files() {
    let dir = tempdir().unwrap();
    write_module(&dir.path().join("A.dll"), "A", "1.0.0.0");
    std::fs::write(dir.path().join("native.dll"), "binary").unwrap();
    std::fs::write(dir.path().join("readme.txt"), "text").unwrap();

    let set = enumerate_modules(dir.path(), ArtifactRole::ExecutionOnly).unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.iter().next().unwrap().role(), ArtifactRole::ExecutionOnly);
}
