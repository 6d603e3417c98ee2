#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test fixture, panics provide clear failure messages"
)]
//! On-disk framework fixtures for unit tests.

use std::fs;
use std::path::{Path, PathBuf};

use crate::identity::ModuleIdentity;

/// Write a managed module file, creating parent directories.
pub fn write_module(path: &Path, name: &str, version: &str) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let identity = ModuleIdentity::new(name, version);
    fs::write(path, format!("{}\n", identity.header_line())).unwrap();
    path.to_path_buf()
}

/// Install a framework under `root` in the global layout.
///
/// Each module is written to both the execution and reference directory with
/// the same identity; reference modules get a documentation sibling.
pub fn install_framework(root: &Path, name: &str, version: &str, modules: &[&str]) -> (PathBuf, PathBuf) {
    let execution_dir = root.join("shared").join(name).join(version);
    let reference_dir = root
        .join("packs")
        .join(format!("{name}.Ref"))
        .join(version)
        .join("ref");
    fs::create_dir_all(&execution_dir).unwrap();
    fs::create_dir_all(&reference_dir).unwrap();
    for module in modules {
        let assembly_version = format!("{version}.0");
        write_module(&execution_dir.join(format!("{module}.dll")), module, &assembly_version);
        write_module(&reference_dir.join(format!("{module}.dll")), module, &assembly_version);
        fs::write(reference_dir.join(format!("{module}.xml")), "<doc/>").unwrap();
    }
    (execution_dir, reference_dir)
}
