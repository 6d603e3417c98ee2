#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test fixture, panics provide clear failure messages"
)]
//! On-disk sessions for unit tests.

use std::fs;
use std::path::{Path, PathBuf};

use kiln_refs::ModuleIdentity;

use crate::config::SessionConfig;

/// Write a module file with the given `export name = literal` lines.
pub fn write_module(path: &Path, name: &str, version: &str, exports: &[(&str, &str)]) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut text = ModuleIdentity::new(name, version).header_line();
    text.push('\n');
    for (export, literal) in exports {
        text.push_str(&format!("export {export} = {literal}\n"));
    }
    fs::write(path, text).unwrap();
    path.to_path_buf()
}

/// Install `Kiln.Core` 1.0.0 under `root` and return a config that finds it.
///
/// Both modules exist as execution and reference copies with one identity,
/// so every reference reconciles by promotion.
pub fn install_core(root: &Path) -> SessionConfig {
    let execution_dir = root.join("shared/Kiln.Core/1.0.0");
    let reference_dir = root.join("packs/Kiln.Core.Ref/1.0.0/ref");
    let modules: [(&str, &[(&str, &str)]); 2] = [
        ("Kiln.Core", &[("version", "\"1.0\"")]),
        ("Kiln.Text", &[("width", "80"), ("greeting", "\"hello\"")]),
    ];
    for (name, exports) in modules {
        let file = format!("{name}.dll");
        write_module(&execution_dir.join(&file), name, "1.0.0.0", exports);
        write_module(&reference_dir.join(&file), name, "1.0.0.0", exports);
    }

    SessionConfig::default()
        .with_base_dir(root)
        .with_install_root(root)
}
