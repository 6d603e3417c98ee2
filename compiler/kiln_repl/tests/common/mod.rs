//! Shared on-disk fixtures for session tests.
//!
//! Layout under the fixture root:
//!
//! ```text
//! shared/Kiln.Core/1.0.0/            Kiln.Core.dll Kiln.Text.dll Kiln.Native.dll
//! packs/Kiln.Core.Ref/1.0.0/ref/     Kiln.Core.dll Kiln.Text.dll (+ .xml docs)
//! feed/kiln.json/1.0.0/lib/          Kiln.Json.dll
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use kiln_refs::ModuleIdentity;
use kiln_repl::{Session, SessionConfig};
use kiln_script::{silent_handler, ScriptEngine};
use tempfile::TempDir;

pub struct Fixture {
    pub dir: TempDir,
    pub config: SessionConfig,
}

impl Fixture {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn execution_dir(&self) -> PathBuf {
        self.root().join("shared/Kiln.Core/1.0.0")
    }

    pub fn reference_dir(&self) -> PathBuf {
        self.root().join("packs/Kiln.Core.Ref/1.0.0/ref")
    }

    pub fn session(&self) -> Session {
        Session::with_engine(self.config.clone(), ScriptEngine::new(silent_handler())).unwrap()
    }
}

pub fn write_module(path: &Path, name: &str, exports: &[(&str, &str)]) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut text = ModuleIdentity::new(name, "1.0.0.0").header_line();
    text.push('\n');
    for (export, literal) in exports {
        text.push_str(&format!("export {export} = {literal}\n"));
    }
    fs::write(path, text).unwrap();
    path.to_path_buf()
}

/// A Kiln.Core install plus a package feed, with a config that finds both.
pub fn framework() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let execution_dir = root.join("shared/Kiln.Core/1.0.0");
    let reference_dir = root.join("packs/Kiln.Core.Ref/1.0.0/ref");

    let shared: [(&str, &[(&str, &str)]); 2] = [
        ("Kiln.Core", &[("version", "\"1.0\"")]),
        ("Kiln.Text", &[("width", "80"), ("greeting", "\"hello\"")]),
    ];
    for (name, exports) in shared {
        let file = format!("{name}.dll");
        write_module(&execution_dir.join(&file), name, exports);
        write_module(&reference_dir.join(&file), name, exports);
        fs::write(reference_dir.join(format!("{name}.xml")), "<doc/>").unwrap();
    }
    // Implementation detail with no reference counterpart.
    write_module(&execution_dir.join("Kiln.Native.dll"), "Kiln.Native", &[("handle", "7")]);

    write_module(
        &root.join("feed/kiln.json/1.0.0/lib/Kiln.Json.dll"),
        "Kiln.Json",
        &[("indent", "2")],
    );

    let config = SessionConfig::default()
        .with_install_root(root)
        .with_package_feed(root.join("feed"))
        .with_base_dir(root);
    Fixture { dir, config }
}
