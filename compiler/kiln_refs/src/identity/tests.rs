use super::*;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn parse_header_with_keyword() {
    let id = ModuleIdentity::parse("kmod CoreLib, Version=6.0.0.0").unwrap();
    assert_eq!(id, ModuleIdentity::new("CoreLib", "6.0.0.0"));
}

#[test]
fn parse_header_without_keyword() {
    let id = ModuleIdentity::parse("Web.Routing, Version=1.2").unwrap();
    assert_eq!(id.name, "Web.Routing");
    assert_eq!(id.version, "1.2");
}

#[test]
fn parse_rejects_bad_versions() {
    assert!(ModuleIdentity::parse("kmod CoreLib, Version=six").is_none());
    assert!(ModuleIdentity::parse("kmod CoreLib, Version=").is_none());
    assert!(ModuleIdentity::parse("kmod CoreLib").is_none());
    assert!(ModuleIdentity::parse("kmod Core Lib, Version=1.0").is_none());
}

#[test]
fn display_round_trips_through_header() {
    let id = ModuleIdentity::new("CoreLib", "6.0.0.0");
    assert_eq!(id.header_line(), "kmod CoreLib, Version=6.0.0.0");
    assert_eq!(ModuleIdentity::parse(&id.header_line()), Some(id));
}

#[test]
fn read_identity_from_file() {
    let dir = tempdir().unwrap();
    let module = dir.path().join("CoreLib.dll");
    fs::write(&module, "kmod CoreLib, Version=6.0.0.0\nexport answer = 42\n").unwrap();
    let plain = dir.path().join("native.dll");
    fs::write(&plain, "\x7fELF not a managed module").unwrap();

    assert_eq!(
        read_identity(&module),
        Some(ModuleIdentity::new("CoreLib", "6.0.0.0"))
    );
    assert_eq!(read_identity(&plain), None);
    assert_eq!(read_identity(&dir.path().join("missing.dll")), None);
}

#[test]
fn reference_file_name_strips_native_image_infix() {
    assert_eq!(
        reference_file_name(&PathBuf::from("/rt/impl/CoreLib.ni.dll")).as_deref(),
        Some("CoreLib.dll")
    );
    assert_eq!(
        reference_file_name(&PathBuf::from("/rt/impl/CoreLib.dll")).as_deref(),
        Some("CoreLib.dll")
    );
}

#[test]
fn documentation_must_exist() {
    let dir = tempdir().unwrap();
    let module = dir.path().join("CoreLib.dll");
    assert_eq!(sibling_documentation(&module), None);
    fs::write(dir.path().join("CoreLib.xml"), "<doc/>").unwrap();
    assert_eq!(
        sibling_documentation(&module),
        Some(dir.path().join("CoreLib.xml"))
    );
}

#[test]
fn module_extension_is_case_insensitive() {
    assert!(has_module_extension(&PathBuf::from("a/B.DLL")));
    assert!(!has_module_extension(&PathBuf::from("a/B.xml")));
}
