use super::*;

fn v(raw: &str) -> FrameworkVersion {
    FrameworkVersion::parse(raw).unwrap()
}

#[test]
fn parse_plain_and_prerelease() {
    let plain = v("6.0.5");
    assert_eq!(plain.major(), 6);
    assert_eq!(plain.minor(), Some(0));
    assert!(!plain.is_prerelease());

    let pre = v("7.0.0-preview.3");
    assert!(pre.is_prerelease());
    assert_eq!(pre.major_minor(), "7.0");
}

#[test]
fn parse_rejects_garbage() {
    assert!(FrameworkVersion::parse("latest").is_none());
    assert!(FrameworkVersion::parse("6.x").is_none());
    assert!(FrameworkVersion::parse("6.0-").is_none());
}

#[test]
fn numeric_components_compare_numerically() {
    assert!(v("6.0.10") > v("6.0.9"));
    assert!(v("10.0.0") > v("9.9.9"));
}

#[test]
fn release_sorts_after_prerelease() {
    assert!(v("7.0.0") > v("7.0.0-rc.2"));
    assert!(v("7.0.0-rc.2") > v("7.0.0-preview.7"));
    assert!(v("7.0.1-preview.1") > v("7.0.0"));
}

#[test]
fn select_without_request_takes_greatest() {
    let dirs = ["6.0.5", "7.0.0-rc.1", "6.0.12", "not-a-version"];
    assert_eq!(select_version(dirs, None), Some(v("7.0.0-rc.1")));
}

#[test]
fn select_matches_major_minor_prefix() {
    let dirs = ["6.0.5", "6.0.12", "6.1.0", "7.0.0"];
    let requested = v("6.0.1");
    assert_eq!(select_version(dirs, Some(&requested)), Some(v("6.0.12")));
}

#[test]
fn select_prefers_release_among_matches() {
    let dirs = ["8.0.0-preview.1", "8.0.0", "8.0.0-rc.2"];
    assert_eq!(select_version(dirs, Some(&v("8.0.0"))), Some(v("8.0.0")));
}

#[test]
fn select_with_no_match_is_none() {
    let dirs = ["6.0.5"];
    assert_eq!(select_version(dirs, Some(&v("5.0.0"))), None);
}
