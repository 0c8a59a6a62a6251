// tests/filter_rules.rs

use std::error::Error;
use std::path::Path;

use proptest::prelude::*;
use watchrun::errors::{PatternKind, WatchError};
use watchrun::watch::{ChangeFilter, absolutize, normalize_path};
use watchrun_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn include_and_exclude_decide_relevance() -> TestResult {
    init_tracing();

    let filter = ChangeFilter::new(r"\.go$", "^vendor/", Some(".env"))?;

    assert!(filter.relevant("src/x.go"));
    assert!(!filter.relevant("vendor/x.go"), "exclude must win over include");
    assert!(!filter.relevant("src/readme.md"));
    Ok(())
}

#[test]
fn env_file_is_relevant_even_when_excluded() -> TestResult {
    init_tracing();

    let filter = ChangeFilter::new(r"\.go$", r"(^|/)config/", Some(".env"))?;

    assert!(filter.is_excluded("config/.env"));
    assert!(filter.relevant("config/.env"));
    assert!(filter.relevant(".env"));
    assert!(!filter.relevant("config/x.go"));
    // Only the exact file name counts.
    assert!(!filter.relevant("config/.env.example"));
    Ok(())
}

#[test]
fn no_env_file_means_no_exemption() -> TestResult {
    let filter = ChangeFilter::new(r".*", r"\.env$", None)?;
    assert!(!filter.relevant(".env"));
    Ok(())
}

#[test]
fn empty_exclude_excludes_nothing() -> TestResult {
    let filter = ChangeFilter::new(r"\.go$", "", None)?;
    assert!(!filter.is_excluded("vendor/x.go"));
    assert!(filter.relevant("vendor/x.go"));
    Ok(())
}

#[test]
fn invalid_patterns_are_reported_with_their_kind() {
    init_tracing();

    match ChangeFilter::new("(unclosed", "", None) {
        Err(WatchError::InvalidPattern { kind, pattern, .. }) => {
            assert_eq!(kind, PatternKind::Include);
            assert_eq!(pattern, "(unclosed");
        }
        other => panic!("expected include pattern error, got {other:?}"),
    }

    match ChangeFilter::new(r"\.go$", "[z-a]", None) {
        Err(WatchError::InvalidPattern { kind, .. }) => assert_eq!(kind, PatternKind::Exclude),
        other => panic!("expected exclude pattern error, got {other:?}"),
    }
}

#[test]
fn excluded_and_vcs_directories_are_skipped() -> TestResult {
    let filter = ChangeFilter::new(r"\.go$", "^vendor/", None)?;

    assert!(filter.skips_dir("vendor"), "trailing-slash pattern must skip the dir itself");
    assert!(filter.skips_dir("vendor/github.com"));
    assert!(filter.skips_dir(".git"));
    assert!(filter.skips_dir("sub/module/.git"));
    assert!(!filter.skips_dir("src"));
    assert!(!filter.skips_dir("src/vendor"));
    Ok(())
}

#[test]
fn normalize_strips_leading_separators_and_resolves_dots() {
    assert_eq!(normalize_path(Path::new("/src/x.go")), "src/x.go");
    assert_eq!(normalize_path(Path::new("./src/x.go")), "src/x.go");
    assert_eq!(normalize_path(Path::new("src/../lib/x.go")), "lib/x.go");
    assert_eq!(normalize_path(Path::new("src//a/./b.go")), "src/a/b.go");
    assert_eq!(normalize_path(Path::new("../x.go")), "../x.go");
    assert_eq!(normalize_path(Path::new(".")), ".");
    assert_eq!(normalize_path(Path::new("")), ".");
    assert_eq!(normalize_path(Path::new(r"src\win\x.go")), "src/win/x.go");
}

#[cfg(unix)]
#[test]
fn absolutize_resolves_against_the_base_lexically() {
    let base = Path::new("/work/app");
    assert_eq!(absolutize(base, Path::new(".")), Path::new("/work/app"));
    assert_eq!(absolutize(base, Path::new("./src/../lib")), Path::new("/work/app/lib"));
    assert_eq!(absolutize(base, Path::new("../shared")), Path::new("/work/shared"));
    assert_eq!(absolutize(base, Path::new("/etc/./x")), Path::new("/etc/x"));
    assert_eq!(absolutize(base, Path::new("../../../..")), Path::new("/"));
}

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-z]{1,6}(\\.go)?",
        1 => Just(".".to_string()),
        1 => Just("..".to_string()),
        1 => Just(String::new()),
    ]
}

fn raw_path() -> impl Strategy<Value = String> {
    (proptest::bool::ANY, proptest::collection::vec(segment(), 0..8)).prop_map(
        |(absolute, segments)| {
            let joined = segments.join("/");
            if absolute { format!("/{joined}") } else { joined }
        },
    )
}

proptest! {
    #[test]
    fn normalized_paths_are_stable(raw in raw_path()) {
        let once = normalize_path(Path::new(&raw));
        let twice = normalize_path(Path::new(&once));
        prop_assert_eq!(&once, &twice);
    }

    #[test]
    fn normalized_paths_have_no_empty_dot_or_leading_segments(raw in raw_path()) {
        let norm = normalize_path(Path::new(&raw));
        prop_assert!(!norm.starts_with('/'));
        if norm != "." {
            for seg in norm.split('/') {
                prop_assert!(!seg.is_empty());
                prop_assert_ne!(seg, ".");
            }
        }
    }

    #[test]
    fn leading_slash_or_dot_does_not_change_the_result(raw in "[a-z]{1,5}(/[a-z]{1,5}){0,4}") {
        let plain = normalize_path(Path::new(&raw));
        prop_assert_eq!(&plain, &normalize_path(Path::new(&format!("/{raw}"))));
        prop_assert_eq!(&plain, &normalize_path(Path::new(&format!("./{raw}"))));
    }
}
