//! Property-based tests for name, target, platform and label handling.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used)]

use std::path::Path;

use proptest::prelude::*;

use runnerctl::domain::instance::{validate_instance_name, validate_runner_version};
use runnerctl::domain::platform::{default_labels, detect_from};
use runnerctl::domain::{InstanceLayout, RepositoryTarget, WorkerSignature};

// ============================================================================
// Instance names
// ============================================================================

proptest! {
    /// Well-formed names are accepted and stay inside the runners directory.
    #[test]
    fn prop_valid_names_stay_under_root(name in "[A-Za-z0-9][A-Za-z0-9._-]{0,62}") {
        prop_assert!(validate_instance_name(&name).is_ok());
        let layout = InstanceLayout::new(Path::new("/srv/ci"), &name).expect("layout");
        prop_assert!(layout.base_dir().starts_with("/srv/ci/runners"));
        prop_assert_eq!(layout.base_dir().file_name().and_then(|n| n.to_str()), Some(name.as_str()));
    }

    /// Anything carrying a path separator is rejected.
    #[test]
    fn prop_names_with_separators_rejected(a in "[a-z]{1,10}", b in "[a-z]{1,10}") {
        let joined = format!("{a}/{b}");
        let escaped = format!("../{a}");
        prop_assert!(validate_instance_name(&joined).is_err());
        prop_assert!(validate_instance_name(&escaped).is_err());
    }

    /// Names longer than 63 characters are rejected.
    #[test]
    fn prop_overlong_names_rejected(name in "[a-z]{64,80}") {
        prop_assert!(validate_instance_name(&name).is_err());
    }
}

#[test]
fn test_name_edge_cases() {
    assert!(validate_instance_name("ci-1").is_ok());
    assert!(validate_instance_name("a").is_ok());
    assert!(validate_instance_name("").is_err());
    assert!(validate_instance_name(".hidden").is_err());
    assert!(validate_instance_name("-dash").is_err());
    assert!(validate_instance_name("has space").is_err());
}

// ============================================================================
// Repository targets
// ============================================================================

proptest! {
    /// `owner/repo` parses to a repository and prints back unchanged.
    #[test]
    fn prop_owner_repo_roundtrip(owner in "[a-z][a-z0-9-]{0,15}", repo in "[a-z][a-z0-9_-]{0,15}") {
        let text = format!("{owner}/{repo}");
        let target: RepositoryTarget = text.parse().expect("target");
        let is_repo = matches!(target, RepositoryTarget::Repo { .. });
        prop_assert!(is_repo);
        prop_assert_eq!(target.to_string(), text);
    }

    /// URLs and bare paths name the same target.
    #[test]
    fn prop_url_and_path_agree(owner in "[a-z][a-z0-9]{0,10}", repo in "[a-z][a-z0-9]{0,10}") {
        let from_path: RepositoryTarget = format!("{owner}/{repo}").parse().expect("path");
        let from_url: RepositoryTarget =
            format!("https://github.com/{owner}/{repo}.git").parse().expect("url");
        prop_assert_eq!(from_path, from_url);
    }
}

#[test]
fn test_target_edge_cases() {
    assert!(matches!(
        "acme".parse::<RepositoryTarget>(),
        Ok(RepositoryTarget::Org { .. })
    ));
    assert!("a/b/c".parse::<RepositoryTarget>().is_err());
    assert!("".parse::<RepositoryTarget>().is_err());
    assert!("owner/re po".parse::<RepositoryTarget>().is_err());
    assert!("owner/../x".parse::<RepositoryTarget>().is_err());
}

#[test]
fn test_token_endpoints() {
    use runnerctl::domain::TokenKind;

    let repo: RepositoryTarget = "acme/app".parse().expect("repo");
    assert_eq!(
        repo.token_endpoint("https://api.github.com/", TokenKind::Registration),
        "https://api.github.com/repos/acme/app/actions/runners/registration-token"
    );
    let org: RepositoryTarget = "acme".parse().expect("org");
    assert_eq!(
        org.token_endpoint("https://api.github.com", TokenKind::Removal),
        "https://api.github.com/orgs/acme/actions/runners/remove-token"
    );
    assert_eq!(repo.service_url("https://github.com"), "https://github.com/acme/app");
}

// ============================================================================
// Platform and labels
// ============================================================================

proptest! {
    /// Architecture aliases are case-insensitive.
    #[test]
    fn prop_arch_aliases_case_insensitive(
        alias in prop::sample::select(vec!["x86_64", "amd64", "aarch64", "arm64", "armv7l"]),
        upper in any::<bool>(),
    ) {
        let raw = if upper { alias.to_uppercase() } else { alias.to_string() };
        prop_assert_eq!(detect_from("linux", &raw).ok(), detect_from("linux", alias).ok());
        prop_assert!(detect_from("linux", &raw).is_ok());
    }

    /// Labels never contain case-insensitive duplicates and always start
    /// with the platform defaults.
    #[test]
    fn prop_labels_deduplicated(extra in prop::collection::vec("[A-Za-z-]{0,8}", 0..6)) {
        let platform = detect_from("linux", "x86_64").expect("platform");
        let labels = default_labels(platform, &extra);
        prop_assert_eq!(&labels[..3], &["self-hosted", "Linux", "X64"]);
        for (i, a) in labels.iter().enumerate() {
            prop_assert!(!a.is_empty());
            for b in &labels[i + 1..] {
                prop_assert!(!a.eq_ignore_ascii_case(b), "duplicate label {} / {}", a, b);
            }
        }
    }
}

#[test]
fn test_unsupported_platforms_rejected() {
    assert!(detect_from("windows", "x86_64").is_err());
    assert!(detect_from("linux", "riscv64").is_err());
    assert!(detect_from("darwin", "arm64").is_ok());
}

// ============================================================================
// Versions and worker signature
// ============================================================================

proptest! {
    /// Semver versions are accepted with or without a leading `v`.
    #[test]
    fn prop_versions_normalized(major in 0u64..10, minor in 0u64..400, patch in 0u64..20) {
        let plain = format!("{major}.{minor}.{patch}");
        prop_assert_eq!(validate_runner_version(&format!("v{plain}")).expect("v-prefixed"), plain.clone());
        prop_assert_eq!(validate_runner_version(&plain).expect("plain"), plain);
    }
}

#[test]
fn test_signature_distinguishes_prefix_siblings() {
    use runnerctl::domain::ProcessSnapshot;

    let root = Path::new("/srv/ci");
    let ours = InstanceLayout::new(root, "ci-1").expect("layout");
    let sibling = InstanceLayout::new(root, "ci-10").expect("layout");
    let signature = WorkerSignature::for_layout("run.sh", &ours);

    let process = |layout: &InstanceLayout, zombie: bool| ProcessSnapshot {
        pid: 10,
        start_time: 1,
        cmdline: vec![
            "/bin/bash".to_string(),
            layout.run_entry().display().to_string(),
        ],
        zombie,
    };

    assert!(signature.matches(&process(&ours, false)));
    assert!(!signature.matches(&process(&ours, true)));
    assert!(!signature.matches(&process(&sibling, false)));
}
