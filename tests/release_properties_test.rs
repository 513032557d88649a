use std::fs;
use std::path::{Path, PathBuf};

use git2::Oid;
use tag_release::boundary::BoundaryWarning;
use tag_release::cli::{run_release, ReleaseRequest, ReleaseResult, ReleaseStatus};
use tag_release::domain::BranchOptions;
use tag_release::git::MockRepository;
use tempfile::TempDir;

const IMAGE: &str = "ghcr.io/org/app";

const MANIFEST: &str = "\
# Hand-maintained deployment descriptor
apiVersion: apps/v1
kind: Deployment
spec:
  template:
    spec:
      containers:
        - name: app
          image: ghcr.io/org/app:v1.2.3   # bumped by tag-release
          env:
            - {name: MODE, value: \"prod\"}
        - name: sidecar
          image: ghcr.io/org/app-proxy:v9.9.9
";

fn oid(n: u8) -> Oid {
    Oid::from_bytes(&[n; 20]).unwrap()
}

struct Fixture {
    _dir: TempDir,
    manifest: PathBuf,
    repo: MockRepository,
}

/// Commit graph 1 <- 2 <- 3 with HEAD at 3, plus 4 branching off 1.
fn fixture(manifest_text: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("deployment.yaml");
    fs::write(&manifest, manifest_text).unwrap();

    let mut repo = MockRepository::new();
    repo.add_commit(oid(1), &[]);
    repo.add_commit(oid(2), &[oid(1)]);
    repo.add_commit(oid(3), &[oid(2)]);
    repo.add_commit(oid(4), &[oid(1)]);
    repo.set_revision("HEAD", oid(3));

    Fixture {
        _dir: dir,
        manifest,
        repo,
    }
}

fn request(manifest: &Path, version: &str, dry_run: bool) -> ReleaseRequest {
    ReleaseRequest {
        version_input: version.to_string(),
        dry_run,
        manifest_path: manifest.to_path_buf(),
        image_name: IMAGE.to_string(),
        branch_options: BranchOptions::default(),
        target: "HEAD".to_string(),
        allow_default_version: true,
        push_remote: None,
    }
}

fn error_code(result: &ReleaseResult) -> &str {
    result
        .error
        .as_ref()
        .map(|e| e.code.as_str())
        .unwrap_or("none")
}

#[test]
fn test_apply_creates_tag_branches_and_patches_manifest() {
    let fx = fixture(MANIFEST);

    let result = run_release(&fx.repo, request(&fx.manifest, "1.2.4", false));

    assert_eq!(result.status, ReleaseStatus::Done, "{:?}", result.error);
    assert_eq!(result.version.as_deref(), Some("1.2.4"));
    assert_eq!(result.tag.as_deref(), Some("v1.2.4"));
    assert!(result.tag_op.as_ref().unwrap().applied);
    assert!(result.branch_ops.iter().all(|op| op.applied));

    let refs = fx.repo.snapshot();
    assert_eq!(refs.tag("v1.2.4"), Some(oid(3)));
    assert_eq!(refs.branch("v1"), Some(oid(3)));
    assert_eq!(refs.branch("v1.2"), Some(oid(3)));

    // tag strictly before the tracking branches
    assert_eq!(
        fx.repo.mutations(),
        vec!["tag v1.2.4", "branch v1", "branch v1.2"]
    );

    let written = fs::read_to_string(&fx.manifest).unwrap();
    assert_eq!(written, MANIFEST.replace("app:v1.2.3", "app:v1.2.4"));
}

#[test]
fn test_second_apply_is_a_noop() {
    let fx = fixture(MANIFEST);

    let first = run_release(&fx.repo, request(&fx.manifest, "1.2.4", false));
    assert!(first.is_done());
    let mutations_after_first = fx.repo.mutations();
    let manifest_after_first = fs::read_to_string(&fx.manifest).unwrap();

    let second = run_release(&fx.repo, request(&fx.manifest, "1.2.4", false));

    assert!(second.is_done(), "{:?}", second.error);
    let tag = second.tag_op.as_ref().unwrap();
    assert!(tag.already_present);
    assert!(!tag.applied);
    assert!(second
        .branch_ops
        .iter()
        .all(|op| op.already_at_target && !op.applied));
    let manifest = second.manifest_patch.as_ref().unwrap();
    assert_eq!(manifest.old_tag, "v1.2.4");
    assert!(!manifest.applied);
    assert!(second.completed_steps().is_empty());
    assert!(second
        .warnings
        .iter()
        .any(|w| matches!(w, BoundaryWarning::ManifestAlreadyCurrent { .. })));

    assert_eq!(fx.repo.mutations(), mutations_after_first);
    assert_eq!(fs::read_to_string(&fx.manifest).unwrap(), manifest_after_first);
}

#[test]
fn test_dry_run_matches_apply_plan() {
    let dry = fixture(MANIFEST);
    let applied = fixture(MANIFEST);

    let mut dry_repo = dry.repo;
    dry_repo.add_tag("v1.2.3", oid(2));
    dry_repo.set_branch_head("v1", oid(2));
    let mut applied_repo = applied.repo;
    applied_repo.add_tag("v1.2.3", oid(2));
    applied_repo.set_branch_head("v1", oid(2));

    let preview = run_release(&dry_repo, request(&dry.manifest, "", true));
    let real = run_release(&applied_repo, request(&applied.manifest, "", false));

    assert!(preview.is_done());
    assert!(real.is_done());
    assert_eq!(preview.tag, real.tag);
    assert_eq!(preview.version, real.version);

    let preview_tag = preview.tag_op.as_ref().unwrap();
    let real_tag = real.tag_op.as_ref().unwrap();
    assert_eq!(preview_tag.name, real_tag.name);
    assert_eq!(preview_tag.target, real_tag.target);

    assert_eq!(preview.branch_ops.len(), real.branch_ops.len());
    for (p, r) in preview.branch_ops.iter().zip(&real.branch_ops) {
        assert_eq!(p.branch, r.branch);
        assert_eq!(p.from_commit, r.from_commit);
        assert_eq!(p.to_commit, r.to_commit);
        assert!(!p.applied);
        assert!(r.applied);
    }

    let p = preview.manifest_patch.as_ref().unwrap();
    let r = real.manifest_patch.as_ref().unwrap();
    assert_eq!((&p.old_tag, &p.new_tag, p.line), (&r.old_tag, &r.new_tag, r.line));
    assert!(!p.applied);
    assert!(r.applied);

    // the dry run touched nothing
    assert!(dry_repo.mutations().is_empty());
    assert_eq!(fs::read_to_string(&dry.manifest).unwrap(), MANIFEST);
}

#[test]
fn test_auto_derivation_without_prior_tags() {
    let fx = fixture("image: ghcr.io/org/app:latest\n");

    let result = run_release(&fx.repo, request(&fx.manifest, "", true));

    assert_eq!(result.version.as_deref(), Some("0.1.0"));
    assert_eq!(result.tag.as_deref(), Some("v0.1.0"));
    let names: Vec<&str> = result.branch_ops.iter().map(|op| op.branch.as_str()).collect();
    assert_eq!(names, vec!["v0", "v0.1"]);
}

#[test]
fn test_auto_derivation_bumps_latest_patch() {
    let mut fx = fixture(MANIFEST);
    fx.repo.add_tag("v1.4.2", oid(2));
    fx.repo.add_tag("v1.3.9", oid(1));
    fx.repo.add_tag("v1.5.0-rc.1", oid(2));

    let result = run_release(&fx.repo, request(&fx.manifest, "", true));

    assert_eq!(result.version.as_deref(), Some("1.4.3"));
    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, BoundaryWarning::UnparsableTag { tag, .. } if tag == "v1.5.0-rc.1")));
}

#[test]
fn test_no_prior_version_when_defaulting_disabled() {
    let fx = fixture(MANIFEST);
    let mut req = request(&fx.manifest, "", false);
    req.allow_default_version = false;

    let result = run_release(&fx.repo, req);

    assert_eq!(error_code(&result), "NoPriorVersion");
    assert!(fx.repo.mutations().is_empty());
}

#[test]
fn test_tag_conflict_makes_no_changes() {
    let mut fx = fixture(MANIFEST);
    fx.repo.add_tag("v2.0.0", oid(2));

    let result = run_release(&fx.repo, request(&fx.manifest, "2.0.0", false));

    assert_eq!(result.status, ReleaseStatus::Failed);
    assert_eq!(error_code(&result), "TagConflict");
    let message = &result.error.as_ref().unwrap().message;
    assert!(message.contains(&oid(2).to_string()));
    assert!(message.contains(&oid(3).to_string()));
    assert!(fx.repo.mutations().is_empty());
    assert_eq!(fs::read_to_string(&fx.manifest).unwrap(), MANIFEST);
    assert!(result.completed_steps().is_empty());
}

#[test]
fn test_non_linear_tracking_branch_is_rejected() {
    let mut fx = fixture(MANIFEST);
    fx.repo.set_branch_head("v1", oid(4));

    let result = run_release(&fx.repo, request(&fx.manifest, "1.2.4", false));

    assert_eq!(error_code(&result), "NonLinearHistory");
    assert!(fx.repo.mutations().is_empty());
    assert_eq!(fx.repo.snapshot().branch("v1"), Some(oid(4)));
    assert_eq!(fs::read_to_string(&fx.manifest).unwrap(), MANIFEST);
}

#[test]
fn test_late_patch_release_behind_tracking_branch_is_rejected() {
    let mut fx = fixture(MANIFEST);
    fx.repo.add_tag("v1.3.0", oid(3));
    fx.repo.set_branch_head("v1", oid(3));
    fx.repo.set_revision("HEAD", oid(2));

    let mut req = request(&fx.manifest, "1.2.9", false);
    req.branch_options.create_minor_branch = false;
    let result = run_release(&fx.repo, req);

    assert_eq!(error_code(&result), "NonLinearHistory");
    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, BoundaryWarning::OlderThanLatest { .. })));
}

#[test]
fn test_manifest_only_tag_substring_changes() {
    let text = "before: 1\n  image: ghcr.io/org/app:v1.2.3\nafter:   [a, b]  # keep\n";
    let fx = fixture(text);

    let result = run_release(&fx.repo, request(&fx.manifest, "v1.2.4", false));

    assert!(result.is_done(), "{:?}", result.error);
    let written = fs::read_to_string(&fx.manifest).unwrap();
    assert_eq!(
        written,
        "before: 1\n  image: ghcr.io/org/app:v1.2.4\nafter:   [a, b]  # keep\n"
    );
    assert_eq!(written.len(), text.len());
}

#[test]
fn test_ambiguous_image_reference_makes_no_changes() {
    let text = "a:\n  image: ghcr.io/org/app:v1.2.3\nb:\n  image: ghcr.io/org/app:v1.1.0\n";
    let fx = fixture(text);

    let result = run_release(&fx.repo, request(&fx.manifest, "1.2.4", false));

    assert_eq!(error_code(&result), "AmbiguousImageRef");
    assert!(fx.repo.mutations().is_empty());
    assert_eq!(fs::read_to_string(&fx.manifest).unwrap(), text);
}

#[test]
fn test_missing_image_reference() {
    let fx = fixture("image: nginx:1.25\n");

    let result = run_release(&fx.repo, request(&fx.manifest, "1.0.0", true));

    assert_eq!(error_code(&result), "ImageRefNotFound");
}

#[test]
fn test_failure_mid_apply_reports_completed_steps() {
    let mut fx = fixture(MANIFEST);
    fx.repo.fail_branch_update("v1.2");

    let result = run_release(&fx.repo, request(&fx.manifest, "1.2.4", false));

    assert_eq!(result.status, ReleaseStatus::Failed);
    assert_eq!(error_code(&result), "IOFailure");
    assert!(result.manifest_patch.as_ref().unwrap().applied);
    assert!(result.tag_op.as_ref().unwrap().applied);
    assert!(result.branch_ops[0].applied);
    assert!(!result.branch_ops[1].applied);
    assert_eq!(result.completed_steps().len(), 3);

    // nothing is rolled back
    assert_eq!(fx.repo.snapshot().tag("v1.2.4"), Some(oid(3)));
    assert_eq!(fx.repo.mutations(), vec!["tag v1.2.4", "branch v1"]);
}

#[test]
fn test_tag_failure_leaves_branches_untouched() {
    let mut fx = fixture(MANIFEST);
    fx.repo.fail_tag_creation();

    let result = run_release(&fx.repo, request(&fx.manifest, "1.2.4", false));

    assert_eq!(result.status, ReleaseStatus::Failed);
    assert!(result.manifest_patch.as_ref().unwrap().applied);
    assert!(!result.tag_op.as_ref().unwrap().applied);
    assert!(result.branch_ops.iter().all(|op| !op.applied));
    assert!(fx.repo.snapshot().branches.is_empty());
}

#[test]
fn test_push_after_apply() {
    let fx = fixture(MANIFEST);
    let mut req = request(&fx.manifest, "1.2.4", false);
    req.push_remote = Some("origin".to_string());

    let result = run_release(&fx.repo, req);

    assert!(result.is_done());
    assert_eq!(result.pushed_to.as_deref(), Some("origin"));
    assert_eq!(
        fx.repo.pushes(),
        vec![(
            "origin".to_string(),
            vec![
                "refs/tags/v1.2.4:refs/tags/v1.2.4".to_string(),
                "refs/heads/v1:refs/heads/v1".to_string(),
                "refs/heads/v1.2:refs/heads/v1.2".to_string(),
            ]
        )]
    );
}

#[test]
fn test_dry_run_never_pushes() {
    let fx = fixture(MANIFEST);
    let mut req = request(&fx.manifest, "1.2.4", true);
    req.push_remote = Some("origin".to_string());

    let result = run_release(&fx.repo, req);

    assert!(result.is_done());
    assert!(result.pushed_to.is_none());
    assert!(fx.repo.pushes().is_empty());
}

#[test]
fn test_push_failure_keeps_local_refs() {
    let mut fx = fixture(MANIFEST);
    fx.repo.fail_push();
    let mut req = request(&fx.manifest, "1.2.4", false);
    req.push_remote = Some("origin".to_string());

    let result = run_release(&fx.repo, req);

    assert_eq!(error_code(&result), "IOFailure");
    assert!(result.pushed_to.is_none());
    assert_eq!(fx.repo.snapshot().tag("v1.2.4"), Some(oid(3)));
}

#[test]
fn test_result_serializes_for_ci() {
    let fx = fixture(MANIFEST);

    let result = run_release(&fx.repo, request(&fx.manifest, "1.2.4", true));
    let json: serde_json::Value =
        serde_json::from_str(&tag_release::ui::render_json(&result).unwrap()).unwrap();

    assert_eq!(json["version"], "1.2.4");
    assert_eq!(json["tag"], "v1.2.4");
    assert_eq!(json["dryRun"], true);
    assert_eq!(json["status"], "Done");
    assert_eq!(json["branchOps"][0]["branch"], "v1");
    assert_eq!(json["branchOps"][0]["applied"], false);
    assert_eq!(json["manifestPatch"]["oldTag"], "v1.2.3");
    assert_eq!(json["manifestPatch"]["newTag"], "v1.2.4");
    assert!(json["error"].is_null());
}

#[test]
fn test_digest_pinned_reference_warns() {
    let fx = fixture("image: ghcr.io/org/app:v1.2.3@sha256:abcdef0123\n");

    let result = run_release(&fx.repo, request(&fx.manifest, "1.2.4", false));

    assert!(result.is_done(), "{:?}", result.error);
    assert_eq!(
        fs::read_to_string(&fx.manifest).unwrap(),
        "image: ghcr.io/org/app:v1.2.4@sha256:abcdef0123\n"
    );
    assert!(result.warnings.iter().any(|w| matches!(
        w,
        BoundaryWarning::DigestPinned { digest, .. } if digest == "sha256:abcdef0123"
    )));
}

#[test]
fn test_overlong_manifest_tag_makes_no_changes() {
    let text = format!("image: ghcr.io/org/app:{}\n", "a".repeat(130));
    let fx = fixture(&text);

    let result = run_release(&fx.repo, request(&fx.manifest, "1.2.4", false));

    assert_eq!(error_code(&result), "InvalidImageRef");
    assert!(fx.repo.mutations().is_empty());
    assert_eq!(fs::read_to_string(&fx.manifest).unwrap(), text);
}
