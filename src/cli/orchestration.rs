//! Release workflow orchestration
//!
//! Sequences version resolution, ref planning and the manifest patch, then
//! either reports the plan (dry run) or applies it. The binary only parses
//! arguments and renders the [ReleaseResult]; everything with state
//! transitions lives here so it can run against
//! [MockRepository](crate::git::MockRepository).

use std::fs;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::boundary::BoundaryWarning;
use crate::domain::tag::release_tag_name;
use crate::domain::{
    latest_release, plan, resolve_version, BranchOptions, ManifestPatch, RefPlan,
};
use crate::error::Result;
use crate::git::Repository;

/// Everything a caller supplies for one release
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRequest {
    /// Requested version; empty means derive from the latest release
    pub version_input: String,

    /// Compute and report only, never mutate
    pub dry_run: bool,

    /// Deployment manifest holding the image reference
    pub manifest_path: PathBuf,

    /// Image whose tag is rewritten
    pub image_name: String,

    pub branch_options: BranchOptions,

    /// Revision being released
    pub target: String,

    /// Whether the first release may default to 0.1.0
    pub allow_default_version: bool,

    /// Remote to push refs to after applying
    pub push_remote: Option<String>,
}

/// Orchestrator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReleaseState {
    Idle,
    Validating,
    Planning,
    DryRunReport,
    Applying,
    Done,
    Failed,
}

impl ReleaseState {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: ReleaseState) -> bool {
        use ReleaseState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Planning)
                | (Planning, DryRunReport)
                | (Planning, Applying)
                | (DryRunReport, Done)
                | (Applying, Done)
                | (Validating | Planning | Applying, Failed)
        )
    }
}

/// Overall outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReleaseStatus {
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagOutcome {
    pub name: String,
    pub target: String,
    pub already_present: bool,
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchOutcome {
    pub branch: String,
    pub from_commit: Option<String>,
    pub to_commit: String,
    pub already_at_target: bool,
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestOutcome {
    pub path: String,
    pub found: bool,
    pub old_tag: String,
    pub new_tag: String,
    pub line: usize,
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseFailure {
    pub code: String,
    pub message: String,
}

/// The externally visible outcome of one release attempt.
///
/// On failure it still carries whatever was computed or applied before the
/// failing step; the `applied` flags tell exactly which mutations happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResult {
    pub version: Option<String>,
    pub tag: Option<String>,
    pub dry_run: bool,
    pub tag_op: Option<TagOutcome>,
    pub branch_ops: Vec<BranchOutcome>,
    pub manifest_patch: Option<ManifestOutcome>,
    pub pushed_to: Option<String>,
    pub warnings: Vec<BoundaryWarning>,
    pub states: Vec<ReleaseState>,
    pub status: ReleaseStatus,
    pub error: Option<ReleaseFailure>,
}

impl ReleaseResult {
    fn new(dry_run: bool) -> Self {
        ReleaseResult {
            version: None,
            tag: None,
            dry_run,
            tag_op: None,
            branch_ops: Vec::new(),
            manifest_patch: None,
            pushed_to: None,
            warnings: Vec::new(),
            states: vec![ReleaseState::Idle],
            status: ReleaseStatus::Failed,
            error: None,
        }
    }

    fn record_plan(&mut self, plan: &RefPlan, patch: &ManifestPatch) {
        self.tag_op = Some(TagOutcome {
            name: plan.tag.name.clone(),
            target: plan.tag.target.to_string(),
            already_present: plan.tag.already_present,
            applied: false,
        });
        self.branch_ops = plan
            .branches
            .iter()
            .map(|op| BranchOutcome {
                branch: op.branch.clone(),
                from_commit: op.from.map(|oid| oid.to_string()),
                to_commit: op.to.to_string(),
                already_at_target: op.already_at_target,
                applied: false,
            })
            .collect();
        self.manifest_patch = Some(ManifestOutcome {
            path: patch.path.display().to_string(),
            found: patch.found,
            old_tag: patch.old_tag.clone(),
            new_tag: patch.new_tag.clone(),
            line: patch.line,
            applied: false,
        });
    }

    pub fn is_done(&self) -> bool {
        self.status == ReleaseStatus::Done
    }

    /// Mutations that actually happened, in the order they were applied
    pub fn completed_steps(&self) -> Vec<String> {
        let mut steps = Vec::new();
        if let Some(manifest) = self.manifest_patch.as_ref().filter(|m| m.applied) {
            steps.push(format!("manifest {} updated to {}", manifest.path, manifest.new_tag));
        }
        if let Some(tag) = self.tag_op.as_ref().filter(|t| t.applied) {
            steps.push(format!("tag {} created", tag.name));
        }
        for op in self.branch_ops.iter().filter(|op| op.applied) {
            steps.push(format!("branch {} moved to {}", op.branch, op.to_commit));
        }
        if let Some(remote) = &self.pushed_to {
            steps.push(format!("refs pushed to {}", remote));
        }
        steps
    }
}

/// Runs a single release. Consumed by [ReleaseOrchestrator::run].
pub struct ReleaseOrchestrator<'a, R: Repository + ?Sized> {
    repo: &'a R,
    request: ReleaseRequest,
    state: ReleaseState,
}

impl<'a, R: Repository + ?Sized> ReleaseOrchestrator<'a, R> {
    pub fn new(repo: &'a R, request: ReleaseRequest) -> Self {
        ReleaseOrchestrator {
            repo,
            request,
            state: ReleaseState::Idle,
        }
    }

    pub fn state(&self) -> ReleaseState {
        self.state
    }

    /// Runs the release to a terminal state and reports it.
    pub fn run(mut self) -> ReleaseResult {
        let mut result = ReleaseResult::new(self.request.dry_run);

        match self.execute(&mut result) {
            Ok(()) => {
                self.transition(ReleaseState::Done, &mut result);
                result.status = ReleaseStatus::Done;
                info!(tag = result.tag.as_deref().unwrap_or_default(), dry_run = result.dry_run, "release finished");
            }
            Err(e) => {
                self.transition(ReleaseState::Failed, &mut result);
                error!(code = e.code(), error = %e, "release failed");
                result.status = ReleaseStatus::Failed;
                result.error = Some(ReleaseFailure {
                    code: e.code().to_string(),
                    message: e.to_string(),
                });
            }
        }

        result
    }

    fn transition(&mut self, next: ReleaseState, result: &mut ReleaseResult) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid release transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(from = ?self.state, to = ?next, "release state transition");
        self.state = next;
        result.states.push(next);
    }

    fn execute(&mut self, result: &mut ReleaseResult) -> Result<()> {
        self.transition(ReleaseState::Validating, result);

        let refs = self.repo.read_refs()?;
        let latest = latest_release(refs.tags.keys());
        for warning in &latest.skipped {
            warn!("{}", warning);
        }
        result.warnings.extend(latest.skipped);

        let version = resolve_version(
            &self.request.version_input,
            latest.version,
            self.request.allow_default_version,
        )?;
        if let Some(newest) = latest.version.filter(|newest| version < *newest) {
            let warning = BoundaryWarning::OlderThanLatest {
                version: version.to_string(),
                latest: newest.to_string(),
            };
            warn!("{}", warning);
            result.warnings.push(warning);
        }
        result.version = Some(version.to_string());
        result.tag = Some(release_tag_name(&version));
        info!(%version, "resolved release version");

        self.transition(ReleaseState::Planning, result);

        let target = self.repo.resolve_commit(&self.request.target)?;
        let plan = plan(
            version,
            &refs,
            target,
            self.request.branch_options,
            self.repo,
        )?;
        if plan.is_noop() {
            info!(tag = %plan.tag.name, "tag and tracking branches already in place");
        }

        let path = &self.request.manifest_path;
        let text = fs::read_to_string(path)
            .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))?;
        let patch = ManifestPatch::compute(path, &text, &self.request.image_name, &plan.tag.name)?;
        if !patch.changes_content() {
            result.warnings.push(BoundaryWarning::ManifestAlreadyCurrent {
                image: patch.image_name.clone(),
                tag: patch.new_tag.clone(),
            });
        }
        if let Some(digest) = &patch.digest {
            let warning = BoundaryWarning::DigestPinned {
                image: patch.image_name.clone(),
                digest: digest.clone(),
            };
            warn!("{}", warning);
            result.warnings.push(warning);
        }
        result.record_plan(&plan, &patch);

        if self.request.dry_run {
            self.transition(ReleaseState::DryRunReport, result);
            info!(tag = %plan.tag.name, "dry run, no changes made");
            return Ok(());
        }

        self.transition(ReleaseState::Applying, result);
        self.apply(&plan, &patch, result)
    }

    /// Manifest, then tag, then branches, then push. Stops at the first failure.
    fn apply(&self, plan: &RefPlan, patch: &ManifestPatch, result: &mut ReleaseResult) -> Result<()> {
        if patch.changes_content() {
            fs::write(&patch.path, patch.patched_text())?;
            info!(path = %patch.path.display(), old = %patch.old_tag, new = %patch.new_tag, "manifest updated");
            if let Some(manifest) = result.manifest_patch.as_mut() {
                manifest.applied = true;
            }
        } else {
            info!(path = %patch.path.display(), "manifest already current");
        }

        if plan.tag.already_present {
            info!(tag = %plan.tag.name, "tag already present");
        } else {
            self.repo.create_tag(&plan.tag.name, plan.tag.target)?;
            info!(tag = %plan.tag.name, target = %plan.tag.target, "tag created");
            if let Some(tag) = result.tag_op.as_mut() {
                tag.applied = true;
            }
        }

        for (op, outcome) in plan.branches.iter().zip(result.branch_ops.iter_mut()) {
            if op.already_at_target {
                info!(branch = %op.branch, "branch already at release commit");
                continue;
            }
            self.repo.update_branch(&op.branch, op.from, op.to)?;
            info!(branch = %op.branch, to = %op.to, "branch moved");
            outcome.applied = true;
        }

        if let Some(remote) = &self.request.push_remote {
            self.repo.push_refs(remote, &plan.refspecs())?;
            info!(%remote, "refs pushed");
            result.pushed_to = Some(remote.clone());
        }

        Ok(())
    }
}

/// Convenience wrapper: build an orchestrator and run it.
pub fn run_release<R: Repository + ?Sized>(repo: &R, request: ReleaseRequest) -> ReleaseResult {
    ReleaseOrchestrator::new(repo, request).run()
}
