//! Ref planning: which tag and tracking branches must exist after a release.

use crate::domain::tag::{major_branch_name, minor_branch_name, release_tag_name};
use crate::domain::SemanticVersion;
use crate::error::{ReleaseError, Result};
use crate::git::{RefSnapshot, Repository};
use git2::Oid;

/// Which moving tracking branches a release maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchOptions {
    pub create_major_branch: bool,
    pub create_minor_branch: bool,
}

impl Default for BranchOptions {
    fn default() -> Self {
        BranchOptions {
            create_major_branch: true,
            create_minor_branch: true,
        }
    }
}

/// The immutable release tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOp {
    pub name: String,
    pub target: Oid,
    /// Set when the tag already exists at `target`
    pub already_present: bool,
}

/// A tracking branch created or fast-forwarded to the release commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchOp {
    pub branch: String,
    /// Current tip, `None` when the branch does not exist yet
    pub from: Option<Oid>,
    pub to: Oid,
    pub already_at_target: bool,
}

/// Every ref that must exist after releasing `version` at `target`.
///
/// The tag always comes before the branches, major before minor; apply in
/// this order so no tracking branch is ever ahead of its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefPlan {
    pub version: SemanticVersion,
    pub target: Oid,
    pub tag: TagOp,
    pub branches: Vec<BranchOp>,
}

impl RefPlan {
    /// True when every ref is already in place
    pub fn is_noop(&self) -> bool {
        self.tag.already_present && self.branches.iter().all(|b| b.already_at_target)
    }

    /// Non-force refspecs publishing the tag and branches, in plan order
    pub fn refspecs(&self) -> Vec<String> {
        let tag = format!("refs/tags/{0}:refs/tags/{0}", self.tag.name);
        std::iter::once(tag)
            .chain(
                self.branches
                    .iter()
                    .map(|b| format!("refs/heads/{0}:refs/heads/{0}", b.branch)),
            )
            .collect()
    }
}

/// Computes the ref plan for a release.
///
/// # Arguments
/// * `version` - Version being released
/// * `refs` - Snapshot of the repository's current tags and branches
/// * `target` - The release commit
/// * `options` - Which tracking branches to maintain
/// * `repo` - Used only to answer ancestry questions
///
/// # Returns
/// * `Ok(RefPlan)` - The plan, with no-op markers for refs already in place
/// * `Err(TagConflict)` - The tag exists at a different commit
/// * `Err(NonLinearHistory)` - A tracking branch cannot be fast-forwarded to `target`
pub fn plan<R: Repository + ?Sized>(
    version: SemanticVersion,
    refs: &RefSnapshot,
    target: Oid,
    options: BranchOptions,
    repo: &R,
) -> Result<RefPlan> {
    let tag_name = release_tag_name(&version);
    let already_present = match refs.tag(&tag_name) {
        None => false,
        Some(existing) if existing == target => true,
        Some(existing) => {
            return Err(ReleaseError::TagConflict {
                tag: tag_name,
                existing: existing.to_string(),
                requested: target.to_string(),
            })
        }
    };

    let mut branch_names = Vec::new();
    if options.create_major_branch {
        branch_names.push(major_branch_name(&version));
    }
    if options.create_minor_branch {
        branch_names.push(minor_branch_name(&version));
    }

    let branches = branch_names
        .into_iter()
        .map(|branch| plan_branch(branch, refs, target, repo))
        .collect::<Result<Vec<_>>>()?;

    Ok(RefPlan {
        version,
        target,
        tag: TagOp {
            name: tag_name,
            target,
            already_present,
        },
        branches,
    })
}

fn plan_branch<R: Repository + ?Sized>(
    branch: String,
    refs: &RefSnapshot,
    target: Oid,
    repo: &R,
) -> Result<BranchOp> {
    let from = refs.branch(&branch);
    let already_at_target = match from {
        None => false,
        Some(tip) if tip == target => true,
        // fast-forward only; a tip ahead of the release commit counts as non-linear too
        Some(tip) if repo.is_ancestor(tip, target)? => false,
        Some(tip) => {
            return Err(ReleaseError::NonLinearHistory {
                branch,
                current: tip.to_string(),
                target: target.to_string(),
            })
        }
    };

    Ok(BranchOp {
        branch,
        from,
        to: target,
        already_at_target,
    })
}
