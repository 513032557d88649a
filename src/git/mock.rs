use crate::error::{ReleaseError, Result};
use crate::git::{RefSnapshot, Repository};
use git2::Oid;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory repository for testing without actual git operations.
///
/// Holds a commit graph, tags, branches and named revisions, and records
/// every mutation so tests can assert on side effects.
pub struct MockRepository {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    parents: HashMap<Oid, Vec<Oid>>,
    refs: RefSnapshot,
    revisions: HashMap<String, Oid>,
    failing_branches: HashSet<String>,
    fail_tags: bool,
    fail_push: bool,
    mutations: Vec<String>,
    pushes: Vec<(String, Vec<String>)>,
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        MockRepository {
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut MockState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a commit with its parents to the graph
    pub fn add_commit(&mut self, oid: Oid, parents: &[Oid]) {
        self.state_mut().parents.insert(oid, parents.to_vec());
    }

    /// Add a tag pointing to an OID
    pub fn add_tag(&mut self, name: impl Into<String>, oid: Oid) {
        self.state_mut().refs.tags.insert(name.into(), oid);
    }

    /// Set a branch head
    pub fn set_branch_head(&mut self, branch: impl Into<String>, oid: Oid) {
        self.state_mut().refs.branches.insert(branch.into(), oid);
    }

    /// Make a revision such as "HEAD" resolve to an OID
    pub fn set_revision(&mut self, revision: impl Into<String>, oid: Oid) {
        self.state_mut().revisions.insert(revision.into(), oid);
    }

    /// Make every tag creation fail
    pub fn fail_tag_creation(&mut self) {
        self.state_mut().fail_tags = true;
    }

    /// Make updates of one branch fail
    pub fn fail_branch_update(&mut self, branch: impl Into<String>) {
        self.state_mut().failing_branches.insert(branch.into());
    }

    /// Make every push fail
    pub fn fail_push(&mut self) {
        self.state_mut().fail_push = true;
    }

    /// Current refs
    pub fn snapshot(&self) -> RefSnapshot {
        self.state().refs.clone()
    }

    /// Mutations performed so far, in order ("tag v1.0.0", "branch v1")
    pub fn mutations(&self) -> Vec<String> {
        self.state().mutations.clone()
    }

    /// Pushes performed so far as (remote, refspecs)
    pub fn pushes(&self) -> Vec<(String, Vec<String>)> {
        self.state().pushes.clone()
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn read_refs(&self) -> Result<RefSnapshot> {
        Ok(self.snapshot())
    }

    fn resolve_commit(&self, revision: &str) -> Result<Oid> {
        let state = self.state();
        if let Some(oid) = state.revisions.get(revision) {
            return Ok(*oid);
        }
        if let Some(oid) = state.refs.branch(revision) {
            return Ok(oid);
        }
        Oid::from_str(revision)
            .ok()
            .filter(|oid| state.parents.contains_key(oid))
            .ok_or_else(|| {
                ReleaseError::Git(git2::Error::from_str(&format!(
                    "revspec '{}' not found",
                    revision
                )))
            })
    }

    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool> {
        let state = self.state();
        let mut pending = vec![descendant];
        let mut seen = HashSet::new();

        while let Some(oid) = pending.pop() {
            if oid == ancestor {
                return Ok(true);
            }
            if !seen.insert(oid) {
                continue;
            }
            if let Some(parents) = state.parents.get(&oid) {
                pending.extend(parents.iter().copied());
            }
        }

        Ok(false)
    }

    fn create_tag(&self, name: &str, target: Oid) -> Result<()> {
        let mut state = self.state();
        if state.fail_tags {
            return Err(ReleaseError::Git(git2::Error::from_str(
                "injected tag creation failure",
            )));
        }
        if let Some(existing) = state.refs.tag(name) {
            return Err(ReleaseError::TagConflict {
                tag: name.to_string(),
                existing: existing.to_string(),
                requested: target.to_string(),
            });
        }
        state.refs.tags.insert(name.to_string(), target);
        state.mutations.push(format!("tag {}", name));
        Ok(())
    }

    fn update_branch(&self, name: &str, expected: Option<Oid>, target: Oid) -> Result<()> {
        let mut state = self.state();
        if state.failing_branches.contains(name) {
            return Err(ReleaseError::Git(git2::Error::from_str(&format!(
                "injected failure updating branch {}",
                name
            ))));
        }
        let current = state.refs.branch(name);
        if current != expected {
            return Err(ReleaseError::NonLinearHistory {
                branch: name.to_string(),
                current: current.map_or_else(|| "(missing)".to_string(), |o| o.to_string()),
                target: target.to_string(),
            });
        }
        state.refs.branches.insert(name.to_string(), target);
        state.mutations.push(format!("branch {}", name));
        Ok(())
    }

    fn push_refs(&self, remote: &str, refspecs: &[String]) -> Result<()> {
        let mut state = self.state();
        if state.fail_push {
            return Err(ReleaseError::remote(format!(
                "injected push failure for '{}'",
                remote
            )));
        }
        state
            .pushes
            .push((remote.to_string(), refspecs.to_vec()));
        Ok(())
    }
}
