//! Git ref store abstraction layer
//!
//! The release flow never holds repository state in-process: it reads the
//! current refs through the [Repository] trait, plans against that snapshot,
//! and writes back through the same trait. Implementations:
//!
//! - [repository::Git2Repository]: a real implementation using the `git2` crate
//! - [mock::MockRepository]: an in-memory fake for tests
//!
//! ```rust
//! # use tag_release::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> tag_release::Result<()> {
//! let refs = repo.read_refs()?;
//! let head = repo.resolve_commit("HEAD")?;
//! println!("{} tags, HEAD at {}", refs.tags.len(), head);
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;
use git2::Oid;
use std::collections::BTreeMap;

/// Tags and local branches of a repository, read at a single point in time.
///
/// Annotated tags are peeled to the commit they point at. Ordered maps keep
/// every derived plan deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RefSnapshot {
    pub tags: BTreeMap<String, Oid>,
    pub branches: BTreeMap<String, Oid>,
}

impl RefSnapshot {
    /// Commit a tag points at, if the tag exists
    pub fn tag(&self, name: &str) -> Option<Oid> {
        self.tags.get(name).copied()
    }

    /// Tip of a local branch, if the branch exists
    pub fn branch(&self, name: &str) -> Option<Oid> {
        self.branches.get(name).copied()
    }
}

/// Narrow read/write interface to a repository's refs.
///
/// ## Atomicity
///
/// Writes must be individually atomic: [Repository::create_tag] never
/// overwrites an existing tag and [Repository::update_branch] only succeeds if
/// the branch still points at the expected commit. A concurrent writer is then
/// reported as [crate::error::ReleaseError::TagConflict] or
/// [crate::error::ReleaseError::NonLinearHistory] instead of being clobbered.
///
/// ## Implementations
///
/// - [Git2Repository](repository::Git2Repository)
/// - [MockRepository](mock::MockRepository)
pub trait Repository: Send + Sync {
    /// Read all tags and local branches
    fn read_refs(&self) -> Result<RefSnapshot>;

    /// Resolve a revision (e.g. "HEAD", a branch, a SHA) to a commit
    fn resolve_commit(&self, revision: &str) -> Result<Oid>;

    /// Whether `ancestor` is reachable from `descendant`.
    ///
    /// A commit counts as its own ancestor.
    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool>;

    /// Create a lightweight tag at `target`
    ///
    /// # Returns
    /// * `Ok(())` - The tag was created
    /// * `Err(TagConflict)` - A tag with this name already exists
    fn create_tag(&self, name: &str, target: Oid) -> Result<()>;

    /// Point a local branch at `target`, creating it when `expected` is `None`.
    ///
    /// # Arguments
    /// * `name` - Branch name without the `refs/heads/` prefix
    /// * `expected` - Tip observed when the update was planned
    /// * `target` - New tip
    ///
    /// # Returns
    /// * `Ok(())` - The branch now points at `target`
    /// * `Err(NonLinearHistory)` - The branch moved since `expected` was read
    fn update_branch(&self, name: &str, expected: Option<Oid>, target: Oid) -> Result<()>;

    /// Push refspecs to a remote without forcing
    fn push_refs(&self, remote: &str, refspecs: &[String]) -> Result<()>;
}
