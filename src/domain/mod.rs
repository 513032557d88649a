//! Domain logic - pure release rules independent of git and filesystem I/O

pub mod manifest;
pub mod plan;
pub mod tag;
pub mod version;

pub use manifest::ManifestPatch;
pub use plan::{plan, BranchOp, BranchOptions, RefPlan, TagOp};
pub use tag::{latest_release, LatestRelease};
pub use version::{resolve_version, SemanticVersion, INITIAL_VERSION};
