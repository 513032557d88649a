use serde::Serialize;
use std::fmt;

/// Non-fatal conditions noticed while preparing a release.
/// They never stop a release but are reported to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BoundaryWarning {
    /// Tag looks like a version but is not a plain `vX.Y.Z` release
    UnparsableTag { tag: String, reason: String },
    /// Manifest already references the release tag
    ManifestAlreadyCurrent { image: String, tag: String },
    /// Released version is lower than the highest existing release
    OlderThanLatest { version: String, latest: String },
    /// Image reference pins a digest that still names the previous image
    DigestPinned { image: String, digest: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::UnparsableTag { tag, reason } => {
                write!(f, "Ignoring tag '{}': {}", tag, reason)
            }
            BoundaryWarning::ManifestAlreadyCurrent { image, tag } => {
                write!(f, "Manifest already references {}:{}", image, tag)
            }
            BoundaryWarning::DigestPinned { image, digest } => {
                write!(
                    f,
                    "{} is pinned to {}; the digest was kept and still selects the old image",
                    image, digest
                )
            }
            BoundaryWarning::OlderThanLatest { version, latest } => {
                write!(
                    f,
                    "Releasing {} although {} is the latest release",
                    version, latest
                )
            }
        }
    }
}
