use crate::boundary::BoundaryWarning;
use crate::domain::SemanticVersion;
use crate::error::ReleaseError;

/// Prefix shared by release tags and tracking branches
pub const TAG_PREFIX: &str = "v";

/// Exact release tag name (1.2.3 -> "v1.2.3")
pub fn release_tag_name(version: &SemanticVersion) -> String {
    format!("{}{}", TAG_PREFIX, version)
}

/// Major tracking branch name (1.2.3 -> "v1")
pub fn major_branch_name(version: &SemanticVersion) -> String {
    format!("{}{}", TAG_PREFIX, version.major)
}

/// Minor tracking branch name (1.2.3 -> "v1.2")
pub fn minor_branch_name(version: &SemanticVersion) -> String {
    format!("{}{}.{}", TAG_PREFIX, version.major, version.minor)
}

/// Highest release found among a set of tag names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LatestRelease {
    pub version: Option<SemanticVersion>,
    pub tag: Option<String>,
    /// Version-like tags that were skipped because they are not plain releases
    pub skipped: Vec<BoundaryWarning>,
}

/// Finds the highest `vX.Y.Z` release among `tags`.
///
/// Tags that start like a version (`v` followed by a digit) but do not parse
/// as a plain release, such as `v1.2.0-rc.1`, are skipped and reported.
/// Everything else is ignored silently.
pub fn latest_release<'a, I>(tags: I) -> LatestRelease
where
    I: IntoIterator<Item = &'a String>,
{
    let mut latest = LatestRelease::default();

    for tag in tags {
        let Some(rest) = tag.strip_prefix(TAG_PREFIX) else {
            continue;
        };
        if !rest.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }

        match SemanticVersion::parse(rest) {
            Ok(version) => {
                if latest.version.map_or(true, |current| version > current) {
                    latest.version = Some(version);
                    latest.tag = Some(tag.clone());
                }
            }
            Err(e) => latest.skipped.push(BoundaryWarning::UnparsableTag {
                tag: tag.clone(),
                reason: match e {
                    ReleaseError::InvalidVersion { reason, .. } => reason,
                    other => other.to_string(),
                },
            }),
        }
    }

    latest
}
