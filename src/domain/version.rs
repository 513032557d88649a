use crate::error::{ReleaseError, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Version used when no release exists yet and the caller gave none.
pub const INITIAL_VERSION: SemanticVersion = SemanticVersion::new(0, 1, 0);

/// Semantic version representation (`major.minor.patch`, no pre-release or build metadata)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

fn release_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^v?([0-9]+)\.([0-9]+)\.([0-9]+)$").expect("release pattern is valid")
    })
}

impl SemanticVersion {
    /// Create a new version
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        SemanticVersion {
            major,
            minor,
            patch,
        }
    }

    /// Parse a release version, optionally prefixed with `v` (e.g. "v1.2.3" -> 1.2.3).
    ///
    /// Rejects extra or missing segments, non-numeric components, leading
    /// zeros and any pre-release or build suffix.
    pub fn parse(input: &str) -> Result<Self> {
        if !release_pattern().is_match(input) {
            let reason = if input.contains('-') || input.contains('+') {
                "pre-release and build metadata are not accepted"
            } else {
                "expected MAJOR.MINOR.PATCH"
            };
            return Err(ReleaseError::invalid_version(input, reason));
        }

        // semver enforces the no-leading-zero rule and numeric bounds
        let core = input.strip_prefix('v').unwrap_or(input);
        let parsed = semver::Version::parse(core)
            .map_err(|e| ReleaseError::invalid_version(input, e.to_string()))?;

        Ok(SemanticVersion::new(parsed.major, parsed.minor, parsed.patch))
    }

    /// The next patch release (1.4.2 -> 1.4.3)
    pub fn next_patch(&self) -> Option<Self> {
        let patch = self.patch.checked_add(1)?;
        Some(SemanticVersion::new(self.major, self.minor, patch))
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Resolves the version to release from the requested input.
///
/// A non-empty `input` is parsed strictly. An empty one increments the patch
/// of `current_latest`, or falls back to [`INITIAL_VERSION`] when nothing has
/// been released yet and `allow_default` permits it.
///
/// # Arguments
/// * `input` - Requested version, possibly empty; surrounding whitespace is ignored
/// * `current_latest` - Highest existing release, if any
/// * `allow_default` - Whether a first release may default to 0.1.0
///
/// # Returns
/// * `Ok(SemanticVersion)` - The version to release
/// * `Err(InvalidVersion)` - If `input` is malformed
/// * `Err(NoPriorVersion)` - If derivation is needed but defaulting is forbidden
pub fn resolve_version(
    input: &str,
    current_latest: Option<SemanticVersion>,
    allow_default: bool,
) -> Result<SemanticVersion> {
    let input = input.trim();
    if !input.is_empty() {
        return SemanticVersion::parse(input);
    }

    match current_latest {
        Some(latest) => latest.next_patch().ok_or_else(|| {
            ReleaseError::invalid_version(latest.to_string(), "patch component cannot be incremented")
        }),
        None if allow_default => Ok(INITIAL_VERSION),
        None => Err(ReleaseError::NoPriorVersion),
    }
}
