use crate::error::{ReleaseError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Longest tag a registry accepts
pub const MAX_TAG_LEN: usize = 128;

/// One tag substitution inside a deployment manifest.
///
/// Computed without touching the filesystem; the caller decides whether to
/// write [`ManifestPatch::patched_text`] back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestPatch {
    pub path: PathBuf,
    pub image_name: String,
    pub old_tag: String,
    pub new_tag: String,
    /// Digest pinned after the tag (`sha256:...`), left untouched by the patch
    pub digest: Option<String>,
    pub found: bool,
    /// 1-based line of the matched reference
    pub line: usize,
    patched_text: String,
}

impl ManifestPatch {
    /// Replaces the tag of the single `<image_name>:<tag>` reference in `text`.
    ///
    /// The image name must match exactly: `ghcr.io/org/app` does not match
    /// `ghcr.io/org/app-worker:...` nor `mirror/ghcr.io/org/app:...`. A digest
    /// following the tag (`@sha256:...`) is kept as is and reported in
    /// [`ManifestPatch::digest`].
    ///
    /// # Returns
    /// * `Ok(ManifestPatch)` - Exactly one reference found
    /// * `Err(Config)` - `image_name` is blank
    /// * `Err(ImageRefNotFound)` - No reference found
    /// * `Err(AmbiguousImageRef)` - More than one reference found
    /// * `Err(InvalidImageRef)` - The existing tag is longer than 128 characters
    pub fn compute(path: &Path, text: &str, image_name: &str, new_tag: &str) -> Result<Self> {
        if image_name.trim().is_empty() {
            return Err(ReleaseError::config("Image name must not be empty"));
        }

        // no lookbehind in `regex`, so the boundary character is captured instead
        let pattern = format!(
            r"(?:^|[^A-Za-z0-9._/:@-]){}:([A-Za-z0-9_][A-Za-z0-9_.-]*)(@[A-Za-z0-9_+.-]+:[A-Za-z0-9=_-]+)?",
            regex::escape(image_name)
        );
        let re = Regex::new(&pattern).map_err(|e| {
            ReleaseError::config(format!("Invalid image name '{}': {}", image_name, e))
        })?;

        let matches: Vec<(regex::Match, Option<regex::Match>)> = re
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).map(|tag| (tag, caps.get(2))))
            .collect();

        let (tag_match, digest_match) = match matches.as_slice() {
            [] => {
                return Err(ReleaseError::ImageRefNotFound {
                    image: image_name.to_string(),
                    path: path.display().to_string(),
                })
            }
            [single] => *single,
            many => {
                return Err(ReleaseError::AmbiguousImageRef {
                    image: image_name.to_string(),
                    path: path.display().to_string(),
                    count: many.len(),
                    lines: many.iter().map(|(m, _)| line_of(text, m.start())).collect(),
                })
            }
        };

        let line = line_of(text, tag_match.start());
        if tag_match.as_str().len() > MAX_TAG_LEN {
            return Err(ReleaseError::InvalidImageRef {
                image: image_name.to_string(),
                path: path.display().to_string(),
                line,
                reason: format!(
                    "tag is {} characters long, the limit is {}",
                    tag_match.as_str().len(),
                    MAX_TAG_LEN
                ),
            });
        }

        let mut patched_text = String::with_capacity(text.len() + new_tag.len());
        patched_text.push_str(&text[..tag_match.start()]);
        patched_text.push_str(new_tag);
        patched_text.push_str(&text[tag_match.end()..]);

        Ok(ManifestPatch {
            path: path.to_path_buf(),
            image_name: image_name.to_string(),
            old_tag: tag_match.as_str().to_string(),
            new_tag: new_tag.to_string(),
            digest: digest_match.map(|m| m.as_str()[1..].to_string()),
            found: true,
            line,
            patched_text,
        })
    }

    /// Manifest content after the substitution
    pub fn patched_text(&self) -> &str {
        &self.patched_text
    }

    /// False when the manifest already references `new_tag`
    pub fn changes_content(&self) -> bool {
        self.old_tag != self.new_tag
    }
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}
