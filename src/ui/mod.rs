//! User interface module - rendering of release results.
//!
//! - `formatter` - Human-readable report and status lines
//! - This module - Machine-readable (JSON) output

use crate::cli::orchestration::ReleaseResult;
use crate::error::{ReleaseError, Result};

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_boundary_warning, display_error, display_release_result, display_status,
    display_success, format_release_report,
};

/// Serializes a release result as pretty-printed JSON for CI consumers.
pub fn render_json(result: &ReleaseResult) -> Result<String> {
    serde_json::to_string_pretty(result)
        .map_err(|e| ReleaseError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
