//! Pure formatting functions for UI output.
//!
//! `format_*` functions build the text; `display_*` functions print it.
//! Colour is applied through `console`, which drops styling when the output
//! is not a terminal.

use console::style;

use crate::boundary::BoundaryWarning;
use crate::cli::orchestration::{ReleaseResult, ReleaseStatus};

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a boundary warning to the user.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

fn short_commit(commit: &str) -> &str {
    commit.get(..7).unwrap_or(commit)
}

/// Builds the human-readable release report.
///
/// Lists the version and tag, every ref operation with its state
/// (`create`, `fast-forward`, `no-op`, marked `done` once applied), the
/// manifest substitution and, on failure, the error plus the steps that
/// completed before it.
pub fn format_release_report(result: &ReleaseResult) -> String {
    let mut lines = Vec::new();

    let heading = if result.dry_run {
        "Release plan (dry run)"
    } else {
        "Release"
    };
    lines.push(style(heading).bold().to_string());

    if let (Some(version), Some(tag)) = (&result.version, &result.tag) {
        lines.push(format!("  Version: {}", style(version).green()));
        lines.push(format!("  Tag:     {}", tag));
    }

    if let Some(tag) = &result.tag_op {
        let action = if tag.already_present {
            "no-op"
        } else if tag.applied {
            "created"
        } else {
            "create"
        };
        lines.push(format!(
            "  tag    {} -> {} [{}]",
            tag.name,
            short_commit(&tag.target),
            action
        ));
    }

    for op in &result.branch_ops {
        let action = match (op.already_at_target, op.applied, &op.from_commit) {
            (true, _, _) => "no-op",
            (false, true, _) => "done",
            (false, false, None) => "create",
            (false, false, Some(_)) => "fast-forward",
        };
        let from = op
            .from_commit
            .as_deref()
            .map(short_commit)
            .unwrap_or("(new)");
        lines.push(format!(
            "  branch {} {} -> {} [{}]",
            op.branch,
            from,
            short_commit(&op.to_commit),
            action
        ));
    }

    if let Some(manifest) = &result.manifest_patch {
        let action = if manifest.old_tag == manifest.new_tag {
            "no-op"
        } else if manifest.applied {
            "written"
        } else {
            "update"
        };
        lines.push(format!(
            "  manifest {}:{} {} -> {} [{}]",
            manifest.path, manifest.line, manifest.old_tag, manifest.new_tag, action
        ));
    }

    if let Some(remote) = &result.pushed_to {
        lines.push(format!("  pushed to {}", remote));
    }

    match (result.status, &result.error) {
        (ReleaseStatus::Done, _) => {
            lines.push(format!("{} {}", style("✓").green(), "Done"));
        }
        (ReleaseStatus::Failed, error) => {
            if let Some(error) = error {
                lines.push(format!(
                    "{} [{}] {}",
                    style("✗ Failed").red().bold(),
                    error.code,
                    error.message
                ));
            }
            let completed = result.completed_steps();
            if completed.is_empty() {
                lines.push("  No changes were made.".to_string());
            } else {
                lines.push("  Completed before the failure (not rolled back):".to_string());
                lines.extend(completed.iter().map(|step| format!("    - {}", step)));
            }
        }
    }

    lines.join("\n")
}

/// Print the release report and any warnings.
pub fn display_release_result(result: &ReleaseResult) {
    for warning in &result.warnings {
        display_boundary_warning(warning);
    }
    println!("{}", format_release_report(result));
}
