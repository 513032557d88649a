use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use tag_release::cli::{run_release, ReleaseRequest};
use tag_release::config::{self, Config};
use tag_release::git::Git2Repository;
use tag_release::{telemetry, ui, ReleaseError};

#[derive(clap::Parser, Debug)]
#[command(
    name = "tag-release",
    version,
    about = "Create release tags, move tracking branches and update the deployment manifest"
)]
struct Args {
    #[arg(
        value_name = "VERSION",
        env = "RELEASE_VERSION",
        default_value = "",
        help = "Version to release (MAJOR.MINOR.PATCH, optional 'v'); empty bumps the latest patch"
    )]
    release_version: String,

    #[arg(long, env = "RELEASE_DRY_RUN", help = "Preview what would happen without making changes")]
    dry_run: bool,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, help = "Deployment manifest to update")]
    manifest: Option<PathBuf>,

    #[arg(long, help = "Image whose tag is rewritten in the manifest")]
    image: Option<String>,

    #[arg(long, help = "Revision to release [default: HEAD]")]
    target: Option<String>,

    #[arg(long, help = "Do not create or move the vMAJOR branch")]
    no_major_branch: bool,

    #[arg(long, help = "Do not create or move the vMAJOR.MINOR branch")]
    no_minor_branch: bool,

    #[arg(long, help = "Fail instead of defaulting to 0.1.0 when no release exists")]
    no_default_version: bool,

    #[arg(long, value_name = "REMOTE", help = "Push the tag and branches to this remote")]
    push: Option<String>,

    #[arg(long, help = "Print the result as JSON")]
    json: bool,

    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
}

/// Merges command-line flags over the loaded configuration.
fn build_request(args: &Args, config: &Config) -> tag_release::Result<ReleaseRequest> {
    let image_name = args
        .image
        .clone()
        .or_else(|| config.release.image_name.clone())
        .filter(|image| !image.trim().is_empty())
        .ok_or_else(|| ReleaseError::config("No image name given (--image or release.image_name)"))?;
    let manifest_path = args
        .manifest
        .clone()
        .or_else(|| config.release.manifest_path.clone())
        .ok_or_else(|| {
            ReleaseError::config("No manifest path given (--manifest or release.manifest_path)")
        })?;

    let mut branch_options = config.branches.options();
    if args.no_major_branch {
        branch_options.create_major_branch = false;
    }
    if args.no_minor_branch {
        branch_options.create_minor_branch = false;
    }

    Ok(ReleaseRequest {
        version_input: args.release_version.clone(),
        dry_run: args.dry_run,
        manifest_path,
        image_name,
        branch_options,
        target: args
            .target
            .clone()
            .unwrap_or_else(|| config.release.target.clone()),
        allow_default_version: config.release.allow_default_version && !args.no_default_version,
        push_remote: args
            .push
            .clone()
            .or_else(|| config.behavior.push_remote.clone()),
    })
}

fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_tracing(if args.verbose { Level::DEBUG } else { Level::WARN });

    let config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };

    let request = match build_request(&args, &config) {
        Ok(request) => request,
        Err(e) => {
            ui::display_error(&e.to_string());
            std::process::exit(1);
        }
    };

    let repo = Git2Repository::open(".").context("Not in a git repository")?;
    if request.dry_run && !args.json {
        ui::display_status("Dry run: no changes will be made");
    }
    let result = run_release(&repo, request);

    if args.json {
        println!("{}", ui::render_json(&result)?);
    } else {
        ui::display_release_result(&result);
        if result.is_done() && !result.dry_run {
            if let Some(tag) = &result.tag {
                ui::display_success(&format!("Released {}", tag));
            }
        }
    }

    if !result.is_done() {
        std::process::exit(1);
    }

    Ok(())
}
