use crate::domain::BranchOptions;
use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the current directory
pub const LOCAL_CONFIG_FILE: &str = "tagrelease.toml";

/// File name looked up in the user config directory
pub const USER_CONFIG_FILE: &str = ".tagrelease.toml";

/// Represents the complete configuration for tag-release.
///
/// Contains the manifest selector, tracking branch switches and behavior options.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub release: ReleaseConfig,

    #[serde(default)]
    pub branches: BranchesConfig,

    #[serde(default)]
    pub behavior: BehaviorConfig,
}

fn default_target() -> String {
    "HEAD".to_string()
}

fn default_true() -> bool {
    true
}

/// What gets released and where its image reference lives.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReleaseConfig {
    /// Image whose tag is rewritten in the manifest (e.g. "ghcr.io/org/app")
    #[serde(default)]
    pub image_name: Option<String>,

    /// Deployment manifest holding the image reference
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,

    /// Revision released when none is given on the command line
    #[serde(default = "default_target")]
    pub target: String,

    /// Whether the first release may default to 0.1.0
    #[serde(default = "default_true")]
    pub allow_default_version: bool,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            image_name: None,
            manifest_path: None,
            target: default_target(),
            allow_default_version: true,
        }
    }
}

/// Moving tracking branches kept in step with releases.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BranchesConfig {
    #[serde(default = "default_true")]
    pub major: bool,

    #[serde(default = "default_true")]
    pub minor: bool,
}

impl Default for BranchesConfig {
    fn default() -> Self {
        BranchesConfig {
            major: true,
            minor: true,
        }
    }
}

impl BranchesConfig {
    pub fn options(&self) -> BranchOptions {
        BranchOptions {
            create_major_branch: self.major,
            create_minor_branch: self.minor,
        }
    }
}

/// Configuration for behavior customization.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct BehaviorConfig {
    /// Remote to push the tag and branches to after applying
    #[serde(default)]
    pub push_remote: Option<String>,
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| ReleaseError::config(e.to_string()))
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `tagrelease.toml` in current directory
/// 3. `.tagrelease.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)?
    } else if Path::new(LOCAL_CONFIG_FILE).exists() {
        fs::read_to_string(LOCAL_CONFIG_FILE)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(USER_CONFIG_FILE);
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    parse_config(&config_str)
}
