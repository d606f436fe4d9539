use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::Serialize;

/// Environment variables consulted for the API base URL, in order.
pub const BASE_URL_ENV_VARS: [&str; 2] = ["STOCKVIEW_API_BASE_URL", "VITE_API_BASE_URL"];

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(alias = "api_base_url")]
    pub base_url: Option<String>,
    pub timeout: Option<u64>,
    pub no_color: Option<bool>,
    pub refresh_on_failure: Option<bool>,
    pub output_format: Option<String>,
    pub verbose: Option<u8>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".stockview").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// First non-empty base URL found in the environment.
pub fn base_url_from_env() -> Option<String> {
    BASE_URL_ENV_VARS
        .iter()
        .filter_map(|key| env::var(key).ok())
        .find(|v| !v.trim().is_empty())
}

pub fn load_config(path: &Path, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

pub fn parse_config(contents: &str) -> Result<ConfigFile, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str::<ConfigFile>(contents)
}

fn default_config_yaml() -> &'static str {
    r#"# stockview config
#
# Location (default):
#   ~/.stockview/config.yml
#
# Precedence: command line > STOCKVIEW_API_BASE_URL / VITE_API_BASE_URL > this file.

# Product API root; "/product" is appended. Trailing slashes are ignored.
# base_url: http://localhost:3000

# Per-request timeout in seconds
timeout: 10

# Re-fetch the product list even when a create/update/delete was rejected
refresh_on_failure: true

# Output for --list: text or json
output_format: text

no_color: false

# Log level on stderr: 0 warn, 1 info, 2 debug. Any -v on the command line wins.
verbose: 0
"#
}

pub fn ensure_default_config_file(path: &Path) -> Result<bool, String> {
    if path.exists() {
        return Ok(false);
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    std::fs::write(path, default_config_yaml())
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(true)
}
