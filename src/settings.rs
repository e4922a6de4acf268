use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::overrides::OverridesPolicy;
use crate::paths::Paths;

pub const DEFAULT_COMMIT_MESSAGE: &str = "Config repo Initialized";
const DEFAULT_AUTHOR_NAME: &str = "cfgrepo";
const DEFAULT_AUTHOR_EMAIL: &str = "cfgrepo@localhost";

/// Resolved settings the repository controller runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root for working copies and key files.
    pub repos_dir: PathBuf,
    /// Tree copied into every repository on initialization. `None` uses the
    /// template compiled into the binary.
    pub templates_dir: Option<PathBuf>,
    pub commit_message: String,
    pub author_name: String,
    pub author_email: String,
    pub overrides_policy: OverridesPolicy,
}

impl Settings {
    /// Defaults rooted at `repos_dir`.
    pub fn new(repos_dir: impl Into<PathBuf>) -> Self {
        Self {
            repos_dir: repos_dir.into(),
            templates_dir: None,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            author_name: DEFAULT_AUTHOR_NAME.to_string(),
            author_email: DEFAULT_AUTHOR_EMAIL.to_string(),
            overrides_policy: OverridesPolicy::default(),
        }
    }
}

/// On-disk form of `config.toml`. Every key is optional.
///
/// Example TOML:
/// ```toml
/// repos_dir        = "/var/lib/cfgrepo/repos"
/// templates_dir    = "/usr/share/cfgrepo/templates/gitrepo"
/// commit_message   = "Config repo Initialized"
/// author_name      = "cfgrepo"
/// author_email     = "cfgrepo@localhost"
/// overrides_policy = "write_if_absent"   # or "overwrite"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    repos_dir: Option<PathBuf>,
    templates_dir: Option<PathBuf>,
    commit_message: Option<String>,
    author_name: Option<String>,
    author_email: Option<String>,
    overrides_policy: Option<OverridesPolicy>,
}

fn parse_settings(txt: &str, p: &Paths) -> Result<Settings> {
    let file: SettingsFile = toml::from_str(txt).context("failed to parse config.toml")?;
    let mut s = Settings::new(file.repos_dir.unwrap_or_else(|| p.repos.clone()));
    if let Some(dir) = file.templates_dir {
        s.templates_dir = Some(dir);
    }
    if let Some(msg) = file.commit_message {
        s.commit_message = msg;
    }
    if let Some(name) = file.author_name {
        s.author_name = name;
    }
    if let Some(email) = file.author_email {
        s.author_email = email;
    }
    if let Some(policy) = file.overrides_policy {
        s.overrides_policy = policy;
    }
    Ok(s)
}

/// Load `config.toml` into [`Settings`].
///
/// # Errors
/// - Returns an error if `config.toml` exists but cannot be read.
/// - Returns an error if parsing the TOML fails.
///
/// # Notes
/// - A missing file yields the defaults, with `repos_dir` under the cfgrepo home.
pub fn load_settings(p: &Paths) -> Result<Settings> {
    if !p.config.exists() {
        return Ok(Settings::new(p.repos.clone()));
    }
    let txt = fs::read_to_string(&p.config)
        .with_context(|| format!("failed to read config: {}", p.config.display()))?;
    parse_settings(&txt, p)
}
