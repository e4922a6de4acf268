use anyhow::Result;
use std::{env, path::PathBuf};

/// Files and directories the `cfgrepo` binary works with.
///
/// The library itself only needs `repos`; the rest back the CLI's
/// settings, registry and inventory files.
#[derive(Clone, Debug)]
pub struct Paths {
    pub repos: PathBuf,
    pub config: PathBuf,
    pub registry: PathBuf,
    pub inventory: PathBuf,
}

/// Resolve the cfgrepo home directory.
///
/// Resolution order:
/// 1. `$CFGREPO_HOME`
/// 2. `$XDG_CONFIG_HOME/.cfgrepo`
/// 3. `$HOME/.config/.cfgrepo`
pub fn cfgrepo_home() -> Result<PathBuf> {
    if let Some(explicit) = env::var_os("CFGREPO_HOME") {
        return Ok(PathBuf::from(explicit));
    }
    let xdg = env::var_os("XDG_CONFIG_HOME");
    let base = xdg
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env::var_os("HOME").unwrap_or_default()).join(".config"));
    Ok(base.join(".cfgrepo"))
}

pub fn paths() -> Result<Paths> {
    let home = cfgrepo_home()?;
    Ok(Paths {
        repos: home.join("repos"),
        config: home.join("config.toml"),
        registry: home.join("repos.toml"),
        inventory: home.join("clusters.toml"),
    })
}
