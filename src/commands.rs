//! CLI commands. Each one wires the library to the file-backed store and inventory
//! under the cfgrepo home.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

use crate::controller::RepoController;
use crate::credentials;
use crate::error::Error;
use crate::git;
use crate::inventory::StaticInventory;
use crate::paths::paths;
use crate::progress::{err_style, ok_style, spinner};
use crate::settings::load_settings;
use crate::store::{FileStore, NewRepository, RepoStore};

type CliController = RepoController<FileStore, StaticInventory>;

fn controller() -> Result<CliController> {
    let p = paths()?;
    let settings = load_settings(&p)?;
    let inventory = StaticInventory::load(&p.inventory)
        .with_context(|| format!("failed to load inventory: {}", p.inventory.display()))?;
    Ok(RepoController::new(settings, FileStore::new(&p.registry), inventory))
}

/// Register a repository for a cluster and clone it.
///
/// # Errors
/// Fails if the key file cannot be read or provisioning fails.
pub fn cmd_create(env_id: u64, name: &str, url: &str, git_ref: &str, key_file: &Path) -> Result<()> {
    let user_key = fs::read_to_string(key_file)
        .with_context(|| format!("failed to read key file: {}", key_file.display()))?;
    let mut ctl = controller()?;
    if let Some(existing) = ctl.store().find_by_env_id(env_id)? {
        bail!(
            "cluster {} already has repository `{}` (id {})",
            env_id,
            existing.repo_name,
            existing.id
        );
    }

    let pb = spinner(format!("cloning {}", url));
    match ctl.create(NewRepository {
        repo_name: name.to_string(),
        env_id,
        git_url: url.to_string(),
        git_ref: git_ref.to_string(),
        user_key,
    }) {
        Ok(managed) => {
            pb.set_style(ok_style());
            pb.finish_with_message(format!(
                "created {} (id {}) at {}",
                managed.record.repo_name,
                managed.record.id,
                managed.clone.path().display()
            ));
            Ok(())
        }
        Err(e) => {
            pb.set_style(err_style());
            pb.finish_with_message(format!("create {} (error: {})", name, e));
            Err(e.into())
        }
    }
}

/// Initialize the cluster's repository and push it.
///
/// A remote that already has everything is reported as up to date, not as an error.
pub fn cmd_init(env_id: u64) -> Result<()> {
    let ctl = controller()?;
    let pb = spinner(format!("initializing repository for cluster {}", env_id));
    let result = ctl.get_by_cluster_id(env_id).and_then(|found| match found {
        Some(managed) => ctl.init(&managed).map(|flag| Some((managed, flag))),
        None => Ok(None),
    });

    match result {
        Ok(Some((managed, flag))) => {
            pb.set_style(ok_style());
            pb.finish_with_message(format!(
                "initialized {} ({})",
                managed.record.repo_name, flag
            ));
            Ok(())
        }
        Ok(None) => {
            pb.set_style(err_style());
            pb.finish_with_message(format!("no repository registered for cluster {}", env_id));
            bail!("no repository registered for cluster {}", env_id)
        }
        Err(Error::NoChanges) => {
            pb.set_style(ok_style());
            pb.finish_with_message("already up to date");
            Ok(())
        }
        Err(e) => {
            pb.set_style(err_style());
            pb.finish_with_message(format!("init cluster {} (error: {})", env_id, e));
            Err(e.into())
        }
    }
}

/// Print the registered repository for a cluster and the state of its clone.
pub fn cmd_show(env_id: u64) -> Result<()> {
    let ctl = controller()?;
    let Some(managed) = ctl.get_by_cluster_id(env_id)? else {
        bail!("no repository registered for cluster {}", env_id);
    };
    let r = &managed.record;
    let repo = managed.clone.repo();
    let head = git::head_commit(repo)?
        .map(|c| c.id().to_string())
        .unwrap_or_else(|| "(unborn)".to_string());

    println!("id:       {}", r.id);
    println!("name:     {}", r.repo_name);
    println!("cluster:  {}", r.env_id);
    println!("url:      {}", r.git_url);
    println!("ref:      {}", r.git_ref);
    println!("path:     {}", managed.clone.path().display());
    println!("key:      {}", credentials::key_path(&ctl.settings().repos_dir, &r.repo_name).display());
    println!("head:     {}", head);
    println!("dirty:    {}", git::is_dirty(repo)?);
    Ok(())
}

pub fn cmd_key_path(name: &str) -> Result<()> {
    let p = paths()?;
    let settings = load_settings(&p)?;
    println!("{}", credentials::key_path(&settings.repos_dir, name).display());
    Ok(())
}

pub fn cmd_ssh_command(name: &str) -> Result<()> {
    let p = paths()?;
    let settings = load_settings(&p)?;
    println!("{}", credentials::ssh_command(&settings.repos_dir, name));
    Ok(())
}
