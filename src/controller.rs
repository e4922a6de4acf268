//! Repository lifecycle: provision, attach, check out, initialize and push.
//!
//! ```text
//! UNREGISTERED --create--> CLONED --checkout--> CHECKED_OUT --init--> INITIALIZED
//!                                      ^   |
//!                                      +---+  remote ref absent (tolerated by init)
//! ```
//! Unrecovered transport, auth or filesystem errors leave the repository where it
//! failed; nothing is retried.

use git2::{Oid, Repository, Signature};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use crate::credentials::{self, GitTransport};
use crate::error::{Error, Result};
use crate::git::{self, PushFlag};
use crate::inventory::Inventory;
use crate::overrides::{OVERRIDES_FILE, OverridesDocument};
use crate::settings::Settings;
use crate::store::{NewRepository, RepoStore, RepositoryRecord};
use crate::templates;

/// On-disk working copy of a managed repository.
pub struct LocalClone {
    path: PathBuf,
    repo: Repository,
}

impl LocalClone {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }
}

impl fmt::Debug for LocalClone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalClone").field("path", &self.path).finish()
    }
}

/// A record with its live working copy attached. The clone is never persisted.
#[derive(Debug)]
pub struct ManagedRepo {
    pub record: RepositoryRecord,
    pub clone: LocalClone,
}

/// Drives the repository lifecycle against a record store and a cluster inventory.
///
/// Operations on the same repository name must not run concurrently; different
/// repositories are independent since each call builds its own [`GitTransport`].
pub struct RepoController<S, I> {
    settings: Settings,
    store: S,
    inventory: I,
}

/// Reject names that would escape `repos_dir` once joined onto it.
fn validate_repo_name(name: &str) -> Result<()> {
    let mut comps = Path::new(name).components();
    match (comps.next(), comps.next()) {
        (Some(Component::Normal(_)), None) if !name.contains('/') => Ok(()),
        _ => Err(Error::Config(format!(
            "repository name `{name}` must be a single path component"
        ))),
    }
}

fn remove_path(path: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path).map_err(Error::fs("remove directory", path))
    } else {
        fs::remove_file(path).map_err(Error::fs("remove file", path))
    }
}

impl<S: RepoStore, I: Inventory> RepoController<S, I> {
    pub fn new(settings: Settings, store: S, inventory: I) -> Self {
        Self {
            settings,
            store,
            inventory,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn repo_path(&self, repo_name: &str) -> PathBuf {
        self.settings.repos_dir.join(repo_name)
    }

    pub fn transport(&self, repo_name: &str) -> GitTransport {
        GitTransport::for_repo(&self.settings.repos_dir, repo_name)
    }

    fn ensure_repos_dir(&self) -> Result<()> {
        let dir = &self.settings.repos_dir;
        fs::create_dir_all(dir).map_err(Error::fs("create directory", dir))
    }

    /// Open the working copy for `record`, cloning it again if it is missing or broken.
    fn attach(&self, record: &RepositoryRecord) -> Result<LocalClone> {
        validate_repo_name(&record.repo_name)?;
        let path = self.repo_path(&record.repo_name);
        match Repository::open(&path) {
            Ok(repo) => Ok(LocalClone { path, repo }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "no usable clone, cloning from remote");
                if path.exists() {
                    remove_path(&path)?;
                }
                self.ensure_repos_dir()?;
                let repo =
                    git::clone_repo(&record.git_url, &path, &self.transport(&record.repo_name))?;
                Ok(LocalClone { path, repo })
            }
        }
    }

    /// Find the repository registered for `cluster_id` and attach its working copy.
    ///
    /// Returns `Ok(None)` when no repository is registered for the cluster.
    ///
    /// # Errors
    /// Fails if the store cannot be queried or a needed re-clone fails.
    pub fn get_by_cluster_id(&self, cluster_id: u64) -> Result<Option<ManagedRepo>> {
        let Some(record) = self.store.find_by_env_id(cluster_id)? else {
            debug!(cluster_id, "no repository registered");
            return Ok(None);
        };
        let clone = self.attach(&record)?;
        Ok(Some(ManagedRepo { record, clone }))
    }

    /// Provision a repository: write its deploy key, clone it fresh, persist the record.
    ///
    /// Anything already at `<repos_dir>/<repo_name>` is deleted first, including
    /// uncommitted work.
    ///
    /// # Errors
    /// - [`Error::Config`] for a repository name that is not a single path component.
    /// - [`Error::Filesystem`] if directories or the key file cannot be written.
    /// - [`Error::Transport`] if the remote is unreachable or rejects the key.
    pub fn create(&mut self, new: NewRepository) -> Result<ManagedRepo> {
        validate_repo_name(&new.repo_name)?;
        self.ensure_repos_dir()?;

        let path = self.repo_path(&new.repo_name);
        if path.exists() {
            warn!(path = %path.display(), "removing existing working copy before clone");
            remove_path(&path)?;
        }

        credentials::create_key_file(&self.settings.repos_dir, &new.repo_name, &new.user_key)?;
        let repo = git::clone_repo(&new.git_url, &path, &self.transport(&new.repo_name))?;

        let record = self.store.create(&new)?;
        info!(id = record.id, env_id = record.env_id, repo = %record.repo_name, "repository created");
        Ok(ManagedRepo {
            record,
            clone: LocalClone { path, repo },
        })
    }

    /// Fetch the record's ref and hard-reset the working copy onto it.
    ///
    /// A missing key file is recreated empty, which leaves the remote unreachable
    /// over SSH until a real key is provisioned again.
    ///
    /// # Errors
    /// Propagates every transport and resolution error, including
    /// [`Error::RemoteRefMissing`].
    pub fn checkout(&self, managed: &ManagedRepo) -> Result<Oid> {
        let name = &managed.record.repo_name;
        let key = credentials::key_path(&self.settings.repos_dir, name);
        if !key.exists() {
            warn!(path = %key.display(), "deploy key missing, recreating it without key material");
            credentials::create_key_file(&self.settings.repos_dir, name, "")?;
        }
        git::checkout_ref(
            managed.clone.repo(),
            &managed.record.git_ref,
            &self.transport(name),
        )
    }

    /// Initialize the repository for its cluster and push the result.
    ///
    /// Steps: check out the target ref (a ref missing on the remote is tolerated),
    /// write `overrides.yaml` per the overrides policy, copy the template tree,
    /// commit if anything changed, push `HEAD` to the target ref.
    ///
    /// Returns the successful push flag (`NewBranch` or `FastForward`).
    ///
    /// # Errors
    /// - [`Error::NoChanges`] if the remote already has everything.
    /// - [`Error::UnresolvableConflict`] for any other unsuccessful push.
    /// - Any checkout error other than [`Error::RemoteRefMissing`].
    pub fn init(&self, managed: &ManagedRepo) -> Result<PushFlag> {
        let record = &managed.record;
        let repo = managed.clone.repo();
        let workdir = managed.clone.path();

        match self.checkout(managed) {
            Ok(_) => {}
            Err(Error::RemoteRefMissing { git_ref }) => {
                info!(%git_ref, "remote has not been initialised, skipping checkout");
            }
            Err(e) => return Err(e),
        }

        let cluster = self.inventory.cluster(record.env_id)?;
        OverridesDocument::from_cluster(&cluster)
            .write(&workdir.join(OVERRIDES_FILE), self.settings.overrides_policy)?;
        templates::install_templates(self.settings.templates_dir.as_deref(), workdir)?;

        if git::is_dirty(repo)? {
            let sig = Signature::now(&self.settings.author_name, &self.settings.author_email)?;
            git::commit_all(repo, &self.settings.commit_message, &sig)?;
        } else {
            debug!(repo = %record.repo_name, "working tree clean, nothing to commit");
        }

        let report = git::push_head(repo, &record.git_ref, &self.transport(&record.repo_name))?;
        let flag = report.flag;
        git::interpret_push(report)?;
        info!(repo = %record.repo_name, %flag, "repository initialized");
        Ok(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_names_must_stay_inside_repos_dir() {
        assert!(validate_repo_name("env-1-config").is_ok());
        assert!(validate_repo_name("").is_err());
        assert!(validate_repo_name("..").is_err());
        assert!(validate_repo_name("a/b").is_err());
        assert!(validate_repo_name("/etc").is_err());
        assert!(validate_repo_name(".").is_err());
    }
}
