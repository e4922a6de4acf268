//! Per-repository deploy keys.
//!
//! Each managed repository owns one private key at `<repos_dir>/<repo_name>.key`.
//! Network operations never read credentials from process-wide state: they get a
//! [`GitTransport`] built for exactly one repository and pass it down explicitly.

use git2::{CertificateCheckStatus, Cred, FetchOptions, PushOptions, RemoteCallbacks};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

const KEY_MODE: u32 = 0o600;

/// Path of the deploy key for `repo_name`. No I/O.
pub fn key_path(repos_dir: &Path, repo_name: &str) -> PathBuf {
    repos_dir.join(format!("{repo_name}.key"))
}

/// SSH invocation that skips host-key verification and uses the repository's key.
pub fn ssh_command(repos_dir: &Path, repo_name: &str) -> String {
    format!(
        "ssh -o StrictHostKeyChecking=no -i {}",
        key_path(repos_dir, repo_name).display()
    )
}

/// Write `key_material` to the repository's key file and restrict it to the owner.
///
/// Any existing file is truncated and overwritten. The mode is set explicitly after
/// writing, so the result is `0600` whatever the process umask or the previous
/// permissions were.
///
/// # Errors
/// Returns [`Error::Filesystem`] if the file cannot be written or chmod-ed.
pub fn create_key_file(repos_dir: &Path, repo_name: &str, key_material: &str) -> Result<PathBuf> {
    let path = key_path(repos_dir, repo_name);
    let mut f = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(KEY_MODE)
        .open(&path)
        .map_err(Error::fs("open key file", &path))?;
    f.write_all(key_material.as_bytes())
        .map_err(Error::fs("write key file", &path))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(KEY_MODE))
        .map_err(Error::fs("restrict key file", &path))?;
    debug!(path = %path.display(), "wrote deploy key");
    Ok(path)
}

/// Transport configuration for a single repository.
///
/// Built per call and handed to every clone/fetch/push so that two repositories
/// handled in the same process never see each other's key.
#[derive(Clone, Debug)]
pub struct GitTransport {
    key_path: PathBuf,
    ssh_command: String,
}

impl GitTransport {
    pub fn for_repo(repos_dir: &Path, repo_name: &str) -> Self {
        Self {
            key_path: key_path(repos_dir, repo_name),
            ssh_command: ssh_command(repos_dir, repo_name),
        }
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub fn ssh_command(&self) -> &str {
        &self.ssh_command
    }

    /// Environment for a `git` subprocess, to be set on that one `Command` only.
    pub fn env(&self) -> [(&'static str, &str); 1] {
        [("GIT_SSH_COMMAND", self.ssh_command.as_str())]
    }

    /// Remote callbacks that authenticate with this repository's key.
    ///
    /// SSH host keys are accepted unconditionally; TLS certificates still go
    /// through libgit2's normal validation. A rejected key is reported after the
    /// first attempt instead of letting libgit2 ask again forever.
    pub fn callbacks(&self) -> RemoteCallbacks<'_> {
        let mut attempts = 0u8;
        let mut cb = RemoteCallbacks::new();
        cb.credentials(move |_url, username_from_url, allowed| {
            let user = username_from_url.unwrap_or("git");
            if allowed.is_username() {
                return Cred::username(user);
            }
            attempts += 1;
            if attempts > 1 {
                return Err(git2::Error::from_str(&format!(
                    "deploy key {} was rejected",
                    self.key_path.display()
                )));
            }
            if allowed.is_ssh_key() {
                return Cred::ssh_key(user, None, &self.key_path, None);
            }
            Cred::default()
        });
        cb.certificate_check(|cert, _host| {
            if cert.as_hostkey().is_some() {
                Ok(CertificateCheckStatus::CertificateOk)
            } else {
                Ok(CertificateCheckStatus::CertificatePassthrough)
            }
        });
        cb
    }

    pub fn fetch_options(&self) -> FetchOptions<'_> {
        let mut fo = FetchOptions::new();
        fo.remote_callbacks(self.callbacks());
        fo
    }

    pub fn push_options<'a>(&'a self, callbacks: RemoteCallbacks<'a>) -> PushOptions<'a> {
        let mut po = PushOptions::new();
        po.remote_callbacks(callbacks);
        po
    }
}
