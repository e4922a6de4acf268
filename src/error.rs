use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::git::PushFlag;

/// Errors surfaced by the repository lifecycle.
#[derive(Debug, Error)]
pub enum Error {
    /// Clone, connect, fetch or push failed on the wire (network, auth, protocol).
    #[error("git {op} failed: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: git2::Error,
    },

    /// A local repository operation failed.
    #[error(transparent)]
    Git(#[from] git2::Error),

    /// The remote does not advertise the target ref yet.
    #[error("ref `{git_ref}` does not exist on the remote")]
    RemoteRefMissing { git_ref: String },

    #[error("failed to {action} {}: {source}", .path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The push had nothing to send.
    #[error("nothing to push: remote is already up to date")]
    NoChanges,

    /// Any push outcome that is neither a success nor a no-op.
    #[error("push to {target} could not be resolved (flag: {flag})")]
    UnresolvableConflict { target: String, flag: PushFlag },

    #[error("cluster {0} not found in inventory")]
    ClusterNotFound(u64),

    #[error("failed to serialize overrides: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to walk template directory: {0}")]
    Template(#[from] walkdir::Error),

    #[error("repository store: {0}")]
    Store(String),

    #[error("configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn fs(
        action: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Error::Filesystem {
            action,
            path,
            source,
        }
    }

    pub(crate) fn transport(op: &'static str) -> impl FnOnce(git2::Error) -> Self {
        move |source| Error::Transport { op, source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
