use std::fmt;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Outcome of pushing `HEAD` to the target ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushFlag {
    /// The ref did not exist on the remote and was created.
    NewBranch,
    /// The remote ref was an ancestor of `HEAD` and advanced.
    FastForward,
    /// The remote ref already points at `HEAD`.
    UpToDate,
    /// Non-fast-forward: the remote has history `HEAD` does not contain.
    Rejected,
    /// The remote refused the ref update (hook, protected branch, ...).
    RemoteRejected,
    /// The push call itself failed.
    Error,
}

impl PushFlag {
    pub fn is_success(self) -> bool {
        matches!(self, PushFlag::NewBranch | PushFlag::FastForward)
    }
}

impl fmt::Display for PushFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PushFlag::NewBranch => "new-branch",
            PushFlag::FastForward => "fast-forward",
            PushFlag::UpToDate => "up-to-date",
            PushFlag::Rejected => "rejected",
            PushFlag::RemoteRejected => "remote-rejected",
            PushFlag::Error => "error",
        };
        f.write_str(s)
    }
}

/// Raw push result, before it is collapsed into the public error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    /// Fully qualified remote ref, e.g. `refs/heads/master`.
    pub target: String,
    pub flag: PushFlag,
    /// Remote status message or push error text, when there was one.
    pub message: Option<String>,
}

impl PushReport {
    pub fn new(target: impl Into<String>, flag: PushFlag) -> Self {
        Self {
            target: target.into(),
            flag,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Map a push report onto the workflow result.
///
/// `NewBranch` and `FastForward` succeed. `UpToDate` becomes [`Error::NoChanges`];
/// every other flag becomes [`Error::UnresolvableConflict`]. The raw flag is logged
/// before it is collapsed.
pub fn interpret_push(report: PushReport) -> Result<()> {
    debug!(remote_ref = %report.target, flag = %report.flag, "push result");
    if report.flag.is_success() {
        return Ok(());
    }
    match report.flag {
        PushFlag::UpToDate => Err(Error::NoChanges),
        flag => {
            warn!(
                remote_ref = %report.target,
                %flag,
                message = report.message.as_deref().unwrap_or(""),
                "push was not accepted"
            );
            Err(Error::UnresolvableConflict {
                target: report.target,
                flag,
            })
        }
    }
}

/// Whether a push error message describes a non-fast-forward rejection.
pub(crate) fn is_non_fast_forward(message: &str) -> bool {
    let msg = message.to_lowercase();
    msg.contains("non-fast-forward")
        || msg.contains("non-fastforward")
        || msg.contains("fetch first")
        || msg.contains("not present locally")
}
