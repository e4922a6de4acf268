use git2::{
    AutotagOption, Commit, ErrorClass, ErrorCode, IndexAddOption, Oid, Repository, ResetType,
    Signature, StatusOptions, build::CheckoutBuilder, build::RepoBuilder,
};
use std::cell::RefCell;
use std::path::Path;
use tracing::{debug, info};

use super::push::{PushFlag, PushReport, is_non_fast_forward};
use crate::credentials::GitTransport;
use crate::error::{Error, Result};

const ORIGIN: &str = "origin";

/// Clone `url` into `dest`, authenticating with the repository's deploy key.
///
/// `dest` must not exist or be an empty directory. An empty remote clones into a
/// repository with an unborn HEAD.
///
/// # Errors
/// Returns [`Error::Transport`] if the remote is unreachable or rejects the key.
pub fn clone_repo(url: &str, dest: &Path, transport: &GitTransport) -> Result<Repository> {
    let mut builder = RepoBuilder::new();
    builder.fetch_options(transport.fetch_options());
    let repo = builder
        .clone(url, dest)
        .map_err(Error::transport("clone"))?;
    info!(%url, dest = %dest.display(), "cloned repository");
    Ok(repo)
}

/// Remote refs `git_ref` may name, in the order they are tried.
///
/// 1. A fully qualified name (`refs/...`) as is
/// 2. Branch `refs/heads/<git_ref>`
/// 3. Tag `refs/tags/<git_ref>`
pub fn ref_candidates(git_ref: &str) -> Vec<String> {
    if git_ref.starts_with("refs/") {
        vec![git_ref.to_string()]
    } else {
        vec![format!("refs/heads/{git_ref}"), format!("refs/tags/{git_ref}")]
    }
}

/// Remote ref a push of `git_ref` should update.
///
/// A short name that was last fetched as a tag stays a tag; anything else is a
/// branch, created on the remote if it does not exist yet.
pub fn push_target(repo: &Repository, git_ref: &str) -> String {
    if git_ref.starts_with("refs/") {
        return git_ref.to_string();
    }
    let branch = format!("refs/heads/{git_ref}");
    let tag = format!("refs/tags/{git_ref}");
    let fetched_branch = repo.find_reference(&tracking_ref_for(&branch)).is_ok();
    if !fetched_branch && repo.find_reference(&tag).is_ok() {
        tag
    } else {
        branch
    }
}

/// Local ref a fetched remote ref is stored under.
fn tracking_ref_for(remote_ref: &str) -> String {
    if let Some(branch) = remote_ref.strip_prefix("refs/heads/") {
        format!("refs/remotes/{ORIGIN}/{branch}")
    } else if remote_ref.starts_with("refs/tags/") {
        remote_ref.to_string()
    } else {
        let rest = remote_ref.strip_prefix("refs/").unwrap_or(remote_ref);
        format!("refs/remotes/{ORIGIN}/{rest}")
    }
}

fn is_missing_remote_ref(e: &git2::Error) -> bool {
    (e.code() == ErrorCode::NotFound && e.class() == ErrorClass::Reference)
        || e.message().contains("couldn't find remote ref")
}

/// Fetch one remote ref into its tracking ref.
///
/// Returns `Ok(None)` when the remote does not have `remote_ref`, including when the
/// remote has no refs at all. The tracking ref is dropped before fetching so a stale
/// value cannot pass for a ref the remote no longer has.
fn fetch_ref(repo: &Repository, remote_ref: &str, transport: &GitTransport) -> Result<Option<Oid>> {
    let tracking = tracking_ref_for(remote_ref);
    if let Ok(mut stale) = repo.find_reference(&tracking) {
        stale.delete()?;
    }

    let refspec = format!("+{remote_ref}:{tracking}");
    let mut options = transport.fetch_options();
    options.download_tags(AutotagOption::None);
    let mut remote = repo.find_remote(ORIGIN)?;
    match remote.fetch(&[refspec.as_str()], Some(&mut options), None) {
        Ok(()) => {}
        Err(e) if is_missing_remote_ref(&e) => {
            debug!(%refspec, error = %e, "remote ref not found");
            return Ok(None);
        }
        Err(e) => return Err(Error::transport("fetch")(e)),
    }

    match repo.find_reference(&tracking) {
        Ok(r) => Ok(Some(r.peel_to_commit()?.id())),
        Err(e) if e.code() == ErrorCode::NotFound => {
            debug!(%refspec, "remote did not send the ref");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Fetch `git_ref` from `origin` and hard-reset the working copy onto it.
///
/// HEAD is detached at the fetched commit; index and working tree are forced to
/// match it. Untracked files are left alone.
///
/// # Errors
/// - [`Error::RemoteRefMissing`] if the remote has no ref `git_ref` resolves to.
/// - [`Error::Transport`] if connecting or fetching fails.
/// - [`Error::Git`] if the fetched ref cannot be peeled or the reset fails.
pub fn checkout_ref(repo: &Repository, git_ref: &str, transport: &GitTransport) -> Result<Oid> {
    for candidate in ref_candidates(git_ref) {
        let Some(oid) = fetch_ref(repo, &candidate, transport)? else {
            continue;
        };
        let commit = repo.find_commit(oid)?;
        repo.set_head_detached(oid)?;
        repo.reset(
            commit.as_object(),
            ResetType::Hard,
            Some(CheckoutBuilder::new().force()),
        )?;
        debug!(remote_ref = %candidate, commit = %oid, "checked out remote ref");
        return Ok(oid);
    }
    Err(Error::RemoteRefMissing {
        git_ref: git_ref.to_string(),
    })
}

/// Whether the working tree differs from HEAD, untracked files included.
pub fn is_dirty(repo: &Repository) -> Result<bool> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);
    Ok(!repo.statuses(Some(&mut opts))?.is_empty())
}

/// Commit HEAD points at, or `None` while HEAD is unborn.
pub fn head_commit(repo: &Repository) -> Result<Option<Commit<'_>>> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Stage every change (`git add -A`) and commit it on top of HEAD.
///
/// On an unborn HEAD the result is a root commit.
pub fn commit_all(repo: &Repository, message: &str, signature: &Signature<'_>) -> Result<Oid> {
    let mut index = repo.index()?;
    index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"], None)?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;

    let parent = head_commit(repo)?;
    let parents: Vec<&Commit<'_>> = parent.iter().collect();
    let oid = repo.commit(Some("HEAD"), signature, signature, message, &tree, &parents)?;
    info!(commit = %oid, "committed working tree");
    Ok(oid)
}

/// Flag for a ref update negotiated with the remote, from the remote's current
/// value (`old`, zero when the ref is absent) and the value being pushed.
///
/// Non-fast-forward updates are refused by libgit2 before anything is sent and
/// surface as a push error instead.
fn classify_update(old: Oid, new: Oid) -> PushFlag {
    if old.is_zero() {
        PushFlag::NewBranch
    } else if old == new {
        PushFlag::UpToDate
    } else {
        PushFlag::FastForward
    }
}

/// Push `HEAD` to `git_ref` on `origin`.
///
/// The flag is taken from the ref update negotiated with the remote, then
/// refined by the remote's status for the ref or by the push error.
///
/// # Errors
/// Returns [`Error::Transport`] only when the push fails before a ref update could
/// be negotiated (remote unreachable, key rejected). Failures of the push itself
/// are reported through [`PushReport::flag`].
pub fn push_head(repo: &Repository, git_ref: &str, transport: &GitTransport) -> Result<PushReport> {
    let target = push_target(repo, git_ref);
    if head_commit(repo)?.is_none() {
        return Ok(PushReport::new(target, PushFlag::UpToDate));
    }

    let refspec = format!("HEAD:{target}");
    let negotiated: RefCell<Option<PushFlag>> = RefCell::new(None);
    let rejection: RefCell<Option<String>> = RefCell::new(None);
    let result = {
        let mut callbacks = transport.callbacks();
        callbacks.push_negotiation(|updates| {
            if let Some(update) = updates.first() {
                *negotiated.borrow_mut() = Some(classify_update(update.src(), update.dst()));
            }
            Ok(())
        });
        callbacks.push_update_reference(|_ref_name, status| {
            if let Some(msg) = status {
                *rejection.borrow_mut() = Some(msg.to_string());
            }
            Ok(())
        });
        let mut options = transport.push_options(callbacks);
        let mut remote = repo.find_remote(ORIGIN)?;
        remote.push(&[refspec.as_str()], Some(&mut options))
    };

    let report = match (result, negotiated.into_inner(), rejection.into_inner()) {
        (Err(e), None, _) => return Err(Error::transport("push")(e)),
        (Err(e), Some(_), _) => {
            let non_ff =
                e.code() == ErrorCode::NotFastForward || is_non_fast_forward(e.message());
            let flag = if non_ff {
                PushFlag::Rejected
            } else {
                PushFlag::Error
            };
            PushReport::new(target, flag).with_message(e.message())
        }
        (Ok(()), _, Some(msg)) => PushReport::new(target, PushFlag::RemoteRejected).with_message(msg),
        (Ok(()), Some(flag), None) => PushReport::new(target, flag),
        (Ok(()), None, None) => {
            PushReport::new(target, PushFlag::Error).with_message("no ref update was negotiated")
        }
    };
    info!(%refspec, flag = %report.flag, "pushed");
    Ok(report)
}
