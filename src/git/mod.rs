//! Git integration layer.
//!
//! This module wraps the `git2` backend and re-exports the operations the
//! repository lifecycle needs: clone, checkout of the target ref, dirty-tree
//! detection, commit, and push with result classification.
//!
//! Every network operation takes a [`GitTransport`](crate::credentials::GitTransport)
//! so the credentials used are always those of the repository being worked on.

mod git2_backend;
mod push;

pub use git2_backend::{
    checkout_ref, clone_repo, commit_all, head_commit, is_dirty, push_head, push_target,
    ref_candidates,
};
pub use push::{PushFlag, PushReport, interpret_push};
