//! Crate entry point for **cfgrepo**.
//!
//! cfgrepo manages one external configuration repository per cluster: it clones
//! the repository with a deploy key dedicated to it, generates node and role
//! overrides from the cluster inventory, commits them together with a template
//! tree, and pushes the result back.
//!
//! The library is driven through [`RepoController`]; record persistence and the
//! cluster inventory are supplied by the host through the [`RepoStore`] and
//! [`Inventory`] traits. The `cfgrepo` binary uses the TOML-backed [`FileStore`]
//! and [`StaticInventory`].

mod commands;
mod controller;
pub mod credentials;
mod error;
pub mod git;
mod inventory;
mod logging;
mod overrides;
mod paths;
mod progress;
mod settings;
mod store;
mod templates;

/// Re-export commonly used types and commands so they can be accessed from `cfgrepo::*`.
pub use commands::{cmd_create, cmd_init, cmd_key_path, cmd_show, cmd_ssh_command};
pub use controller::{LocalClone, ManagedRepo, RepoController};
pub use error::{Error, Result};
pub use inventory::{Cluster, Inventory, Node, StaticInventory};
pub use logging::init_logging;
pub use overrides::{OVERRIDES_FILE, OverridesDocument, OverridesPolicy};
pub use paths::{Paths, cfgrepo_home, paths};
pub use settings::{DEFAULT_COMMIT_MESSAGE, Settings, load_settings};
pub use store::{FileStore, MemoryStore, NewRepository, RepoStore, RepositoryRecord};
pub use templates::{copy_tree, install_templates, write_builtin};
