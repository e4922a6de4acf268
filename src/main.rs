//! # cfgrepo
//!
//! **cfgrepo** manages per-cluster configuration repositories.
//!
//! Features:
//! - `cfgrepo create` registers a repository for a cluster, stores its deploy key and clones it
//! - `cfgrepo init` writes overrides and templates, commits and pushes them
//! - `cfgrepo show` prints the registered repository and its working copy state
//! - `cfgrepo key-path` / `cfgrepo ssh-command` print credential locations for a repository
//! - `cfgrepo home` prints the cfgrepo home directory
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cfgrepo::{
    cfgrepo_home, cmd_create, cmd_init, cmd_key_path, cmd_show, cmd_ssh_command, init_logging,
};

/// Command-line interface definition.
#[derive(Parser, Debug)]
#[command(
    name = "cfgrepo",
    version,
    about = "cfgrepo - per-cluster configuration repository manager",
    arg_required_else_help = true
)]
struct Cli {
    /// Log workflow steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Cmd {
    /// Register and clone the configuration repository of a cluster
    Create {
        #[arg(long)]
        env_id: u64,
        /// Local directory and key file name
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long = "ref", default_value = "master")]
        git_ref: String,
        /// Private deploy key to install for this repository
        #[arg(long)]
        key_file: PathBuf,
    },
    /// Write overrides and templates, commit and push
    Init {
        #[arg(long)]
        env_id: u64,
    },
    /// Show the repository registered for a cluster
    Show {
        #[arg(long)]
        env_id: u64,
    },
    /// Print the deploy key path of a repository
    KeyPath { name: String },
    /// Print the SSH command used for a repository
    SshCommand { name: String },
    /// Print the cfgrepo home directory
    Home,
}

/// CLI entry point.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Cmd::Create {
            env_id,
            name,
            url,
            git_ref,
            key_file,
        } => cmd_create(env_id, &name, &url, &git_ref, &key_file),
        Cmd::Init { env_id } => cmd_init(env_id),
        Cmd::Show { env_id } => cmd_show(env_id),
        Cmd::KeyPath { name } => cmd_key_path(&name),
        Cmd::SshCommand { name } => cmd_ssh_command(&name),
        Cmd::Home => {
            println!("{}", cfgrepo_home()?.display());
            Ok(())
        }
    }
}
