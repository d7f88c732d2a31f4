// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! `param-sync` CLI: review and apply differences between a local YAML
//! snapshot and a remote parameter store.
//!
//! Validation failures (scope, coercion) exit non-zero before any remote
//! mutation. Apply failures are reported per path and also exit non-zero,
//! but already-applied mutations are not rolled back.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use eyre::WrapErr;
use tracing_subscriber::EnvFilter;

use param_sync::diff::MergePolicy;
use param_sync::store::{connect, StoreConfig};
use param_sync::{Reconciler, SyncConfig};

#[derive(Parser)]
#[command(name = "param-sync", version, about = "Sync a local YAML snapshot with a remote parameter store")]
struct Cli {
    /// Local snapshot file
    #[arg(short = 'f', long, default_value = "parameters.yml")]
    filename: String,

    /// Root path the snapshot is authoritative for
    #[arg(long, default_value = "/")]
    root_path: String,

    /// Restrict to a path (repeatable); defaults to the root path
    #[arg(long = "path")]
    paths: Vec<String>,

    /// Named credential profile for the remote transport
    #[arg(long)]
    profile: Option<String>,

    /// Exclude secure values entirely
    #[arg(long)]
    no_secure: bool,

    /// Fetch secure values without decrypting them
    #[arg(long)]
    no_decrypt: bool,

    /// Backing document of the file-based store
    #[arg(long, default_value = "remote-store.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show differences between the local snapshot and the remote store
    Plan,
    /// Create or overwrite the local snapshot from the remote store
    Init,
    /// Merge remote changes into the local snapshot
    Pull {
        /// Let remote values win over local edits
        #[arg(long)]
        force: bool,
    },
    /// Apply local changes to the remote store
    Apply,
}

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = SyncConfig {
        filename: cli.filename,
        root_path: cli.root_path.clone(),
        paths: if cli.paths.is_empty() {
            vec![cli.root_path]
        } else {
            cli.paths
        },
        no_secure: cli.no_secure,
        no_decrypt: cli.no_decrypt,
        profile: cli.profile.clone(),
    };

    let store = connect(&StoreConfig {
        file: cli.store,
        profile: cli.profile,
    });
    let reconciler = Reconciler::new(store, config).wrap_err("invalid invocation scope")?;

    match cli.command {
        Command::Plan => {
            let plan = reconciler.plan().await.wrap_err("plan failed")?;
            println!("{plan}");
        }
        Command::Init => {
            reconciler.init().await.wrap_err("init failed")?;
            println!("Local snapshot initialized from remote.");
        }
        Command::Pull { force } => {
            reconciler
                .pull(MergePolicy::from_force(force))
                .await
                .wrap_err("pull failed")?;
            println!("Local snapshot merged from remote.");
        }
        Command::Apply => {
            let outcome = reconciler.apply().await.wrap_err("apply failed")?;
            println!(
                "Applied {} change(s): {} added, {} changed, {} deleted.",
                outcome.applied(),
                outcome.added,
                outcome.changed,
                outcome.deleted
            );
            if !outcome.is_success() {
                for (path, err) in &outcome.failed {
                    eprintln!("failed: {path}: {err}");
                }
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
