// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dot::{
    path::{absolute_from, home_dir, Layout},
    GitPublisher, InquireConfirm, TrackError, Tracker, UpOutcome,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{
    env::current_dir,
    path::PathBuf,
    process::exit,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "dot [options] <command> [arguments]",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Use manifest at path instead of ~/.dotconfig.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let layout = match self.config {
            Some(manifest) => Layout::new(home_dir()?, manifest),
            None => Layout::try_default()?,
        };
        let mut tracker = Tracker::new(layout, InquireConfirm::new(), GitPublisher::new());

        match self.command {
            Command::Up => run_up(&mut tracker),
            Command::Sync => run_sync(&mut tracker),
            Command::Add(opts) => run_add(&mut tracker, opts),
            Command::Rm(opts) => run_rm(&mut tracker, opts),
            Command::List => run_list(&tracker),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Set up folder for dot to manage, or sync an existing setup.
    #[command(override_usage = "dot up")]
    Up,

    /// Sync all files that are being tracked.
    #[command(override_usage = "dot sync")]
    Sync,

    /// Add a file or folder for tracking.
    #[command(override_usage = "dot add [options] <name> <path>")]
    Add(AddOptions),

    /// Remove a file or folder from tracking.
    #[command(override_usage = "dot rm [options] <name>")]
    Rm(RmOptions),

    /// List all entries that are being tracked.
    #[command(override_usage = "dot list")]
    List,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct AddOptions {
    /// Name to track entry under.
    #[arg(value_name = "name")]
    pub name: String,

    /// Path to file or folder to track.
    #[arg(value_name = "path")]
    pub path: String,

    /// Commit and push the repository afterwards.
    #[arg(short, long)]
    pub push: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RmOptions {
    /// Name of entry to stop tracking.
    #[arg(value_name = "name")]
    pub name: String,

    /// Commit and push the repository afterwards.
    #[arg(short, long)]
    pub push: bool,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        // INVARIANT: Problems with the request itself are not crashes.
        match error.downcast_ref::<TrackError>() {
            Some(track_error) if track_error.is_validation() => {
                error!("{track_error}");
                exit(2);
            }
            _ => {
                error!("{error:?}");
                exit(1);
            }
        }
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_up(tracker: &mut Tracker) -> Result<()> {
    let repo_dir = current_dir().context("cannot determine current directory")?;
    match tracker.up(&repo_dir)? {
        UpOutcome::Synced(report) => info!(
            "{} linked, {} already linked, {} skipped",
            report.changed.len(),
            report.unchanged.len(),
            report.skipped.len()
        ),
        UpOutcome::Initialized(_) => {}
        UpOutcome::Declined => info!("nothing was set up"),
    }

    Ok(())
}

fn run_sync(tracker: &mut Tracker) -> Result<()> {
    let report = tracker.sync_all()?;
    info!(
        "{} linked, {} already linked, {} skipped",
        report.changed.len(),
        report.unchanged.len(),
        report.skipped.len()
    );

    Ok(())
}

fn run_add(tracker: &mut Tracker, opts: AddOptions) -> Result<()> {
    info!("Adding new entry for tracking ...");
    let path = absolute_path(&opts.path)?;
    tracker.track(&opts.name, path, opts.push)?;

    Ok(())
}

fn run_rm(tracker: &mut Tracker, opts: RmOptions) -> Result<()> {
    info!("Removing entry from tracking ...");
    tracker.untrack(&opts.name, opts.push)?;

    Ok(())
}

fn run_list(tracker: &Tracker) -> Result<()> {
    let entries = tracker.list()?;
    if entries.is_empty() {
        info!("there are no files being tracked, begin doing so with `dot add <name> <path>`");
        return Ok(());
    }

    let width = entries
        .iter()
        .map(|entry| entry.name.len())
        .max()
        .unwrap_or_default()
        .max("name".len());
    println!("{:<width$}  path", "name");
    for entry in entries {
        println!("{:<width$}  {}", entry.name, entry.path.display());
    }

    Ok(())
}

fn absolute_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::tilde(path);
    let cwd = current_dir().context("cannot determine current directory")?;
    Ok(absolute_from(cwd, expanded.as_ref()))
}
