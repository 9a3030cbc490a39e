// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Simple dotfile manager.
//!
//! Dot moves selected configuration files and folders out of the home
//! directory into a version-controlled repository, and leaves symlinks at
//! their original locations. A small manifest remembers what is tracked, so
//! the same arrangement can be reproduced on any additional machine by
//! cloning the repository and running a sync.

pub mod config;
pub mod path;
pub mod prompt;
pub mod store;
pub mod tracker;

pub use config::Manifest;
pub use path::Layout;
pub use prompt::{Answer, Confirm, InquireConfirm};
pub use store::ManifestStore;
pub use tracker::{
    publish::{Action, GitPublisher, Publish},
    setup::UpOutcome,
    SyncReport, SyncSession, TrackError, TrackOutcome, TrackedEntry, Tracker,
};
