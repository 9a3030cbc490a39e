// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::HomeFixture;

use anyhow::Result;
use dot::{
    path::PathError, tracker::setup::MANIFEST_ENTRY, Action, Answer, Manifest, TrackError,
    TrackOutcome, TrackedEntry, UpOutcome,
};
use pretty_assertions::assert_eq;
use std::{
    fs::{create_dir_all, read_link, read_to_string, remove_file, write},
    path::{Path, PathBuf},
};

fn is_symlink(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .symlink_metadata()
        .map(|metadata| metadata.file_type().is_symlink())
        .unwrap_or(false)
}

#[test]
fn track_new_entry_links_and_records() -> Result<()> {
    let fixture = HomeFixture::new()?;
    fixture
        .store()
        .save(&Manifest::new(fixture.repo().to_path_buf()))?;
    let nvimrc = fixture.write(".nvimrc", "set number\n")?;
    let (mut tracker, probe) = fixture.tracker(&[]);

    let outcome = tracker.track("nvimrc", &nvimrc, false)?;

    let canonical = fixture.repo().join("files/nvimrc/.nvimrc");
    assert_eq!(outcome, TrackOutcome::Added);
    assert!(is_symlink(&nvimrc));
    assert_eq!(read_link(&nvimrc)?, canonical);
    assert_eq!(read_to_string(&canonical)?, "set number\n");

    let mut expect = Manifest::new(fixture.repo().to_path_buf());
    expect.insert("nvimrc", "/.nvimrc");
    assert_eq!(fixture.manifest()?, expect);
    assert!(probe.published().is_empty());

    Ok(())
}

#[test]
fn track_twice_is_a_no_op() -> Result<()> {
    let fixture = HomeFixture::new()?;
    let nvimrc = fixture.write(".nvimrc", "set number\n")?;
    let (mut tracker, probe) = fixture.tracker(&[]);

    tracker.track("nvimrc", &nvimrc, false)?;
    let manifest = fixture.manifest()?;
    let outcome = tracker.track("nvimrc", &nvimrc, false)?;

    assert_eq!(outcome, TrackOutcome::AlreadyLinked);
    assert_eq!(fixture.manifest()?, manifest);
    assert!(probe.questions().is_empty());

    Ok(())
}

#[test]
fn track_directory_with_trailing_separator() -> Result<()> {
    let fixture = HomeFixture::new()?;
    fixture.write(".config/nvim/init.lua", "vim.o.number = true\n")?;
    fixture.write(".config/nvim/lua/plugins.lua", "return {}\n")?;
    let (mut tracker, _) = fixture.tracker(&[]);

    let nvim = fixture.home().join(".config/nvim/");
    tracker.track("nvim", &nvim, false)?;

    let canonical = fixture.repo().join("files/nvim/nvim");
    assert!(is_symlink(fixture.home().join(".config/nvim")));
    assert_eq!(read_to_string(canonical.join("lua/plugins.lua"))?, "return {}\n");
    assert_eq!(
        read_to_string(fixture.home().join(".config/nvim/init.lua"))?,
        "vim.o.number = true\n"
    );
    assert_eq!(fixture.manifest()?.get("nvim"), Some("/.config/nvim"));

    Ok(())
}

#[test]
fn track_with_push_publishes_addition() -> Result<()> {
    let fixture = HomeFixture::new()?;
    let zshrc = fixture.write(".zshrc", "export EDITOR=nvim\n")?;
    let (mut tracker, probe) = fixture.tracker(&[]);

    tracker.track("zshrc", &zshrc, true)?;

    assert_eq!(
        probe.published(),
        vec![(fixture.repo().to_path_buf(), "zshrc".to_string(), Action::Add)]
    );

    Ok(())
}

#[test]
fn track_rejects_name_recorded_for_other_path() -> Result<()> {
    let fixture = HomeFixture::new()?;
    fixture.record("vimrc", "/.vimrc")?;
    let nvimrc = fixture.write(".nvimrc", "set number\n")?;
    let (mut tracker, _) = fixture.tracker(&[]);

    let result = tracker.track("vimrc", &nvimrc, false);

    assert!(matches!(result, Err(TrackError::AlreadyTracked { .. })));
    assert!(!is_symlink(&nvimrc));

    Ok(())
}

#[test]
fn track_rejects_path_outside_home() -> Result<()> {
    let fixture = HomeFixture::new()?;
    let (mut tracker, _) = fixture.tracker(&[]);

    let result = tracker.track("hosts", "/etc/hosts", false);

    assert!(matches!(
        result,
        Err(TrackError::Path(PathError::NotUnderHome { .. }))
    ));

    Ok(())
}

#[test]
fn track_relinks_on_additional_machine() -> Result<()> {
    let fixture = HomeFixture::new()?;
    fixture.record("nvimrc", "/.nvimrc")?;
    let canonical = fixture.write_canonical("nvimrc", ".nvimrc", "set number\n")?;
    let nvimrc = fixture.write(".nvimrc", "set nonumber\n")?;
    let (mut tracker, _) = fixture.tracker(&[]);

    let outcome = tracker.track("nvimrc", &nvimrc, false)?;

    let backup = fixture.repo().join("backup/nvimrc/.nvimrc");
    assert_eq!(outcome, TrackOutcome::Relinked { backup: backup.clone() });
    assert_eq!(read_link(&nvimrc)?, canonical);
    assert_eq!(read_to_string(&nvimrc)?, "set number\n");
    assert_eq!(read_to_string(&backup)?, "set nonumber\n");

    Ok(())
}

#[test]
fn relink_keeps_local_file_when_backup_removal_declined() -> Result<()> {
    let fixture = HomeFixture::new()?;
    fixture.record("nvimrc", "/.nvimrc")?;
    fixture.write_canonical("nvimrc", ".nvimrc", "set number\n")?;
    let backup = fixture.repo().join("backup/nvimrc/.nvimrc");
    create_dir_all(backup.parent().unwrap())?;
    write(&backup, "old backup\n")?;
    let nvimrc = fixture.write(".nvimrc", "set nonumber\n")?;
    let (mut tracker, probe) = fixture.tracker(&[Answer::No]);

    let outcome = tracker.track("nvimrc", &nvimrc, false)?;

    assert_eq!(outcome, TrackOutcome::Skipped);
    assert_eq!(probe.questions().len(), 1);
    assert!(!is_symlink(&nvimrc));
    assert_eq!(read_to_string(&nvimrc)?, "set nonumber\n");
    assert_eq!(read_to_string(&backup)?, "old backup\n");

    Ok(())
}

#[test]
fn relink_replaces_backup_when_confirmed() -> Result<()> {
    let fixture = HomeFixture::new()?;
    fixture.record("nvimrc", "/.nvimrc")?;
    fixture.write_canonical("nvimrc", ".nvimrc", "set number\n")?;
    let backup = fixture.repo().join("backup/nvimrc/.nvimrc");
    create_dir_all(backup.parent().unwrap())?;
    write(&backup, "old backup\n")?;
    let nvimrc = fixture.write(".nvimrc", "set nonumber\n")?;
    let (mut tracker, _) = fixture.tracker(&[Answer::Yes]);

    tracker.track("nvimrc", &nvimrc, false)?;

    assert!(is_symlink(&nvimrc));
    assert_eq!(read_to_string(&backup)?, "set nonumber\n");

    Ok(())
}

#[test]
fn untrack_restores_entry() -> Result<()> {
    let fixture = HomeFixture::new()?;
    let nvimrc = fixture.write(".nvimrc", "set number\n")?;
    let (mut tracker, probe) = fixture.tracker(&[]);
    tracker.track("nvimrc", &nvimrc, false)?;

    tracker.untrack("nvimrc", true)?;

    assert!(!is_symlink(&nvimrc));
    assert_eq!(read_to_string(&nvimrc)?, "set number\n");
    assert!(!fixture.repo().join("files/nvimrc").exists());
    assert_eq!(fixture.manifest()?.get("nvimrc"), None);
    assert_eq!(
        probe.published(),
        vec![(fixture.repo().to_path_buf(), "nvimrc".to_string(), Action::Remove)]
    );

    let result = tracker.untrack("nvimrc", false);
    assert!(matches!(result, Err(TrackError::NotTracked { .. })));

    Ok(())
}

#[test]
fn untrack_restores_directory_entry() -> Result<()> {
    let fixture = HomeFixture::new()?;
    fixture.write(".config/nvim/init.lua", "vim.o.number = true\n")?;
    let (mut tracker, _) = fixture.tracker(&[]);
    tracker.track("nvim", fixture.home().join(".config/nvim"), false)?;

    tracker.untrack("nvim", false)?;

    let nvim = fixture.home().join(".config/nvim");
    assert!(!is_symlink(&nvim));
    assert_eq!(read_to_string(nvim.join("init.lua"))?, "vim.o.number = true\n");
    assert!(!fixture.repo().join("files/nvim").exists());

    Ok(())
}

#[test]
fn untrack_refuses_plain_file() -> Result<()> {
    let fixture = HomeFixture::new()?;
    fixture.record("nvimrc", "/.nvimrc")?;
    fixture.write_canonical("nvimrc", ".nvimrc", "set number\n")?;
    let nvimrc = fixture.write(".nvimrc", "set nonumber\n")?;
    let (mut tracker, _) = fixture.tracker(&[]);

    let result = tracker.untrack("nvimrc", false);

    assert!(matches!(result, Err(TrackError::NotASymlink { .. })));
    assert_eq!(read_to_string(&nvimrc)?, "set nonumber\n");
    assert_eq!(fixture.manifest()?.get("nvimrc"), Some("/.nvimrc"));

    Ok(())
}

#[test]
fn untrack_refuses_missing_repo_copy() -> Result<()> {
    let fixture = HomeFixture::new()?;
    let nvimrc = fixture.write(".nvimrc", "set number\n")?;
    let (mut tracker, _) = fixture.tracker(&[]);
    tracker.track("nvimrc", &nvimrc, false)?;
    remove_file(fixture.repo().join("files/nvimrc/.nvimrc"))?;

    let result = tracker.untrack("nvimrc", false);

    assert!(matches!(result, Err(TrackError::RepoCopyMissing { .. })));
    assert!(is_symlink(&nvimrc));

    Ok(())
}

#[test]
fn sync_copy_all_asks_only_once() -> Result<()> {
    let fixture = HomeFixture::new()?;
    for name in ["bashrc", "nvimrc", "zshrc"] {
        let base = format!(".{name}");
        fixture.record(name, &format!("/{base}"))?;
        fixture.write_canonical(name, &base, name)?;
    }
    let (mut tracker, probe) = fixture.tracker(&[Answer::All]);

    let report = tracker.sync_all()?;

    assert_eq!(probe.questions().len(), 1);
    assert_eq!(report.changed, vec!["bashrc", "nvimrc", "zshrc"]);
    for name in ["bashrc", "nvimrc", "zshrc"] {
        let path = fixture.home().join(format!(".{name}"));
        assert!(is_symlink(&path));
        assert_eq!(read_to_string(&path)?, name);
    }

    Ok(())
}

#[test]
fn sync_asks_per_entry_without_copy_all() -> Result<()> {
    let fixture = HomeFixture::new()?;
    for name in ["bashrc", "nvimrc"] {
        let base = format!(".{name}");
        fixture.record(name, &format!("/{base}"))?;
        fixture.write_canonical(name, &base, name)?;
    }
    let (mut tracker, probe) = fixture.tracker(&[Answer::Yes, Answer::No]);

    let report = tracker.sync_all()?;

    assert_eq!(probe.questions().len(), 2);
    assert_eq!(report.changed, vec!["bashrc"]);
    assert_eq!(report.skipped, vec!["nvimrc"]);
    assert!(is_symlink(fixture.home().join(".bashrc")));
    assert!(!fixture.home().join(".nvimrc").exists());

    Ok(())
}

#[test]
fn sync_skips_entries_without_repo_copy() -> Result<()> {
    let fixture = HomeFixture::new()?;
    fixture.record("bashrc", "/.bashrc")?;
    fixture.record("nvimrc", "/.nvimrc")?;
    let nvimrc = fixture.write(".nvimrc", "set number\n")?;
    let (mut tracker, probe) = fixture.tracker(&[]);

    let report = tracker.sync_all()?;

    assert!(probe.questions().is_empty());
    assert_eq!(report.skipped, vec!["bashrc"]);
    assert_eq!(report.changed, vec!["nvimrc"]);
    assert!(is_symlink(&nvimrc));

    Ok(())
}

#[test]
fn sync_leaves_linked_entries_alone() -> Result<()> {
    let fixture = HomeFixture::new()?;
    let nvimrc = fixture.write(".nvimrc", "set number\n")?;
    let (mut tracker, _) = fixture.tracker(&[]);
    tracker.track("nvimrc", &nvimrc, false)?;

    let report = tracker.sync_all()?;

    assert_eq!(report.unchanged, vec!["nvimrc"]);
    assert!(report.changed.is_empty());

    Ok(())
}

#[test]
fn setup_new_machine_tracks_manifest() -> Result<()> {
    let fixture = HomeFixture::bare()?;
    let (mut tracker, _) = fixture.tracker(&[]);

    let outcome = tracker.setup_new_machine(fixture.repo())?;

    let manifest_path = fixture.layout().manifest_path().to_path_buf();
    assert_eq!(outcome, TrackOutcome::Added);
    assert!(fixture.repo().join("backup").is_dir());
    assert!(is_symlink(&manifest_path));
    assert_eq!(
        read_link(&manifest_path)?,
        fixture.repo().join("files/dotconfig/.dotconfig")
    );

    let mut expect = Manifest::new("/dotfiles");
    expect.insert(MANIFEST_ENTRY, "/.dotconfig");
    assert_eq!(fixture.manifest()?, expect);

    Ok(())
}

#[test]
fn up_initializes_when_confirmed() -> Result<()> {
    let fixture = HomeFixture::bare()?;
    let (mut tracker, probe) = fixture.tracker(&[Answer::Yes]);

    let outcome = tracker.up(fixture.repo())?;

    assert_eq!(outcome, UpOutcome::Initialized(TrackOutcome::Added));
    assert_eq!(probe.questions().len(), 1);
    assert!(is_symlink(fixture.layout().manifest_path()));

    Ok(())
}

#[test]
fn up_does_nothing_when_declined() -> Result<()> {
    let fixture = HomeFixture::bare()?;
    let (mut tracker, _) = fixture.tracker(&[Answer::No]);

    let outcome = tracker.up(fixture.repo())?;

    assert_eq!(outcome, UpOutcome::Declined);
    assert!(!fixture.layout().manifest_path().exists());

    Ok(())
}

#[test]
fn up_links_repository_manifest_on_additional_machine() -> Result<()> {
    let fixture = HomeFixture::bare()?;
    let mut manifest = Manifest::new("/dotfiles");
    manifest.insert(MANIFEST_ENTRY, "/.dotconfig");
    manifest.insert("nvimrc", "/.nvimrc");
    fixture.write_canonical(MANIFEST_ENTRY, ".dotconfig", &manifest.to_string())?;
    let canonical = fixture.write_canonical("nvimrc", ".nvimrc", "set number\n")?;
    let nvimrc = fixture.write(".nvimrc", "set nonumber\n")?;
    let (mut tracker, probe) = fixture.tracker(&[]);

    let outcome = tracker.up(fixture.repo())?;

    let UpOutcome::Synced(report) = outcome else {
        panic!("expected sync, got {outcome:?}");
    };
    assert!(probe.questions().is_empty());
    assert_eq!(report.unchanged, vec![MANIFEST_ENTRY]);
    assert_eq!(report.changed, vec!["nvimrc"]);
    assert!(is_symlink(fixture.layout().manifest_path()));
    assert_eq!(read_link(&nvimrc)?, canonical);
    assert_eq!(
        read_to_string(fixture.repo().join("backup/nvimrc/.nvimrc"))?,
        "set nonumber\n"
    );

    Ok(())
}

#[test]
fn up_replaces_local_manifest_with_repository_manifest() -> Result<()> {
    let fixture = HomeFixture::bare()?;
    let mut manifest = Manifest::new("/dotfiles");
    manifest.insert(MANIFEST_ENTRY, "/.dotconfig");
    fixture.write_canonical(MANIFEST_ENTRY, ".dotconfig", &manifest.to_string())?;
    let local = Manifest::new("/elsewhere").to_string();
    fixture.write(".dotconfig", &local)?;
    let (mut tracker, _) = fixture.tracker(&[]);

    tracker.up(fixture.repo())?;

    assert!(is_symlink(fixture.layout().manifest_path()));
    assert_eq!(fixture.manifest()?, manifest);
    assert_eq!(
        read_to_string(fixture.repo().join("backup/dotconfig/.dotconfig"))?,
        local
    );

    Ok(())
}

#[test]
fn list_resolves_absolute_paths() -> Result<()> {
    let fixture = HomeFixture::new()?;
    fixture.record("nvim", "/.config/nvim")?;
    fixture.record("zshrc", "/.zshrc")?;
    let (tracker, _) = fixture.tracker(&[]);

    let result = tracker.list()?;

    let expect = vec![
        TrackedEntry {
            name: "nvim".into(),
            path: fixture.home().join(".config/nvim"),
        },
        TrackedEntry {
            name: "zshrc".into(),
            path: PathBuf::from(fixture.home()).join(".zshrc"),
        },
    ];
    assert_eq!(result, expect);

    Ok(())
}
