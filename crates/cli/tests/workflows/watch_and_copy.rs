//! Happy-path sync workflows

use crate::common::{wait_until, write_atomically, SyncPair, TICK};
use cli_lib::SyncController;
use std::fs;
use watcher::WatchState;

#[tokio::test]
async fn test_single_sync_copies_nested_tree() {
    let pair = SyncPair::new();
    fs::create_dir(pair.source.join("sub")).unwrap();
    fs::write(pair.source.join("a.java"), b"X").unwrap();
    fs::write(pair.source.join("sub/b.java"), b"Y").unwrap();

    let controller = SyncController::new(pair.java_watch(), &pair.target).unwrap();
    let report = controller.sync_once().await.unwrap();

    assert!(report.errors.is_empty());
    assert_eq!(fs::read(pair.target.join("a.java")).unwrap(), b"X");
    assert_eq!(fs::read(pair.target.join("sub/b.java")).unwrap(), b"Y");
}

#[tokio::test]
async fn test_matching_create_triggers_exactly_one_pass() {
    let pair = SyncPair::new();
    let controller = SyncController::new(pair.java_watch(), &pair.target).unwrap();
    let handle = controller.handle();

    let (summary, ()) = tokio::join!(controller.run(), async {
        assert!(wait_until(|| handle.state() == WatchState::Watching).await);
        write_atomically(&pair.source.join("Main.java"), b"class Main {}");

        assert!(wait_until(|| pair.target.join("Main.java").exists()).await);
        tokio::time::sleep(TICK * 10).await;
        handle.close();
    });

    let summary = summary.unwrap();
    assert_eq!(summary.passes, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(
        fs::read(pair.target.join("Main.java")).unwrap(),
        b"class Main {}"
    );
}

#[tokio::test]
async fn test_non_matching_change_triggers_nothing() {
    let pair = SyncPair::new();
    let controller = SyncController::new(pair.java_watch(), &pair.target).unwrap();
    let handle = controller.handle();

    let (summary, ()) = tokio::join!(controller.run(), async {
        assert!(wait_until(|| handle.state() == WatchState::Watching).await);
        fs::write(pair.source.join("notes.txt"), b"not java").unwrap();
        fs::create_dir(pair.source.join("pkg")).unwrap();
        tokio::time::sleep(TICK * 10).await;
        handle.close();
    });

    assert_eq!(summary.unwrap().passes, 0);
    assert!(!pair.target.join("notes.txt").exists());
    assert!(!pair.target.join("pkg").exists());
}

#[tokio::test]
async fn test_pass_copies_whole_tree_not_just_changed_file() {
    let pair = SyncPair::new();
    fs::write(pair.source.join("README.md"), b"docs").unwrap();
    fs::create_dir(pair.source.join("res")).unwrap();
    fs::write(pair.source.join("res/logo.svg"), b"<svg/>").unwrap();
    // Pre-existing extra in the target survives
    fs::write(pair.target.join("keep.me"), b"extra").unwrap();

    let controller = SyncController::new(pair.java_watch(), &pair.target).unwrap();
    let handle = controller.handle();

    let (summary, ()) = tokio::join!(controller.run(), async {
        assert!(wait_until(|| handle.state() == WatchState::Watching).await);
        write_atomically(&pair.source.join("App.java"), b"class App {}");
        assert!(wait_until(|| pair.target.join("App.java").exists()).await);
        handle.close();
    });

    summary.unwrap();
    assert_eq!(fs::read(pair.target.join("README.md")).unwrap(), b"docs");
    assert_eq!(fs::read(pair.target.join("res/logo.svg")).unwrap(), b"<svg/>");
    assert_eq!(fs::read(pair.target.join("keep.me")).unwrap(), b"extra");
}

#[tokio::test]
async fn test_removed_source_file_stays_in_target() {
    let pair = SyncPair::new();
    fs::write(pair.source.join("Old.java"), b"old").unwrap();

    let controller = SyncController::new(pair.java_watch(), &pair.target)
        .unwrap()
        .with_initial_sync(true);
    let handle = controller.handle();

    let (summary, ()) = tokio::join!(controller.run(), async {
        assert!(wait_until(|| pair.target.join("Old.java").exists()).await);

        fs::remove_file(pair.source.join("Old.java")).unwrap();
        write_atomically(&pair.source.join("New.java"), b"new");
        assert!(wait_until(|| pair.target.join("New.java").exists()).await);
        handle.close();
    });

    assert!(summary.unwrap().passes >= 2);
    // Additive: removals are not propagated
    assert!(pair.target.join("Old.java").exists());
}

#[tokio::test]
async fn test_initial_sync_runs_before_any_change() {
    let pair = SyncPair::new();
    fs::write(pair.source.join("Existing.java"), b"already there").unwrap();

    let controller = SyncController::new(pair.java_watch(), &pair.target)
        .unwrap()
        .with_initial_sync(true);
    let handle = controller.handle();

    let (summary, ()) = tokio::join!(controller.run(), async {
        assert!(wait_until(|| pair.target.join("Existing.java").exists()).await);
        tokio::time::sleep(TICK * 5).await;
        handle.close();
    });

    let summary = summary.unwrap();
    assert_eq!(summary.passes, 1);
    assert_eq!(summary.files_copied, 1);
}

#[tokio::test]
async fn test_later_edit_is_propagated() {
    let pair = SyncPair::new();
    let controller = SyncController::new(pair.java_watch(), &pair.target).unwrap();
    let handle = controller.handle();
    let file = pair.source.join("Edit.java");

    let (summary, ()) = tokio::join!(controller.run(), async {
        assert!(wait_until(|| handle.state() == WatchState::Watching).await);
        write_atomically(&file, b"v1");
        assert!(wait_until(|| fs::read(pair.target.join("Edit.java")).ok() == Some(b"v1".to_vec())).await);

        write_atomically(&file, b"version two");
        assert!(
            wait_until(|| fs::read(pair.target.join("Edit.java")).ok() == Some(b"version two".to_vec()))
                .await
        );
        handle.close();
    });

    assert!(summary.unwrap().passes >= 2);
}
