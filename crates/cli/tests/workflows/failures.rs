//! Error paths: bad roots, fatal watch errors, per-file copy failures

use crate::common::{wait_until, write_atomically, SyncPair, TICK};
use cli_lib::{ControllerError, Role, SyncController};
use std::fs;
use syncr_core::PathError;
use watcher::{WatchError, WatchState};

#[test]
fn test_missing_source_is_rejected_up_front() {
    let pair = SyncPair::new();
    fs::remove_dir(&pair.source).unwrap();

    let err = SyncController::new(pair.java_watch(), &pair.target).err().unwrap();
    assert!(matches!(
        err,
        ControllerError::InvalidConfiguration {
            role: Role::Source,
            source: PathError::Missing { .. },
        }
    ));
}

#[test]
fn test_file_target_is_rejected_up_front() {
    let pair = SyncPair::new();
    let file_target = pair.target.join("plain.txt");
    fs::write(&file_target, b"x").unwrap();

    let err = SyncController::new(pair.java_watch(), &file_target).err().unwrap();
    assert!(matches!(
        err,
        ControllerError::InvalidConfiguration {
            role: Role::Target,
            source: PathError::NotADirectory { .. },
        }
    ));
    assert!(err.to_string().starts_with("invalid target directory"));
}

#[test]
fn test_target_inside_source_is_rejected_up_front() {
    let pair = SyncPair::new();
    let nested = pair.source.join("out");
    fs::create_dir(&nested).unwrap();

    let err = SyncController::new(pair.java_watch(), &nested).err().unwrap();
    assert!(matches!(
        err,
        ControllerError::InvalidConfiguration {
            role: Role::Target,
            source: PathError::Nested { .. },
        }
    ));

    let err = SyncController::new(pair.java_watch(), &pair.source).err().unwrap();
    assert!(matches!(
        err,
        ControllerError::InvalidConfiguration {
            role: Role::Target,
            source: PathError::Nested { .. },
        }
    ));
}

#[tokio::test]
async fn test_deleted_source_root_ends_the_run() {
    let pair = SyncPair::new();
    let controller = SyncController::new(pair.java_watch(), &pair.target).unwrap();
    let handle = controller.handle();

    let (result, ()) = tokio::join!(controller.run(), async {
        assert!(wait_until(|| handle.state() == WatchState::Watching).await);
        fs::remove_dir_all(&pair.source).unwrap();
    });

    assert!(matches!(result, Err(ControllerError::Watch(_))));
    assert_eq!(handle.state(), WatchState::Closed);
}

#[tokio::test]
async fn test_closed_controller_cannot_run_again() {
    let pair = SyncPair::new();
    let controller = SyncController::new(pair.java_watch(), &pair.target).unwrap();
    controller.handle().close();

    let result = controller.run().await;
    assert!(matches!(result, Err(ControllerError::Watch(WatchError::Closed))));
}

#[tokio::test]
async fn test_burst_of_changes_runs_few_passes() {
    let pair = SyncPair::new();
    let controller = SyncController::new(pair.java_watch(), &pair.target).unwrap();
    let handle = controller.handle();

    let (summary, ()) = tokio::join!(controller.run(), async {
        assert!(wait_until(|| handle.state() == WatchState::Watching).await);
        for i in 0..50 {
            fs::write(pair.source.join(format!("Burst{}.java", i)), b"x").unwrap();
        }
        assert!(wait_until(|| pair.target.join("Burst49.java").exists()).await);
        tokio::time::sleep(TICK * 10).await;
        handle.close();
    });

    let summary = summary.unwrap();
    // Far fewer passes than changes, and the last one saw every file
    assert!(summary.passes >= 1);
    assert!(summary.passes < 50);
    for i in 0..50 {
        assert!(pair.target.join(format!("Burst{}.java", i)).exists());
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_copy_failures_do_not_stop_the_watch() {
    let pair = SyncPair::new();
    std::os::unix::fs::symlink(pair.source.join("nowhere"), pair.source.join("Dangling.java"))
        .unwrap();

    let controller = SyncController::new(pair.java_watch(), &pair.target).unwrap();
    let handle = controller.handle();

    let (summary, ()) = tokio::join!(controller.run(), async {
        assert!(wait_until(|| handle.state() == WatchState::Watching).await);

        write_atomically(&pair.source.join("First.java"), b"1");
        assert!(wait_until(|| pair.target.join("First.java").exists()).await);
        // Let the first pass finish before staging the next file
        tokio::time::sleep(TICK * 5).await;

        write_atomically(&pair.source.join("Second.java"), b"2");
        assert!(wait_until(|| pair.target.join("Second.java").exists()).await);
        tokio::time::sleep(TICK * 5).await;
        handle.close();
    });

    let summary = summary.unwrap();
    assert_eq!(summary.passes, 2);
    assert_eq!(summary.errors, 2);
    let last = summary.last_report.unwrap();
    assert_eq!(last.files_copied, 2);
    assert_eq!(last.errors.len(), 1);
    assert!(last.errors[0].path.ends_with("Dangling.java"));
}
