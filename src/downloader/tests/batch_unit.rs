use crate::db::HistoryStore;
use crate::downloader::test_helpers::{
    MemorySink, MockFetcher, create_test_downloader, create_test_downloader_with_db, tasks,
};
use crate::error::{BatchError, Error};
use crate::types::{AudioFormat, BatchState, DownloadTask};
use std::sync::Arc;
use std::time::Duration;

// --- admission ---

#[tokio::test]
async fn test_empty_batch_is_rejected_and_state_unchanged() {
    let fetcher = Arc::new(MockFetcher::new());
    let downloader = create_test_downloader(fetcher.clone(), Arc::new(MemorySink::new()));

    let err = downloader
        .run_batch(Vec::new(), AudioFormat::Mp3)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Batch(BatchError::EmptyBatch)));
    assert_eq!(downloader.progress().await.state, BatchState::Idle);
    assert!(!downloader.is_running());
    assert!(fetcher.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_batch_is_refused_while_running() {
    let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_secs(5)));
    let downloader = create_test_downloader(fetcher.clone(), Arc::new(MemorySink::new()));

    let first = downloader
        .start_batch(tasks(&["a", "b"]), AudioFormat::Mp3)
        .await
        .unwrap();
    assert!(downloader.is_running());

    let err = downloader
        .run_batch(tasks(&["z"]), AudioFormat::Mp3)
        .await
        .unwrap_err();
    match err {
        Error::Batch(BatchError::AlreadyRunning { active }) => assert_eq!(active, first.get()),
        other => panic!("expected AlreadyRunning, got {:?}", other),
    }

    // A clone shares the same slot
    let clone = downloader.clone();
    assert!(clone.start_batch(tasks(&["z"]), AudioFormat::Mp3).await.is_err());

    while downloader.is_running() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(fetcher.sources(), vec!["a", "b"], "refused batches never fetch");

    // Slot is free again once the batch finished
    let summary = downloader
        .run_batch(tasks(&["c"]), AudioFormat::Mp3)
        .await
        .unwrap();
    assert_eq!(summary.state, BatchState::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_start_batch_resets_progress_before_returning() {
    let fetcher = Arc::new(MockFetcher::new());
    let downloader = create_test_downloader(fetcher, Arc::new(MemorySink::new()));

    downloader
        .run_batch(tasks(&["a"]), AudioFormat::Mp3)
        .await
        .unwrap();
    assert_eq!(downloader.progress().await.state, BatchState::Completed);

    downloader
        .start_batch(tasks(&["b", "c"]), AudioFormat::Mp3)
        .await
        .unwrap();

    // No yield between the two calls: the spawned loop has not run yet
    let progress = downloader.progress().await;
    assert_eq!(progress.state, BatchState::Running);
    assert_eq!(progress.completed_count, 0);
    assert_eq!(progress.total_count, 2);
    assert!(downloader.is_running());

    while downloader.is_running() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(downloader.progress().await.state, BatchState::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_start_batch_returns_before_the_loop_finishes() {
    let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_secs(1)));
    let downloader = create_test_downloader(fetcher, Arc::new(MemorySink::new()));
    let mut rx = downloader.subscribe();

    let batch_id = downloader
        .start_batch(tasks(&["a", "b", "c"]), AudioFormat::Mp3)
        .await
        .unwrap();

    loop {
        match rx.recv().await.unwrap() {
            crate::types::Event::BatchFinished {
                batch_id: finished,
                state,
                ..
            } => {
                assert_eq!(finished, batch_id);
                assert_eq!(state, BatchState::Completed);
                break;
            }
            _ => continue,
        }
    }

    let progress = downloader.progress().await;
    assert_eq!(progress.completed_count, 3);
    assert_eq!(progress.total_count, 3);
}

#[tokio::test]
async fn test_duplicate_task_ids_are_processed() {
    let fetcher = Arc::new(MockFetcher::new());
    let downloader = create_test_downloader(fetcher.clone(), Arc::new(MemorySink::new()));

    let batch = vec![
        DownloadTask::new("same", "First", "one"),
        DownloadTask::new("same", "Second", "two"),
    ];
    let summary = downloader.run_batch(batch, AudioFormat::Mp3).await.unwrap();

    assert_eq!(fetcher.sources(), vec!["one", "two"]);
    assert_eq!(summary.outcomes.len(), 2);
    assert_eq!(summary.state, BatchState::Completed);
}

#[tokio::test]
async fn test_display_names_become_safe_file_names() {
    let sink = Arc::new(MemorySink::new());
    let downloader = create_test_downloader(Arc::new(MockFetcher::new()), sink.clone());

    let batch = vec![
        DownloadTask::new("1", "AC/DC: Back in Black?", "one"),
        DownloadTask::new("2", "   ", "two"),
    ];
    downloader.run_batch(batch, AudioFormat::M4a).await.unwrap();

    assert_eq!(
        sink.file_names(),
        vec!["AC_DC_ Back in Black_.m4a", "track.m4a"]
    );
}

// --- persistence ---

#[tokio::test]
async fn test_outcomes_and_summary_are_persisted() {
    let fetcher = Arc::new(MockFetcher::new().failing_on("b"));
    let (downloader, db, _temp_dir) =
        create_test_downloader_with_db(fetcher, Arc::new(MemorySink::new())).await;

    let summary = downloader
        .run_batch(tasks(&["a", "b", "c"]), AudioFormat::Opus)
        .await
        .unwrap();

    let record = db.get_batch(summary.batch_id).await.unwrap().unwrap();
    assert_eq!(record.state, BatchState::Failed);
    assert_eq!(record.format, AudioFormat::Opus);
    assert_eq!(record.total, 3);
    assert_eq!(record.succeeded, 2);
    assert_eq!(record.failed, 1);

    let outcomes = db.batch_outcomes(summary.batch_id).await.unwrap();
    let flags: Vec<bool> = outcomes.iter().map(|o| o.outcome.succeeded).collect();
    assert_eq!(flags, vec![true, false, true]);
    assert_eq!(outcomes[1].outcome.task.source_reference, "b");
}

#[tokio::test]
async fn test_history_failure_does_not_stop_batch() {
    let fetcher = Arc::new(MockFetcher::new());
    let (downloader, db, _temp_dir) =
        create_test_downloader_with_db(fetcher.clone(), Arc::new(MemorySink::new())).await;

    // Outcome inserts fail from here on
    sqlx::query("DROP TABLE batch_outcomes")
        .execute(db.pool())
        .await
        .unwrap();

    let summary = downloader
        .run_batch(tasks(&["a", "b"]), AudioFormat::Mp3)
        .await
        .unwrap();

    assert_eq!(fetcher.calls().len(), 2);
    assert_eq!(summary.state, BatchState::Completed);
    assert_eq!(
        db.get_batch(summary.batch_id).await.unwrap().unwrap().state,
        BatchState::Completed
    );
}
