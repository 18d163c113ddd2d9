//! Custom test assertions for integration tests

use astrocollector::{TaskId, TaskPipeline, TaskStatus};
use std::time::Duration;

/// Result of waiting for a task to finish
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// Task completed successfully
    Completed,
    /// Task failed
    Failed,
    /// The task disappeared (deleted or swept) while waiting
    Gone,
    /// Timeout waiting for a terminal status
    Timeout,
}

/// Poll a task until it reaches a terminal status
pub async fn wait_for_completion(
    pipeline: &TaskPipeline,
    id: TaskId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match pipeline.get_status(id).await {
                Ok(TaskStatus::Completed) => return WaitResult::Completed,
                Ok(TaskStatus::Failed) => return WaitResult::Failed,
                Ok(TaskStatus::InProgress) => {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                Err(_) => return WaitResult::Gone,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Assert that a task completed successfully
pub async fn assert_task_completed(pipeline: &TaskPipeline, id: TaskId) {
    match wait_for_completion(pipeline, id, Duration::from_secs(10)).await {
        WaitResult::Completed => {}
        other => panic!("task {} did not complete: {:?}", id, other),
    }
}

/// Assert that a task failed
pub async fn assert_task_failed(pipeline: &TaskPipeline, id: TaskId) {
    match wait_for_completion(pipeline, id, Duration::from_secs(10)).await {
        WaitResult::Failed => {}
        other => panic!("task {} did not fail: {:?}", id, other),
    }
}

/// Names of the entries in a zip archive, without the scratch directory prefix
pub fn archive_entries(path: &std::path::Path) -> Vec<String> {
    let file = std::fs::File::open(path).expect("archive should exist");
    let mut archive = zip::ZipArchive::new(file).expect("archive should be a zip");
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| {
            let name = archive.by_index(i).unwrap().name().to_string();
            name.split_once('/')
                .map(|(_, file)| file.to_string())
                .unwrap_or(name)
        })
        .collect();
    names.sort();
    names
}
