use crate::db::*;
use crate::types::{TaskId, TaskKind, TaskStatus};
use tempfile::NamedTempFile;

async fn test_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

#[tokio::test]
async fn test_insert_and_get_task() {
    let (db, _file) = test_db().await;
    let id = TaskId::new();

    db.insert_task(id, TaskKind::PhotometricData).await.unwrap();

    let row = db.get_task(id).await.unwrap().expect("task should exist");
    assert_eq!(row.id, id);
    assert_eq!(row.kind, TaskKind::PhotometricData.to_i32());
    assert_eq!(row.status, TaskStatus::InProgress.to_i32());
    assert!(row.created_at > 0);
    assert!(row.finished_at.is_none());

    let info: crate::types::TaskInfo = row.into();
    assert_eq!(info.kind, TaskKind::PhotometricData);
    assert_eq!(info.status, TaskStatus::InProgress);
}

#[tokio::test]
async fn test_get_missing_task_returns_none() {
    let (db, _file) = test_db().await;

    assert!(db.get_task(TaskId::new()).await.unwrap().is_none());
    assert!(db.get_task_status(TaskId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_finish_task_only_once() {
    let (db, _file) = test_db().await;
    let id = TaskId::new();
    db.insert_task(id, TaskKind::ObjectSearch).await.unwrap();

    assert!(db.finish_task(id, TaskStatus::Completed).await.unwrap());
    // A second terminal write matches no row and leaves the first in place
    assert!(!db.finish_task(id, TaskStatus::Failed).await.unwrap());

    assert_eq!(
        db.get_task_status(id).await.unwrap(),
        Some(TaskStatus::Completed)
    );
    let row = db.get_task(id).await.unwrap().unwrap();
    assert!(row.finished_at.is_some());
}

#[tokio::test]
async fn test_finish_missing_task_matches_nothing() {
    let (db, _file) = test_db().await;
    assert!(!db.finish_task(TaskId::new(), TaskStatus::Failed).await.unwrap());
}

#[tokio::test]
async fn test_delete_task() {
    let (db, _file) = test_db().await;
    let id = TaskId::new();
    db.insert_task(id, TaskKind::ObjectSearch).await.unwrap();

    assert!(db.delete_task(id).await.unwrap());
    assert!(!db.delete_task(id).await.unwrap());
    assert!(db.get_task_status(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_tasks_before_cutoff() {
    let (db, _file) = test_db().await;
    let old = TaskId::new();
    let fresh = TaskId::new();
    db.insert_task(old, TaskKind::ObjectSearch).await.unwrap();
    db.insert_task(fresh, TaskKind::ObjectSearch).await.unwrap();

    sqlx::query("UPDATE tasks SET created_at = 1000 WHERE id = ?")
        .bind(old)
        .execute(db.pool())
        .await
        .unwrap();

    let deleted = db.delete_tasks_before(2000).await.unwrap();
    assert_eq!(deleted, vec![old]);
    assert!(db.get_task(old).await.unwrap().is_none());
    assert!(db.get_task(fresh).await.unwrap().is_some());
}

#[tokio::test]
async fn test_count_tasks_by_status() {
    let (db, _file) = test_db().await;
    for _ in 0..3 {
        db.insert_task(TaskId::new(), TaskKind::ObjectSearch)
            .await
            .unwrap();
    }
    let done = TaskId::new();
    db.insert_task(done, TaskKind::ObjectSearch).await.unwrap();
    db.finish_task(done, TaskStatus::Completed).await.unwrap();

    assert_eq!(
        db.count_tasks_by_status(TaskStatus::InProgress).await.unwrap(),
        3
    );
    assert_eq!(
        db.count_tasks_by_status(TaskStatus::Completed).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_fail_interrupted_tasks_leaves_terminal_tasks_alone() {
    let (db, _file) = test_db().await;
    let running = TaskId::new();
    let done = TaskId::new();
    db.insert_task(running, TaskKind::ObjectSearch).await.unwrap();
    db.insert_task(done, TaskKind::ObjectSearch).await.unwrap();
    db.finish_task(done, TaskStatus::Completed).await.unwrap();

    assert_eq!(db.fail_interrupted_tasks().await.unwrap(), 1);
    assert_eq!(
        db.get_task_status(running).await.unwrap(),
        Some(TaskStatus::Failed)
    );
    assert_eq!(
        db.get_task_status(done).await.unwrap(),
        Some(TaskStatus::Completed)
    );
}
