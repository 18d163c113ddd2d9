use crate::error::{Error, TaskError};
use crate::pipeline::TaskPipeline;
use crate::pipeline::test_helpers::{
    TEST_PROVIDER, create_test_pipeline, fixture, registry_with, test_config,
};
use crate::provider::ProviderRegistry;
use crate::resolver::StaticResolver;
use crate::types::{ProviderId, SkyPosition, TaskId, TaskKind, TaskStatus};
use std::sync::Arc;

#[tokio::test]
async fn test_created_task_starts_in_progress() {
    let (pipeline, _temp) = create_test_pipeline(ProviderRegistry::new()).await;

    let id = pipeline.create_task(TaskKind::ObjectSearch).await.unwrap();

    let info = pipeline.get_task(id).await.unwrap();
    assert_eq!(info.id, id);
    assert_eq!(info.kind, TaskKind::ObjectSearch);
    assert_eq!(info.status, TaskStatus::InProgress);
    assert_eq!(pipeline.get_status(id).await.unwrap(), TaskStatus::InProgress);
}

#[tokio::test]
async fn test_transition_happens_exactly_once() {
    let (pipeline, _temp) = create_test_pipeline(ProviderRegistry::new()).await;
    let id = pipeline.create_task(TaskKind::PhotometricData).await.unwrap();

    pipeline.transition(id, TaskStatus::Completed).await.unwrap();

    let second = pipeline.transition(id, TaskStatus::Failed).await;
    match second {
        Err(Error::Task(TaskError::InvalidTransition {
            current, requested, ..
        })) => {
            assert_eq!(current, TaskStatus::Completed);
            assert_eq!(requested, TaskStatus::Failed);
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }

    // The rejected transition left the row untouched
    assert_eq!(pipeline.get_status(id).await.unwrap(), TaskStatus::Completed);
}

#[tokio::test]
async fn test_transition_back_to_in_progress_is_rejected() {
    let (pipeline, _temp) = create_test_pipeline(ProviderRegistry::new()).await;
    let id = pipeline.create_task(TaskKind::ObjectSearch).await.unwrap();

    let result = pipeline.transition(id, TaskStatus::InProgress).await;
    assert!(matches!(
        result,
        Err(Error::Task(TaskError::InvalidTransition { .. }))
    ));
    assert_eq!(pipeline.get_status(id).await.unwrap(), TaskStatus::InProgress);
}

#[tokio::test]
async fn test_transition_on_missing_task_is_not_found() {
    let (pipeline, _temp) = create_test_pipeline(ProviderRegistry::new()).await;
    let id = TaskId::new();

    let result = pipeline.transition(id, TaskStatus::Completed).await;
    assert!(matches!(
        result,
        Err(Error::Task(TaskError::NotFound { id: missing })) if missing == id
    ));
}

#[tokio::test]
async fn test_deleted_task_reports_not_found() {
    let (pipeline, _temp) = create_test_pipeline(ProviderRegistry::new()).await;
    let id = pipeline.create_task(TaskKind::ObjectSearch).await.unwrap();

    pipeline.delete_task(id).await.unwrap();

    assert!(matches!(
        pipeline.get_status(id).await,
        Err(Error::Task(TaskError::NotFound { .. }))
    ));
    assert!(matches!(
        pipeline.delete_task(id).await,
        Err(Error::Task(TaskError::NotFound { .. }))
    ));
}

#[tokio::test]
async fn test_shutdown_rejects_new_submissions() {
    let (pipeline, _temp) = create_test_pipeline(registry_with(fixture())).await;
    pipeline.start_services();

    pipeline.shutdown().await.unwrap();
    assert!(!pipeline.is_accepting());

    let result = pipeline
        .submit_cone_search(
            ProviderId::from(TEST_PROVIDER),
            SkyPosition::new(10.0, 10.0).unwrap(),
            None,
        )
        .await;
    assert!(matches!(result, Err(Error::ShuttingDown)));
}

#[tokio::test]
async fn test_interrupted_tasks_fail_on_next_start() {
    let temp = tempfile::tempdir().unwrap();

    let first = TaskPipeline::with_resolver(
        test_config(temp.path()),
        ProviderRegistry::new(),
        Arc::new(StaticResolver::new()),
    )
    .await
    .unwrap();
    let interrupted = first.create_task(TaskKind::ObjectSearch).await.unwrap();
    let finished = first.create_task(TaskKind::ObjectSearch).await.unwrap();
    first
        .transition(finished, TaskStatus::Completed)
        .await
        .unwrap();
    drop(first);

    let second = TaskPipeline::with_resolver(
        test_config(temp.path()),
        ProviderRegistry::new(),
        Arc::new(StaticResolver::new()),
    )
    .await
    .unwrap();

    assert_eq!(
        second.get_status(interrupted).await.unwrap(),
        TaskStatus::Failed
    );
    assert_eq!(
        second.get_status(finished).await.unwrap(),
        TaskStatus::Completed
    );
}

#[tokio::test]
async fn test_invalid_config_is_rejected_at_startup() {
    let temp = tempfile::tempdir().unwrap();
    let mut config = test_config(temp.path());
    config.execution.max_concurrent_tasks = 0;

    let result = TaskPipeline::with_resolver(
        config,
        ProviderRegistry::new(),
        Arc::new(StaticResolver::new()),
    )
    .await;
    assert!(matches!(result, Err(Error::Config { .. })));
}
