//! Background dispatcher: pulls submitted jobs and runs each one exactly once.

use super::TaskPipeline;

impl TaskPipeline {
    /// Start the dispatcher loop
    ///
    /// Jobs are taken off the queue in submission order and executed on their
    /// own tokio task once a slot under `max_concurrent_tasks` is free. The
    /// loop ends when the pipeline shuts down. Only the first call starts a
    /// loop; later calls return an already-finished handle.
    pub fn start_dispatcher(&self) -> tokio::task::JoinHandle<()> {
        let receiver = match self.dispatch.queue_rx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        let Some(mut receiver) = receiver else {
            tracing::warn!("Dispatcher already started, ignoring");
            return tokio::spawn(async {});
        };

        let concurrent_limit = self.dispatch.concurrent_limit.clone();
        let active_tasks = self.dispatch.active_tasks.clone();
        let shutdown = self.dispatch.shutdown.clone();
        let pipeline = self.clone();

        tokio::spawn(async move {
            loop {
                let job = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    job = receiver.recv() => match job {
                        Some(job) => job,
                        None => break,
                    },
                };

                // Wait for a free slot (blocks if at max concurrent tasks)
                let permit = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    permit = concurrent_limit.clone().acquire_owned() => match permit {
                        Ok(p) => p,
                        Err(_) => break,
                    },
                };

                let task_id = job.task_id;
                {
                    let mut active = active_tasks.lock().await;
                    if !active.insert(task_id) {
                        tracing::warn!(task_id = %task_id, "task already executing, dropping duplicate job");
                        continue;
                    }
                }

                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    pipeline.execute_task(job).await;
                    pipeline.dispatch.active_tasks.lock().await.remove(&task_id);
                });
            }

            // Jobs still queued stay in progress and are failed on the next start
            tracing::info!("Dispatcher stopped");
        })
    }
}
