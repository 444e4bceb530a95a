//! Asynchronous job queue.
//!
//! A [`JobQueue`] owns a bounded worker pool and a job table. Work is run on
//! Tokio's blocking pool (signing and verification are synchronous and video
//! runs can be slow); callers poll by job id for a [`JobSnapshot`].
//!
//! Each queue is an independent handle: cloning shares the same table and
//! pool, constructing a new one does not.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::artifact::{verify_artifact, ArtifactKind};
use crate::error::{ProvenanceError, Result};
use crate::signature::VerifyingKey;
use crate::store::ProvenanceStore;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Serialized result of a `done` job.
    pub result: Option<serde_json::Value>,
    /// Error message of a `failed` job.
    pub error: Option<String>,
}

impl JobSnapshot {
    fn queued(id: Uuid) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            submitted_at: Utc::now(),
            finished_at: None,
            result: None,
            error: None,
        }
    }
}

/// Bounded pool of blocking workers plus the table of submitted jobs.
#[derive(Clone)]
pub struct JobQueue {
    jobs: Arc<DashMap<Uuid, JobSnapshot>>,
    permits: Arc<Semaphore>,
}

impl JobQueue {
    /// Create a queue running at most `max_workers` jobs at once (minimum 1).
    pub fn new(max_workers: usize) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            permits: Arc::new(Semaphore::new(max_workers.max(1))),
        }
    }

    /// Queue `task` and return its id immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit<F, T>(&self, task: F) -> Uuid
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let id = Uuid::new_v4();
        self.jobs.insert(id, JobSnapshot::queued(id));
        debug!(%id, "Job queued");

        let jobs = Arc::clone(&self.jobs);
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                finish(&jobs, id, Err("job queue closed".to_string()));
                return;
            };
            if let Some(mut job) = jobs.get_mut(&id) {
                job.status = JobStatus::Processing;
            }

            let outcome = match tokio::task::spawn_blocking(task).await {
                Ok(Ok(value)) => serde_json::to_value(&value).map_err(|e| e.to_string()),
                Ok(Err(err)) => Err(err.to_string()),
                Err(join_err) => Err(format!("worker panicked: {join_err}")),
            };
            finish(&jobs, id, outcome);
        });

        id
    }

    /// Queue verification of the artifact at `path`.
    pub fn submit_verification(
        &self,
        kind: ArtifactKind,
        path: impl Into<PathBuf>,
        key: VerifyingKey,
        store: ProvenanceStore,
    ) -> Uuid {
        let path = path.into();
        self.submit(move || Ok(verify_artifact(kind, &path, &key, &store)))
    }

    /// Snapshot of job `id`, or `None` if it was never submitted here.
    pub fn get(&self, id: &Uuid) -> Option<JobSnapshot> {
        self.jobs.get(id).map(|job| job.clone())
    }

    /// Poll until job `id` reaches a terminal state.
    pub async fn wait(&self, id: &Uuid) -> Result<JobSnapshot> {
        loop {
            let job = self
                .get(id)
                .ok_or_else(|| ProvenanceError::Job(format!("unknown job {id}")))?;
            if job.status.is_terminal() {
                return Ok(job);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

fn finish(
    jobs: &DashMap<Uuid, JobSnapshot>,
    id: Uuid,
    outcome: std::result::Result<serde_json::Value, String>,
) {
    let Some(mut job) = jobs.get_mut(&id) else {
        return;
    };
    job.finished_at = Some(Utc::now());
    match outcome {
        Ok(value) => {
            job.status = JobStatus::Done;
            job.result = Some(value);
            debug!(%id, "Job done");
        }
        Err(error) => {
            warn!(%id, %error, "Job failed");
            job.status = JobStatus::Failed;
            job.error = Some(error);
        }
    }
}
