//! Asynchronous backend jobs.
//!
//! A job is started once and then observed through [`JobService::status`].
//! Its authoritative effect is a write to the study document, so callers
//! usually watch the document rather than trusting the status alone.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sf_core::ids::{PREFIX_JOB, generate_id};

use crate::document::DocumentStore;
use crate::error::RemoteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// What a job works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInput {
    pub study_id: String,
    /// Storage paths of the photos to classify.
    pub image_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTicket {
    pub job_id: String,
    pub status: JobState,
    pub stage: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub state: JobState,
    pub result_count: usize,
    pub stage: String,
}

#[async_trait]
pub trait JobService: Send + Sync {
    async fn start(&self, input: JobInput) -> Result<JobTicket, RemoteError>;

    async fn status(&self, job_id: &str) -> Result<JobStatus, RemoteError>;
}

// ---------------------------------------------------------------------------
// Simulated room classifier
// ---------------------------------------------------------------------------

/// Classifies rooms from photo file names after a fixed delay, then writes
/// the `rooms` field of the study.
pub struct SimulatedRoomClassifier {
    store: Arc<dyn DocumentStore>,
    delay: Duration,
    jobs: Arc<Mutex<HashMap<String, JobStatus>>>,
}

impl SimulatedRoomClassifier {
    pub fn new(store: Arc<dyn DocumentStore>, delay: Duration) -> Self {
        Self {
            store,
            delay,
            jobs: Arc::default(),
        }
    }

    fn lock(
        jobs: &Mutex<HashMap<String, JobStatus>>,
    ) -> MutexGuard<'_, HashMap<String, JobStatus>> {
        jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(jobs: &Mutex<HashMap<String, JobStatus>>, job_id: &str, status: JobStatus) {
        Self::lock(jobs).insert(job_id.to_string(), status);
    }

    /// One room per photo, labelled by the photo's file stem.
    fn classify(image_paths: &[String]) -> Vec<Value> {
        image_paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let label = Path::new(path)
                    .file_stem()
                    .map_or_else(|| "room".to_string(), |s| s.to_string_lossy().into_owned());
                json!({
                    "id": format!("room-{}", i + 1),
                    "label": label,
                    "photos": [path],
                })
            })
            .collect()
    }
}

#[async_trait]
impl JobService for SimulatedRoomClassifier {
    async fn start(&self, input: JobInput) -> Result<JobTicket, RemoteError> {
        let job_id = generate_id(PREFIX_JOB);
        let queued = JobStatus {
            state: JobState::Queued,
            result_count: 0,
            stage: "queued".into(),
        };
        SimulatedRoomClassifier::set(&self.jobs, &job_id, queued);

        let store = Arc::clone(&self.store);
        let jobs = Arc::clone(&self.jobs);
        let delay = self.delay;
        let id = job_id.clone();
        tokio::spawn(async move {
            SimulatedRoomClassifier::set(
                &jobs,
                &id,
                JobStatus {
                    state: JobState::Running,
                    result_count: 0,
                    stage: "classifying".into(),
                },
            );
            tokio::time::sleep(delay).await;

            let rooms = SimulatedRoomClassifier::classify(&input.image_paths);
            let count = rooms.len();
            let mut fields = Map::new();
            fields.insert("rooms".into(), Value::Array(rooms));

            let status = match store.update(&input.study_id, fields).await {
                Ok(()) => {
                    tracing::info!(
                        job_id = %id,
                        study_id = %input.study_id,
                        rooms = count,
                        "room classification finished"
                    );
                    JobStatus {
                        state: JobState::Succeeded,
                        result_count: count,
                        stage: "done".into(),
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        job_id = %id,
                        error = %e,
                        "room classification failed to write results"
                    );
                    JobStatus {
                        state: JobState::Failed,
                        result_count: 0,
                        stage: e.to_string(),
                    }
                }
            };
            SimulatedRoomClassifier::set(&jobs, &id, status);
        });

        Ok(JobTicket {
            job_id,
            status: JobState::Queued,
            stage: "queued".into(),
        })
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus, RemoteError> {
        SimulatedRoomClassifier::lock(&self.jobs)
            .get(job_id)
            .cloned()
            .ok_or_else(|| RemoteError::UnknownJob(job_id.to_string()))
    }
}
