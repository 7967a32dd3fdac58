//! Waiting on asynchronous backend jobs.
//!
//! The job service's status is advisory. Completion is decided by the
//! caller's predicate over the synced study, because the job's real output
//! is what it writes into the document.

use std::sync::Arc;

use sf_core::entities::Study;
use sf_remote::{JobInput, JobService, JobState, JobStatus};
use sf_tasks::{PollOptions, PollState, PollingController};

use crate::error::SyncError;
use crate::store::SyncStore;

/// A finished job and the study state that satisfied the caller.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    pub study: Study,
}

#[derive(Debug, Clone)]
struct Sample {
    status: JobStatus,
    study: Study,
}

/// Start a job for a subscribed study and poll until `is_complete` holds.
///
/// A job the service reports as failed ends the wait early.
///
/// # Errors
///
/// - [`SyncError::Remote`] if the job cannot be started
/// - [`SyncError::Timeout`] if `options.max_duration` passes first
/// - [`SyncError::JobHalted`] if the job failed or status checks kept failing
pub async fn await_job<P>(
    sync: &SyncStore,
    jobs: Arc<dyn JobService>,
    input: JobInput,
    options: PollOptions<SyncError>,
    is_complete: P,
) -> Result<JobOutcome, SyncError>
where
    P: Fn(&Study) -> bool + Send + Sync + 'static,
{
    let study_id = input.study_id.clone();
    let ticket = jobs.start(input).await?;
    let job_id = ticket.job_id;
    tracing::info!(job_id, study_id, "job started");

    let is_complete = Arc::new(is_complete);
    let poll = {
        let sync = sync.clone();
        let job_id = job_id.clone();
        move || {
            let sync = sync.clone();
            let jobs = Arc::clone(&jobs);
            let job_id = job_id.clone();
            let study_id = study_id.clone();
            async move {
                let status = jobs.status(&job_id).await?;
                let study = sync
                    .snapshot(&study_id)
                    .ok_or(SyncError::NotLoaded(study_id))?;
                Ok(Sample { status, study })
            }
        }
    };
    let should_stop = {
        let is_complete = Arc::clone(&is_complete);
        move |sample: &Sample| is_complete(&sample.study) || sample.status.state == JobState::Failed
    };

    let max_duration = options.max_duration;
    let controller = PollingController::new(poll, should_stop, options);
    controller.start();
    let outcome = controller.wait().await;

    match (outcome.state, outcome.value) {
        (PollState::Stopped, Some(sample)) if is_complete(&sample.study) => {
            tracing::info!(job_id, "job complete");
            Ok(JobOutcome {
                job_id,
                status: sample.status,
                study: sample.study,
            })
        }
        (PollState::Stopped, Some(sample)) => Err(SyncError::JobHalted {
            job_id,
            reason: sample.status.stage,
        }),
        (PollState::TimedOut, _) => Err(SyncError::Timeout(format!(
            "job {job_id} after {max_duration:?}"
        ))),
        (state, _) => Err(SyncError::JobHalted {
            job_id,
            reason: format!("polling ended in state {state}"),
        }),
    }
}
