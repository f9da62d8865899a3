//! Single-worker analysis queue.
//!
//! Jobs run one at a time in submission order. The worker task is started
//! by `submit` when idle and exits once no queued job is left.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::error::ReviewError;
use crate::evaluator::DepthPreset;

/// Guess for the job currently on the engine, in seconds.
pub const PROCESSING_ESTIMATE_SECS: u64 = 60;

/// Runs one game analysis and returns the stored result id.
pub trait JobRunner: Send + Sync {
    fn run(
        &self,
        game_id: i64,
        preset: DepthPreset,
    ) -> impl Future<Output = Result<i64, ReviewError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    /// Submission sequence number.
    pub id: u64,
    pub game_id: i64,
    pub depth_preset: DepthPreset,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// Set on failure: whether resubmitting could succeed.
    pub retryable: Option<bool>,
    pub result_ref: Option<i64>,
}

#[derive(Debug, Default)]
struct JobTable {
    /// Submission order.
    jobs: Vec<AnalysisJob>,
    next_id: u64,
    worker_running: bool,
}

impl JobTable {
    fn find(&self, game_id: i64) -> Option<&AnalysisJob> {
        self.jobs.iter().find(|job| job.game_id == game_id)
    }
}

struct Inner<R> {
    runner: R,
    table: Mutex<JobTable>,
    changed: Notify,
}

/// Handle to the queue. Clones share the same table and worker.
pub struct Scheduler<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for Scheduler<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: JobRunner + 'static> Scheduler<R> {
    pub fn new(runner: R) -> Self {
        Self {
            inner: Arc::new(Inner {
                runner,
                table: Mutex::new(JobTable::default()),
                changed: Notify::new(),
            }),
        }
    }

    pub fn runner(&self) -> &R {
        &self.inner.runner
    }

    /// Queue a game. A game that already has a live job gets that job back
    /// unchanged; a finished job for the game is replaced by a fresh one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, game_id: i64, preset: DepthPreset) -> AnalysisJob {
        let (job, start_worker) = {
            let mut table = self.table();
            if let Some(existing) = table.find(game_id) {
                if !existing.status.is_terminal() {
                    return existing.clone();
                }
                table.jobs.retain(|job| job.game_id != game_id);
            }

            table.next_id += 1;
            let job = AnalysisJob {
                id: table.next_id,
                game_id,
                depth_preset: preset,
                status: JobStatus::Queued,
                created_at: Utc::now(),
                started_at: None,
                completed_at: None,
                error: None,
                retryable: None,
                result_ref: None,
            };
            table.jobs.push(job.clone());

            let start_worker = !table.worker_running;
            table.worker_running = true;
            (job, start_worker)
        };

        info!(game_id, job_id = job.id, preset = preset.as_str(), "Job queued");
        if start_worker {
            tokio::spawn(worker_loop(Arc::clone(&self.inner)));
        }
        job
    }

    pub fn status(&self, game_id: i64) -> Option<AnalysisJob> {
        self.table().find(game_id).cloned()
    }

    /// Advisory seconds until the job finishes (processing) or starts
    /// (queued). `None` for unknown games.
    pub fn estimate(&self, game_id: i64) -> Option<u64> {
        let table = self.table();
        let job = table.find(game_id)?;
        let secs = match job.status {
            JobStatus::Completed | JobStatus::Failed => 0,
            JobStatus::Processing => PROCESSING_ESTIMATE_SECS,
            JobStatus::Queued => {
                let in_flight = table
                    .jobs
                    .iter()
                    .any(|j| j.status == JobStatus::Processing);
                let ahead: u64 = table
                    .jobs
                    .iter()
                    .take_while(|j| j.id != job.id)
                    .filter(|j| j.status == JobStatus::Queued)
                    .map(|j| j.depth_preset.estimated_secs())
                    .sum();
                ahead + if in_flight { PROCESSING_ESTIMATE_SECS } else { 0 }
            }
        };
        Some(secs)
    }

    pub fn list_all(&self) -> Vec<AnalysisJob> {
        self.table().jobs.clone()
    }

    /// Drop completed and failed jobs; returns how many went.
    pub fn clear_finished(&self) -> usize {
        let mut table = self.table();
        let before = table.jobs.len();
        table.jobs.retain(|job| !job.status.is_terminal());
        before - table.jobs.len()
    }

    /// Remove a job unless it is being processed.
    pub fn remove_job(&self, game_id: i64) -> bool {
        let mut table = self.table();
        match table.jobs.iter().position(|job| job.game_id == game_id) {
            Some(idx) if table.jobs[idx].status != JobStatus::Processing => {
                table.jobs.remove(idx);
                true
            }
            _ => false,
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.table().worker_running
    }

    /// Resolve once the game's job is terminal. `None` if no such job, or
    /// if it is removed while waiting.
    pub async fn wait_for(&self, game_id: i64) -> Option<AnalysisJob> {
        loop {
            let notified = self.inner.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.status(game_id) {
                Some(job) if job.status.is_terminal() => return Some(job),
                Some(_) => {}
                None => return None,
            }
            notified.await;
        }
    }

    fn table(&self) -> MutexGuard<'_, JobTable> {
        lock_table(&self.inner)
    }
}

fn lock_table<R>(inner: &Inner<R>) -> MutexGuard<'_, JobTable> {
    inner.table.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn worker_loop<R: JobRunner + 'static>(inner: Arc<Inner<R>>) {
    info!("Analysis worker started");
    loop {
        let next = {
            let mut table = lock_table(&inner);
            match table.jobs.iter_mut().find(|job| job.status == JobStatus::Queued) {
                Some(job) => {
                    job.status = JobStatus::Processing;
                    job.started_at = Some(Utc::now());
                    Some((job.id, job.game_id, job.depth_preset))
                }
                None => {
                    table.worker_running = false;
                    None
                }
            }
        };
        inner.changed.notify_waiters();

        let Some((job_id, game_id, preset)) = next else {
            info!("Analysis worker idle");
            return;
        };

        info!(game_id, job_id, "Processing job");
        let task_inner = Arc::clone(&inner);
        let outcome = tokio::spawn(async move { task_inner.runner.run(game_id, preset).await })
            .await
            .unwrap_or_else(|e| Err(ReviewError::Evaluator(format!("analysis task aborted: {e}"))));

        {
            let mut table = lock_table(&inner);
            if let Some(job) = table.jobs.iter_mut().find(|job| job.id == job_id) {
                let now = Utc::now();
                match &outcome {
                    Ok(result_ref) => {
                        job.status = JobStatus::Completed;
                        job.result_ref = Some(*result_ref);
                    }
                    Err(e) => {
                        job.status = JobStatus::Failed;
                        job.error = Some(e.to_string());
                        job.retryable = Some(!e.is_permanent());
                    }
                }
                job.completed_at = Some(now);
            }
        }

        match outcome {
            Ok(result_ref) => info!(game_id, job_id, result_ref, "Job completed"),
            Err(e) if e.is_permanent() => warn!(game_id, job_id, error = %e, "Job failed"),
            Err(e) => error!(game_id, job_id, error = %e, "Job failed"),
        }
    }
}
