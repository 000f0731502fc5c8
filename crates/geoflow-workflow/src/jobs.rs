//! Analysis job queue.
//!
//! Jobs are validated synchronously on submission and then executed on their
//! own tokio task. Every write coming from a task carries the attempt number
//! it was started for, so a task superseded by a retry never touches the job.
//!
//! Uses `RwLock::unwrap()` intentionally, like the stores: a poisoned job
//! table is unrecoverable.

use geoflow_core::error::{GeoflowError, Result};
use geoflow_core::models::{AnalysisJob, DatasetId, JobId, JobStatus, Parameters, Tier};
use geoflow_core::ports::{AnalysisExecutor, ExecutionRequest, ProgressSink};
use geoflow_core::ToolCatalog;
use geoflow_store::DatasetRegistry;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 256;

/// Message stored on jobs cancelled through [`JobQueue::cancel`]
pub const CANCELLED_MESSAGE: &str = "Cancelled by user";

/// Lifecycle notification broadcast to observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    Started { job_id: JobId, attempt: u32 },
    Progress { job_id: JobId, percent: u8 },
    Completed { job_id: JobId },
    Failed { job_id: JobId, message: String },
    Cancelled { job_id: JobId },
}

impl JobEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::Started { job_id, .. }
            | JobEvent::Progress { job_id, .. }
            | JobEvent::Completed { job_id }
            | JobEvent::Failed { job_id, .. }
            | JobEvent::Cancelled { job_id } => *job_id,
        }
    }
}

#[derive(Default)]
struct JobTable {
    /// Creation order
    jobs: Vec<AnalysisJob>,
    handles: HashMap<JobId, JoinHandle<()>>,
    next_id: u64,
}

impl JobTable {
    fn get(&self, id: JobId) -> Result<&AnalysisJob> {
        self.jobs
            .iter()
            .find(|j| j.id == id)
            .ok_or_else(|| GeoflowError::JobNotFound { id: id.to_string() })
    }

    fn get_mut(&mut self, id: JobId) -> Result<&mut AnalysisJob> {
        self.jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| GeoflowError::JobNotFound { id: id.to_string() })
    }
}

struct QueueInner {
    catalog: ToolCatalog,
    registry: DatasetRegistry,
    executor: Arc<dyn AnalysisExecutor>,
    /// Read when an attempt starts; shared by every clone of the queue
    timeout: RwLock<Option<Duration>>,
    table: RwLock<JobTable>,
    events: broadcast::Sender<JobEvent>,
}

impl QueueInner {
    fn emit(&self, event: JobEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Move a retried job into `processing` when its task starts.
    ///
    /// Returns false when this attempt should not run at all.
    fn begin(&self, job_id: JobId, attempt: u32) -> bool {
        let mut table = self.table.write().unwrap();
        let Ok(job) = table.get_mut(job_id) else {
            return false;
        };
        if job.attempt != attempt {
            return false;
        }
        match job.status {
            JobStatus::Processing => true,
            JobStatus::Pending => {
                if job.start().is_err() {
                    return false;
                }
                drop(table);
                self.emit(JobEvent::Started { job_id, attempt });
                true
            }
            _ => false,
        }
    }

    async fn run(self: Arc<Self>, request: ExecutionRequest, attempt: u32) {
        let job_id = request.job_id;
        if !self.begin(job_id, attempt) {
            tracing::debug!(job_id = %job_id, attempt, "Skipping superseded attempt");
            return;
        }

        let reporter = ProgressReporter {
            queue: Arc::clone(&self),
            job_id,
            attempt,
        };
        let timeout = *self.timeout.read().unwrap();
        let execution = self.executor.execute(request, &reporter);
        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, execution).await {
                Ok(outcome) => outcome,
                Err(_) => Err(GeoflowError::Execution(format!("Timed out after {:?}", limit))),
            },
            None => execution.await,
        };

        self.finish(job_id, attempt, outcome);
    }

    fn finish(&self, job_id: JobId, attempt: u32, outcome: Result<serde_json::Value>) {
        let event = {
            let mut table = self.table.write().unwrap();
            let Ok(job) = table.get_mut(job_id) else {
                return;
            };
            if job.attempt != attempt || job.status != JobStatus::Processing {
                tracing::debug!(
                    job_id = %job_id,
                    attempt,
                    status = %job.status,
                    "Discarding outcome of inactive attempt"
                );
                return;
            }

            match outcome {
                Ok(value) => {
                    if let Err(e) = job.complete(value) {
                        tracing::warn!(job_id = %job_id, error = %e, "Could not complete job");
                        return;
                    }
                    tracing::info!(job_id = %job_id, tool = %job.tool_id, "Job completed");
                    JobEvent::Completed { job_id }
                }
                Err(err) => {
                    let message = failure_message(err);
                    if let Err(e) = job.fail(message.clone()) {
                        tracing::warn!(job_id = %job_id, error = %e, "Could not fail job");
                        return;
                    }
                    tracing::warn!(
                        job_id = %job_id,
                        tool = %job.tool_id,
                        error = %message,
                        "Job failed"
                    );
                    JobEvent::Failed { job_id, message }
                }
            }
        };
        self.emit(event);
    }
}

fn failure_message(err: GeoflowError) -> String {
    match err {
        GeoflowError::Execution(message) => message,
        other => other.to_string(),
    }
}

/// Progress sink handed to the executor for one attempt
struct ProgressReporter {
    queue: Arc<QueueInner>,
    job_id: JobId,
    attempt: u32,
}

impl ProgressSink for ProgressReporter {
    fn report(&self, percent: u8) -> Result<()> {
        {
            let mut table = self.queue.table.write().unwrap();
            let job = table.get_mut(self.job_id)?;
            if job.attempt != self.attempt {
                return Err(GeoflowError::Execution(format!(
                    "Attempt {} of {} was superseded",
                    self.attempt, self.job_id
                )));
            }
            job.record_progress(percent)?;
        }

        tracing::debug!(job_id = %self.job_id, percent, "Job progress");
        self.queue.emit(JobEvent::Progress {
            job_id: self.job_id,
            percent,
        });
        Ok(())
    }
}

/// Shared handle to the job queue. Clones observe the same jobs.
///
/// `submit` and `retry` spawn onto the current tokio runtime.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("jobs", &self.len())
            .field("timeout", &self.timeout())
            .finish()
    }
}

impl JobQueue {
    pub fn new(
        catalog: ToolCatalog,
        registry: DatasetRegistry,
        executor: Arc<dyn AnalysisExecutor>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(QueueInner {
                catalog,
                registry,
                executor,
                timeout: RwLock::new(None),
                table: RwLock::new(JobTable::default()),
                events,
            }),
        }
    }

    /// Fail jobs that run longer than `timeout`
    pub fn with_timeout(self, timeout: Option<Duration>) -> Self {
        self.set_timeout(timeout);
        self
    }

    /// Change the execution limit for every clone of this queue.
    ///
    /// Applies to attempts started afterwards; running attempts keep theirs.
    pub fn set_timeout(&self, timeout: Option<Duration>) {
        *self.inner.timeout.write().unwrap() = timeout;
        tracing::debug!(timeout_secs = timeout.map(|t| t.as_secs()), "Job timeout set");
    }

    pub fn timeout(&self) -> Option<Duration> {
        *self.inner.timeout.read().unwrap()
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.inner.catalog
    }

    /// Validate and start a new job.
    ///
    /// Checks run in order: tool, tier, datasets, dataset kinds, parameters.
    /// Nothing is recorded unless every check passes.
    pub async fn submit(
        &self,
        tool_id: &str,
        dataset_ids: &[DatasetId],
        parameters: &Parameters,
        tier: Tier,
    ) -> Result<AnalysisJob> {
        let tool = self.inner.catalog.get(tool_id)?;
        if !self.inner.catalog.authorize(tool, tier) {
            return Err(GeoflowError::PremiumRequired {
                feature: tool.id.clone(),
                required: tool.tier,
                actual: tier,
            });
        }

        if dataset_ids.is_empty() {
            return Err(GeoflowError::validation(
                "dataset_ids",
                "at least one dataset is required",
            ));
        }
        let datasets = dataset_ids
            .iter()
            .map(|id| self.inner.registry.get(*id))
            .collect::<Result<Vec<_>>>()?;

        if let Some(ds) = datasets.iter().find(|d| !tool.accepts(d.kind)) {
            return Err(GeoflowError::validation(
                "dataset_ids",
                format!("{} does not accept {} dataset '{}'", tool.name, ds.kind, ds.name),
            ));
        }

        let parameters = tool.validate_parameters(parameters)?;

        let snapshot = {
            let mut table = self.inner.table.write().unwrap();
            let id = JobId(table.next_id);
            table.next_id += 1;

            let mut job = AnalysisJob::new(
                id,
                tool.id.clone(),
                tool.name.clone(),
                dataset_ids.to_vec(),
                parameters.clone(),
            );
            job.start()?;
            table.jobs.push(job.clone());
            job
        };

        tracing::info!(
            job_id = %snapshot.id,
            tool = %snapshot.tool_id,
            datasets = snapshot.dataset_ids.len(),
            "Submitted job"
        );
        self.inner.emit(JobEvent::Started {
            job_id: snapshot.id,
            attempt: snapshot.attempt,
        });

        self.dispatch(
            ExecutionRequest {
                job_id: snapshot.id,
                tool: tool.clone(),
                datasets,
                parameters,
            },
            snapshot.attempt,
        );

        Ok(snapshot)
    }

    fn dispatch(&self, request: ExecutionRequest, attempt: u32) {
        let job_id = request.job_id;
        let handle = tokio::spawn(Arc::clone(&self.inner).run(request, attempt));

        let mut table = self.inner.table.write().unwrap();
        if let Some(previous) = table.handles.insert(job_id, handle) {
            previous.abort();
        }
    }

    /// Fail a pending or processing job with "Cancelled by user"
    pub fn cancel(&self, id: JobId) -> Result<AnalysisJob> {
        let snapshot = {
            let mut table = self.inner.table.write().unwrap();
            let job = table.get_mut(id)?;
            job.fail(CANCELLED_MESSAGE)?;
            let snapshot = job.clone();
            if let Some(handle) = table.handles.remove(&id) {
                handle.abort();
            }
            snapshot
        };

        tracing::info!(job_id = %id, progress = snapshot.progress, "Job cancelled");
        self.inner.emit(JobEvent::Cancelled { job_id: id });
        Ok(snapshot)
    }

    /// Reset a failed job and run it again with the same inputs.
    ///
    /// Returns the `pending` snapshot; the new attempt starts on its task.
    pub async fn retry(&self, id: JobId) -> Result<AnalysisJob> {
        let current = self.get(id)?;
        if !current.status.can_transition_to(JobStatus::Pending) {
            return Err(GeoflowError::InvalidTransition {
                subject: id.to_string(),
                from: current.status.to_string(),
                to: JobStatus::Pending.to_string(),
            });
        }

        let tool = self.inner.catalog.get(&current.tool_id)?.clone();
        let datasets = current
            .dataset_ids
            .iter()
            .map(|d| self.inner.registry.get(*d))
            .collect::<Result<Vec<_>>>()?;

        let snapshot = {
            let mut table = self.inner.table.write().unwrap();
            let job = table.get_mut(id)?;
            job.reset_for_retry()?;
            job.clone()
        };

        tracing::info!(job_id = %id, attempt = snapshot.attempt, "Retrying job");
        self.dispatch(
            ExecutionRequest {
                job_id: id,
                tool,
                datasets,
                parameters: snapshot.parameters.clone(),
            },
            snapshot.attempt,
        );

        Ok(snapshot)
    }

    pub fn get(&self, id: JobId) -> Result<AnalysisJob> {
        self.inner.table.read().unwrap().get(id).cloned()
    }

    /// Jobs with the given status (or all jobs), most recent first
    pub fn list(&self, status: Option<JobStatus>) -> Vec<AnalysisJob> {
        let table = self.inner.table.read().unwrap();
        table
            .jobs
            .iter()
            .rev()
            .filter(|j| status.map_or(true, |s| j.status == s))
            .cloned()
            .collect()
    }

    pub fn completed_count(&self) -> usize {
        let table = self.inner.table.read().unwrap();
        table
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Completed)
            .count()
    }

    pub fn len(&self) -> usize {
        self.inner.table.read().unwrap().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    /// Wait until the job reaches a terminal status and return it
    pub async fn wait(&self, id: JobId) -> Result<AnalysisJob> {
        let mut events = self.subscribe();
        loop {
            let job = self.get(id)?;
            if job.status.is_terminal() {
                return Ok(job);
            }
            match events.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return self.get(id),
            }
        }
    }
}
