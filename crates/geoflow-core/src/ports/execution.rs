use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Dataset, JobId, Parameters, ToolDescriptor};

/// Everything an executor needs to run one job attempt
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub job_id: JobId,
    pub tool: ToolDescriptor,
    pub datasets: Vec<Dataset>,
    /// Validated parameters, defaults included
    pub parameters: Parameters,
}

/// Receives progress checkpoints from a running job
pub trait ProgressSink: Send + Sync {
    /// Report a checkpoint in `[0, 99]`.
    ///
    /// Fails once the job has left `processing` (e.g. it was cancelled);
    /// executors should stop at that point.
    fn report(&self, percent: u8) -> Result<()>;
}

/// Port for running an analysis
#[async_trait]
pub trait AnalysisExecutor: Send + Sync {
    /// Run the analysis and return its result payload
    async fn execute(
        &self,
        request: ExecutionRequest,
        progress: &dyn ProgressSink,
    ) -> Result<serde_json::Value>;
}
