use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::dataset::DatasetId;
use crate::error::{GeoflowError, Result};

/// Unique identifier for an analysis job
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job_{}", self.0)
    }
}

/// A single parameter value supplied for a tool run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    /// Parse a command-line style value: numbers become `Number`, anything else `Text`
    pub fn parse(raw: &str) -> Self {
        raw.trim()
            .parse::<f64>()
            .map(ParamValue::Number)
            .unwrap_or_else(|_| ParamValue::Text(raw.to_string()))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            ParamValue::Number(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

/// Parameter values keyed by parameter name
pub type Parameters = BTreeMap<String, ParamValue>;

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Legal transitions:
    /// `pending -> processing -> {completed, failed}`, `pending -> failed`
    /// (cancel before start) and `failed -> pending` (retry).
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
                | (JobStatus::Failed, JobStatus::Pending)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution of a tool against datasets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: JobId,
    pub tool_id: String,
    pub tool_name: String,
    pub dataset_ids: Vec<DatasetId>,
    pub parameters: Parameters,
    pub status: JobStatus,
    /// Percentage in `[0, 100]`; 100 only once completed
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    /// Set on the transition into a terminal status
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    /// Execution attempt, starting at 1 and bumped by every retry
    pub attempt: u32,
}

impl AnalysisJob {
    pub fn new(
        id: JobId,
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        dataset_ids: Vec<DatasetId>,
        parameters: Parameters,
    ) -> Self {
        Self {
            id,
            tool_id: tool_id.into(),
            tool_name: tool_name.into(),
            dataset_ids,
            parameters,
            status: JobStatus::Pending,
            progress: 0,
            created_at: Utc::now(),
            completed_at: None,
            result: None,
            error_message: None,
            attempt: 1,
        }
    }

    fn check_transition(&self, next: JobStatus) -> Result<()> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(GeoflowError::InvalidTransition {
                subject: self.id.to_string(),
                from: self.status.to_string(),
                to: next.to_string(),
            })
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.check_transition(JobStatus::Processing)?;
        self.status = JobStatus::Processing;
        Ok(())
    }

    /// Record a progress checkpoint. Only values in `[progress, 99]` are accepted.
    pub fn record_progress(&mut self, percent: u8) -> Result<()> {
        if self.status != JobStatus::Processing {
            return Err(GeoflowError::InvalidTransition {
                subject: self.id.to_string(),
                from: self.status.to_string(),
                to: format!("progress {}", percent),
            });
        }
        if percent < self.progress || percent >= 100 {
            return Err(GeoflowError::OutOfRange {
                field: "progress".to_string(),
                value: f64::from(percent),
                min: f64::from(self.progress),
                max: 99.0,
            });
        }
        self.progress = percent;
        Ok(())
    }

    pub fn complete(&mut self, result: serde_json::Value) -> Result<()> {
        self.check_transition(JobStatus::Completed)?;
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Fail the job, freezing progress at its last value
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.check_transition(JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn reset_for_retry(&mut self) -> Result<()> {
        self.check_transition(JobStatus::Pending)?;
        self.status = JobStatus::Pending;
        self.progress = 0;
        self.error_message = None;
        self.result = None;
        self.completed_at = None;
        self.attempt += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> AnalysisJob {
        let mut params = Parameters::new();
        params.insert("threshold".to_string(), ParamValue::Number(0.3));
        AnalysisJob::new(JobId(1), "ndvi_analysis", "NDVI Analysis", vec![DatasetId(0)], params)
    }

    #[test]
    fn test_happy_path() {
        let mut job = job();
        job.start().unwrap();
        job.record_progress(10).unwrap();
        job.record_progress(10).unwrap();
        job.record_progress(90).unwrap();
        job.complete(serde_json::json!({"avg_ndvi": 0.67})).unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_progress_rejects_regression_and_hundred() {
        let mut job = job();
        job.start().unwrap();
        job.record_progress(50).unwrap();

        assert!(matches!(job.record_progress(25), Err(GeoflowError::OutOfRange { .. })));
        assert!(matches!(job.record_progress(100), Err(GeoflowError::OutOfRange { .. })));
        assert_eq!(job.progress, 50);
    }

    #[test]
    fn test_progress_requires_processing() {
        let mut job = job();
        assert!(matches!(
            job.record_progress(10),
            Err(GeoflowError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_illegal_transitions() {
        let mut job = job();
        assert!(job.complete(serde_json::Value::Null).is_err());

        job.start().unwrap();
        job.complete(serde_json::Value::Null).unwrap();
        assert!(job.fail("late").is_err());
        assert!(job.reset_for_retry().is_err());
        assert!(job.start().is_err());
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn test_fail_freezes_progress_and_retry_resets() {
        let mut job = job();
        let original = job.clone();
        job.start().unwrap();
        job.record_progress(75).unwrap();
        job.fail("boom").unwrap();
        assert_eq!(job.progress, 75);
        assert_eq!(job.error_message.as_deref(), Some("boom"));

        job.reset_for_retry().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(job.error_message.is_none());
        assert_eq!(job.attempt, 2);
        assert_eq!(job.tool_id, original.tool_id);
        assert_eq!(job.dataset_ids, original.dataset_ids);
        assert_eq!(job.parameters, original.parameters);
    }

    #[test]
    fn test_param_value_parse() {
        assert_eq!(ParamValue::parse("0.3"), ParamValue::Number(0.3));
        assert_eq!(ParamValue::parse("unet"), ParamValue::Text("unet".to_string()));
    }
}
