//! Port trait definitions
//!
//! These traits define the collaborators the orchestration core consumes:
//! upload storage, analysis execution, and the subscription tier source.

pub mod execution;
pub mod storage;
pub mod subscription;

pub use execution::{AnalysisExecutor, ExecutionRequest, ProgressSink};
pub use storage::{UploadMeta, UploadStore};
pub use subscription::{StaticSubscription, SubscriptionProvider};
