//! GeoFlow Workflow - Job orchestration and the analysis session
//!
//! This crate runs analysis jobs on tokio tasks, computes the guided
//! workflow, and ties the stores together into a single-writer session.

pub mod executor;
pub mod export;
pub mod jobs;
pub mod session;
pub mod workflow;

pub use executor::SimulatedExecutor;
pub use export::{ExportArtifact, ExportPayload};
pub use jobs::{JobEvent, JobQueue};
pub use session::Session;
pub use workflow::{StepCondition, StepDefinition, StepStatus, StepView, Workflow, WorkflowContext};
