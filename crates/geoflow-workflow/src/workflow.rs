//! Guided workflow over the analysis steps.
//!
//! The only stored state is the active step index. Step statuses are derived
//! on every read from a [`WorkflowContext`] built from the live session, so
//! they can never go stale.

use geoflow_core::error::{GeoflowError, Result};
use serde::Serialize;

/// What has to be true for a step to count as done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCondition {
    DatasetsRegistered,
    ToolSelected,
    JobCompleted,
    /// Never satisfied automatically
    Manual,
}

impl StepCondition {
    fn holds(self, ctx: &WorkflowContext) -> bool {
        match self {
            StepCondition::DatasetsRegistered => ctx.dataset_count > 0,
            StepCondition::ToolSelected => ctx.selected_tool.is_some(),
            StepCondition::JobCompleted => ctx.completed_jobs > 0,
            StepCondition::Manual => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub done_when: StepCondition,
}

impl StepDefinition {
    pub fn new(id: &str, title: &str, description: &str, done_when: StepCondition) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            done_when,
        }
    }
}

/// Snapshot of session facts the step conditions read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowContext {
    pub dataset_count: usize,
    pub selected_tool: Option<String>,
    pub completed_jobs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Active,
    Completed,
    Pending,
    Disabled,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Active => "active",
            StepStatus::Completed => "completed",
            StepStatus::Pending => "pending",
            StepStatus::Disabled => "disabled",
        }
    }
}

/// A step with its derived status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub index: usize,
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone)]
pub struct Workflow {
    steps: Vec<StepDefinition>,
    current: usize,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new(vec![
            StepDefinition::new(
                "upload",
                "Upload Data",
                "Upload vector or raster datasets to analyze",
                StepCondition::DatasetsRegistered,
            ),
            StepDefinition::new(
                "tool_select",
                "Select Tool",
                "Choose an analysis tool that fits the selected dataset",
                StepCondition::ToolSelected,
            ),
            StepDefinition::new(
                "run",
                "Run Analysis",
                "Configure parameters and run the analysis",
                StepCondition::JobCompleted,
            ),
            StepDefinition::new(
                "export",
                "Export Results",
                "Review result layers and export them",
                StepCondition::Manual,
            ),
        ])
    }
}

impl Workflow {
    pub fn new(steps: Vec<StepDefinition>) -> Self {
        Self { steps, current: 0 }
    }

    pub fn current_step(&self) -> usize {
        self.current
    }

    pub fn definitions(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn status(&self, index: usize, ctx: &WorkflowContext) -> StepStatus {
        if index == self.current {
            StepStatus::Active
        } else if self.steps.get(index).is_some_and(|s| s.done_when.holds(ctx)) {
            StepStatus::Completed
        } else if self.steps[..index.min(self.steps.len())]
            .iter()
            .all(|s| s.done_when.holds(ctx))
        {
            StepStatus::Pending
        } else {
            StepStatus::Disabled
        }
    }

    pub fn steps(&self, ctx: &WorkflowContext) -> Vec<StepView> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| StepView {
                index,
                id: step.id.clone(),
                title: step.title.clone(),
                description: step.description.clone(),
                status: self.status(index, ctx),
            })
            .collect()
    }

    /// Move to the next step if it is reachable
    pub fn advance(&mut self, ctx: &WorkflowContext) -> Result<usize> {
        let next = self.current + 1;
        if next >= self.steps.len() {
            let from = self
                .steps
                .get(self.current)
                .map_or_else(|| "none".to_string(), |s| s.id.clone());
            return Err(GeoflowError::InvalidTransition {
                subject: "workflow".to_string(),
                from,
                to: "end".to_string(),
            });
        }
        self.enter(next, ctx)
    }

    /// Make any non-disabled step active
    pub fn jump_to(&mut self, index: usize, ctx: &WorkflowContext) -> Result<usize> {
        if index >= self.steps.len() {
            return Err(GeoflowError::OutOfRange {
                field: "step".to_string(),
                value: index as f64,
                min: 0.0,
                max: self.steps.len().saturating_sub(1) as f64,
            });
        }
        self.enter(index, ctx)
    }

    fn enter(&mut self, index: usize, ctx: &WorkflowContext) -> Result<usize> {
        if self.status(index, ctx) == StepStatus::Disabled {
            let unmet = self.steps[..index]
                .iter()
                .find(|s| !s.done_when.holds(ctx))
                .map_or_else(String::new, |s| s.title.clone());
            return Err(GeoflowError::StepUnavailable {
                step: self.steps[index].id.clone(),
                reason: format!("'{}' is not finished", unmet),
            });
        }

        if index != self.current {
            tracing::debug!(from = self.current, to = index, "Workflow step changed");
            self.current = index;
        }
        Ok(self.current)
    }

    /// Advance when the active step's condition is met. Returns whether it moved.
    pub fn advance_if_complete(&mut self, ctx: &WorkflowContext) -> bool {
        let done = self
            .steps
            .get(self.current)
            .is_some_and(|s| s.done_when.holds(ctx));
        done && self.current + 1 < self.steps.len() && self.advance(ctx).is_ok()
    }

    /// Share of steps in `completed` status, as a percentage
    pub fn progress(&self, ctx: &WorkflowContext) -> u8 {
        if self.steps.is_empty() {
            return 0;
        }
        let completed = (0..self.steps.len())
            .filter(|&i| self.status(i, ctx) == StepStatus::Completed)
            .count();
        (completed * 100 / self.steps.len()) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ctx(datasets: usize, tool: Option<&str>, jobs: usize) -> WorkflowContext {
        WorkflowContext {
            dataset_count: datasets,
            selected_tool: tool.map(str::to_string),
            completed_jobs: jobs,
        }
    }

    fn statuses(workflow: &Workflow, ctx: &WorkflowContext) -> Vec<StepStatus> {
        workflow.steps(ctx).into_iter().map(|s| s.status).collect()
    }

    #[test]
    fn test_initial_statuses() {
        let workflow = Workflow::default();
        assert_eq!(
            statuses(&workflow, &ctx(0, None, 0)),
            vec![
                StepStatus::Active,
                StepStatus::Disabled,
                StepStatus::Disabled,
                StepStatus::Disabled
            ]
        );
        assert_eq!(workflow.progress(&ctx(0, None, 0)), 0);
    }

    #[test]
    fn test_upload_then_advance() {
        let mut workflow = Workflow::default();
        let after_upload = ctx(1, None, 0);

        assert!(workflow.advance_if_complete(&after_upload));
        assert_eq!(workflow.current_step(), 1);
        assert_eq!(
            statuses(&workflow, &after_upload),
            vec![
                StepStatus::Completed,
                StepStatus::Active,
                StepStatus::Disabled,
                StepStatus::Disabled
            ]
        );
        assert_eq!(workflow.progress(&after_upload), 25);
    }

    #[test]
    fn test_advance_into_disabled_step_fails() {
        let mut workflow = Workflow::default();
        let err = workflow.advance(&ctx(0, None, 0)).unwrap_err();
        assert!(matches!(err, GeoflowError::StepUnavailable { .. }));
        assert_eq!(workflow.current_step(), 0);
    }

    #[test]
    fn test_advance_past_last_step_fails() {
        let mut workflow = Workflow::default();
        let full = ctx(1, Some("ndvi_analysis"), 1);
        workflow.jump_to(3, &full).unwrap();

        assert!(matches!(
            workflow.advance(&full),
            Err(GeoflowError::InvalidTransition { .. })
        ));
        assert!(!workflow.advance_if_complete(&full));
    }

    #[test]
    fn test_jump_to() {
        let mut workflow = Workflow::default();
        let c = ctx(1, Some("buffer_analysis"), 0);

        assert_eq!(workflow.jump_to(2, &c).unwrap(), 2);
        assert_eq!(workflow.jump_to(0, &c).unwrap(), 0);
        assert!(matches!(
            workflow.jump_to(3, &c),
            Err(GeoflowError::StepUnavailable { .. })
        ));
        assert!(matches!(
            workflow.jump_to(9, &c),
            Err(GeoflowError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_manual_step_never_completes() {
        let workflow = Workflow::default();
        let full = ctx(2, Some("ndvi_analysis"), 3);
        assert_eq!(workflow.status(3, &full), StepStatus::Pending);
        assert_eq!(workflow.progress(&full), 50);
    }

    proptest! {
        #[test]
        fn exactly_one_active_step(
            datasets in 0usize..3,
            tool in any::<bool>(),
            jobs in 0usize..3,
            target in 0usize..4,
        ) {
            let c = ctx(datasets, tool.then_some("ndvi_analysis"), jobs);
            let mut workflow = Workflow::default();
            let _ = workflow.jump_to(target, &c);

            let all = statuses(&workflow, &c);
            prop_assert_eq!(all.iter().filter(|s| **s == StepStatus::Active).count(), 1);
            prop_assert_eq!(all[workflow.current_step()], StepStatus::Active);
        }
    }
}
