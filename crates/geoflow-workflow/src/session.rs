//! One user's analysis session.
//!
//! The session is the single writer over the registry, the selection, the job
//! queue, the layer stack and the workflow. Everything presentation needs is
//! exposed as a read projection; the workflow context is rebuilt from live
//! state on every call.

use geoflow_core::config::SessionSettings;
use geoflow_core::error::{GeoflowError, Result};
use geoflow_core::models::{
    deterministic_bounds, AnalysisJob, Dataset, DatasetId, DatasetKind, DatasetOrigin,
    ExportFormat, FileMeta, JobId, JobStatus, LayerId, MapLayer, MapView, Parameters,
    ToolDescriptor,
};
use geoflow_core::ports::{
    AnalysisExecutor, StaticSubscription, SubscriptionProvider, UploadMeta, UploadStore,
};
use geoflow_core::{ExportCatalog, ToolCatalog};
use geoflow_store::{DatasetRegistry, LayerDefaults, LayerStack, MemoryUploadStore};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::executor::SimulatedExecutor;
use crate::export::{self, ExportArtifact};
use crate::jobs::{JobEvent, JobQueue};
use crate::workflow::{StepView, Workflow, WorkflowContext};

pub struct Session {
    registry: DatasetRegistry,
    layers: LayerStack,
    queue: JobQueue,
    exports: ExportCatalog,
    workflow: Workflow,
    storage: Arc<dyn UploadStore>,
    subscription: Arc<dyn SubscriptionProvider>,
    selected_dataset: Option<DatasetId>,
    selected_tool: Option<String>,
    /// Completed jobs already turned into datasets and result layers
    promoted: HashSet<JobId>,
}

impl Session {
    pub fn new(
        settings: &SessionSettings,
        catalog: ToolCatalog,
        storage: Arc<dyn UploadStore>,
        executor: Arc<dyn AnalysisExecutor>,
        subscription: Arc<dyn SubscriptionProvider>,
    ) -> Self {
        let registry = DatasetRegistry::new();
        let queue = JobQueue::new(catalog, registry.clone(), executor)
            .with_timeout(settings.job_timeout);

        Self {
            registry,
            layers: LayerStack::new(LayerDefaults::from(settings)),
            queue,
            exports: ExportCatalog::builtin(),
            workflow: Workflow::default(),
            storage,
            subscription,
            selected_dataset: None,
            selected_tool: None,
            promoted: HashSet::new(),
        }
    }

    /// A session backed by in-memory storage, the simulated executor and the
    /// configured tier
    pub fn in_memory(settings: &SessionSettings) -> Self {
        Self::new(
            settings,
            ToolCatalog::builtin(),
            Arc::new(MemoryUploadStore::new()),
            Arc::new(SimulatedExecutor::new(settings.progress_interval)),
            Arc::new(StaticSubscription(settings.user_tier)),
        )
    }

    pub fn with_workflow(mut self, workflow: Workflow) -> Self {
        self.workflow = workflow;
        self
    }

    fn context(&self) -> WorkflowContext {
        WorkflowContext {
            dataset_count: self.registry.len(),
            selected_tool: self.selected_tool.clone(),
            completed_jobs: self.queue.completed_count(),
        }
    }

    fn advance_workflow(&mut self) {
        let ctx = self.context();
        if self.workflow.advance_if_complete(&ctx) {
            tracing::debug!(step = self.workflow.current_step(), "Workflow advanced");
        }
    }

    // Datasets

    /// Store, register and display an uploaded file.
    ///
    /// Unsupported formats are rejected before anything reaches storage.
    pub async fn upload(&mut self, file_name: &str, bytes: &[u8]) -> Result<Dataset> {
        DatasetKind::from_file_name(file_name)?;

        let meta = UploadMeta {
            file_name: file_name.to_string(),
            content_length: bytes.len() as u64,
        };
        let url = self.storage.put(bytes, &meta).await?;

        let dataset = self
            .registry
            .register(FileMeta::new(file_name, meta.content_length).with_url(url))?;
        self.layers.on_dataset_registered(&dataset);

        if self.selected_dataset.is_none() {
            self.selected_dataset = Some(dataset.id);
        }
        self.advance_workflow();

        Ok(dataset)
    }

    /// Select the dataset tools run on. A selected tool that cannot consume it
    /// is deselected.
    pub fn select_dataset(&mut self, id: DatasetId) -> Result<Dataset> {
        let dataset = self.registry.get(id)?;
        self.selected_dataset = Some(id);

        let incompatible = self
            .selected_tool()
            .is_some_and(|t| !t.accepts(dataset.kind));
        if incompatible {
            tracing::debug!(dataset_id = id.0, "Deselecting incompatible tool");
            self.selected_tool = None;
        }
        self.advance_workflow();
        Ok(dataset)
    }

    pub fn selected_dataset(&self) -> Option<Dataset> {
        self.selected_dataset.and_then(|id| self.registry.get(id).ok())
    }

    pub fn datasets(&self) -> Vec<Dataset> {
        self.registry.list(None)
    }

    /// Toggle a dataset and its layer together
    pub fn set_dataset_visibility(&mut self, id: DatasetId, visible: bool) -> Result<Dataset> {
        let dataset = self.registry.set_visible(id, visible)?;
        let layer_id = match dataset.origin {
            DatasetOrigin::Upload => LayerId::data(id),
            DatasetOrigin::Job(job_id) => LayerId::result(job_id),
        };
        self.layers.set_visibility(&layer_id, visible)?;
        Ok(dataset)
    }

    // Tools

    /// Tools able to consume the selected dataset
    pub fn compatible_tools(&self) -> Vec<ToolDescriptor> {
        let dataset = self.selected_dataset();
        self.queue
            .catalog()
            .compatible(dataset.as_ref())
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn select_tool(&mut self, tool_id: &str) -> Result<ToolDescriptor> {
        let tool = self.queue.catalog().get(tool_id)?.clone();
        let dataset = self
            .selected_dataset()
            .ok_or_else(|| GeoflowError::validation("dataset", "select a dataset first"))?;

        if !tool.accepts(dataset.kind) {
            return Err(GeoflowError::validation(
                "tool",
                format!(
                    "{} does not accept {} dataset '{}'",
                    tool.name, dataset.kind, dataset.name
                ),
            ));
        }

        self.selected_tool = Some(tool.id.clone());
        self.advance_workflow();
        Ok(tool)
    }

    pub fn selected_tool(&self) -> Option<ToolDescriptor> {
        self.selected_tool
            .as_deref()
            .and_then(|id| self.queue.catalog().get(id).ok())
            .cloned()
    }

    // Jobs

    /// Run the selected tool on the selected dataset at the current tier
    pub async fn submit(&mut self, parameters: &Parameters) -> Result<AnalysisJob> {
        let tool_id = self
            .selected_tool
            .clone()
            .ok_or_else(|| GeoflowError::validation("tool", "no tool selected"))?;
        let dataset_id = self
            .selected_dataset
            .ok_or_else(|| GeoflowError::validation("dataset", "no dataset selected"))?;
        let tier = self.subscription.current_tier();

        self.queue
            .submit(&tool_id, &[dataset_id], parameters, tier)
            .await
    }

    pub fn cancel(&mut self, id: JobId) -> Result<AnalysisJob> {
        self.queue.cancel(id)
    }

    pub async fn retry(&mut self, id: JobId) -> Result<AnalysisJob> {
        self.queue.retry(id).await
    }

    /// Wait for a job to finish, then fold its outcome into the session
    pub async fn wait(&mut self, id: JobId) -> Result<AnalysisJob> {
        let job = self.queue.wait(id).await?;
        self.sync();
        Ok(job)
    }

    /// Jobs with the given status (or all), most recent first
    pub fn jobs(&self, status: Option<JobStatus>) -> Vec<AnalysisJob> {
        self.queue.list(status)
    }

    pub fn job(&self, id: JobId) -> Result<AnalysisJob> {
        self.queue.get(id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.queue.subscribe()
    }

    /// Promote newly completed jobs into result datasets and layers.
    ///
    /// Each job is promoted at most once. Returns the layers added.
    pub fn sync(&mut self) -> Vec<MapLayer> {
        let mut completed: Vec<AnalysisJob> = self
            .queue
            .list(Some(JobStatus::Completed))
            .into_iter()
            .filter(|j| !self.promoted.contains(&j.id))
            .collect();
        completed.reverse();

        let mut added = Vec::with_capacity(completed.len());
        for job in completed {
            let input = job
                .dataset_ids
                .first()
                .and_then(|id| self.registry.get(*id).ok());
            let bbox = input
                .as_ref()
                .and_then(|d| d.bbox)
                .unwrap_or_else(|| deterministic_bounds(&job.id.to_string()));

            self.registry.promote(&job, Some(bbox));
            added.push(self.layers.on_job_completed(&job, input.as_ref()));
            self.promoted.insert(job.id);
        }

        if !added.is_empty() {
            self.advance_workflow();
        }
        added
    }

    // Layers

    pub fn ordered_layers(&self) -> Vec<MapLayer> {
        self.layers.ordered_layers()
    }

    pub fn set_layer_visibility(&mut self, id: &LayerId, visible: bool) -> Result<MapLayer> {
        self.layers.set_visibility(id, visible)
    }

    pub fn set_layer_opacity(&mut self, id: &LayerId, opacity: f64) -> Result<MapLayer> {
        self.layers.set_opacity(id, opacity)
    }

    pub fn zoom_to_layer(&mut self, id: &LayerId) -> Result<MapView> {
        self.layers.zoom_to_layer(id)
    }

    pub fn view(&self) -> MapView {
        self.layers.view()
    }

    pub fn export_formats(&self) -> &[ExportFormat] {
        self.exports.formats()
    }

    /// Look up an export format and check the current tier may use it
    pub fn export_format(&self, format_id: &str) -> Result<ExportFormat> {
        let format = self.exports.get(format_id)?;
        let tier = self.subscription.current_tier();
        if !self.exports.authorize(format, tier) {
            return Err(GeoflowError::PremiumRequired {
                feature: format.name.clone(),
                required: format.tier,
                actual: tier,
            });
        }
        Ok(format.clone())
    }

    /// Export the visible data and result layers.
    ///
    /// The tier is checked before anything is produced.
    pub fn export(&self, format_id: &str) -> Result<ExportArtifact> {
        let format = self.export_format(format_id)?;
        let artifact = export::render(format, &self.layers.ordered_layers());
        tracing::info!(
            format = %artifact.format.id,
            layers = artifact.layer_count(),
            "Exported layers"
        );
        Ok(artifact)
    }

    // Workflow

    pub fn steps(&self) -> Vec<StepView> {
        self.workflow.steps(&self.context())
    }

    pub fn current_step(&self) -> usize {
        self.workflow.current_step()
    }

    pub fn workflow_progress(&self) -> u8 {
        self.workflow.progress(&self.context())
    }

    pub fn advance(&mut self) -> Result<usize> {
        let ctx = self.context();
        self.workflow.advance(&ctx)
    }

    pub fn jump_to(&mut self, index: usize) -> Result<usize> {
        let ctx = self.context();
        self.workflow.jump_to(index, &ctx)
    }
}
