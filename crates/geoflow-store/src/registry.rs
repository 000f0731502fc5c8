//! Append-only registry of uploaded datasets.
//!
//! Uses `RwLock::unwrap()` intentionally: lock poisoning only occurs when
//! another thread panicked while holding the lock, which is an unrecoverable
//! state for an in-memory session.

use chrono::Utc;
use geoflow_core::error::{GeoflowError, Result};
use geoflow_core::models::{
    deterministic_bounds, AnalysisJob, BoundingBox, Dataset, DatasetId, DatasetKind, DatasetOrigin,
    FileMeta,
};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct RegistryState {
    datasets: Vec<Dataset>,
    next_id: u64,
}

impl RegistryState {
    fn allocate_id(&mut self) -> DatasetId {
        let id = DatasetId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Shared handle to the dataset registry. Clones observe the same datasets.
#[derive(Debug, Clone, Default)]
pub struct DatasetRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an uploaded file, inferring its kind from the extension.
    ///
    /// Unsupported extensions are rejected before anything is inserted.
    pub fn register(&self, meta: FileMeta) -> Result<Dataset> {
        let (kind, format) = DatasetKind::from_file_name(&meta.file_name)?;
        let name = meta.display_name();

        let mut state = self.state.write().unwrap();
        let dataset = Dataset {
            id: state.allocate_id(),
            bbox: Some(deterministic_bounds(&name)),
            name,
            kind,
            format: format.to_string(),
            size_bytes: meta.size_bytes,
            uploaded_at: Utc::now(),
            visible: true,
            url: meta.url,
            origin: DatasetOrigin::Upload,
        };
        state.datasets.push(dataset.clone());

        tracing::info!(
            dataset_id = dataset.id.0,
            kind = %dataset.kind,
            format = %dataset.format,
            size_bytes = dataset.size_bytes,
            "Registered dataset"
        );

        Ok(dataset)
    }

    /// Append the output of a completed job as a derived raster dataset
    pub fn promote(&self, job: &AnalysisJob, bbox: Option<BoundingBox>) -> Dataset {
        let mut state = self.state.write().unwrap();
        let dataset = Dataset {
            id: state.allocate_id(),
            name: format!("{} Result", job.tool_name),
            kind: DatasetKind::Raster,
            format: "Analysis Result".to_string(),
            size_bytes: 0,
            uploaded_at: job.completed_at.unwrap_or_else(Utc::now),
            visible: true,
            bbox,
            url: None,
            origin: DatasetOrigin::Job(job.id),
        };
        state.datasets.push(dataset.clone());

        tracing::info!(
            dataset_id = dataset.id.0,
            job_id = job.id.0,
            "Promoted job output to dataset"
        );

        dataset
    }

    /// Toggle dataset visibility
    pub fn set_visible(&self, id: DatasetId, visible: bool) -> Result<Dataset> {
        let mut state = self.state.write().unwrap();
        let dataset = state
            .datasets
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| GeoflowError::DatasetNotFound { id: id.to_string() })?;

        dataset.visible = visible;
        Ok(dataset.clone())
    }

    pub fn get(&self, id: DatasetId) -> Result<Dataset> {
        let state = self.state.read().unwrap();
        state
            .datasets
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| GeoflowError::DatasetNotFound { id: id.to_string() })
    }

    /// Datasets in insertion order, optionally restricted to one kind
    pub fn list(&self, kind: Option<DatasetKind>) -> Vec<Dataset> {
        let state = self.state.read().unwrap();
        state
            .datasets
            .iter()
            .filter(|d| kind.map_or(true, |k| d.kind == k))
            .cloned()
            .collect()
    }

    /// Most recently registered dataset
    pub fn latest(&self) -> Option<Dataset> {
        self.state.read().unwrap().datasets.last().cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap().datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
