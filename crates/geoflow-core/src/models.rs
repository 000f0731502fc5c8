pub mod dataset;
pub mod export;
pub mod geometry;
pub mod job;
pub mod layer;
pub mod tier;
pub mod tool;

pub use dataset::{Dataset, DatasetId, DatasetKind, DatasetOrigin, FileMeta};
pub use export::ExportFormat;
pub use geometry::{deterministic_bounds, BoundingBox, MapView};
pub use job::{AnalysisJob, JobId, JobStatus, ParamValue, Parameters};
pub use layer::{LayerId, LayerOrigin, LayerSource, MapLayer};
pub use tier::Tier;
pub use tool::{ParameterKind, ParameterSpec, ToolDescriptor};
