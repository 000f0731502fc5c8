use geoflow_core::models::{
    AnalysisJob, Dataset, MapLayer, MapView, ParameterKind, ParameterSpec, ToolDescriptor,
};
use geoflow_workflow::StepView;
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::Tabled;

/// Output for tools command
#[derive(Debug, Serialize)]
pub struct ToolOutput {
    #[serde(flatten)]
    pub tool: ToolDescriptor,
    /// Whether the active tier may run the tool
    pub available: bool,
}

#[derive(Tabled)]
pub struct ToolRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Accepts")]
    pub accepts: String,
    #[tabled(rename = "Tier")]
    pub tier: String,
    #[tabled(rename = "Available")]
    pub available: String,
}

impl From<&ToolOutput> for ToolRow {
    fn from(output: &ToolOutput) -> Self {
        let tool = &output.tool;
        Self {
            id: tool.id.clone(),
            name: tool.name.clone(),
            category: tool.category.clone(),
            accepts: tool
                .accepted_kinds
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            tier: tool.tier.to_string(),
            available: if output.available { "✓" } else { "✗" }.to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct ParameterRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Label")]
    pub label: String,
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Required")]
    pub required: String,
    #[tabled(rename = "Default")]
    pub default: String,
    #[tabled(rename = "Allowed")]
    pub allowed: String,
}

impl From<&ParameterSpec> for ParameterRow {
    fn from(spec: &ParameterSpec) -> Self {
        let allowed = match &spec.kind {
            ParameterKind::Slider { min, max, .. } => format!("{} to {}", min, max),
            ParameterKind::Select { options, .. } => options.join(" | "),
            ParameterKind::Text { json: true, .. } => "JSON".to_string(),
            ParameterKind::Text { .. } => "text".to_string(),
        };
        Self {
            name: spec.name.clone(),
            label: spec.label.clone(),
            kind: spec.kind.type_name().to_string(),
            required: if spec.required { "yes" } else { "no" }.to_string(),
            default: spec.kind.default_value().to_string(),
            allowed,
        }
    }
}

/// Output for run command
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub datasets: Vec<Dataset>,
    pub job: AnalysisJob,
    pub layers: Vec<MapLayer>,
    pub view: MapView,
    pub steps: Vec<StepView>,
    pub workflow_progress: u8,
    pub export_path: Option<String>,
}

#[derive(Tabled)]
pub struct DatasetRow {
    #[tabled(rename = "ID")]
    pub id: u64,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Format")]
    pub format: String,
    #[tabled(rename = "Size")]
    pub size: u64,
}

impl From<&Dataset> for DatasetRow {
    fn from(dataset: &Dataset) -> Self {
        Self {
            id: dataset.id.0,
            name: dataset.name.clone(),
            kind: dataset.kind.to_string(),
            format: dataset.format.clone(),
            size: dataset.size_bytes,
        }
    }
}

#[derive(Tabled)]
pub struct LayerRow {
    #[tabled(rename = "Layer")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Visible")]
    pub visible: String,
    #[tabled(rename = "Opacity")]
    pub opacity: String,
}

impl From<&MapLayer> for LayerRow {
    fn from(layer: &MapLayer) -> Self {
        Self {
            id: layer.id.to_string(),
            name: layer.name.clone(),
            visible: if layer.visible { "yes" } else { "no" }.to_string(),
            opacity: format!("{:.2}", layer.opacity),
        }
    }
}

#[derive(Tabled)]
pub struct StepRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Step")]
    pub title: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

impl From<&StepView> for StepRow {
    fn from(step: &StepView) -> Self {
        Self {
            index: step.index + 1,
            title: step.title.clone(),
            status: step.status.as_str().to_string(),
        }
    }
}

/// Output for config command
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub values: BTreeMap<String, ConfigEntry>,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub value: String,
    pub source: String,
}
