//! Static catalogs of analysis tools and export formats
//!
//! Both catalogs are built once at process start and never mutated. The tool
//! catalog answers which tools can run on a dataset; both answer whether a
//! subscription tier may use an entry.

use crate::error::{GeoflowError, Result};
use crate::models::{Dataset, DatasetKind, ExportFormat, ParameterSpec, Tier, ToolDescriptor};

#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ToolCatalog {
    /// Create a catalog from an explicit tool list
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }

    /// The tools shipped with the analysis lab
    pub fn builtin() -> Self {
        use DatasetKind::{Raster, Satellite, Vector};

        let tools = vec![
            tool(
                "ndvi_analysis",
                "NDVI Analysis",
                "Vegetation Analysis",
                "Normalized Difference Vegetation Index analysis for vegetation health monitoring",
                &[Satellite, Raster],
                Tier::Free,
                vec![
                    ParameterSpec::select(
                        "band_combination",
                        "Band Combination",
                        "nir_red",
                        &["nir_red", "custom"],
                    ),
                    ParameterSpec::slider("threshold", "Vegetation Threshold", 0.3, 0.1, 0.8)
                        .required(),
                ],
            ),
            tool(
                "lulc_classification",
                "LULC Classification",
                "Classification",
                "Land Use Land Cover classification using U-Net and Random Forest models",
                &[Raster, Satellite],
                Tier::Premium,
                vec![
                    ParameterSpec::select(
                        "model_type",
                        "Model Type",
                        "unet",
                        &["unet", "random_forest", "deep_learning"],
                    ),
                    ParameterSpec::slider(
                        "confidence_threshold",
                        "Confidence Threshold",
                        0.8,
                        0.5,
                        1.0,
                    ),
                ],
            ),
            tool(
                "urban_change_detection",
                "Urban Change Detection",
                "Change Detection",
                "Detect urban expansion and land use changes over time",
                &[Satellite, Raster],
                Tier::Pro,
                vec![
                    ParameterSpec::select(
                        "time_period",
                        "Time Period",
                        "5_years",
                        &["1_year", "3_years", "5_years", "10_years"],
                    ),
                    ParameterSpec::slider("sensitivity", "Change Sensitivity", 0.6, 0.3, 0.9),
                ],
            ),
            tool(
                "suitability_mapping",
                "Suitability Mapping",
                "Spatial Analysis",
                "Multi-criteria weighted overlay analysis for site suitability",
                &[Vector, Raster],
                Tier::Premium,
                vec![ParameterSpec::json_text(
                    "criteria_weights",
                    "Criteria Weights (JSON)",
                    r#"{"slope": 0.3, "distance_roads": 0.2, "land_cover": 0.5}"#,
                )],
            ),
            tool(
                "object_detection",
                "Object Detection",
                "Object Detection",
                "Detect buildings, roads, and infrastructure from high-resolution imagery",
                &[Satellite, Raster],
                Tier::Pro,
                vec![
                    ParameterSpec::select(
                        "object_type",
                        "Object Type",
                        "buildings",
                        &["buildings", "roads", "water_bodies", "vehicles", "all"],
                    ),
                    ParameterSpec::slider(
                        "detection_confidence",
                        "Detection Confidence",
                        0.7,
                        0.5,
                        0.95,
                    ),
                ],
            ),
            tool(
                "buffer_analysis",
                "Buffer Analysis",
                "Proximity",
                "Creates buffer zones around point, line, or polygon features at specified distances",
                &[Vector],
                Tier::Free,
                vec![
                    ParameterSpec::slider("distance", "Distance (m)", 100.0, 1.0, 50_000.0)
                        .required(),
                    ParameterSpec::slider("segments", "Segments", 5.0, 1.0, 64.0),
                    ParameterSpec::select(
                        "end_cap",
                        "End Cap Style",
                        "round",
                        &["round", "flat", "square"],
                    ),
                ],
            ),
            tool(
                "hotspot_analysis",
                "Hotspot Analysis",
                "Spatial Statistics",
                "Getis-Ord Gi* statistic to find statistically significant clusters",
                &[Vector],
                Tier::Enterprise,
                vec![
                    ParameterSpec::slider(
                        "distance_band",
                        "Distance Band (m)",
                        1000.0,
                        10.0,
                        100_000.0,
                    ),
                    ParameterSpec::select(
                        "confidence",
                        "Confidence Level",
                        "95",
                        &["90", "95", "99"],
                    ),
                ],
            ),
        ];

        Self::new(tools)
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Look up a tool by id
    pub fn get(&self, id: &str) -> Result<&ToolDescriptor> {
        self.tools
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| GeoflowError::ToolNotFound { id: id.to_string() })
    }

    /// Tools able to consume the dataset, or every tool when no dataset is given
    pub fn compatible(&self, dataset: Option<&Dataset>) -> Vec<&ToolDescriptor> {
        match dataset {
            Some(dataset) => self.tools.iter().filter(|t| t.accepts(dataset.kind)).collect(),
            None => self.tools.iter().collect(),
        }
    }

    /// Whether `tier` may run `tool`
    pub fn authorize(&self, tool: &ToolDescriptor, tier: Tier) -> bool {
        tier.satisfies(tool.tier)
    }
}

/// Export formats offered at the end of the workflow
#[derive(Debug, Clone)]
pub struct ExportCatalog {
    formats: Vec<ExportFormat>,
}

impl Default for ExportCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ExportCatalog {
    pub fn new(formats: Vec<ExportFormat>) -> Self {
        Self { formats }
    }

    /// GeoTIFF, Shapefile, GeoJSON and CSV for everyone; PDF reports and
    /// cloud optimized GeoTIFFs from the premium tier up
    pub fn builtin() -> Self {
        Self::new(vec![
            ExportFormat::new(
                "geotiff",
                "GeoTIFF",
                "Georeferenced raster format",
                ".tiff",
                Tier::Free,
            ),
            ExportFormat::new("shapefile", "Shapefile", "ESRI vector format", ".zip", Tier::Free),
            ExportFormat::new(
                "geojson",
                "GeoJSON",
                "Web-friendly vector format",
                ".geojson",
                Tier::Free,
            ),
            ExportFormat::new(
                "csv",
                "CSV with coordinates",
                "Tabular data with spatial coordinates",
                ".csv",
                Tier::Free,
            ),
            ExportFormat::new(
                "pdf_report",
                "PDF Report",
                "Analysis report with maps and statistics",
                ".pdf",
                Tier::Premium,
            ),
            ExportFormat::new(
                "cog",
                "Cloud Optimized GeoTIFF",
                "Web-optimized raster format",
                ".tiff",
                Tier::Premium,
            ),
        ])
    }

    pub fn formats(&self) -> &[ExportFormat] {
        &self.formats
    }

    pub fn get(&self, id: &str) -> Result<&ExportFormat> {
        self.formats
            .iter()
            .find(|f| f.id == id)
            .ok_or_else(|| GeoflowError::ExportFormatNotFound { id: id.to_string() })
    }

    /// Whether `tier` may export in `format`
    pub fn authorize(&self, format: &ExportFormat, tier: Tier) -> bool {
        tier.satisfies(format.tier)
    }
}

fn tool(
    id: &str,
    name: &str,
    category: &str,
    description: &str,
    kinds: &[DatasetKind],
    tier: Tier,
    parameters: Vec<ParameterSpec>,
) -> ToolDescriptor {
    ToolDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        accepted_kinds: kinds.to_vec(),
        tier,
        parameters,
    }
}
