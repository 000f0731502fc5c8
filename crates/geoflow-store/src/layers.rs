//! Map layer composition.
//!
//! Layers live in three append-only groups (base, data, result). Rendering
//! order is the concatenation of the groups, so the group invariant holds by
//! construction and survives any interleaving of appends and style changes.

use geoflow_core::config::SessionSettings;
use geoflow_core::error::{GeoflowError, Result};
use geoflow_core::models::{
    deterministic_bounds, AnalysisJob, Dataset, DatasetKind, LayerId, LayerOrigin, LayerSource,
    MapLayer, MapView,
};

/// Styling defaults for new layers and view targets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerDefaults {
    pub data_opacity: f64,
    pub result_opacity: f64,
    /// Zoom used by `zoom_to_layer`
    pub feature_zoom: u8,
    /// Zoom used when recentering on a freshly uploaded dataset
    pub upload_zoom: u8,
    pub initial_view: MapView,
}

impl Default for LayerDefaults {
    fn default() -> Self {
        Self::from(&SessionSettings::default())
    }
}

impl From<&SessionSettings> for LayerDefaults {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            data_opacity: settings.data_layer_opacity,
            result_opacity: settings.result_layer_opacity,
            feature_zoom: settings.feature_zoom,
            upload_zoom: settings.upload_zoom,
            initial_view: MapView::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayerStack {
    base: Vec<MapLayer>,
    data: Vec<MapLayer>,
    result: Vec<MapLayer>,
    defaults: LayerDefaults,
    view: MapView,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new(LayerDefaults::default())
    }
}

impl LayerStack {
    /// Create a stack holding the default OpenStreetMap base layer
    pub fn new(defaults: LayerDefaults) -> Self {
        Self::with_base_layers(defaults, &[("osm", "OpenStreetMap")])
    }

    /// Create a stack with explicit `(key, name)` base layers
    pub fn with_base_layers(defaults: LayerDefaults, base_layers: &[(&str, &str)]) -> Self {
        let base = base_layers
            .iter()
            .map(|(key, name)| MapLayer {
                id: LayerId::base(key),
                name: name.to_string(),
                origin: LayerOrigin::Base,
                source: LayerSource::None,
                kind: DatasetKind::Raster,
                visible: true,
                opacity: 1.0,
                bbox: None,
            })
            .collect();

        Self {
            base,
            data: Vec::new(),
            result: Vec::new(),
            view: defaults.initial_view,
            defaults,
        }
    }

    /// Append a data layer for a newly registered dataset and recenter on it
    pub fn on_dataset_registered(&mut self, dataset: &Dataset) -> MapLayer {
        let bbox = dataset.bbox.unwrap_or_else(|| deterministic_bounds(&dataset.name));
        let layer = MapLayer {
            id: LayerId::data(dataset.id),
            name: dataset.name.clone(),
            origin: LayerOrigin::Data,
            source: LayerSource::Dataset(dataset.id),
            kind: dataset.kind,
            visible: true,
            opacity: self.defaults.data_opacity,
            bbox: Some(bbox),
        };

        self.view = MapView {
            center: bbox.center(),
            zoom: self.defaults.upload_zoom,
        };
        self.data.push(layer.clone());

        tracing::debug!(layer_id = %layer.id, "Appended data layer");
        layer
    }

    /// Append a result layer for a completed job, placed over its first input
    pub fn on_job_completed(&mut self, job: &AnalysisJob, input: Option<&Dataset>) -> MapLayer {
        let bbox = input
            .and_then(|d| d.bbox)
            .unwrap_or_else(|| deterministic_bounds(&job.id.to_string()));
        let layer = MapLayer {
            id: LayerId::result(job.id),
            name: format!("{} Result", job.tool_name),
            origin: LayerOrigin::Result,
            source: LayerSource::Job(job.id),
            kind: DatasetKind::Raster,
            visible: true,
            opacity: self.defaults.result_opacity,
            bbox: Some(bbox),
        };
        self.result.push(layer.clone());

        tracing::debug!(layer_id = %layer.id, job_id = job.id.0, "Appended result layer");
        layer
    }

    fn layer_mut(&mut self, id: &LayerId) -> Result<&mut MapLayer> {
        self.base
            .iter_mut()
            .chain(self.data.iter_mut())
            .chain(self.result.iter_mut())
            .find(|l| &l.id == id)
            .ok_or_else(|| GeoflowError::LayerNotFound { id: id.to_string() })
    }

    pub fn get(&self, id: &LayerId) -> Result<&MapLayer> {
        self.iter()
            .find(|l| &l.id == id)
            .ok_or_else(|| GeoflowError::LayerNotFound { id: id.to_string() })
    }

    pub fn set_visibility(&mut self, id: &LayerId, visible: bool) -> Result<MapLayer> {
        let layer = self.layer_mut(id)?;
        layer.visible = visible;
        Ok(layer.clone())
    }

    /// Set opacity; values outside `[0, 1]` leave the layer untouched
    pub fn set_opacity(&mut self, id: &LayerId, opacity: f64) -> Result<MapLayer> {
        let layer = self.layer_mut(id)?;
        if !(0.0..=1.0).contains(&opacity) {
            return Err(GeoflowError::OutOfRange {
                field: "opacity".to_string(),
                value: opacity,
                min: 0.0,
                max: 1.0,
            });
        }
        layer.opacity = opacity;
        Ok(layer.clone())
    }

    /// Center the view on a layer's extent at the feature zoom.
    ///
    /// Layers without an extent (base layers) leave the view unchanged.
    pub fn zoom_to_layer(&mut self, id: &LayerId) -> Result<MapView> {
        let bbox = self.get(id)?.bbox;
        if let Some(bbox) = bbox {
            self.view = MapView {
                center: bbox.center(),
                zoom: self.defaults.feature_zoom,
            };
        }
        Ok(self.view)
    }

    pub fn view(&self) -> MapView {
        self.view
    }

    fn iter(&self) -> impl Iterator<Item = &MapLayer> {
        self.base.iter().chain(self.data.iter()).chain(self.result.iter())
    }

    /// Base layers, then data layers, then result layers, each in append order
    pub fn ordered_layers(&self) -> Vec<MapLayer> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.base.len() + self.data.len() + self.result.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use geoflow_core::models::{DatasetId, DatasetOrigin, JobId, Parameters};

    fn dataset(id: u64, name: &str) -> Dataset {
        Dataset {
            id: DatasetId(id),
            name: name.to_string(),
            kind: DatasetKind::Vector,
            format: "GeoJSON".to_string(),
            size_bytes: 1,
            uploaded_at: Utc::now(),
            visible: true,
            bbox: Some(deterministic_bounds(name)),
            url: None,
            origin: DatasetOrigin::Upload,
        }
    }

    #[test]
    fn test_starts_with_base_layer() {
        let stack = LayerStack::default();
        let layers = stack.ordered_layers();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].id, LayerId::base("osm"));
        assert_eq!(layers[0].opacity, 1.0);
        assert_eq!(stack.view(), MapView::default());
    }

    #[test]
    fn test_data_layer_defaults_and_recenter() {
        let mut stack = LayerStack::default();
        let ds = dataset(0, "parcels");
        let layer = stack.on_dataset_registered(&ds);

        assert_eq!(layer.opacity, 0.8);
        assert!(layer.visible);
        assert_eq!(layer.source, LayerSource::Dataset(DatasetId(0)));
        assert_eq!(stack.view().zoom, 10);
        assert_eq!(stack.view().center, deterministic_bounds("parcels").center());
    }

    #[test]
    fn test_result_layer_uses_input_extent() {
        let mut stack = LayerStack::default();
        let ds = dataset(0, "scene");
        let job = AnalysisJob::new(
            JobId(3),
            "ndvi_analysis",
            "NDVI Analysis",
            vec![ds.id],
            Parameters::new(),
        );

        let layer = stack.on_job_completed(&job, Some(&ds));
        assert_eq!(layer.name, "NDVI Analysis Result");
        assert_eq!(layer.opacity, 0.7);
        assert_eq!(layer.bbox, ds.bbox);
        assert_eq!(layer.id, LayerId::result(JobId(3)));
    }

    #[test]
    fn test_opacity_out_of_range_is_rejected() {
        let mut stack = LayerStack::default();
        let layer = stack.on_dataset_registered(&dataset(0, "parcels"));

        let err = stack.set_opacity(&layer.id, 1.5).unwrap_err();
        assert!(matches!(err, GeoflowError::OutOfRange { .. }));
        assert!(stack.set_opacity(&layer.id, f64::NAN).is_err());
        assert_eq!(stack.get(&layer.id).unwrap().opacity, 0.8);

        let updated = stack.set_opacity(&layer.id, 0.25).unwrap();
        assert_eq!(updated.opacity, 0.25);
        assert_eq!(updated.origin, LayerOrigin::Data);
        assert_eq!(updated.source, layer.source);
    }

    #[test]
    fn test_unknown_layer() {
        let mut stack = LayerStack::default();
        assert!(matches!(
            stack.set_visibility(&LayerId::from("data:42"), false),
            Err(GeoflowError::LayerNotFound { .. })
        ));
    }

    #[test]
    fn test_zoom_to_layer() {
        let mut stack = LayerStack::default();
        let layer = stack.on_dataset_registered(&dataset(0, "parcels"));

        let view = stack.zoom_to_layer(&layer.id).unwrap();
        assert_eq!(view.zoom, 12);
        assert_eq!(view.center, layer.bbox.unwrap().center());

        // Base layers carry no extent
        let unchanged = stack.zoom_to_layer(&LayerId::base("osm")).unwrap();
        assert_eq!(unchanged, view);
    }
}
