//! Export of the visible layer stack.
//!
//! GeoJSON is encoded for real. Every other catalog format produces a
//! manifest of what the file would contain.

use geoflow_core::models::{ExportFormat, LayerId, LayerOrigin, MapLayer};
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use serde::Serialize;

const GEOJSON_FORMAT: &str = "geojson";
const FILE_STEM: &str = "geoflow-export";

/// Content produced for an export
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExportPayload {
    GeoJson(FeatureCollection),
    Simulated {
        format: String,
        layers: Vec<LayerId>,
        simulated: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub payload: ExportPayload,
}

impl ExportArtifact {
    /// Number of layers written
    pub fn layer_count(&self) -> usize {
        match &self.payload {
            ExportPayload::GeoJson(collection) => collection.features.len(),
            ExportPayload::Simulated { layers, .. } => layers.len(),
        }
    }
}

/// Export the visible data and result layers in `format`
pub fn render(format: ExportFormat, layers: &[MapLayer]) -> ExportArtifact {
    let payload = if format.id == GEOJSON_FORMAT {
        ExportPayload::GeoJson(feature_collection(layers))
    } else {
        ExportPayload::Simulated {
            format: format.id.clone(),
            layers: layers
                .iter()
                .filter(|l| l.visible && l.origin != LayerOrigin::Base)
                .map(|l| l.id.clone())
                .collect(),
            simulated: true,
        }
    };

    ExportArtifact {
        file_name: format.file_name(FILE_STEM),
        format,
        payload,
    }
}

/// Visible data and result layers as bbox polygons, in rendering order.
///
/// Base layers and layers without an extent are skipped.
pub fn feature_collection(layers: &[MapLayer]) -> FeatureCollection {
    let features = layers
        .iter()
        .filter(|l| l.visible && l.origin != LayerOrigin::Base)
        .filter_map(layer_feature)
        .collect();

    FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    }
}

fn layer_feature(layer: &MapLayer) -> Option<Feature> {
    let bbox = layer.bbox?;
    let ring = bbox
        .exterior_ring()
        .into_iter()
        .map(|[x, y]| vec![x, y])
        .collect();

    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), JsonValue::from(layer.name.clone()));
    properties.insert("origin".to_string(), JsonValue::from(layer.origin.as_str()));
    properties.insert("kind".to_string(), JsonValue::from(layer.kind.as_str()));
    properties.insert("opacity".to_string(), JsonValue::from(layer.opacity));

    Some(Feature {
        geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
        properties: Some(properties),
        id: Some(Id::String(layer.id.to_string())),
        bbox: Some(vec![bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y]),
        foreign_members: None,
    })
}
