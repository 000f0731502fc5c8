//! Catalog compatibility and tier gating

use chrono::Utc;
use geoflow_core::models::{
    Dataset, DatasetId, DatasetKind, DatasetOrigin, ParamValue, Parameters, Tier,
};
use geoflow_core::{GeoflowError, ToolCatalog};
use proptest::prelude::*;

fn dataset(kind: DatasetKind) -> Dataset {
    Dataset {
        id: DatasetId(0),
        name: "sample".to_string(),
        kind,
        format: "GeoTIFF".to_string(),
        size_bytes: 1024,
        uploaded_at: Utc::now(),
        visible: true,
        bbox: None,
        url: None,
        origin: DatasetOrigin::Upload,
    }
}

#[test]
fn test_no_dataset_returns_every_tool() {
    let catalog = ToolCatalog::builtin();
    assert_eq!(catalog.compatible(None).len(), catalog.tools().len());
}

#[test]
fn test_vector_dataset_filters_tools() {
    let catalog = ToolCatalog::builtin();
    let vector = dataset(DatasetKind::Vector);

    let ids: Vec<_> = catalog
        .compatible(Some(&vector))
        .iter()
        .map(|t| t.id.as_str())
        .collect();

    assert!(ids.contains(&"buffer_analysis"));
    assert!(ids.contains(&"suitability_mapping"));
    assert!(!ids.contains(&"ndvi_analysis"));
    assert!(!ids.contains(&"object_detection"));
}

#[test]
fn test_ndvi_accepts_raster_threshold() {
    let catalog = ToolCatalog::builtin();
    let ndvi = catalog.get("ndvi_analysis").unwrap();

    let mut params = Parameters::new();
    params.insert("threshold".to_string(), ParamValue::Number(0.3));

    let resolved = ndvi.validate_parameters(&params).unwrap();
    assert_eq!(resolved.len(), 2);
    assert!(ndvi.accepts(DatasetKind::Raster));
}

#[test]
fn test_suitability_rejects_malformed_weights() {
    let catalog = ToolCatalog::builtin();
    let tool = catalog.get("suitability_mapping").unwrap();

    let mut params = Parameters::new();
    params.insert(
        "criteria_weights".to_string(),
        ParamValue::Text("slope=0.3".to_string()),
    );

    assert!(matches!(
        tool.validate_parameters(&params),
        Err(GeoflowError::Validation { .. })
    ));
}

fn any_kind() -> impl Strategy<Value = DatasetKind> {
    prop_oneof![
        Just(DatasetKind::Vector),
        Just(DatasetKind::Raster),
        Just(DatasetKind::Satellite),
    ]
}

fn any_tier() -> impl Strategy<Value = Tier> {
    prop_oneof![
        Just(Tier::Free),
        Just(Tier::Premium),
        Just(Tier::Pro),
        Just(Tier::Enterprise),
    ]
}

proptest! {
    #[test]
    fn compatible_tools_always_accept_the_kind(kind in any_kind()) {
        let catalog = ToolCatalog::builtin();
        let ds = dataset(kind);
        for tool in catalog.compatible(Some(&ds)) {
            prop_assert!(tool.accepted_kinds.contains(&kind));
        }
    }

    #[test]
    fn authorization_is_monotonic_in_tier(a in any_tier(), b in any_tier()) {
        let catalog = ToolCatalog::builtin();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        for tool in catalog.tools() {
            if catalog.authorize(tool, low) {
                prop_assert!(catalog.authorize(tool, high));
            }
        }
    }
}
