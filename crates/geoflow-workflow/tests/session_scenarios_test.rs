//! End-to-end session scenarios

use geoflow_core::config::SessionSettings;
use geoflow_core::models::{
    DatasetKind, JobStatus, LayerOrigin, ParamValue, Parameters, Tier,
};
use geoflow_core::{ErrorKind, GeoflowError};
use geoflow_workflow::{ExportPayload, Session, StepStatus};
use std::time::Duration;

fn session(tier: Tier) -> Session {
    let settings = SessionSettings {
        user_tier: tier,
        progress_interval: Duration::ZERO,
        ..SessionSettings::default()
    };
    Session::in_memory(&settings)
}

fn threshold(value: f64) -> Parameters {
    let mut params = Parameters::new();
    params.insert("threshold".to_string(), ParamValue::Number(value));
    params
}

#[tokio::test]
async fn test_upload_vector_completes_first_step() {
    let mut session = session(Tier::Free);
    let dataset = session.upload("parcels.geojson", b"{}").await.unwrap();

    assert_eq!(dataset.kind, DatasetKind::Vector);
    assert_eq!(session.datasets().len(), 1);

    let steps = session.steps();
    assert_eq!(steps[0].status, StepStatus::Completed);
    assert_eq!(steps[1].status, StepStatus::Active);
    assert_eq!(session.workflow_progress(), 25);
}

#[tokio::test]
async fn test_pro_tool_on_free_tier_is_rejected() {
    let mut session = session(Tier::Free);
    session.upload("city.tif", b"II*").await.unwrap();
    session.select_tool("object_detection").unwrap();

    let err = session.submit(&Parameters::new()).await.unwrap_err();
    assert!(matches!(err, GeoflowError::PremiumRequired { .. }));
    assert_eq!(err.kind(), ErrorKind::PremiumRequired);
    assert!(session.jobs(None).is_empty());
}

#[tokio::test]
async fn test_ndvi_on_raster_produces_one_result_layer() {
    let mut session = session(Tier::Free);
    session.upload("scene.tif", b"II*").await.unwrap();
    session.select_tool("ndvi_analysis").unwrap();

    let job = session.submit(&threshold(0.3)).await.unwrap();
    assert_eq!(job.status, JobStatus::Processing);

    let done = session.wait(job.id).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.progress, 100);

    let results: Vec<_> = session
        .ordered_layers()
        .into_iter()
        .filter(|l| l.origin == LayerOrigin::Result)
        .collect();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "NDVI Analysis Result");
    assert_eq!(results[0].opacity, 0.7);
    assert!(results[0].visible);

    let export = session.export("geojson").unwrap();
    let ExportPayload::GeoJson(collection) = &export.payload else {
        panic!("expected GeoJSON");
    };
    assert_eq!(collection.features.len(), 2);
}

#[tokio::test]
async fn test_parameter_out_of_bounds_creates_no_job() {
    let mut session = session(Tier::Free);
    session.upload("scene.tif", b"II*").await.unwrap();
    session.select_tool("ndvi_analysis").unwrap();

    let err = session.submit(&threshold(0.95)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(session.jobs(None).is_empty());
}

#[tokio::test]
async fn test_layers_stay_grouped_after_results() {
    let mut session = session(Tier::Enterprise);
    session.upload("scene.tif", b"II*").await.unwrap();
    session.select_tool("ndvi_analysis").unwrap();
    let job = session.submit(&threshold(0.4)).await.unwrap();
    session.wait(job.id).await.unwrap();

    // A data layer appended after a result layer still renders below it
    session.upload("later.geojson", b"{}").await.unwrap();

    let origins: Vec<_> = session.ordered_layers().iter().map(|l| l.origin).collect();
    assert_eq!(
        origins,
        vec![
            LayerOrigin::Base,
            LayerOrigin::Data,
            LayerOrigin::Data,
            LayerOrigin::Result
        ]
    );
}

#[tokio::test]
async fn test_zoom_and_opacity_through_session() {
    let mut session = session(Tier::Free);
    let dataset = session.upload("parcels.geojson", b"{}").await.unwrap();
    assert_eq!(session.view().zoom, 10);

    let layer_id = session.ordered_layers()[1].id.clone();
    let view = session.zoom_to_layer(&layer_id).unwrap();
    assert_eq!(view.zoom, 12);
    assert_eq!(Some(view.center), dataset.bbox.map(|b| b.center()));

    let err = session.set_layer_opacity(&layer_id, 1.5).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
    assert_eq!(session.ordered_layers()[1].opacity, 0.8);
}

#[tokio::test]
async fn test_free_tier_cannot_export_pdf_report() {
    let mut session = session(Tier::Free);
    session.upload("parcels.geojson", b"{}").await.unwrap();

    let err = session.export("pdf_report").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PremiumRequired);

    let free: Vec<_> = session
        .export_formats()
        .iter()
        .filter(|f| f.tier == Tier::Free)
        .map(|f| f.id.as_str())
        .collect();
    assert_eq!(free, vec!["geotiff", "shapefile", "geojson", "csv"]);
}
