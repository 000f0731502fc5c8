use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::geometry::BoundingBox;
use super::job::JobId;
use crate::error::{GeoflowError, Result};

/// Unique identifier for a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DatasetId(pub u64);

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Semantic kind of a dataset, used for tool compatibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Vector,
    Raster,
    Satellite,
}

impl DatasetKind {
    /// Infer kind and format name from a file extension (without the dot)
    pub fn from_extension(extension: &str) -> Option<(DatasetKind, &'static str)> {
        match extension.to_lowercase().as_str() {
            "geojson" => Some((DatasetKind::Vector, "GeoJSON")),
            "shp" => Some((DatasetKind::Vector, "Shapefile")),
            "kml" => Some((DatasetKind::Vector, "KML")),
            "gpx" => Some((DatasetKind::Vector, "GPX")),
            "tif" | "tiff" => Some((DatasetKind::Raster, "GeoTIFF")),
            "jpg" | "jpeg" => Some((DatasetKind::Satellite, "JPEG")),
            "png" => Some((DatasetKind::Satellite, "PNG")),
            _ => None,
        }
    }

    /// Infer kind and format name from a file name, rejecting unknown extensions
    pub fn from_file_name(file_name: &str) -> Result<(DatasetKind, &'static str)> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        Self::from_extension(extension).ok_or_else(|| GeoflowError::UnsupportedFormat {
            file_name: file_name.to_string(),
            extension: extension.to_string(),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Vector => "vector",
            DatasetKind::Raster => "raster",
            DatasetKind::Satellite => "satellite",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a dataset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "job_id")]
pub enum DatasetOrigin {
    Upload,
    Job(JobId),
}

/// Metadata of an uploaded file, as handed to the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMeta {
    pub file_name: String,
    pub size_bytes: u64,
    /// Location returned by the storage backend, if the bytes were persisted
    pub url: Option<String>,
}

impl FileMeta {
    pub fn new(file_name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            file_name: file_name.into(),
            size_bytes,
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// File name with its final extension stripped
    pub fn display_name(&self) -> String {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file_name)
            .to_string()
    }
}

/// A registered dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Unique identifier
    pub id: DatasetId,

    /// Display name
    pub name: String,

    /// Semantic kind
    pub kind: DatasetKind,

    /// Source format (e.g. "GeoJSON", "GeoTIFF")
    pub format: String,

    /// Size of the uploaded file
    pub size_bytes: u64,

    /// When the dataset was registered
    pub uploaded_at: DateTime<Utc>,

    /// Whether the dataset is shown on the map
    pub visible: bool,

    /// Extent of the dataset
    pub bbox: Option<BoundingBox>,

    /// Storage location
    pub url: Option<String>,

    pub origin: DatasetOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_extensions() {
        for name in ["parcels.geojson", "roads.shp", "pois.kml", "track.gpx"] {
            let (kind, _) = DatasetKind::from_file_name(name).unwrap();
            assert_eq!(kind, DatasetKind::Vector, "{}", name);
        }
    }

    #[test]
    fn test_raster_and_satellite_extensions() {
        assert_eq!(DatasetKind::from_file_name("dem.tif").unwrap().0, DatasetKind::Raster);
        assert_eq!(DatasetKind::from_file_name("dem.TIFF").unwrap().0, DatasetKind::Raster);
        assert_eq!(
            DatasetKind::from_file_name("scene.jpeg").unwrap().0,
            DatasetKind::Satellite
        );
        assert_eq!(
            DatasetKind::from_file_name("scene.png").unwrap(),
            (DatasetKind::Satellite, "PNG")
        );
    }

    #[test]
    fn test_unsupported_extensions() {
        for name in ["notes.pdf", "data.json", "archive.zip", "noextension"] {
            let err = DatasetKind::from_file_name(name).unwrap_err();
            assert!(matches!(err, GeoflowError::UnsupportedFormat { .. }), "{}", name);
        }
    }

    #[test]
    fn test_display_name_strips_extension() {
        assert_eq!(FileMeta::new("parcels.geojson", 10).display_name(), "parcels");
        assert_eq!(FileMeta::new("city.roads.shp", 10).display_name(), "city.roads");
    }
}
