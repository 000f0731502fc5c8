use serde::{Deserialize, Serialize};
use std::fmt;

use super::dataset::{DatasetId, DatasetKind};
use super::geometry::BoundingBox;
use super::job::JobId;

/// Identifier of a map layer (`base:osm`, `data:3`, `result:7`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn base(key: &str) -> Self {
        Self(format!("base:{}", key))
    }

    pub fn data(id: DatasetId) -> Self {
        Self(format!("data:{}", id.0))
    }

    pub fn result(id: JobId) -> Self {
        Self(format!("result:{}", id.0))
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Stacking group of a layer. Groups render in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerOrigin {
    Base,
    Data,
    Result,
}

impl LayerOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerOrigin::Base => "base",
            LayerOrigin::Data => "data",
            LayerOrigin::Result => "result",
        }
    }
}

impl fmt::Display for LayerOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Back-reference to the entity a layer was derived from. Lookup only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum LayerSource {
    None,
    Dataset(DatasetId),
    Job(JobId),
}

/// A renderable entry of the layer stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLayer {
    pub id: LayerId,
    pub name: String,
    pub origin: LayerOrigin,
    pub source: LayerSource,
    /// Data kind used to pick a renderer
    pub kind: DatasetKind,
    pub visible: bool,
    /// Opacity in `[0, 1]`
    pub opacity: f64,
    pub bbox: Option<BoundingBox>,
}
