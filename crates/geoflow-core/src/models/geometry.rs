//! Extents and map views.
//!
//! Geometry extraction from uploaded files is out of scope, so extents are
//! placed deterministically from a key (dataset name, job id) instead.

use geo::{coord, Rect};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in WGS 84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_x, y: self.min_y },
            coord! { x: self.max_x, y: self.max_y },
        )
    }

    /// Centroid as `[lng, lat]`
    pub fn center(&self) -> [f64; 2] {
        let center = self.to_rect().center();
        [center.x, center.y]
    }

    /// Closed exterior ring, counter-clockwise, starting at the south-west corner
    pub fn exterior_ring(&self) -> Vec<[f64; 2]> {
        vec![
            [self.min_x, self.min_y],
            [self.max_x, self.min_y],
            [self.max_x, self.max_y],
            [self.min_x, self.max_y],
            [self.min_x, self.min_y],
        ]
    }
}

/// A camera target for the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    /// `[lng, lat]`
    pub center: [f64; 2],
    pub zoom: u8,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: [-95.7129, 37.0902],
            zoom: 4,
        }
    }
}

/// Half-width of a placed extent, in degrees
const PLACEMENT_HALF_SIZE: f64 = 0.1;

/// Place a small extent somewhere over North America, keyed by `key`.
///
/// Same key, same box. Uses a 32-bit rolling hash over UTF-16 code units.
pub fn deterministic_bounds(key: &str) -> BoundingBox {
    let hash = key.encode_utf16().fold(0i32, |acc, unit| {
        acc.wrapping_shl(5).wrapping_sub(acc).wrapping_add(i32::from(unit))
    });

    let base_lat = 40.0 + (f64::from(hash % 1000) / 1000.0) * 20.0;
    let base_lng = -120.0 + (f64::from(hash % 2000) / 2000.0) * 60.0;

    BoundingBox::new(
        base_lng - PLACEMENT_HALF_SIZE,
        base_lat - PLACEMENT_HALF_SIZE,
        base_lng + PLACEMENT_HALF_SIZE,
        base_lat + PLACEMENT_HALF_SIZE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_bounds_is_stable() {
        assert_eq!(deterministic_bounds("parcels"), deterministic_bounds("parcels"));
        assert_ne!(deterministic_bounds("parcels"), deterministic_bounds("roads"));
    }

    #[test]
    fn test_deterministic_bounds_size() {
        let bbox = deterministic_bounds("landsat_scene");
        assert!((bbox.max_x - bbox.min_x - 0.2).abs() < 1e-9);
        assert!((bbox.max_y - bbox.min_y - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_empty_key_places_at_origin_of_range() {
        let [lng, lat] = deterministic_bounds("").center();
        assert!((lng + 120.0).abs() < 1e-9);
        assert!((lat - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_center() {
        let bbox = BoundingBox::new(10.0, 20.0, 12.0, 24.0);
        assert_eq!(bbox.center(), [11.0, 22.0]);
    }

    #[test]
    fn test_exterior_ring_is_closed() {
        let ring = BoundingBox::new(0.0, 0.0, 1.0, 1.0).exterior_ring();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
    }
}
