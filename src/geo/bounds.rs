//! Native bounding box to WGS84 bounds.

use serde::{Deserialize, Serialize};

use crate::error::ProjectionError;
use crate::format::NativeBoundingBox;

use super::projection::ProjectionTransform;

/// WGS84 bounding rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBounds {
    /// Bounds spanned by two `(lng, lat)` points, whatever their order.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            north: a.1.max(b.1),
            south: a.1.min(b.1),
            east: a.0.max(b.0),
            west: a.0.min(b.0),
        }
    }
}

/// Reproject the south-west and north-east corners of `native` to WGS84.
///
/// Raw coordinates are multiplied by `unit_scale` before the transform.
pub fn reproject(
    native: &NativeBoundingBox,
    transform: &ProjectionTransform,
    unit_scale: f64,
) -> Result<GeoBounds, ProjectionError> {
    let south_west = transform.forward(native.min_x * unit_scale, native.min_y * unit_scale)?;
    let north_east = transform.forward(native.max_x * unit_scale, native.max_y * unit_scale)?;
    Ok(GeoBounds::from_corners(south_west, north_east))
}
