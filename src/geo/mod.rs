//! Coordinate reference systems.
//!
//! [`resolve`] turns a geo-key directory into a transform to WGS84 and
//! [`reproject`] applies it to a raster's native bounding box.

mod bounds;
mod projection;

pub use bounds::{reproject, GeoBounds};
pub use projection::{
    angular_unit_factor, linear_unit_factor, resolve, ProjectionTransform, ResolvedProjection,
    WGS84_DEFINITION,
};

use crate::error::ProjectionError;
use crate::format::DecodedGeoTiff;

/// Resolve the CRS of a decoded GeoTIFF and reproject its bounds.
pub fn wgs84_bounds(decoded: &DecodedGeoTiff) -> Result<GeoBounds, ProjectionError> {
    let resolved = resolve(&decoded.geo_keys)?;
    reproject(&decoded.native_box, &resolved.transform, resolved.unit_scale)
}
