//! GeoTIFF decoding.
//!
//! [`tiff`] parses the container and extracts typed bands; [`geokeys`] holds
//! the geo-key directory; [`geotiff::decode`] ties both together and derives
//! the native bounding box.

pub mod geokeys;
pub mod geotiff;
pub mod tiff;

pub use geokeys::{GeoKeyDirectory, GeoKeyValue};
pub use geotiff::{decode, DecodedGeoTiff, NativeBoundingBox};
