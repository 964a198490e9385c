//! # Solar Layers
//!
//! Turns solar-potential GeoTIFF rasters into geographically bounded RGBA
//! overlays.
//!
//! A building's data-layers document points at a roof mask plus annual flux,
//! monthly flux and hourly shade rasters. This library decodes those GeoTIFFs,
//! resolves their coordinate reference system, reprojects their bounds to
//! WGS84 and renders them through a color palette, one frame at a time.
//!
//! ## Features
//!
//! - **Native GeoTIFF decoding**: classic TIFF and BigTIFF, strips or tiles,
//!   chunky or planar bands, Deflate with horizontal differencing
//! - **CRS resolution**: EPSG codes and user-defined projections from geo-keys
//! - **Lazy frames**: a layer renders each frame only when asked
//! - **Parallel rendering**: rows are shaded concurrently with rayon
//!
//! ## Architecture
//!
//! - [`io`] - Byte sources (local files, `file://` locations)
//! - [`mod@format`] - TIFF parser, band extraction and geo-key directory
//! - [`raster`] - Typed bands and the named raster store
//! - [`geo`] - CRS resolution and bounding-box reprojection
//! - [`render`] - Palettes, frame rendering and PNG encoding
//! - [`layer`] - Layer kinds, assembly and concurrent loading
//! - [`config`] - CLI and palette configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use solar_layers::{load_layer, LayerKind, LocalRasterSource, PaletteConfig, RenderRequest, SolarLayerUrls};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let urls: SolarLayerUrls = serde_json::from_str(&std::fs::read_to_string("layers.json")?)?;
//!     let source = LocalRasterSource::new(".");
//!
//!     let layer = load_layer(LayerKind::MonthlyFlux, &urls, &source, &PaletteConfig::default()).await?;
//!     for frame in layer.frames(&RenderRequest::roof_only()) {
//!         let frame = frame?;
//!         println!("{}x{}", frame.width(), frame.height());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod geo;
pub mod io;
pub mod layer;
pub mod raster;
pub mod render;

// Re-export commonly used types for convenience
pub use config::{Cli, Command, InspectConfig, PaletteConfig, RenderConfig};
pub use error::{
    DecodeError, GeoTiffError, LoadError, ProjectionError, RasterError, RenderError, SourceError,
    StoreError, TiffError,
};
pub use format::{decode, DecodedGeoTiff, GeoKeyDirectory, NativeBoundingBox};
pub use geo::{resolve, wgs84_bounds, GeoBounds, ProjectionTransform};
pub use io::{LocalRasterSource, RasterSource};
pub use layer::{
    assemble, load_layer, read_geotiff, GeoTiff, LayerDescriptor, LayerKind, LayerSummary,
    PaletteLegend, RenderRequest, SolarLayerUrls,
};
pub use raster::{BandData, RasterImage, RasterStore, SampleType, StoredRaster};
pub use render::{render, PaletteName, PaletteSpec, PngFrameEncoder, RenderParams, Rgb};
