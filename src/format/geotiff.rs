//! GeoTIFF decoding.
//!
//! [`decode`] turns a complete in-memory GeoTIFF into typed bands, the
//! raster's bounding box in native CRS units and its geo-key directory.
//! Only the first image of the file is read.

use tracing::debug;

use crate::error::{DecodeError, TiffError};
use crate::raster::RasterImage;

use super::geokeys::GeoKeyDirectory;
use super::tiff::{read_bands, Ifd, TiffHeader, TiffTag, ValueReader};

// =============================================================================
// Types
// =============================================================================

/// Raster extent in native CRS units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeBoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl NativeBoundingBox {
    /// Smallest box containing every point.
    fn enclosing(points: &[(f64, f64)]) -> Self {
        points.iter().fold(
            Self {
                min_x: f64::INFINITY,
                min_y: f64::INFINITY,
                max_x: f64::NEG_INFINITY,
                max_y: f64::NEG_INFINITY,
            },
            |acc, &(x, y)| Self {
                min_x: acc.min_x.min(x),
                min_y: acc.min_y.min(y),
                max_x: acc.max_x.max(x),
                max_y: acc.max_y.max(y),
            },
        )
    }
}

/// Output of [`decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGeoTiff {
    pub raster: RasterImage,
    pub native_box: NativeBoundingBox,
    pub geo_keys: GeoKeyDirectory,
    /// GDAL no-data marker, when present
    pub no_data: Option<f64>,
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a GeoTIFF held entirely in memory.
///
/// # Errors
/// - `Malformed` for anything that is not a structurally valid TIFF,
///   including truncated input
/// - `UnsupportedSampleFormat` / `UnsupportedCompression` for bands outside
///   the numeric model
/// - `MissingGeoTags` when the geo-key directory or georeferencing is absent
pub fn decode(bytes: &[u8]) -> Result<DecodedGeoTiff, DecodeError> {
    let header = TiffHeader::parse(bytes)?;
    let ifd = Ifd::parse(bytes, &header, header.first_ifd_offset)?;
    let reader = ValueReader::new(bytes, &header);

    // Geo tags are checked before the pixel data so a plain TIFF fails fast
    let geo_keys = read_geo_keys(&reader, &ifd)?;
    let georeference = read_georeference(&reader, &ifd)?;

    let raster = read_bands(bytes, &header, &ifd)?;
    let native_box =
        NativeBoundingBox::enclosing(&georeference.corners(raster.width(), raster.height()));

    let no_data = ifd
        .get_entry_by_tag(TiffTag::GdalNoData)
        .map(|entry| reader.read_string(entry))
        .transpose()?
        .and_then(|s| s.trim().parse::<f64>().ok());

    debug!(
        width = raster.width(),
        height = raster.height(),
        bands = raster.band_count(),
        geo_keys = geo_keys.len(),
        min_x = native_box.min_x,
        min_y = native_box.min_y,
        max_x = native_box.max_x,
        max_y = native_box.max_y,
        "decoded GeoTIFF"
    );

    Ok(DecodedGeoTiff {
        raster,
        native_box,
        geo_keys,
        no_data,
    })
}

fn read_geo_keys(reader: &ValueReader<'_>, ifd: &Ifd) -> Result<GeoKeyDirectory, DecodeError> {
    let directory = ifd
        .get_entry_by_tag(TiffTag::GeoKeyDirectory)
        .ok_or(DecodeError::MissingGeoTags("GeoKeyDirectory"))?;
    let directory = reader.read_u16_array(directory)?;

    let doubles = match ifd.get_entry_by_tag(TiffTag::GeoDoubleParams) {
        Some(entry) => reader.read_f64_array(entry)?,
        None => Vec::new(),
    };
    let ascii = match ifd.get_entry_by_tag(TiffTag::GeoAsciiParams) {
        Some(entry) => reader.read_string(entry)?,
        None => String::new(),
    };

    GeoKeyDirectory::parse(&directory, &doubles, &ascii)
}

/// How raster pixel coordinates map to model coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Georeference {
    /// Model coordinate of pixel (0, 0) and the pixel size
    TiePoint {
        origin_x: f64,
        origin_y: f64,
        scale_x: f64,
        scale_y: f64,
    },
    /// Row-major 4x4 raster-to-model matrix
    Matrix([f64; 16]),
}

impl Georeference {
    /// Model coordinates of the four raster corners.
    fn corners(&self, width: u32, height: u32) -> [(f64, f64); 4] {
        let (w, h) = (width as f64, height as f64);
        match *self {
            Georeference::TiePoint {
                origin_x,
                origin_y,
                scale_x,
                scale_y,
            } => {
                let far_x = origin_x + scale_x * w;
                let far_y = origin_y - scale_y * h;
                [
                    (origin_x, origin_y),
                    (far_x, origin_y),
                    (origin_x, far_y),
                    (far_x, far_y),
                ]
            }
            Georeference::Matrix(m) => {
                let apply = |i: f64, j: f64| (m[0] * i + m[1] * j + m[3], m[4] * i + m[5] * j + m[7]);
                [apply(0.0, 0.0), apply(w, 0.0), apply(0.0, h), apply(w, h)]
            }
        }
    }
}

/// Read the georeferencing tags.
///
/// Tie point + pixel scale takes precedence over a transformation matrix
/// when both are present.
fn read_georeference(reader: &ValueReader<'_>, ifd: &Ifd) -> Result<Georeference, DecodeError> {
    let tiepoint = ifd.get_entry_by_tag(TiffTag::ModelTiepoint);
    let scale = ifd.get_entry_by_tag(TiffTag::ModelPixelScale);

    if let (Some(tiepoint), Some(scale)) = (tiepoint, scale) {
        let tiepoint = reader.read_f64_array(tiepoint)?;
        let scale = reader.read_f64_array(scale)?;
        let t = first_n::<6>(&tiepoint, TiffTag::ModelTiepoint)?;
        let s = first_n::<2>(&scale, TiffTag::ModelPixelScale)?;

        // t = [I, J, K, X, Y, Z]
        return Ok(Georeference::TiePoint {
            origin_x: t[3] - t[0] * s[0],
            origin_y: t[4] + t[1] * s[1],
            scale_x: s[0],
            scale_y: s[1],
        });
    }

    if let Some(entry) = ifd.get_entry_by_tag(TiffTag::ModelTransformation) {
        let matrix = reader.read_f64_array(entry)?;
        return Ok(Georeference::Matrix(*first_n::<16>(
            &matrix,
            TiffTag::ModelTransformation,
        )?));
    }

    Err(DecodeError::MissingGeoTags(
        "ModelPixelScale + ModelTiepoint or ModelTransformation",
    ))
}

fn first_n<const N: usize>(values: &[f64], tag: TiffTag) -> Result<&[f64; N], TiffError> {
    values
        .get(..N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| TiffError::InvalidTagValue {
            tag: tag.name(),
            message: format!("expected at least {} values, got {}", N, values.len()),
        })
}
