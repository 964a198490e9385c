//! Raster to RGBA rendering.
//!
//! Every pixel is independent, so rows are filled in parallel with rayon.

use image::RgbaImage;
use rayon::prelude::*;

use crate::error::RenderError;
use crate::raster::{extract_bit, BandData, RasterImage};

use super::palette::PaletteSpec;

const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// Parameters for a single [`render`] call.
#[derive(Debug, Clone, Copy)]
pub struct RenderParams<'a> {
    pub band: usize,
    pub mask: Option<&'a RasterImage>,
    pub palette: &'a PaletteSpec,
    /// Map `(raw >> bit) & 1` instead of the raw value
    pub bit_index: Option<u8>,
}

/// Render one band of `data` through a palette.
///
/// Pixels where the mask's first band is zero come out fully transparent;
/// every other pixel is opaque.
///
/// # Errors
/// - `BandOutOfRange` if `band` does not exist in `data`
/// - `DimensionMismatch` if the mask covers a different pixel grid
/// - `InvalidBitIndex` if the bit index is 64 or more
pub fn render(data: &RasterImage, params: RenderParams<'_>) -> Result<RgbaImage, RenderError> {
    let values = data.band(params.band).ok_or(RenderError::BandOutOfRange {
        band: params.band,
        band_count: data.band_count(),
    })?;

    let mask = match params.mask {
        Some(mask) if !mask.same_dimensions(data) => {
            return Err(RenderError::DimensionMismatch {
                mask_width: mask.width(),
                mask_height: mask.height(),
                data_width: data.width(),
                data_height: data.height(),
            })
        }
        Some(mask) => mask.band(0),
        None => None,
    };

    if let Some(bit) = params.bit_index {
        if bit >= 64 {
            return Err(RenderError::InvalidBitIndex(bit));
        }
    }

    let width = data.width() as usize;
    let mut pixels = vec![0u8; data.pixel_count() * 4];

    pixels
        .par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                let idx = y * width + x;
                pixel.copy_from_slice(&shade(values, mask, idx, params));
            }
        });

    RgbaImage::from_raw(data.width(), data.height(), pixels)
        .ok_or_else(|| RenderError::Encode("pixel buffer does not match dimensions".to_string()))
}

#[inline]
fn shade(values: &BandData, mask: Option<&BandData>, idx: usize, params: RenderParams<'_>) -> [u8; 4] {
    if mask.is_some_and(|m| m.value(idx) == 0.0) {
        return TRANSPARENT;
    }

    let value = match params.bit_index {
        Some(bit) => extract_bit(values.bits(idx), bit) as f64,
        None => values.value(idx),
    };

    let color = params.palette.color_for(value);
    [color.r, color.g, color.b, 255]
}
