//! PNG frame encoder.
//!
//! Rendered frames are RGBA; PNG keeps the alpha channel the roof mask
//! depends on, so it is the only output format.

use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageEncoder, RgbaImage};

use crate::error::RenderError;

// =============================================================================
// PNG Encoder
// =============================================================================

/// Encodes rendered frames as PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngFrameEncoder {
    fast: bool,
}

impl PngFrameEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trade output size for encoding speed.
    pub fn fast() -> Self {
        Self { fast: true }
    }

    /// Encode an RGBA frame.
    ///
    /// # Errors
    /// `RenderError::Encode` if the PNG writer fails.
    pub fn encode(&self, frame: &RgbaImage) -> Result<Bytes, RenderError> {
        let mut output = Vec::new();
        let (compression, filter) = if self.fast {
            (CompressionType::Fast, FilterType::NoFilter)
        } else {
            (CompressionType::Default, FilterType::Adaptive)
        };

        PngEncoder::new_with_quality(&mut output, compression, filter)
            .write_image(
                frame.as_raw(),
                frame.width(),
                frame.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| RenderError::Encode(e.to_string()))?;

        Ok(Bytes::from(output))
    }
}

// =============================================================================
// Tests
// =============================================================================
