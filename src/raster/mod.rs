//! Strongly typed raster model.
//!
//! A decoded GeoTIFF becomes a [`RasterImage`]: a width, a height and one
//! [`BandData`] per band. The sample type is resolved once at decode time,
//! so rendering code never has to guess what a band holds.
//!
//! Bands are row-major with `width * height` samples each and are never
//! mutated after construction.

mod store;

pub use store::{RasterStore, RasterStoreBuilder, StoredRaster};

use crate::error::RasterError;

// =============================================================================
// SampleType
// =============================================================================

/// Numeric type of every sample in a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    F32,
    F64,
}

impl SampleType {
    /// Resolve a TIFF SampleFormat / BitsPerSample pair.
    ///
    /// Returns `None` for combinations outside the numeric model
    /// (1-bit, 24-bit, 64-bit integers, 16-bit floats, complex types).
    pub fn from_tiff(sample_format: u16, bits: u16) -> Option<Self> {
        match (sample_format, bits) {
            (1, 8) => Some(SampleType::U8),
            (1, 16) => Some(SampleType::U16),
            (1, 32) => Some(SampleType::U32),
            (2, 8) => Some(SampleType::I8),
            (2, 16) => Some(SampleType::I16),
            (2, 32) => Some(SampleType::I32),
            (3, 32) => Some(SampleType::F32),
            (3, 64) => Some(SampleType::F64),
            _ => None,
        }
    }

    /// Size of one sample in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    /// Whether the type is a floating point type.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, SampleType::F32 | SampleType::F64)
    }
}

// =============================================================================
// BandData
// =============================================================================

/// The samples of one band, stored at their native width.
#[derive(Debug, Clone, PartialEq)]
pub enum BandData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl BandData {
    /// A zero-filled band of `len` samples, or `None` when the allocation fails.
    pub fn zeroed(sample_type: SampleType, len: usize) -> Option<Self> {
        fn filled<T: Copy>(zero: T, len: usize) -> Option<Vec<T>> {
            let mut values = Vec::new();
            values.try_reserve_exact(len).ok()?;
            values.resize(len, zero);
            Some(values)
        }

        Some(match sample_type {
            SampleType::U8 => BandData::U8(filled(0, len)?),
            SampleType::U16 => BandData::U16(filled(0, len)?),
            SampleType::U32 => BandData::U32(filled(0, len)?),
            SampleType::I8 => BandData::I8(filled(0, len)?),
            SampleType::I16 => BandData::I16(filled(0, len)?),
            SampleType::I32 => BandData::I32(filled(0, len)?),
            SampleType::F32 => BandData::F32(filled(0.0, len)?),
            SampleType::F64 => BandData::F64(filled(0.0, len)?),
        })
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            BandData::U8(_) => SampleType::U8,
            BandData::U16(_) => SampleType::U16,
            BandData::U32(_) => SampleType::U32,
            BandData::I8(_) => SampleType::I8,
            BandData::I16(_) => SampleType::I16,
            BandData::I32(_) => SampleType::I32,
            BandData::F32(_) => SampleType::F32,
            BandData::F64(_) => SampleType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BandData::U8(v) => v.len(),
            BandData::U16(v) => v.len(),
            BandData::U32(v) => v.len(),
            BandData::I8(v) => v.len(),
            BandData::I16(v) => v.len(),
            BandData::I32(v) => v.len(),
            BandData::F32(v) => v.len(),
            BandData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `idx` widened to f64.
    ///
    /// # Panics
    /// Panics if `idx` is out of bounds.
    #[inline]
    pub fn value(&self, idx: usize) -> f64 {
        match self {
            BandData::U8(v) => v[idx] as f64,
            BandData::U16(v) => v[idx] as f64,
            BandData::U32(v) => v[idx] as f64,
            BandData::I8(v) => v[idx] as f64,
            BandData::I16(v) => v[idx] as f64,
            BandData::I32(v) => v[idx] as f64,
            BandData::F32(v) => v[idx] as f64,
            BandData::F64(v) => v[idx],
        }
    }

    /// Sample at `idx` as an integer bit pattern for bit extraction.
    ///
    /// Integer samples are sign-extended; float samples are truncated
    /// toward zero first, matching how packed masks stored as floats behave.
    ///
    /// # Panics
    /// Panics if `idx` is out of bounds.
    #[inline]
    pub fn bits(&self, idx: usize) -> u64 {
        match self {
            BandData::U8(v) => v[idx] as u64,
            BandData::U16(v) => v[idx] as u64,
            BandData::U32(v) => v[idx] as u64,
            BandData::I8(v) => v[idx] as i64 as u64,
            BandData::I16(v) => v[idx] as i64 as u64,
            BandData::I32(v) => v[idx] as i64 as u64,
            BandData::F32(v) => v[idx] as i64 as u64,
            BandData::F64(v) => v[idx] as i64 as u64,
        }
    }

    /// Store a raw sample bit pattern (as read from the file) at `idx`.
    #[inline]
    pub(crate) fn set_raw(&mut self, idx: usize, raw: u64) {
        match self {
            BandData::U8(v) => v[idx] = raw as u8,
            BandData::U16(v) => v[idx] = raw as u16,
            BandData::U32(v) => v[idx] = raw as u32,
            BandData::I8(v) => v[idx] = raw as u8 as i8,
            BandData::I16(v) => v[idx] = raw as u16 as i16,
            BandData::I32(v) => v[idx] = raw as u32 as i32,
            BandData::F32(v) => v[idx] = f32::from_bits(raw as u32),
            BandData::F64(v) => v[idx] = f64::from_bits(raw),
        }
    }

    /// All samples widened to f64.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.value(i)).collect()
    }
}

// =============================================================================
// RasterImage
// =============================================================================

/// A decoded multi-band raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    bands: Vec<BandData>,
}

impl RasterImage {
    /// Build a raster, checking it has at least one pixel and every band
    /// holds `width * height` samples.
    pub fn new(width: u32, height: u32, bands: Vec<BandData>) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::Empty { width, height });
        }
        if bands.is_empty() {
            return Err(RasterError::NoBands);
        }

        let expected = width as usize * height as usize;
        if let Some((band, data)) = bands.iter().enumerate().find(|(_, b)| b.len() != expected) {
            return Err(RasterError::BandLength {
                band,
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            bands,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn bands(&self) -> &[BandData] {
        &self.bands
    }

    pub fn band(&self, index: usize) -> Option<&BandData> {
        self.bands.get(index)
    }

    /// Number of pixels per band.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Sample at pixel `(x, y)` of `band`, or `None` outside the raster.
    pub fn value(&self, band: usize, x: u32, y: u32) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.bands.get(band).map(|b| b.value(idx))
    }

    /// Whether another raster covers the same pixel grid.
    pub fn same_dimensions(&self, other: &RasterImage) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// `(value >> bit) & 1`, defined as 0 for shifts past the word width.
#[inline]
pub fn extract_bit(value: u64, bit: u8) -> u64 {
    value.checked_shr(bit as u32).map(|v| v & 1).unwrap_or(0)
}

// =============================================================================
// Tests
// =============================================================================
