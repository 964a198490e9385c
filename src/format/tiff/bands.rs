//! Raster sample extraction.
//!
//! Turns the strips or tiles of a single IFD into typed bands. Both chunky
//! (`PlanarConfiguration = 1`, samples interleaved per pixel) and planar
//! (`= 2`, one set of chunks per band) layouts are handled. Chunks may be
//! uncompressed or Deflate-compressed, optionally with horizontal
//! differencing applied to integer samples.

use std::io::Read;

use flate2::read::ZlibDecoder;
use tracing::debug;

use crate::error::{DecodeError, TiffError};
use crate::raster::{BandData, RasterImage, SampleType};

use super::parser::{checked_slice, ByteOrder, Ifd, TiffHeader};
use super::tags::{
    Compression, TiffTag, PLANAR_CHUNKY, PLANAR_SEPARATE, PREDICTOR_HORIZONTAL, PREDICTOR_NONE,
    SAMPLE_FORMAT_UINT,
};
use super::values::ValueReader;

// =============================================================================
// Layout
// =============================================================================

/// Everything needed to walk the chunks of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleLayout {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: usize,
    pub sample_type: SampleType,
    pub compression: Compression,
    pub predictor: u16,
    pub planar: u16,
    /// Chunk width in pixels (image width for strips)
    pub chunk_width: u32,
    /// Chunk height in rows (RowsPerStrip for strips)
    pub chunk_height: u32,
    /// Whether chunks are tiles (always full size) rather than strips
    pub tiled: bool,
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
}

impl SampleLayout {
    /// Read the sample layout tags from an IFD.
    pub fn from_ifd(reader: &ValueReader<'_>, ifd: &Ifd) -> Result<Self, DecodeError> {
        let width = required_u32(reader, ifd, TiffTag::ImageWidth)?;
        let height = required_u32(reader, ifd, TiffTag::ImageLength)?;
        if width == 0 || height == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: "ImageWidth",
                message: format!("empty image {}x{}", width, height),
            }
            .into());
        }

        let samples_per_pixel = optional_u32(reader, ifd, TiffTag::SamplesPerPixel)?.unwrap_or(1) as usize;
        if samples_per_pixel == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: "SamplesPerPixel",
                message: "must be at least 1".to_string(),
            }
            .into());
        }

        let sample_type = resolve_sample_type(reader, ifd, samples_per_pixel)?;

        let compression_code = optional_u32(reader, ifd, TiffTag::Compression)?.unwrap_or(1) as u16;
        let compression = Compression::from_u16(compression_code)
            .filter(|c| c.is_supported())
            .ok_or_else(|| {
                DecodeError::UnsupportedCompression(
                    Compression::from_u16(compression_code)
                        .map(|c| c.name().to_string())
                        .unwrap_or_else(|| format!("code {}", compression_code)),
                )
            })?;

        let predictor = optional_u32(reader, ifd, TiffTag::Predictor)?.unwrap_or(1) as u16;
        match predictor {
            PREDICTOR_NONE => {}
            PREDICTOR_HORIZONTAL if !sample_type.is_float() => {}
            other => {
                return Err(DecodeError::UnsupportedCompression(format!(
                    "predictor {} for {:?} samples",
                    other, sample_type
                )))
            }
        }

        let planar = optional_u32(reader, ifd, TiffTag::PlanarConfiguration)?.unwrap_or(1) as u16;
        if planar != PLANAR_CHUNKY && planar != PLANAR_SEPARATE {
            return Err(TiffError::InvalidTagValue {
                tag: "PlanarConfiguration",
                message: format!("unknown value {}", planar),
            }
            .into());
        }

        let tiled = ifd.has_tag(TiffTag::TileWidth);
        let (chunk_width, chunk_height, offsets_tag, counts_tag) = if tiled {
            (
                required_u32(reader, ifd, TiffTag::TileWidth)?,
                required_u32(reader, ifd, TiffTag::TileLength)?,
                TiffTag::TileOffsets,
                TiffTag::TileByteCounts,
            )
        } else {
            let rows = optional_u32(reader, ifd, TiffTag::RowsPerStrip)?
                .unwrap_or(height)
                .min(height);
            (width, rows, TiffTag::StripOffsets, TiffTag::StripByteCounts)
        };

        if chunk_width == 0 || chunk_height == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: if tiled { "TileWidth" } else { "RowsPerStrip" },
                message: "chunk dimension is zero".to_string(),
            }
            .into());
        }

        let offsets = required_array(reader, ifd, offsets_tag)?;
        let byte_counts = required_array(reader, ifd, counts_tag)?;

        let layout = Self {
            width,
            height,
            samples_per_pixel,
            sample_type,
            compression,
            predictor,
            planar,
            chunk_width,
            chunk_height,
            tiled,
            offsets,
            byte_counts,
        };

        layout.decoded_size()?;
        layout.chunk_size()?;

        let expected = layout.chunk_count();
        if layout.offsets.len() < expected || layout.byte_counts.len() < expected {
            return Err(TiffError::InvalidTagValue {
                tag: offsets_tag.name(),
                message: format!(
                    "expected {} chunks, found {} offsets and {} byte counts",
                    expected,
                    layout.offsets.len(),
                    layout.byte_counts.len()
                ),
            }
            .into());
        }

        Ok(layout)
    }

    /// Bytes of decoded samples across every band.
    pub fn decoded_size(&self) -> Result<usize, TiffError> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(self.samples_per_pixel))
            .and_then(|samples| samples.checked_mul(self.sample_type.size_in_bytes()))
            .ok_or_else(|| {
                TiffError::ImageTooLarge(format!(
                    "{}x{} with {} {:?} samples per pixel",
                    self.width, self.height, self.samples_per_pixel, self.sample_type
                ))
            })
    }

    /// Bytes of one fully decoded chunk.
    fn chunk_size(&self) -> Result<usize, TiffError> {
        (self.chunk_width as usize)
            .checked_mul(self.chunk_height as usize)
            .and_then(|pixels| pixels.checked_mul(self.samples_in_chunk()))
            .and_then(|samples| samples.checked_mul(self.sample_type.size_in_bytes()))
            .ok_or_else(|| {
                TiffError::ImageTooLarge(format!(
                    "{}x{} chunks",
                    self.chunk_width, self.chunk_height
                ))
            })
    }

    /// Bytes of one decoded chunk row. Bounded by `chunk_size`.
    fn row_bytes(&self) -> usize {
        self.chunk_width as usize * self.samples_in_chunk() * self.sample_type.size_in_bytes()
    }

    /// Sum of the stored sizes of every chunk, saturating.
    fn stored_size(&self) -> u64 {
        self.byte_counts[..self.chunk_count()]
            .iter()
            .fold(0u64, |total, &count| total.saturating_add(count))
    }

    fn chunks_across(&self) -> usize {
        self.width.div_ceil(self.chunk_width) as usize
    }

    fn chunks_down(&self) -> usize {
        self.height.div_ceil(self.chunk_height) as usize
    }

    fn chunks_per_plane(&self) -> usize {
        self.chunks_across() * self.chunks_down()
    }

    /// Samples interleaved in each chunk pixel.
    fn samples_in_chunk(&self) -> usize {
        if self.planar == PLANAR_SEPARATE {
            1
        } else {
            self.samples_per_pixel
        }
    }

    /// Total number of chunks the offsets array must describe.
    pub fn chunk_count(&self) -> usize {
        if self.planar == PLANAR_SEPARATE {
            self.chunks_per_plane() * self.samples_per_pixel
        } else {
            self.chunks_per_plane()
        }
    }
}

fn required_u32(reader: &ValueReader<'_>, ifd: &Ifd, tag: TiffTag) -> Result<u32, TiffError> {
    let entry = ifd
        .get_entry_by_tag(tag)
        .ok_or(TiffError::MissingTag(tag.name()))?;
    reader.read_u32(entry)
}

fn optional_u32(reader: &ValueReader<'_>, ifd: &Ifd, tag: TiffTag) -> Result<Option<u32>, TiffError> {
    ifd.get_entry_by_tag(tag)
        .map(|entry| reader.read_u32(entry))
        .transpose()
}

fn required_array(reader: &ValueReader<'_>, ifd: &Ifd, tag: TiffTag) -> Result<Vec<u64>, TiffError> {
    let entry = ifd
        .get_entry_by_tag(tag)
        .ok_or(TiffError::MissingTag(tag.name()))?;
    reader.read_u64_array(entry)
}

/// Resolve one sample type shared by every band.
///
/// BitsPerSample and SampleFormat may hold one value or one per band.
fn resolve_sample_type(
    reader: &ValueReader<'_>,
    ifd: &Ifd,
    samples_per_pixel: usize,
) -> Result<SampleType, DecodeError> {
    let bits = match ifd.get_entry_by_tag(TiffTag::BitsPerSample) {
        Some(entry) => reader.read_u16_array(entry)?,
        None => vec![1],
    };
    let formats = match ifd.get_entry_by_tag(TiffTag::SampleFormat) {
        Some(entry) => reader.read_u16_array(entry)?,
        None => vec![SAMPLE_FORMAT_UINT],
    };

    let per_band = |values: &[u16], band: usize, default: u16| {
        values
            .get(band)
            .or_else(|| values.first())
            .copied()
            .unwrap_or(default)
    };

    let first_bits = per_band(&bits, 0, 1);
    let first_format = per_band(&formats, 0, SAMPLE_FORMAT_UINT);

    for band in 0..samples_per_pixel {
        let b = per_band(&bits, band, 1);
        let f = per_band(&formats, band, SAMPLE_FORMAT_UINT);
        if b != first_bits || f != first_format {
            return Err(DecodeError::UnsupportedSampleFormat {
                sample_format: f,
                bits: b,
            });
        }
    }

    SampleType::from_tiff(first_format, first_bits).ok_or(DecodeError::UnsupportedSampleFormat {
        sample_format: first_format,
        bits: first_bits,
    })
}

// =============================================================================
// Band extraction
// =============================================================================

/// Upper bound on the zlib expansion ratio.
const MAX_INFLATE_RATIO: u64 = 1032;

/// Decode every band of the image described by `ifd`.
pub fn read_bands(data: &[u8], header: &TiffHeader, ifd: &Ifd) -> Result<RasterImage, DecodeError> {
    let reader = ValueReader::new(data, header);
    let layout = SampleLayout::from_ifd(&reader, ifd)?;

    debug!(
        width = layout.width,
        height = layout.height,
        bands = layout.samples_per_pixel,
        sample_type = ?layout.sample_type,
        compression = layout.compression.name(),
        tiled = layout.tiled,
        "decoding raster"
    );

    // Refuse sizes the stored chunks cannot account for before allocating
    let decoded = layout.decoded_size()? as u64;
    let stored = layout.stored_size();
    match layout.compression {
        Compression::None if decoded > stored => {
            return Err(TiffError::Truncated {
                offset: 0,
                len: decoded,
                size: stored,
            }
            .into());
        }
        Compression::Deflate | Compression::AdobeDeflate
            if decoded > stored.saturating_mul(MAX_INFLATE_RATIO) =>
        {
            return Err(TiffError::ImageTooLarge(format!(
                "{} decoded bytes from {} compressed bytes",
                decoded, stored
            ))
            .into());
        }
        _ => {}
    }

    let pixels = layout.width as usize * layout.height as usize;
    let mut bands = Vec::with_capacity(layout.samples_per_pixel);
    for _ in 0..layout.samples_per_pixel {
        let band = BandData::zeroed(layout.sample_type, pixels).ok_or_else(|| {
            TiffError::ImageTooLarge(format!("cannot allocate {} samples", pixels))
        })?;
        bands.push(band);
    }

    let per_plane = layout.chunks_per_plane();
    for chunk in 0..layout.chunk_count() {
        let (plane, index_in_plane) = if layout.planar == PLANAR_SEPARATE {
            (chunk / per_plane, chunk % per_plane)
        } else {
            (0, chunk)
        };

        let x0 = (index_in_plane % layout.chunks_across()) as u32 * layout.chunk_width;
        let y0 = (index_in_plane / layout.chunks_across()) as u32 * layout.chunk_height;

        // Strips at the bottom edge hold only the remaining rows; tiles are always full
        let rows = if layout.tiled {
            layout.chunk_height
        } else {
            layout.chunk_height.min(layout.height - y0)
        };

        let raw = checked_slice(data, layout.offsets[chunk], layout.byte_counts[chunk])?;
        let bytes = decompress(raw, layout.compression, layout.row_bytes() * rows as usize)?;

        write_chunk(&layout, &bytes, header.byte_order, plane, x0, y0, rows, &mut bands)?;
    }

    RasterImage::new(layout.width, layout.height, bands).map_err(|e| {
        DecodeError::Malformed(TiffError::InvalidTagValue {
            tag: "ImageWidth",
            message: e.to_string(),
        })
    })
}

/// Inflate a chunk, stopping once `expected` bytes have been produced.
fn decompress(raw: &[u8], compression: Compression, expected: usize) -> Result<Vec<u8>, DecodeError> {
    match compression {
        Compression::None => Ok(raw.to_vec()),
        Compression::Deflate | Compression::AdobeDeflate => {
            let mut out = Vec::with_capacity(expected.min(raw.len().saturating_mul(4)));
            ZlibDecoder::new(raw)
                .take(expected as u64)
                .read_to_end(&mut out)
                .map_err(|e| TiffError::CorruptBlock(e.to_string()))?;
            Ok(out)
        }
        other => Err(DecodeError::UnsupportedCompression(other.name().to_string())),
    }
}

/// Copy one decoded chunk into the destination bands.
#[allow(clippy::too_many_arguments)]
fn write_chunk(
    layout: &SampleLayout,
    bytes: &[u8],
    byte_order: ByteOrder,
    plane: usize,
    x0: u32,
    y0: u32,
    rows: u32,
    bands: &mut [BandData],
) -> Result<(), DecodeError> {
    let sample_size = layout.sample_type.size_in_bytes();
    let spp = layout.samples_in_chunk();
    let row_samples = layout.chunk_width as usize * spp;
    let row_bytes = layout.row_bytes();

    let needed = row_bytes * rows as usize;
    if bytes.len() < needed {
        return Err(TiffError::Truncated {
            offset: 0,
            len: needed as u64,
            size: bytes.len() as u64,
        }
        .into());
    }

    let bits = sample_size as u32 * 8;
    let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
    let mut row = vec![0u64; row_samples];

    for r in 0..rows {
        let y = y0 + r;
        if y >= layout.height {
            break;
        }

        let row_start = r as usize * row_bytes;
        for (i, sample) in row.iter_mut().enumerate() {
            let at = row_start + i * sample_size;
            *sample = read_sample(&bytes[at..at + sample_size], byte_order);
        }

        if layout.predictor == PREDICTOR_HORIZONTAL {
            for i in spp..row_samples {
                row[i] = row[i].wrapping_add(row[i - spp]) & mask;
            }
        }

        let dest_row = y as usize * layout.width as usize;
        for c in 0..layout.chunk_width {
            let x = x0 + c;
            if x >= layout.width {
                break;
            }
            for s in 0..spp {
                let band = if layout.planar == PLANAR_SEPARATE { plane } else { s };
                bands[band].set_raw(dest_row + x as usize, row[c as usize * spp + s]);
            }
        }
    }

    Ok(())
}

#[inline]
fn read_sample(bytes: &[u8], byte_order: ByteOrder) -> u64 {
    match bytes.len() {
        1 => bytes[0] as u64,
        2 => byte_order.read_u16(bytes) as u64,
        4 => byte_order.read_u32(bytes) as u64,
        _ => byte_order.read_u64(bytes),
    }
}

// =============================================================================
// Tests
// =============================================================================
