//! Test utilities for integration tests.
//!
//! This module provides an in-memory raster source and a builder for
//! GeoTIFF files with various layouts (byte order, BigTIFF, strips or tiles,
//! Deflate) and georeferencing.

use async_trait::async_trait;
use bytes::Bytes;
use flate2::write::ZlibEncoder;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use solar_layers::error::SourceError;
use solar_layers::io::RasterSource;
use solar_layers::SolarLayerUrls;

// =============================================================================
// Mock Raster Source
// =============================================================================

/// Serves pre-configured GeoTIFF bytes and counts fetches.
pub struct MockRasterSource {
    rasters: HashMap<String, Bytes>,
    fetch_count: Arc<AtomicUsize>,
}

impl MockRasterSource {
    pub fn new() -> Self {
        Self {
            rasters: HashMap::new(),
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_raster(mut self, location: impl Into<String>, data: Vec<u8>) -> Self {
        self.rasters.insert(location.into(), Bytes::from(data));
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

impl Default for MockRasterSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RasterSource for MockRasterSource {
    async fn fetch(&self, location: &str) -> Result<Bytes, SourceError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.rasters
            .get(location)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(location.to_string()))
    }
}

/// Data-layers document whose locations match the names used by
/// [`building_source`].
pub fn building_urls() -> SolarLayerUrls {
    SolarLayerUrls {
        mask_url: Some("mask.tif".to_string()),
        annual_flux_url: Some("annual.tif".to_string()),
        monthly_flux_url: Some("monthly.tif".to_string()),
        hourly_shade_urls: (0..12).map(|m| format!("shade_{:02}.tif", m)).collect(),
        ..SolarLayerUrls::default()
    }
}

// =============================================================================
// Sample Types
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SampleKind {
    U8,
    U16,
    U32,
    I32,
    F32,
    F64,
}

impl SampleKind {
    fn bits(self) -> u16 {
        match self {
            SampleKind::U8 => 8,
            SampleKind::U16 => 16,
            SampleKind::U32 | SampleKind::I32 | SampleKind::F32 => 32,
            SampleKind::F64 => 64,
        }
    }

    fn sample_format(self) -> u16 {
        match self {
            SampleKind::U8 | SampleKind::U16 | SampleKind::U32 => 1,
            SampleKind::I32 => 2,
            SampleKind::F32 | SampleKind::F64 => 3,
        }
    }

    fn bytes(self) -> usize {
        self.bits() as usize / 8
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

impl ByteOrderType {
    fn encode<T: Copy, const N: usize>(
        self,
        values: &[T],
        le: fn(T) -> [u8; N],
        be: fn(T) -> [u8; N],
    ) -> Vec<u8> {
        values
            .iter()
            .flat_map(|&v| match self {
                ByteOrderType::LittleEndian => le(v),
                ByteOrderType::BigEndian => be(v),
            })
            .collect()
    }

    fn sample(self, kind: SampleKind, value: f64) -> Vec<u8> {
        match kind {
            SampleKind::U8 => vec![value as u8],
            SampleKind::U16 => self.encode(&[value as u16], u16::to_le_bytes, u16::to_be_bytes),
            SampleKind::U32 => self.encode(&[value as u32], u32::to_le_bytes, u32::to_be_bytes),
            SampleKind::I32 => self.encode(&[value as i32], i32::to_le_bytes, i32::to_be_bytes),
            SampleKind::F32 => self.encode(&[value as f32], f32::to_le_bytes, f32::to_be_bytes),
            SampleKind::F64 => self.encode(&[value], f64::to_le_bytes, f64::to_be_bytes),
        }
    }
}

// =============================================================================
// Georeferencing Presets
// =============================================================================

/// Easting of the UTM test block's west edge.
pub const UTM_WEST: f64 = 551000.0;

/// Northing of the UTM test block's north edge.
pub const UTM_NORTH: f64 = 4180100.0;

/// How a built raster is placed on the globe.
#[derive(Clone, Debug, PartialEq)]
pub enum Placement {
    /// EPSG:32610 (UTM zone 10N) with the north-west corner at
    /// (`UTM_WEST`, `UTM_NORTH`) and square pixels of `pixel` metres
    Utm10 { pixel: f64 },
    /// EPSG:4326 with the north-west corner at (`west`, `north`)
    Geographic { west: f64, north: f64, pixel: f64 },
    /// No geo tags at all
    None,
}

impl Placement {
    fn geo_keys(&self) -> Option<Vec<u16>> {
        match self {
            Placement::Utm10 { .. } => Some(vec![1, 1, 0, 2, 1024, 0, 1, 1, 3072, 0, 1, 32610]),
            Placement::Geographic { .. } => {
                Some(vec![1, 1, 0, 2, 1024, 0, 1, 2, 2048, 0, 1, 4326])
            }
            Placement::None => None,
        }
    }

    fn tie_point_and_scale(&self) -> Option<([f64; 6], [f64; 3])> {
        match *self {
            Placement::Utm10 { pixel } => Some((
                [0.0, 0.0, 0.0, UTM_WEST, UTM_NORTH, 0.0],
                [pixel, pixel, 0.0],
            )),
            Placement::Geographic { west, north, pixel } => {
                Some(([0.0, 0.0, 0.0, west, north, 0.0], [pixel, pixel, 0.0]))
            }
            Placement::None => None,
        }
    }
}

// =============================================================================
// GeoTIFF Builder
// =============================================================================

/// Builder for single-image GeoTIFF files.
///
/// Bands are stored pixel-interleaved. The whole image is one strip unless
/// tiles are requested.
pub struct GeoTiffBuilder {
    byte_order: ByteOrderType,
    is_bigtiff: bool,
    width: u32,
    height: u32,
    kind: SampleKind,
    bands: Vec<Vec<f64>>,
    tile: Option<(u32, u32)>,
    deflate: bool,
    placement: Placement,
    no_data: Option<String>,
    declared_size: Option<(u32, u32)>,
}

impl GeoTiffBuilder {
    pub fn new(width: u32, height: u32, kind: SampleKind) -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            is_bigtiff: false,
            width,
            height,
            kind,
            bands: Vec::new(),
            tile: None,
            deflate: false,
            placement: Placement::Utm10 { pixel: 50.0 },
            no_data: None,
            declared_size: None,
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_bigtiff(mut self, is_bigtiff: bool) -> Self {
        self.is_bigtiff = is_bigtiff;
        self
    }

    /// Add a band of `width * height` row-major values.
    pub fn add_band(mut self, values: Vec<f64>) -> Self {
        assert_eq!(values.len(), (self.width * self.height) as usize);
        self.bands.push(values);
        self
    }

    pub fn with_tiles(mut self, tile_width: u32, tile_height: u32) -> Self {
        self.tile = Some((tile_width, tile_height));
        self
    }

    pub fn with_deflate(mut self) -> Self {
        self.deflate = true;
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_no_data(mut self, no_data: &str) -> Self {
        self.no_data = Some(no_data.to_string());
        self
    }

    /// Write ImageWidth, ImageLength and RowsPerStrip as LONGs holding
    /// `width` and `height`, whatever the band data actually covers.
    pub fn with_declared_size(mut self, width: u32, height: u32) -> Self {
        self.declared_size = Some((width, height));
        self
    }

    /// Build the GeoTIFF file data.
    pub fn build(self) -> Vec<u8> {
        let order = self.byte_order;
        let band_count = self.bands.len() as u16;
        let chunks = self.chunks();

        let (width, height) = match self.declared_size {
            Some((w, h)) => (Entry::longs(order, 256, &[w]), Entry::longs(order, 257, &[h])),
            None => (
                Entry::shorts(order, 256, &[self.width as u16]),
                Entry::shorts(order, 257, &[self.height as u16]),
            ),
        };

        let mut entries: Vec<Entry> = vec![
            width,
            height,
            Entry::shorts(order, 258, &vec![self.kind.bits(); band_count as usize]),
            Entry::shorts(order, 259, &[if self.deflate { 8 } else { 1 }]),
            Entry::shorts(order, 262, &[1]),
            Entry::shorts(order, 277, &[band_count]),
            Entry::shorts(order, 284, &[1]),
            Entry::shorts(
                order,
                339,
                &vec![self.kind.sample_format(); band_count as usize],
            ),
        ];

        let (offsets_tag, counts_tag) = match self.tile {
            Some((tw, th)) => {
                entries.push(Entry::shorts(order, 322, &[tw as u16]));
                entries.push(Entry::shorts(order, 323, &[th as u16]));
                (324, 325)
            }
            None => {
                entries.push(match self.declared_size {
                    Some((_, h)) => Entry::longs(order, 278, &[h]),
                    None => Entry::shorts(order, 278, &[self.height as u16]),
                });
                (273, 279)
            }
        };

        if let Some((tiepoint, scale)) = self.placement.tie_point_and_scale() {
            entries.push(Entry::doubles(order, 33550, &scale));
            entries.push(Entry::doubles(order, 33922, &tiepoint));
        }
        if let Some(keys) = self.placement.geo_keys() {
            entries.push(Entry::shorts(order, 34735, &keys));
        }
        if let Some(ref no_data) = self.no_data {
            entries.push(Entry::ascii(42113, no_data));
        }

        // Chunk offsets are patched in once the layout is known
        let counts: Vec<u64> = chunks.iter().map(|c| c.len() as u64).collect();
        entries.push(self.offsets_entry(counts_tag, &counts));
        entries.push(self.offsets_entry(offsets_tag, &vec![0; chunks.len()]));
        entries.sort_by_key(|e| e.tag);

        let header_size: usize = if self.is_bigtiff { 16 } else { 8 };
        let entry_size: usize = if self.is_bigtiff { 20 } else { 12 };
        let inline_size: usize = if self.is_bigtiff { 8 } else { 4 };
        let ifd_size = if self.is_bigtiff {
            8 + entries.len() * entry_size + 8
        } else {
            2 + entries.len() * entry_size + 4
        };

        let chunk_start = header_size + ifd_size;
        let mut chunk_offsets = Vec::with_capacity(chunks.len());
        let mut cursor = chunk_start as u64;
        for chunk in &chunks {
            chunk_offsets.push(cursor);
            cursor += chunk.len() as u64;
        }
        let offsets = self.offsets_entry(offsets_tag, &chunk_offsets);
        for entry in entries.iter_mut().filter(|e| e.tag == offsets_tag) {
            *entry = offsets.clone();
        }

        // Header
        let mut data = match order {
            ByteOrderType::LittleEndian => vec![b'I', b'I'],
            ByteOrderType::BigEndian => vec![b'M', b'M'],
        };
        if self.is_bigtiff {
            data.extend(self.u16s(&[43, 8, 0]));
            data.extend(self.u64s(&[header_size as u64]));
        } else {
            data.extend(self.u16s(&[42]));
            data.extend(self.u32s(&[header_size as u32]));
        }

        // IFD
        let mut blobs: Vec<u8> = Vec::new();
        let blob_start = cursor as usize;
        if self.is_bigtiff {
            data.extend(self.u64s(&[entries.len() as u64]));
        } else {
            data.extend(self.u16s(&[entries.len() as u16]));
        }
        for entry in &entries {
            data.extend(self.u16s(&[entry.tag, entry.field_type]));
            if self.is_bigtiff {
                data.extend(self.u64s(&[entry.count as u64]));
            } else {
                data.extend(self.u32s(&[entry.count]));
            }

            if entry.bytes.len() <= inline_size {
                let mut inline = entry.bytes.clone();
                inline.resize(inline_size, 0);
                data.extend(inline);
            } else {
                let offset = (blob_start + blobs.len()) as u64;
                if self.is_bigtiff {
                    data.extend(self.u64s(&[offset]));
                } else {
                    data.extend(self.u32s(&[offset as u32]));
                }
                blobs.extend(&entry.bytes);
            }
        }
        if self.is_bigtiff {
            data.extend(self.u64s(&[0]));
        } else {
            data.extend(self.u32s(&[0]));
        }
        assert_eq!(data.len(), chunk_start);

        for chunk in chunks {
            data.extend(chunk);
        }
        data.extend(blobs);
        data
    }

    /// Raw (optionally compressed) strips or tiles.
    fn chunks(&self) -> Vec<Vec<u8>> {
        let (chunk_w, chunk_h) = self.tile.unwrap_or((self.width, self.height));
        let across = self.width.div_ceil(chunk_w);
        let down = self.height.div_ceil(chunk_h);

        let mut chunks = Vec::new();
        for ty in 0..down {
            for tx in 0..across {
                let mut raw = Vec::with_capacity((chunk_w * chunk_h) as usize * self.kind.bytes());
                for y in ty * chunk_h..(ty + 1) * chunk_h {
                    for x in tx * chunk_w..(tx + 1) * chunk_w {
                        for band in &self.bands {
                            let value = if x < self.width && y < self.height {
                                band[(y * self.width + x) as usize]
                            } else {
                                0.0
                            };
                            raw.extend(self.byte_order.sample(self.kind, value));
                        }
                    }
                }
                chunks.push(if self.deflate { deflate(&raw) } else { raw });
            }
        }
        chunks
    }

    fn offsets_entry(&self, tag: u16, values: &[u64]) -> Entry {
        if self.is_bigtiff {
            Entry {
                tag,
                field_type: 16,
                count: values.len() as u32,
                bytes: self.u64s(values),
            }
        } else {
            let values: Vec<u32> = values.iter().map(|&v| v as u32).collect();
            Entry {
                tag,
                field_type: 4,
                count: values.len() as u32,
                bytes: self.u32s(&values),
            }
        }
    }

    fn u16s(&self, values: &[u16]) -> Vec<u8> {
        self.byte_order.encode(values, u16::to_le_bytes, u16::to_be_bytes)
    }

    fn u32s(&self, values: &[u32]) -> Vec<u8> {
        self.byte_order.encode(values, u32::to_le_bytes, u32::to_be_bytes)
    }

    fn u64s(&self, values: &[u64]) -> Vec<u8> {
        self.byte_order.encode(values, u64::to_le_bytes, u64::to_be_bytes)
    }
}

#[derive(Clone)]
struct Entry {
    tag: u16,
    field_type: u16,
    count: u32,
    bytes: Vec<u8>,
}

impl Entry {
    fn shorts(order: ByteOrderType, tag: u16, values: &[u16]) -> Self {
        Self {
            tag,
            field_type: 3,
            count: values.len() as u32,
            bytes: order.encode(values, u16::to_le_bytes, u16::to_be_bytes),
        }
    }

    fn longs(order: ByteOrderType, tag: u16, values: &[u32]) -> Self {
        Self {
            tag,
            field_type: 4,
            count: values.len() as u32,
            bytes: order.encode(values, u32::to_le_bytes, u32::to_be_bytes),
        }
    }

    fn doubles(order: ByteOrderType, tag: u16, values: &[f64]) -> Self {
        Self {
            tag,
            field_type: 12,
            count: values.len() as u32,
            bytes: order.encode(values, f64::to_le_bytes, f64::to_be_bytes),
        }
    }

    fn ascii(tag: u16, value: &str) -> Self {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        Self {
            tag,
            field_type: 2,
            count: bytes.len() as u32,
            bytes,
        }
    }
}

fn deflate(raw: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(raw).unwrap();
    encoder.finish().unwrap()
}

// =============================================================================
// Building Fixtures
// =============================================================================

/// 2x2 roof mask, UTM 50 m pixels.
pub fn mask_tiff(values: [u8; 4]) -> Vec<u8> {
    GeoTiffBuilder::new(2, 2, SampleKind::U8)
        .add_band(values.iter().map(|&v| v as f64).collect())
        .build()
}

/// 2x2 float raster with one band per entry of `bands`.
pub fn flux_tiff(bands: &[[f64; 4]]) -> Vec<u8> {
    bands
        .iter()
        .fold(GeoTiffBuilder::new(2, 2, SampleKind::F32), |builder, band| {
            builder.add_band(band.to_vec())
        })
        .build()
}

/// 2x2 hourly shade raster: 24 bands, every pixel of hour `h` holds
/// `hours[h]`.
pub fn shade_tiff(hours: &[u32; 24]) -> Vec<u8> {
    hours
        .iter()
        .fold(GeoTiffBuilder::new(2, 2, SampleKind::U32), |builder, &bits| {
            builder.add_band(vec![bits as f64; 4])
        })
        .build()
}

/// Mock source holding a full building: mask, annual flux
/// `[[0, 900], [1800, 450]]`, monthly flux where month `m` is `m * 10`
/// everywhere, and hourly shade where only hour 12 of day 21 in June
/// (month 5) is sunlit.
pub fn building_source(mask: [u8; 4]) -> MockRasterSource {
    let monthly: Vec<[f64; 4]> = (0..12).map(|m| [m as f64 * 10.0; 4]).collect();

    let mut source = MockRasterSource::new()
        .with_raster("mask.tif", mask_tiff(mask))
        .with_raster("annual.tif", flux_tiff(&[[0.0, 900.0, 1800.0, 450.0]]))
        .with_raster("monthly.tif", flux_tiff(&monthly));

    for month in 0..12 {
        let mut hours = [0u32; 24];
        if month == 5 {
            hours[12] = 1 << 20;
        }
        source = source.with_raster(format!("shade_{:02}.tif", month), shade_tiff(&hours));
    }
    source
}
