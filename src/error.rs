use thiserror::Error;

/// Errors that can occur when fetching raster bytes from a source
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Raster not found at the requested location
    #[error("Raster not found: {0}")]
    NotFound(String),

    /// Filesystem or transport error
    #[error("I/O error reading {location}: {message}")]
    Io { location: String, message: String },
}

/// Structural errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// Buffer is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside the buffer)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// A value, IFD or data block extends past the end of the buffer
    #[error("Truncated data: {len} bytes at offset {offset}, buffer size is {size}")]
    Truncated { offset: u64, len: u64, size: u64 },

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),

    /// Compressed block could not be inflated
    #[error("Corrupt compressed block: {0}")]
    CorruptBlock(String),

    /// Declared image size cannot be held in memory or backed by the file
    #[error("Image too large: {0}")]
    ImageTooLarge(String),
}

/// Errors returned by the GeoTIFF decoder
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The byte stream is not a valid TIFF
    #[error("Malformed TIFF: {0}")]
    Malformed(#[from] TiffError),

    /// Band sample type cannot be represented in the numeric model
    #[error("Unsupported sample format {sample_format} with {bits} bits per sample")]
    UnsupportedSampleFormat { sample_format: u16, bits: u16 },

    /// Compression scheme or predictor is not handled
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// Required geospatial tags are absent
    #[error("Missing geospatial tag: {0}")]
    MissingGeoTags(&'static str),
}

/// Errors produced while resolving a geo-key directory into a transform
#[derive(Debug, Clone, Error)]
pub enum ProjectionError {
    /// The geo-key combination does not map to a resolvable system
    #[error("Unknown coordinate reference system: {0}")]
    UnknownCrs(String),

    /// Linear or angular unit code is not handled
    #[error("Unsupported unit code: {0}")]
    UnsupportedUnits(u16),

    /// The generated definition was rejected by the projection engine
    #[error("Invalid projection definition '{definition}': {message}")]
    InvalidDefinition { definition: String, message: String },

    /// A coordinate could not be transformed
    #[error("Coordinate transform failed for ({x}, {y}): {message}")]
    Transform { x: f64, y: f64, message: String },
}

/// Errors produced while rendering a frame
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// Requested band does not exist in the raster
    #[error("Band index {band} out of range: raster has {band_count} band(s)")]
    BandOutOfRange { band: usize, band_count: usize },

    /// Mask and data rasters have different dimensions
    #[error("Mask is {mask_width}x{mask_height} but data is {data_width}x{data_height}")]
    DimensionMismatch {
        mask_width: u32,
        mask_height: u32,
        data_width: u32,
        data_height: u32,
    },

    /// Frame index or month/day selection is out of range
    #[error("Invalid frame selection: {0}")]
    InvalidSelection(String),

    /// Palette has no colors or an empty domain
    #[error("Invalid palette: {0}")]
    InvalidPalette(String),

    /// Bit index outside the width of a packed sample
    #[error("Bit index {0} out of range (must be < 64)")]
    InvalidBitIndex(u8),

    /// PNG encoding failed
    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

/// Errors from the raster store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No raster registered under the name
    #[error("Raster not found in store: {0}")]
    NotFound(String),
}

/// Errors that can occur when loading and assembling a layer
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// Fetching raster bytes failed
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// A source raster could not be decoded
    #[error("Decode error for {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: DecodeError,
    },

    /// Bounds of the mask raster could not be resolved
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// A required raster was not loaded
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Layer failed validation at assembly time
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// The data-layers document lacks a URL needed for this layer
    #[error("Missing layer URL: {0}")]
    MissingUrl(&'static str),

    /// A blocking decode task panicked or was cancelled
    #[error("Decode task failed: {0}")]
    Task(String),
}

/// Errors from the GeoTIFF pass-through (decode + bounds)
#[derive(Debug, Clone, Error)]
pub enum GeoTiffError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Errors raised when constructing a raster from parts
#[derive(Debug, Clone, Error)]
pub enum RasterError {
    /// Band length does not equal width * height
    #[error("Band {band} has {actual} samples, expected {expected}")]
    BandLength {
        band: usize,
        expected: usize,
        actual: usize,
    },

    /// A raster needs at least one band
    #[error("Raster has no bands")]
    NoBands,

    /// A raster needs at least one pixel
    #[error("Raster is empty: {width}x{height}")]
    Empty { width: u32, height: u32 },
}
