//! TIFF container parsing.
//!
//! Handles the parts of TIFF and BigTIFF a single-image GeoTIFF needs.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values must be read respecting this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets, BigTIFF uses 64-bit
//!   offsets. The parser handles both transparently.
//!
//! - **IFD (Image File Directory)**: Holds the tags describing one image. Only the first
//!   IFD is read.
//!
//! - **Inline vs offset values**: Small values are stored inline in the IFD entry,
//!   larger values are stored at an offset pointed to by the entry.
//!
//! - **Chunks**: Pixel data lives in strips or tiles, each optionally Deflate-compressed.

mod bands;
mod parser;
mod tags;
mod values;

pub use bands::{read_bands, SampleLayout};
pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use tags::{
    Compression, FieldType, TiffTag, PLANAR_CHUNKY, PLANAR_SEPARATE, PREDICTOR_HORIZONTAL,
    PREDICTOR_NONE, SAMPLE_FORMAT_FLOAT, SAMPLE_FORMAT_INT, SAMPLE_FORMAT_UINT,
};
pub use values::ValueReader;
