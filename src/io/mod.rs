//! I/O layer: raster sources and byte-order helpers.

mod endian;
mod source;

pub use endian::{read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le};
pub use source::{LocalRasterSource, RasterSource};
