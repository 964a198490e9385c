//! TIFF tag value reading.
//!
//! Values can be stored either inline in the IFD entry (for small values)
//! or at an offset in the file (for larger values like arrays). The whole
//! GeoTIFF payload is held in memory, so offset values are borrowed straight
//! out of the input buffer after a bounds check.

use crate::error::TiffError;

use super::parser::{checked_slice, ByteOrder, IfdEntry, TiffHeader};
use super::tags::{FieldType, TiffTag};

// =============================================================================
// ValueReader
// =============================================================================

/// Reads tag values from an in-memory TIFF file.
pub struct ValueReader<'a> {
    data: &'a [u8],
    header: &'a TiffHeader,
}

fn tag_name(entry: &IfdEntry) -> &'static str {
    TiffTag::from_u16(entry.tag_id)
        .map(TiffTag::name)
        .unwrap_or("unknown")
}

impl<'a> ValueReader<'a> {
    /// Create a new ValueReader.
    pub fn new(data: &'a [u8], header: &'a TiffHeader) -> Self {
        Self { data, header }
    }

    /// Get the byte order from the header.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Raw bytes for an IFD entry's value.
    ///
    /// For inline values, returns the bytes from the entry.
    /// For offset values, borrows the bytes from the file.
    pub fn read_bytes<'e>(&self, entry: &'e IfdEntry) -> Result<&'e [u8], TiffError>
    where
        'a: 'e,
    {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.is_inline {
            Ok(&entry.value_offset_bytes[..size as usize])
        } else {
            let offset = entry.value_offset(self.header.byte_order);
            checked_slice(self.data, offset, size)
        }
    }

    /// Read a single unsigned value (BYTE, SHORT or LONG).
    pub fn read_u32(&self, entry: &IfdEntry) -> Result<u32, TiffError> {
        if let Some(value) = entry.inline_u32(self.header.byte_order) {
            return Ok(value);
        }

        let values = self.read_u64_array(entry)?;
        match values.as_slice() {
            [value] => u32::try_from(*value).map_err(|_| TiffError::InvalidTagValue {
                tag: tag_name(entry),
                message: format!("value {} does not fit in 32 bits", value),
            }),
            _ => Err(TiffError::InvalidTagValue {
                tag: tag_name(entry),
                message: format!("expected count 1, got {}", entry.count),
            }),
        }
    }

    /// Read an array of unsigned integers, widening all to u64.
    ///
    /// This is the primary method for reading strip/tile offsets and byte
    /// counts. Handles BYTE, SHORT, LONG, LONG8 and IFD8 field types.
    pub fn read_u64_array(&self, entry: &IfdEntry) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.count == 0 {
            return Ok(Vec::new());
        }

        let bytes = self.read_bytes(entry)?;
        let byte_order = self.header.byte_order;

        let values = match field_type {
            FieldType::Byte => bytes.iter().map(|&b| b as u64).collect(),
            FieldType::Short => bytes
                .chunks_exact(2)
                .map(|c| byte_order.read_u16(c) as u64)
                .collect(),
            FieldType::Long => bytes
                .chunks_exact(4)
                .map(|c| byte_order.read_u32(c) as u64)
                .collect(),
            FieldType::Long8 | FieldType::Ifd8 => {
                bytes.chunks_exact(8).map(|c| byte_order.read_u64(c)).collect()
            }
            _ => {
                return Err(TiffError::InvalidTagValue {
                    tag: tag_name(entry),
                    message: format!("expected an unsigned integer type, got {:?}", field_type),
                });
            }
        };

        Ok(values)
    }

    /// Read an array of SHORT values (BitsPerSample, SampleFormat, GeoKeyDirectory).
    pub fn read_u16_array(&self, entry: &IfdEntry) -> Result<Vec<u16>, TiffError> {
        let values = self.read_u64_array(entry)?;
        values
            .into_iter()
            .map(|v| {
                u16::try_from(v).map_err(|_| TiffError::InvalidTagValue {
                    tag: tag_name(entry),
                    message: format!("value {} does not fit in 16 bits", v),
                })
            })
            .collect()
    }

    /// Read an array of numeric values as f64.
    ///
    /// DOUBLE and FLOAT are read directly; integer and rational types are
    /// converted. Used for the GeoTIFF model tags and GeoDoubleParams.
    pub fn read_f64_array(&self, entry: &IfdEntry) -> Result<Vec<f64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.count == 0 {
            return Ok(Vec::new());
        }

        let bytes = self.read_bytes(entry)?;
        let bo = self.header.byte_order;

        let values = match field_type {
            FieldType::Double => bytes.chunks_exact(8).map(|c| bo.read_f64(c)).collect(),
            FieldType::Float => bytes.chunks_exact(4).map(|c| bo.read_f32(c) as f64).collect(),
            FieldType::Rational => bytes
                .chunks_exact(8)
                .map(|c| bo.read_u32(&c[0..4]) as f64 / bo.read_u32(&c[4..8]) as f64)
                .collect(),
            FieldType::SRational => bytes
                .chunks_exact(8)
                .map(|c| bo.read_u32(&c[0..4]) as i32 as f64 / bo.read_u32(&c[4..8]) as i32 as f64)
                .collect(),
            FieldType::SShort => bytes
                .chunks_exact(2)
                .map(|c| bo.read_u16(c) as i16 as f64)
                .collect(),
            FieldType::SLong => bytes
                .chunks_exact(4)
                .map(|c| bo.read_u32(c) as i32 as f64)
                .collect(),
            _ => self
                .read_u64_array(entry)?
                .into_iter()
                .map(|v| v as f64)
                .collect(),
        };

        Ok(values)
    }

    /// Read a string value from an entry (ASCII type).
    ///
    /// The string is cut at the first NUL byte.
    pub fn read_string(&self, entry: &IfdEntry) -> Result<String, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if field_type != FieldType::Ascii {
            return Err(TiffError::InvalidTagValue {
                tag: tag_name(entry),
                message: format!("expected Ascii type for string, got {:?}", field_type),
            });
        }

        let bytes = self.read_bytes(entry)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}

// =============================================================================
// Tests
// =============================================================================
