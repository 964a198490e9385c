//! GeoTIFF geo-key directory.
//!
//! The directory is a SHORT array: a four-value header
//! `[version, revision, minor, key_count]` followed by `key_count` entries of
//! `[key_id, location, count, value_offset]`. `location` says where the value
//! lives:
//!
//! - `0`: the value is `value_offset` itself (a single SHORT)
//! - `34735`: SHORTs inside the directory array
//! - `34736`: DOUBLEs in GeoDoubleParams
//! - `34737`: characters in GeoAsciiParams, terminated by `|`
//!
//! Values are stored verbatim; interpretation happens in [`crate::geo`].

use std::collections::BTreeMap;

use crate::error::{DecodeError, TiffError};

// =============================================================================
// Key IDs
// =============================================================================

pub const GT_MODEL_TYPE: u16 = 1024;
pub const GT_RASTER_TYPE: u16 = 1025;
pub const GT_CITATION: u16 = 1026;

pub const GEOGRAPHIC_TYPE: u16 = 2048;
pub const GEOG_CITATION: u16 = 2049;
pub const GEOG_GEODETIC_DATUM: u16 = 2050;
pub const GEOG_LINEAR_UNITS: u16 = 2052;
pub const GEOG_ANGULAR_UNITS: u16 = 2054;
pub const GEOG_ANGULAR_UNIT_SIZE: u16 = 2055;
pub const GEOG_ELLIPSOID: u16 = 2056;
pub const GEOG_SEMI_MAJOR_AXIS: u16 = 2057;
pub const GEOG_SEMI_MINOR_AXIS: u16 = 2058;
pub const GEOG_INV_FLATTENING: u16 = 2059;

pub const PROJECTED_CS_TYPE: u16 = 3072;
pub const PROJECTION: u16 = 3074;
pub const PROJ_COORD_TRANS: u16 = 3075;
pub const PROJ_LINEAR_UNITS: u16 = 3076;
pub const PROJ_LINEAR_UNIT_SIZE: u16 = 3077;
pub const PROJ_STD_PARALLEL_1: u16 = 3078;
pub const PROJ_STD_PARALLEL_2: u16 = 3079;
pub const PROJ_NAT_ORIGIN_LONG: u16 = 3080;
pub const PROJ_NAT_ORIGIN_LAT: u16 = 3081;
pub const PROJ_FALSE_EASTING: u16 = 3082;
pub const PROJ_FALSE_NORTHING: u16 = 3083;
pub const PROJ_FALSE_ORIGIN_LONG: u16 = 3084;
pub const PROJ_FALSE_ORIGIN_LAT: u16 = 3085;
pub const PROJ_CENTER_LONG: u16 = 3088;
pub const PROJ_CENTER_LAT: u16 = 3089;
pub const PROJ_SCALE_AT_NAT_ORIGIN: u16 = 3092;
pub const PROJ_SCALE_AT_CENTER: u16 = 3093;
pub const PROJ_STRAIGHT_VERT_POLE_LONG: u16 = 3095;

/// Code meaning "user-defined" for any key that takes an EPSG code.
pub const USER_DEFINED: u16 = 32767;

const LOCATION_INLINE: u16 = 0;
const LOCATION_DIRECTORY: u16 = 34735;
const LOCATION_DOUBLES: u16 = 34736;
const LOCATION_ASCII: u16 = 34737;

// =============================================================================
// GeoKeyDirectory
// =============================================================================

/// A single geo-key value.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoKeyValue {
    Short(u16),
    Shorts(Vec<u16>),
    Doubles(Vec<f64>),
    Ascii(String),
}

/// Geo-key id to value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoKeyDirectory {
    keys: BTreeMap<u16, GeoKeyValue>,
}

impl GeoKeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the directory from the three GeoTIFF parameter tags.
    pub fn parse(directory: &[u16], doubles: &[f64], ascii: &str) -> Result<Self, DecodeError> {
        let malformed = |message: String| {
            DecodeError::Malformed(TiffError::InvalidTagValue {
                tag: "GeoKeyDirectory",
                message,
            })
        };

        if directory.len() < 4 {
            return Err(malformed(format!(
                "header needs 4 values, got {}",
                directory.len()
            )));
        }

        let key_count = directory[3] as usize;
        let needed = 4 + key_count * 4;
        if directory.len() < needed {
            return Err(malformed(format!(
                "{} keys need {} values, got {}",
                key_count,
                needed,
                directory.len()
            )));
        }

        let mut keys = BTreeMap::new();
        for entry in directory[4..needed].chunks_exact(4) {
            let (key_id, location, count, offset) =
                (entry[0], entry[1], entry[2] as usize, entry[3] as usize);

            let value = match location {
                LOCATION_INLINE => GeoKeyValue::Short(entry[3]),
                LOCATION_DIRECTORY => GeoKeyValue::Shorts(
                    directory
                        .get(offset..offset + count)
                        .ok_or_else(|| malformed(format!("key {} points past the directory", key_id)))?
                        .to_vec(),
                ),
                LOCATION_DOUBLES => GeoKeyValue::Doubles(
                    doubles
                        .get(offset..offset + count)
                        .ok_or_else(|| malformed(format!("key {} points past GeoDoubleParams", key_id)))?
                        .to_vec(),
                ),
                LOCATION_ASCII => {
                    let text = ascii
                        .get(offset..offset + count)
                        .ok_or_else(|| malformed(format!("key {} points past GeoAsciiParams", key_id)))?;
                    GeoKeyValue::Ascii(text.trim_end_matches('|').to_string())
                }
                other => {
                    return Err(malformed(format!(
                        "key {} has unknown location {}",
                        key_id, other
                    )))
                }
            };

            keys.insert(key_id, value);
        }

        Ok(Self { keys })
    }

    /// Add or replace a key.
    pub fn insert(&mut self, key_id: u16, value: GeoKeyValue) {
        self.keys.insert(key_id, value);
    }

    pub fn get(&self, key_id: u16) -> Option<&GeoKeyValue> {
        self.keys.get(&key_id)
    }

    /// A SHORT-valued key.
    pub fn short(&self, key_id: u16) -> Option<u16> {
        match self.keys.get(&key_id)? {
            GeoKeyValue::Short(v) => Some(*v),
            GeoKeyValue::Shorts(v) => v.first().copied(),
            _ => None,
        }
    }

    /// The first value of a DOUBLE-valued key.
    pub fn double(&self, key_id: u16) -> Option<f64> {
        match self.keys.get(&key_id)? {
            GeoKeyValue::Doubles(v) => v.first().copied(),
            _ => None,
        }
    }

    pub fn ascii(&self, key_id: u16) -> Option<&str> {
        match self.keys.get(&key_id)? {
            GeoKeyValue::Ascii(s) => Some(s),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &GeoKeyValue)> {
        self.keys.iter().map(|(k, v)| (*k, v))
    }
}
