//! Geo-key directory to WGS84 transform.
//!
//! [`resolve`] reads the model type, CRS codes, projection parameters and
//! unit codes from a [`GeoKeyDirectory`] and produces a PROJ-style definition
//! in metres (or degrees for geographic rasters) plus the factor that turns
//! raw raster coordinates into those units. EPSG codes are looked up in the
//! `crs-definitions` database; user-defined systems are assembled from the
//! individual projection keys. The transform itself runs on `proj4rs`.

use std::fmt;

use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use tracing::debug;

use crate::error::ProjectionError;
use crate::format::geokeys::*;
use crate::format::GeoKeyDirectory;

// =============================================================================
// Constants
// =============================================================================

/// Target system of every transform.
pub const WGS84_DEFINITION: &str = "+proj=longlat +datum=WGS84 +no_defs";

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;

const ANGULAR_DEGREE: u16 = 9102;

// =============================================================================
// Units
// =============================================================================

/// Metres per unit for an EPSG linear unit code.
///
/// `32767` (user-defined) reads the size from `user_size`.
pub fn linear_unit_factor(code: u16, user_size: Option<f64>) -> Result<f64, ProjectionError> {
    match code {
        9001 => Ok(1.0),
        9002 => Ok(0.3048),
        9003 => Ok(0.3048006096012192),
        9030 => Ok(1852.0),
        9036 => Ok(1000.0),
        USER_DEFINED => user_size.ok_or(ProjectionError::UnsupportedUnits(code)),
        other => Err(ProjectionError::UnsupportedUnits(other)),
    }
}

/// Degrees per unit for an EPSG angular unit code.
pub fn angular_unit_factor(code: u16, user_size: Option<f64>) -> Result<f64, ProjectionError> {
    match code {
        9101 => Ok(180.0 / std::f64::consts::PI),
        9102 | 9122 => Ok(1.0),
        9103 => Ok(1.0 / 60.0),
        9104 => Ok(1.0 / 3600.0),
        9105 => Ok(0.9),
        // User-defined size is given in radians
        USER_DEFINED => user_size
            .map(f64::to_degrees)
            .ok_or(ProjectionError::UnsupportedUnits(code)),
        other => Err(ProjectionError::UnsupportedUnits(other)),
    }
}

/// Strip `+units` / `+to_meter` from a definition and pin it to metres.
///
/// Returns the rewritten definition and the metres-per-unit factor the
/// original definition implied.
fn normalize_to_metres(definition: &str) -> Result<(String, f64), ProjectionError> {
    let mut factor = 1.0;
    let mut to_meter = None;
    let mut kept = Vec::new();

    for token in definition.split_whitespace() {
        if let Some(units) = token.strip_prefix("+units=") {
            factor = match units {
                "m" => 1.0,
                "km" => 1000.0,
                "ft" => 0.3048,
                "us-ft" => 0.3048006096012192,
                "kmi" => 1852.0,
                other => {
                    return Err(ProjectionError::InvalidDefinition {
                        definition: definition.to_string(),
                        message: format!("unknown units '{}'", other),
                    })
                }
            };
        } else if let Some(value) = token.strip_prefix("+to_meter=") {
            to_meter = Some(value.parse::<f64>().map_err(|e| {
                ProjectionError::InvalidDefinition {
                    definition: definition.to_string(),
                    message: format!("bad +to_meter: {}", e),
                }
            })?);
        } else {
            kept.push(token);
        }
    }

    kept.push("+units=m");
    Ok((kept.join(" "), to_meter.unwrap_or(factor)))
}

// =============================================================================
// Definition building
// =============================================================================

/// Datum/ellipsoid parameters for the geographic system in the keys.
fn datum_params(keys: &GeoKeyDirectory) -> String {
    match keys.short(GEOGRAPHIC_TYPE) {
        Some(4326) => return "+datum=WGS84".to_string(),
        Some(4269) => return "+datum=NAD83".to_string(),
        Some(4258) => return "+ellps=GRS80".to_string(),
        Some(code) if code != USER_DEFINED => {
            if let Some(def) = crs_definitions::from_code(code) {
                let params: Vec<&str> = def
                    .proj4
                    .split_whitespace()
                    .filter(|t| !t.starts_with("+proj=") && *t != "+no_defs" && !t.starts_with("+type="))
                    .collect();
                if !params.is_empty() {
                    return params.join(" ");
                }
            }
        }
        _ => {}
    }

    match (
        keys.double(GEOG_SEMI_MAJOR_AXIS),
        keys.double(GEOG_SEMI_MINOR_AXIS),
        keys.double(GEOG_INV_FLATTENING),
    ) {
        (Some(a), Some(b), _) => format!("+a={} +b={}", a, b),
        (Some(a), None, Some(rf)) => format!("+a={} +rf={}", a, rf),
        (Some(a), None, None) => format!("+a={} +b={}", a, a),
        _ => "+datum=WGS84".to_string(),
    }
}

/// Assemble a definition for a user-defined projected system.
///
/// Angles are converted to degrees with `angular`; false easting/northing to
/// metres with `linear`.
fn user_defined_projection(
    keys: &GeoKeyDirectory,
    angular: f64,
    linear: f64,
) -> Result<String, ProjectionError> {
    let coord_trans = keys.short(PROJ_COORD_TRANS).ok_or_else(|| {
        ProjectionError::UnknownCrs("user-defined projection without ProjCoordTransGeoKey".to_string())
    })?;

    let angle = |ids: &[u16]| {
        ids.iter()
            .find_map(|id| keys.double(*id))
            .map(|v| v * angular)
            .unwrap_or(0.0)
    };
    let lon_0 = angle(&[PROJ_NAT_ORIGIN_LONG, PROJ_FALSE_ORIGIN_LONG, PROJ_CENTER_LONG]);
    let lat_0 = angle(&[PROJ_NAT_ORIGIN_LAT, PROJ_FALSE_ORIGIN_LAT, PROJ_CENTER_LAT]);
    let lat_1 = angle(&[PROJ_STD_PARALLEL_1]);
    let lat_2 = angle(&[PROJ_STD_PARALLEL_2]);
    let k_0 = keys
        .double(PROJ_SCALE_AT_NAT_ORIGIN)
        .or_else(|| keys.double(PROJ_SCALE_AT_CENTER))
        .unwrap_or(1.0);
    let x_0 = keys.double(PROJ_FALSE_EASTING).unwrap_or(0.0) * linear;
    let y_0 = keys.double(PROJ_FALSE_NORTHING).unwrap_or(0.0) * linear;
    let offsets = format!("+x_0={} +y_0={}", x_0, y_0);

    let projection = match coord_trans {
        1 => format!("+proj=tmerc +lat_0={} +lon_0={} +k_0={} {}", lat_0, lon_0, k_0, offsets),
        7 => format!("+proj=merc +lon_0={} +k_0={} {}", lon_0, k_0, offsets),
        8 => format!(
            "+proj=lcc +lat_1={} +lat_2={} +lat_0={} +lon_0={} {}",
            lat_1, lat_2, lat_0, lon_0, offsets
        ),
        9 => format!(
            "+proj=lcc +lat_1={} +lat_0={} +lon_0={} +k_0={} {}",
            lat_0, lat_0, lon_0, k_0, offsets
        ),
        10 => format!("+proj=laea +lat_0={} +lon_0={} {}", lat_0, lon_0, offsets),
        11 => format!(
            "+proj=aea +lat_1={} +lat_2={} +lat_0={} +lon_0={} {}",
            lat_1, lat_2, lat_0, lon_0, offsets
        ),
        15 => {
            let lon_0 = keys
                .double(PROJ_STRAIGHT_VERT_POLE_LONG)
                .map(|v| v * angular)
                .unwrap_or(lon_0);
            let pole = if lat_0 < 0.0 { -90.0 } else { 90.0 };
            format!(
                "+proj=stere +lat_0={} +lat_ts={} +lon_0={} +k_0={} {}",
                pole, lat_0, lon_0, k_0, offsets
            )
        }
        17 => format!(
            "+proj=eqc +lat_ts={} +lat_0={} +lon_0={} {}",
            lat_1, lat_0, lon_0, offsets
        ),
        other => {
            return Err(ProjectionError::UnknownCrs(format!(
                "coordinate transformation {}",
                other
            )))
        }
    };

    Ok(format!("{} {} +units=m +no_defs", projection, datum_params(keys)))
}

// =============================================================================
// ProjectionTransform
// =============================================================================

/// Forward transform from a native CRS to WGS84 longitude/latitude degrees.
pub struct ProjectionTransform {
    definition: String,
    source: Proj,
    target: Proj,
    /// Source takes degrees (converted to radians for proj4rs)
    geographic: bool,
}

impl fmt::Debug for ProjectionTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectionTransform")
            .field("definition", &self.definition)
            .field("geographic", &self.geographic)
            .finish()
    }
}

impl ProjectionTransform {
    /// Build a transform from a PROJ-style definition.
    ///
    /// `geographic` marks longlat sources whose input is in degrees.
    pub fn new(definition: &str, geographic: bool) -> Result<Self, ProjectionError> {
        let invalid = |definition: &str, e: &dyn fmt::Debug| ProjectionError::InvalidDefinition {
            definition: definition.to_string(),
            message: format!("{:?}", e),
        };

        let source = Proj::from_proj_string(definition).map_err(|e| invalid(definition, &e))?;
        let target =
            Proj::from_proj_string(WGS84_DEFINITION).map_err(|e| invalid(WGS84_DEFINITION, &e))?;

        Ok(Self {
            definition: definition.to_string(),
            source,
            target,
            geographic,
        })
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn is_geographic(&self) -> bool {
        self.geographic
    }

    /// Map `(x, y)` in native units to `(lng, lat)` degrees.
    pub fn forward(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        let mut point = if self.geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        transform(&self.source, &self.target, &mut point).map_err(|e| ProjectionError::Transform {
            x,
            y,
            message: format!("{:?}", e),
        })?;

        let (lng, lat) = (point.0.to_degrees(), point.1.to_degrees());
        if !lng.is_finite() || !lat.is_finite() {
            return Err(ProjectionError::Transform {
                x,
                y,
                message: "result is not finite".to_string(),
            });
        }
        Ok((lng, lat))
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// A transform plus the factor applied to raw coordinates before it.
#[derive(Debug)]
pub struct ResolvedProjection {
    pub transform: ProjectionTransform,
    /// Native units to the transform's input units (metres or degrees)
    pub unit_scale: f64,
}

impl ResolvedProjection {
    pub fn definition(&self) -> &str {
        self.transform.definition()
    }
}

/// Interpret a geo-key directory.
///
/// # Errors
/// - `UnknownCrs` when the keys name no model type, an EPSG code missing
///   from the database, or an unhandled coordinate transformation
/// - `UnsupportedUnits` for unit codes outside the handled set
pub fn resolve(keys: &GeoKeyDirectory) -> Result<ResolvedProjection, ProjectionError> {
    let model_type = keys.short(GT_MODEL_TYPE).or_else(|| {
        if keys.short(PROJECTED_CS_TYPE).is_some() {
            Some(MODEL_TYPE_PROJECTED)
        } else if keys.short(GEOGRAPHIC_TYPE).is_some() {
            Some(MODEL_TYPE_GEOGRAPHIC)
        } else {
            None
        }
    });

    let angular = angular_unit_factor(
        keys.short(GEOG_ANGULAR_UNITS).unwrap_or(ANGULAR_DEGREE),
        keys.double(GEOG_ANGULAR_UNIT_SIZE),
    )?;

    let (definition, unit_scale, geographic) = match model_type {
        Some(MODEL_TYPE_PROJECTED) => {
            let declared = keys
                .short(PROJ_LINEAR_UNITS)
                .map(|code| linear_unit_factor(code, keys.double(PROJ_LINEAR_UNIT_SIZE)))
                .transpose()?;

            match keys.short(PROJECTED_CS_TYPE) {
                Some(code) if code != USER_DEFINED => {
                    let proj4 = crs_definitions::from_code(code)
                        .map(|d| d.proj4)
                        .ok_or_else(|| ProjectionError::UnknownCrs(format!("EPSG:{}", code)))?;
                    let (definition, implied) = normalize_to_metres(proj4)?;
                    (definition, declared.unwrap_or(implied), false)
                }
                _ => {
                    let linear = declared.unwrap_or(1.0);
                    (user_defined_projection(keys, angular, linear)?, linear, false)
                }
            }
        }
        Some(MODEL_TYPE_GEOGRAPHIC) => (
            format!("+proj=longlat {} +no_defs", datum_params(keys)),
            angular,
            true,
        ),
        Some(other) => {
            return Err(ProjectionError::UnknownCrs(format!("model type {}", other)));
        }
        None => {
            return Err(ProjectionError::UnknownCrs(
                "no model type or CRS code in geo-keys".to_string(),
            ));
        }
    };

    debug!(definition = %definition, unit_scale, geographic, "resolved projection");

    Ok(ResolvedProjection {
        transform: ProjectionTransform::new(&definition, geographic)?,
        unit_scale,
    })
}

// =============================================================================
// Tests
// =============================================================================
