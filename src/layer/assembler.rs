//! Layer assembly from decoded rasters.

use tracing::{info, warn};

use crate::config::PaletteConfig;
use crate::error::{LoadError, RenderError};
use crate::raster::{RasterImage, RasterStore};

use super::{LayerData, LayerDescriptor, LayerKind, HOURS, MONTHS};

/// Store name of the roof mask raster.
pub const MASK: &str = "mask";

/// Store name of the annual flux raster.
pub const ANNUAL_FLUX: &str = "annualFlux";

/// Store name of the monthly flux raster.
pub const MONTHLY_FLUX: &str = "monthlyFlux";

/// Store name of the hourly shade raster for `month` (0-11).
pub fn hourly_shade_name(month: usize) -> String {
    format!("hourlyShade[{}]", month)
}

/// Build a layer from the rasters in `store`.
///
/// Bounds come from the mask raster. The layer owns copies of the rasters
/// it renders from, and `store` is left as it was.
///
/// # Errors
/// - `Store` if a raster the layer needs was never loaded
/// - `Render(BandOutOfRange)` if monthly flux lacks 12 bands or an hourly
///   shade raster lacks 24
/// - `Render(InvalidPalette)` if the configured palette is unusable
pub fn assemble(
    kind: LayerKind,
    store: &RasterStore,
    config: &PaletteConfig,
) -> Result<LayerDescriptor, LoadError> {
    let palette = config.palette_for(kind)?;
    let mask = store.get(MASK)?;

    let data = match kind {
        LayerKind::AnnualFlux => LayerData::AnnualFlux {
            flux: store.get(ANNUAL_FLUX)?.image.clone(),
        },
        LayerKind::MonthlyFlux => {
            let flux = store.get(MONTHLY_FLUX)?.image.clone();
            require_bands(&flux, MONTHS)?;
            LayerData::MonthlyFlux { flux }
        }
        LayerKind::HourlyShade => {
            let months = (0..MONTHS)
                .map(|month| -> Result<RasterImage, LoadError> {
                    let raster = &store.get(&hourly_shade_name(month))?.image;
                    require_bands(raster, HOURS)?;
                    Ok(raster.clone())
                })
                .collect::<Result<Vec<_>, _>>()?;
            LayerData::HourlyShade { months }
        }
    };

    let data_rasters: Vec<&RasterImage> = match &data {
        LayerData::AnnualFlux { flux } | LayerData::MonthlyFlux { flux } => vec![flux],
        LayerData::HourlyShade { months } => months.iter().collect(),
    };
    if data_rasters.iter().any(|r| !r.same_dimensions(&mask.image)) {
        warn!(
            layer = kind.id(),
            "data rasters differ in size from the mask, roof-only frames will fail"
        );
    }

    info!(
        layer = kind.id(),
        width = mask.image.width(),
        height = mask.image.height(),
        north = mask.bounds.north,
        south = mask.bounds.south,
        east = mask.bounds.east,
        west = mask.bounds.west,
        "assembled layer"
    );

    Ok(LayerDescriptor::new(mask.bounds, palette, mask.image.clone(), data))
}

fn require_bands(raster: &RasterImage, count: usize) -> Result<(), RenderError> {
    if raster.band_count() < count {
        return Err(RenderError::BandOutOfRange {
            band: count - 1,
            band_count: raster.band_count(),
        });
    }
    Ok(())
}
