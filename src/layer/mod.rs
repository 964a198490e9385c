//! Solar visualization layers.
//!
//! A [`LayerDescriptor`] ties a layer's source rasters to its palette and
//! bounds, and renders frames on demand:
//!
//! | Layer          | Sources                    | Frames                     |
//! |----------------|----------------------------|----------------------------|
//! | `annualFlux`   | mask + annual flux         | 1                          |
//! | `monthlyFlux`  | mask + 12-band monthly flux| 12, one per month          |
//! | `hourlyShade`  | mask + 12 monthly rasters  | 24 per (month, day), hours |
//!
//! Hourly shade rasters carry one band per hour. Each sample packs the days
//! of the month as bits: bit `day - 1` is set when that hour of that day is
//! sunlit.

mod assembler;
mod loader;

pub use assembler::{assemble, hourly_shade_name, ANNUAL_FLUX, MASK, MONTHLY_FLUX};
pub use loader::{
    download_geotiff, layer_sources, load_layer, read_geotiff, GeoTiff, SolarLayerUrls,
};

use image::RgbaImage;
use serde::Serialize;
use tracing::debug;

use crate::error::RenderError;
use crate::geo::GeoBounds;
use crate::raster::RasterImage;
use crate::render::{render, PaletteSpec, RenderParams, Rgb};

/// Months in a monthly flux raster and in the hourly shade set.
pub const MONTHS: usize = 12;

/// Hours (bands) in an hourly shade raster.
pub const HOURS: usize = 24;

/// Highest day number a packed shade sample can address.
pub const MAX_DAY: u8 = 31;

// =============================================================================
// LayerKind
// =============================================================================

/// The closed set of supported layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum LayerKind {
    AnnualFlux,
    MonthlyFlux,
    HourlyShade,
}

impl LayerKind {
    pub const ALL: [LayerKind; 3] = [
        LayerKind::AnnualFlux,
        LayerKind::MonthlyFlux,
        LayerKind::HourlyShade,
    ];

    /// Identifier used by the data-layers API.
    pub const fn id(self) -> &'static str {
        match self {
            LayerKind::AnnualFlux => "annualFlux",
            LayerKind::MonthlyFlux => "monthlyFlux",
            LayerKind::HourlyShade => "hourlyShade",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// Frames produced per render request.
    pub const fn frame_count(self) -> usize {
        match self {
            LayerKind::AnnualFlux => 1,
            LayerKind::MonthlyFlux => MONTHS,
            LayerKind::HourlyShade => HOURS,
        }
    }

    /// Legend labels for the low and high ends of the palette.
    pub const fn labels(self) -> (&'static str, &'static str) {
        match self {
            LayerKind::AnnualFlux | LayerKind::MonthlyFlux => ("Shady", "Sunny"),
            LayerKind::HourlyShade => ("Shade", "Sun"),
        }
    }
}

// =============================================================================
// Legend / Request
// =============================================================================

/// Palette metadata for client-side legends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaletteLegend {
    pub colors: Vec<Rgb>,
    pub min: &'static str,
    pub max: &'static str,
}

/// What the caller wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    /// Hide pixels outside the roof mask
    pub show_roof_only: bool,
    /// Hourly shade month, 0-11
    pub month: u8,
    /// Hourly shade day of month, 1-31
    pub day: u8,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            show_roof_only: false,
            month: 0,
            day: 1,
        }
    }
}

impl RenderRequest {
    pub fn roof_only() -> Self {
        Self {
            show_roof_only: true,
            ..Self::default()
        }
    }

    pub fn for_day(month: u8, day: u8) -> Self {
        Self {
            month,
            day,
            ..Self::default()
        }
    }
}

/// JSON summary of a layer (written next to rendered frames).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSummary {
    pub id: LayerKind,
    pub bounds: GeoBounds,
    pub palette: PaletteLegend,
    pub domain: [f64; 2],
    pub frame_count: usize,
}

// =============================================================================
// LayerDescriptor
// =============================================================================

/// Source rasters, per layer kind.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerData {
    AnnualFlux { flux: RasterImage },
    MonthlyFlux { flux: RasterImage },
    HourlyShade { months: Vec<RasterImage> },
}

impl LayerData {
    pub fn kind(&self) -> LayerKind {
        match self {
            LayerData::AnnualFlux { .. } => LayerKind::AnnualFlux,
            LayerData::MonthlyFlux { .. } => LayerKind::MonthlyFlux,
            LayerData::HourlyShade { .. } => LayerKind::HourlyShade,
        }
    }
}

/// An assembled layer, ready to render frames.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDescriptor {
    bounds: GeoBounds,
    palette: PaletteSpec,
    mask: RasterImage,
    data: LayerData,
}

impl LayerDescriptor {
    pub(crate) fn new(bounds: GeoBounds, palette: PaletteSpec, mask: RasterImage, data: LayerData) -> Self {
        Self {
            bounds,
            palette,
            mask,
            data,
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.data.kind()
    }

    pub fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    pub fn palette(&self) -> &PaletteSpec {
        &self.palette
    }

    pub fn mask(&self) -> &RasterImage {
        &self.mask
    }

    pub fn data(&self) -> &LayerData {
        &self.data
    }

    pub fn frame_count(&self) -> usize {
        self.kind().frame_count()
    }

    pub fn legend(&self) -> PaletteLegend {
        let (min, max) = self.kind().labels();
        PaletteLegend {
            colors: self.palette.colors().to_vec(),
            min,
            max,
        }
    }

    pub fn summary(&self) -> LayerSummary {
        LayerSummary {
            id: self.kind(),
            bounds: self.bounds,
            palette: self.legend(),
            domain: [self.palette.domain_min(), self.palette.domain_max()],
            frame_count: self.frame_count(),
        }
    }

    /// Render frame `index`.
    ///
    /// Annual flux has one frame; monthly flux frame `i` is month `i`;
    /// hourly shade frame `h` is hour `h` of `request.month` / `request.day`.
    ///
    /// # Errors
    /// - `InvalidSelection` for a frame index, month or day out of range
    /// - anything [`render`] reports for the underlying rasters
    pub fn render_frame(&self, index: usize, request: &RenderRequest) -> Result<RgbaImage, RenderError> {
        let frame_count = self.frame_count();
        if index >= frame_count {
            return Err(RenderError::InvalidSelection(format!(
                "frame {} out of range: {} has {} frame(s)",
                index,
                self.kind().id(),
                frame_count
            )));
        }

        let mask = request.show_roof_only.then_some(&self.mask);

        let (data, band, bit_index) = match &self.data {
            LayerData::AnnualFlux { flux } => (flux, 0, None),
            LayerData::MonthlyFlux { flux } => (flux, index, None),
            LayerData::HourlyShade { months } => {
                validate_day(request.month, request.day)?;
                let month = months.get(request.month as usize).ok_or_else(|| {
                    RenderError::InvalidSelection(format!(
                        "month {} not loaded ({} available)",
                        request.month,
                        months.len()
                    ))
                })?;
                (month, index, Some(request.day - 1))
            }
        };

        debug!(layer = self.kind().id(), frame = index, band, ?bit_index, "rendering frame");

        render(
            data,
            RenderParams {
                band,
                mask,
                palette: &self.palette,
                bit_index,
            },
        )
    }

    /// Lazily render every frame for `request`, in order.
    pub fn frames<'a>(
        &'a self,
        request: &'a RenderRequest,
    ) -> impl Iterator<Item = Result<RgbaImage, RenderError>> + 'a {
        (0..self.frame_count()).map(move |index| self.render_frame(index, request))
    }
}

fn validate_day(month: u8, day: u8) -> Result<(), RenderError> {
    if month as usize >= MONTHS {
        return Err(RenderError::InvalidSelection(format!(
            "month must be 0-11, got {}",
            month
        )));
    }
    if day == 0 || day > MAX_DAY {
        return Err(RenderError::InvalidSelection(format!(
            "day must be 1-31, got {}",
            day
        )));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
