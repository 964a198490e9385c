//! Configuration for the solar layer tools.
//!
//! This module provides:
//! - Command-line arguments via clap
//! - Environment variables with `SOLAR_` prefix
//! - [`PaletteConfig`], the palette constants passed to the layer assembler
//!
//! # Environment Variables
//!
//! - `SOLAR_LAYERS_FILE` - Data-layers JSON document for `render`
//! - `SOLAR_OUT_DIR` - Output directory for `render`
//! - `SOLAR_ROOF_ONLY` - Apply the roof mask (default: false)
//! - `SOLAR_MONTH` / `SOLAR_DAY` - Hourly-shade selection (default: 0 / 1)
//! - `SOLAR_ANNUAL_FLUX_MAX` - Annual flux palette maximum (default: 1800)
//! - `SOLAR_MONTHLY_FLUX_MAX` - Monthly flux palette maximum (default: 200)
//! - `SOLAR_FLUX_PALETTE` / `SOLAR_SHADE_PALETTE` - Built-in ramp names

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::RenderError;
use crate::layer::LayerKind;
use crate::render::{PaletteName, PaletteSpec};

// =============================================================================
// Default Values
// =============================================================================

/// Upper end of the annual flux palette (kWh/kW/year).
pub const DEFAULT_ANNUAL_FLUX_MAX: f64 = 1800.0;

/// Upper end of the monthly flux palette (kWh/kW/month).
pub const DEFAULT_MONTHLY_FLUX_MAX: f64 = 200.0;

/// Hourly shade frames are 0 (shade) or 1 (sun).
pub const DEFAULT_SHADE_MAX: f64 = 1.0;

/// Default hourly-shade month (January).
pub const DEFAULT_MONTH: u8 = 0;

/// Default hourly-shade day of month.
pub const DEFAULT_DAY: u8 = 1;

// =============================================================================
// Palette Configuration
// =============================================================================

/// Palette constants for every layer kind.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteConfig {
    pub annual_flux_max: f64,
    pub monthly_flux_max: f64,
    pub shade_max: f64,
    /// Ramp for the flux layers
    pub flux_palette: PaletteName,
    /// Ramp for the hourly shade layer
    pub shade_palette: PaletteName,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            annual_flux_max: DEFAULT_ANNUAL_FLUX_MAX,
            monthly_flux_max: DEFAULT_MONTHLY_FLUX_MAX,
            shade_max: DEFAULT_SHADE_MAX,
            flux_palette: PaletteName::Iron,
            shade_palette: PaletteName::Sunlight,
        }
    }
}

impl PaletteConfig {
    /// Palette used to render `kind`. Every domain starts at zero.
    pub fn palette_for(&self, kind: LayerKind) -> Result<PaletteSpec, RenderError> {
        let (name, max) = match kind {
            LayerKind::AnnualFlux => (self.flux_palette, self.annual_flux_max),
            LayerKind::MonthlyFlux => (self.flux_palette, self.monthly_flux_max),
            LayerKind::HourlyShade => (self.shade_palette, self.shade_max),
        };
        PaletteSpec::new(name.colors().to_vec(), 0.0, max)
    }

    /// Reject non-positive or non-finite maxima.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("annual_flux_max", self.annual_flux_max),
            ("monthly_flux_max", self.monthly_flux_max),
            ("shade_max", self.shade_max),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be a positive number, got {}", name, value));
            }
        }
        Ok(())
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Solar Layers - render solar-potential GeoTIFFs into map overlays.
#[derive(Parser, Debug, Clone)]
#[command(name = "solar-layers")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Decode a GeoTIFF and print its size, bounds and optionally its bands.
    Inspect(InspectConfig),

    /// Render one layer from a data-layers document into PNG frames.
    Render(RenderConfig),
}

/// Options for `inspect`.
#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    /// GeoTIFF file to decode.
    pub file: PathBuf,

    /// Include every band's values in the output.
    #[arg(long, default_value_t = false)]
    pub with_data: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl InspectConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.file.as_os_str().is_empty() {
            return Err("a GeoTIFF file path is required".to_string());
        }
        Ok(())
    }
}

/// Options for `render`.
#[derive(Args, Debug, Clone)]
pub struct RenderConfig {
    // =========================================================================
    // Input / Output
    // =========================================================================
    /// Layer to render.
    #[arg(long, value_enum)]
    pub layer: LayerKind,

    /// Data-layers JSON document; relative raster paths resolve against its directory.
    #[arg(long, env = "SOLAR_LAYERS_FILE")]
    pub layers: PathBuf,

    /// Directory receiving frame_NN.png and layer.json.
    #[arg(long, env = "SOLAR_OUT_DIR")]
    pub out: PathBuf,

    /// Render a single frame instead of all of them.
    #[arg(long)]
    pub frame: Option<usize>,

    // =========================================================================
    // Frame Selection
    // =========================================================================
    /// Hide pixels outside the roof mask.
    #[arg(long, default_value_t = false, env = "SOLAR_ROOF_ONLY")]
    pub roof_only: bool,

    /// Month for hourly shade (0 = January).
    #[arg(long, default_value_t = DEFAULT_MONTH, env = "SOLAR_MONTH")]
    pub month: u8,

    /// Day of month for hourly shade (1-31).
    #[arg(long, default_value_t = DEFAULT_DAY, env = "SOLAR_DAY")]
    pub day: u8,

    // =========================================================================
    // Palette
    // =========================================================================
    /// Annual flux value mapped to the top of the ramp.
    #[arg(long, default_value_t = DEFAULT_ANNUAL_FLUX_MAX, env = "SOLAR_ANNUAL_FLUX_MAX")]
    pub annual_flux_max: f64,

    /// Monthly flux value mapped to the top of the ramp.
    #[arg(long, default_value_t = DEFAULT_MONTHLY_FLUX_MAX, env = "SOLAR_MONTHLY_FLUX_MAX")]
    pub monthly_flux_max: f64,

    /// Ramp for flux layers.
    #[arg(long, value_enum, default_value_t = PaletteName::Iron, env = "SOLAR_FLUX_PALETTE")]
    pub flux_palette: PaletteName,

    /// Ramp for the hourly shade layer.
    #[arg(long, value_enum, default_value_t = PaletteName::Sunlight, env = "SOLAR_SHADE_PALETTE")]
    pub shade_palette: PaletteName,

    /// Favor PNG encoding speed over size.
    #[arg(long, default_value_t = false)]
    pub fast_png: bool,

    // =========================================================================
    // Logging
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl RenderConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.month > 11 {
            return Err(format!("month must be between 0 and 11, got {}", self.month));
        }
        if self.day == 0 || self.day > 31 {
            return Err(format!("day must be between 1 and 31, got {}", self.day));
        }

        if let Some(frame) = self.frame {
            let count = self.layer.frame_count();
            if frame >= count {
                return Err(format!(
                    "frame {} out of range: {} has {} frame(s)",
                    frame,
                    self.layer.id(),
                    count
                ));
            }
        }

        self.palette_config().validate()
    }

    pub fn palette_config(&self) -> PaletteConfig {
        PaletteConfig {
            annual_flux_max: self.annual_flux_max,
            monthly_flux_max: self.monthly_flux_max,
            flux_palette: self.flux_palette,
            shade_palette: self.shade_palette,
            ..PaletteConfig::default()
        }
    }

    /// Directory that relative raster locations resolve against.
    pub fn layers_root(&self) -> PathBuf {
        self.layers
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

// =============================================================================
// Tests
// =============================================================================
