//! Color ramps.

use serde::{Serialize, Serializer};

use crate::error::RenderError;

// =============================================================================
// Rgb
// =============================================================================

/// An opaque 8-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `RRGGBB` or `#RRGGBB`.
    pub fn from_hex(hex: &str) -> Result<Self, RenderError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(RenderError::InvalidPalette(format!("bad hex color '{}'", hex)));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| RenderError::InvalidPalette(format!("bad hex color '{}'", hex)))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Lowercase `rrggbb` without a leading `#`.
    pub fn to_hex(self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Blend towards `other`; `t` is clamped to `[0, 1]` and channels rounded.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Parse a list of hex colors.
pub fn parse_colors<S: AsRef<str>>(hex: &[S]) -> Result<Vec<Rgb>, RenderError> {
    hex.iter().map(|h| Rgb::from_hex(h.as_ref())).collect()
}

// =============================================================================
// Built-in ramps
// =============================================================================

pub const IRON_PALETTE: [Rgb; 5] = [
    Rgb::new(0x00, 0x00, 0x0a),
    Rgb::new(0x91, 0x00, 0x9c),
    Rgb::new(0xe6, 0x46, 0x16),
    Rgb::new(0xfe, 0xb4, 0x00),
    Rgb::new(0xff, 0xff, 0xf6),
];

pub const SUNLIGHT_PALETTE: [Rgb; 2] = [Rgb::new(0x21, 0x21, 0x21), Rgb::new(0xff, 0xca, 0x28)];

pub const BINARY_PALETTE: [Rgb; 2] = [Rgb::new(0x21, 0x21, 0x21), Rgb::new(0xb3, 0xe5, 0xfc)];

pub const RAINBOW_PALETTE: [Rgb; 5] = [
    Rgb::new(0x39, 0x49, 0xab),
    Rgb::new(0x81, 0xd4, 0xfa),
    Rgb::new(0x66, 0xbb, 0x6a),
    Rgb::new(0xff, 0xe0, 0x82),
    Rgb::new(0xe5, 0x39, 0x35),
];

/// Names of the built-in ramps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteName {
    Iron,
    Sunlight,
    Binary,
    Rainbow,
}

impl PaletteName {
    pub fn colors(self) -> &'static [Rgb] {
        match self {
            PaletteName::Iron => &IRON_PALETTE,
            PaletteName::Sunlight => &SUNLIGHT_PALETTE,
            PaletteName::Binary => &BINARY_PALETTE,
            PaletteName::Rainbow => &RAINBOW_PALETTE,
        }
    }
}

// =============================================================================
// PaletteSpec
// =============================================================================

/// An ordered color ramp stretched over a numeric domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaletteSpec {
    colors: Vec<Rgb>,
    domain_min: f64,
    domain_max: f64,
}

impl PaletteSpec {
    /// # Errors
    /// `InvalidPalette` when `colors` is empty or the domain is not a finite
    /// interval with `domain_min < domain_max`.
    pub fn new(colors: Vec<Rgb>, domain_min: f64, domain_max: f64) -> Result<Self, RenderError> {
        if colors.is_empty() {
            return Err(RenderError::InvalidPalette("no colors".to_string()));
        }
        if !domain_min.is_finite() || !domain_max.is_finite() || domain_min >= domain_max {
            return Err(RenderError::InvalidPalette(format!(
                "domain [{}, {}] is empty",
                domain_min, domain_max
            )));
        }
        Ok(Self {
            colors,
            domain_min,
            domain_max,
        })
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn domain_min(&self) -> f64 {
        self.domain_min
    }

    pub fn domain_max(&self) -> f64 {
        self.domain_max
    }

    /// Position of `value` in the domain, clamped to `[0, 1]`. NaN maps to 0.
    pub fn fraction(&self, value: f64) -> f64 {
        let t = (value - self.domain_min) / (self.domain_max - self.domain_min);
        if t.is_nan() {
            0.0
        } else {
            t.clamp(0.0, 1.0)
        }
    }

    /// Color at fraction `t` along the ramp.
    pub fn color_at(&self, t: f64) -> Rgb {
        let last = self.colors.len() - 1;
        if last == 0 {
            return self.colors[0];
        }

        let position = t.clamp(0.0, 1.0) * last as f64;
        let lower = (position.floor() as usize).min(last - 1);
        self.colors[lower].lerp(self.colors[lower + 1], position - lower as f64)
    }

    /// Color for a raw data value.
    #[inline]
    pub fn color_for(&self, value: f64) -> Rgb {
        self.color_at(self.fraction(value))
    }
}
