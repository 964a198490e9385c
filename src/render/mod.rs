//! Palette rendering.
//!
//! # Components
//!
//! - [`PaletteSpec`]: an ordered color ramp over a numeric domain
//! - [`render`]: maps one band of a raster to an RGBA frame, honoring an
//!   optional mask and bit index
//! - [`PngFrameEncoder`]: writes frames as PNG

mod encoder;
mod palette;
mod renderer;

pub use encoder::PngFrameEncoder;
pub use palette::{
    parse_colors, PaletteName, PaletteSpec, Rgb, BINARY_PALETTE, IRON_PALETTE, RAINBOW_PALETTE,
    SUNLIGHT_PALETTE,
};
pub use renderer::{render, RenderParams};
