//! End-to-end layer tests: load through a mock source, render frames.

use image::RgbaImage;
use solar_layers::error::RenderError;
use solar_layers::render::{IRON_PALETTE, SUNLIGHT_PALETTE};
use solar_layers::{
    load_layer, LayerDescriptor, LayerKind, PaletteConfig, PngFrameEncoder, RenderRequest, Rgb,
};

use super::test_utils::{building_source, building_urls};

const FULL_ROOF: [u8; 4] = [1, 1, 1, 1];

async fn load(kind: LayerKind, mask: [u8; 4]) -> LayerDescriptor {
    load_layer(kind, &building_urls(), &building_source(mask), &PaletteConfig::default())
        .await
        .unwrap()
}

fn rgb(frame: &RgbaImage, x: u32, y: u32) -> Rgb {
    let pixel = frame.get_pixel(x, y);
    Rgb::new(pixel[0], pixel[1], pixel[2])
}

// =============================================================================
// Annual Flux
// =============================================================================

#[tokio::test]
async fn test_annual_flux_frame() {
    let layer = load(LayerKind::AnnualFlux, FULL_ROOF).await;
    assert_eq!(layer.frame_count(), 1);

    let frame = layer.render_frame(0, &RenderRequest::default()).unwrap();
    assert_eq!(frame.dimensions(), (2, 2));
    assert_eq!(rgb(&frame, 0, 0), IRON_PALETTE[0]);
    assert_eq!(rgb(&frame, 1, 0), IRON_PALETTE[2]);
    assert_eq!(rgb(&frame, 0, 1), IRON_PALETTE[4]);
    assert_eq!(rgb(&frame, 1, 1), IRON_PALETTE[1]);
    assert!(frame.pixels().all(|p| p[3] == 255));
}

#[tokio::test]
async fn test_roof_only_hides_unmasked_pixels() {
    let layer = load(LayerKind::AnnualFlux, [1, 0, 1, 0]).await;

    let everything = layer.render_frame(0, &RenderRequest::default()).unwrap();
    assert!(everything.pixels().all(|p| p[3] == 255));

    let roof = layer.render_frame(0, &RenderRequest::roof_only()).unwrap();
    assert_eq!(roof.get_pixel(1, 0).0, [0, 0, 0, 0]);
    assert_eq!(roof.get_pixel(1, 1).0, [0, 0, 0, 0]);
    assert_eq!(rgb(&roof, 0, 1), IRON_PALETTE[4]);
    assert_eq!(roof.get_pixel(0, 1)[3], 255);
}

#[tokio::test]
async fn test_values_above_domain_clamp() {
    let config = PaletteConfig {
        annual_flux_max: 900.0,
        ..PaletteConfig::default()
    };
    let layer = load_layer(
        LayerKind::AnnualFlux,
        &building_urls(),
        &building_source(FULL_ROOF),
        &config,
    )
    .await
    .unwrap();

    let frame = layer.render_frame(0, &RenderRequest::default()).unwrap();
    assert_eq!(rgb(&frame, 1, 0), IRON_PALETTE[4]);
    assert_eq!(rgb(&frame, 0, 1), IRON_PALETTE[4]);
}

// =============================================================================
// Monthly Flux
// =============================================================================

#[tokio::test]
async fn test_monthly_flux_frames_follow_months() {
    let layer = load(LayerKind::MonthlyFlux, FULL_ROOF).await;
    assert_eq!(layer.frame_count(), 12);

    let palette = layer.palette();
    let request = RenderRequest::default();
    let frames: Vec<RgbaImage> = layer.frames(&request).collect::<Result<_, _>>().unwrap();
    assert_eq!(frames.len(), 12);

    for (month, frame) in frames.iter().enumerate() {
        assert_eq!(rgb(frame, 0, 0), palette.color_for(month as f64 * 10.0));
    }
    assert_eq!(rgb(&frames[0], 1, 1), IRON_PALETTE[0]);
}

#[tokio::test]
async fn test_frames_are_lazy() {
    let layer = load(LayerKind::MonthlyFlux, FULL_ROOF).await;
    let request = RenderRequest::default();

    let mut frames = layer.frames(&request);
    assert!(frames.next().unwrap().is_ok());
    assert_eq!(frames.count(), 11);
}

// =============================================================================
// Hourly Shade
// =============================================================================

#[tokio::test]
async fn test_hourly_shade_selects_day_bit() {
    let layer = load(LayerKind::HourlyShade, FULL_ROOF).await;
    assert_eq!(layer.frame_count(), 24);

    let june_21 = RenderRequest::for_day(5, 21);
    let frames: Vec<RgbaImage> = layer.frames(&june_21).collect::<Result<_, _>>().unwrap();
    for (hour, frame) in frames.iter().enumerate() {
        let expected = if hour == 12 {
            SUNLIGHT_PALETTE[1]
        } else {
            SUNLIGHT_PALETTE[0]
        };
        assert_eq!(rgb(frame, 1, 1), expected, "hour {}", hour);
    }

    let june_22 = RenderRequest::for_day(5, 22);
    let noon = layer.render_frame(12, &june_22).unwrap();
    assert_eq!(rgb(&noon, 0, 0), SUNLIGHT_PALETTE[0]);

    let may_21 = RenderRequest::for_day(4, 21);
    let noon = layer.render_frame(12, &may_21).unwrap();
    assert_eq!(rgb(&noon, 0, 0), SUNLIGHT_PALETTE[0]);
}

#[tokio::test]
async fn test_hourly_shade_rejects_bad_selection() {
    let layer = load(LayerKind::HourlyShade, FULL_ROOF).await;

    assert!(matches!(
        layer.render_frame(0, &RenderRequest::for_day(12, 1)),
        Err(RenderError::InvalidSelection(_))
    ));
    assert!(matches!(
        layer.render_frame(0, &RenderRequest::for_day(0, 0)),
        Err(RenderError::InvalidSelection(_))
    ));
    assert!(matches!(
        layer.render_frame(24, &RenderRequest::default()),
        Err(RenderError::InvalidSelection(_))
    ));
}

// =============================================================================
// Summary and Encoding
// =============================================================================

#[tokio::test]
async fn test_summary_json() {
    let layer = load(LayerKind::MonthlyFlux, FULL_ROOF).await;
    let json = serde_json::to_value(layer.summary()).unwrap();

    assert_eq!(json["id"], "monthlyFlux");
    assert_eq!(json["frameCount"], 12);
    assert_eq!(json["domain"][1], 200.0);
    assert_eq!(json["palette"]["colors"][0], "00000a");
    assert!(json["bounds"]["north"].as_f64().unwrap() > json["bounds"]["south"].as_f64().unwrap());
}

#[tokio::test]
async fn test_frames_encode_as_png() {
    let layer = load(LayerKind::AnnualFlux, [1, 0, 0, 1]).await;
    let frame = layer.render_frame(0, &RenderRequest::roof_only()).unwrap();

    let png = PngFrameEncoder::new().encode(&frame).unwrap();
    let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::Png)
        .unwrap()
        .to_rgba8();
    assert_eq!(decoded, frame);
}
