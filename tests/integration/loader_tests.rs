//! Loader tests: which rasters get fetched and how failures surface.

use solar_layers::error::{DecodeError, LoadError, SourceError};
use solar_layers::{load_layer, LayerKind, LocalRasterSource, PaletteConfig, SolarLayerUrls};

use super::test_utils::{building_source, building_urls, flux_tiff, mask_tiff, MockRasterSource};

const FULL_ROOF: [u8; 4] = [1, 1, 1, 1];

#[tokio::test]
async fn test_fetches_only_needed_rasters() {
    let cases = [
        (LayerKind::AnnualFlux, 2),
        (LayerKind::MonthlyFlux, 2),
        (LayerKind::HourlyShade, 13),
    ];

    for (kind, expected) in cases {
        let source = building_source(FULL_ROOF);
        load_layer(kind, &building_urls(), &source, &PaletteConfig::default())
            .await
            .unwrap();
        assert_eq!(source.fetch_count(), expected, "{}", kind.id());
    }
}

#[tokio::test]
async fn test_missing_url_fails_before_fetching() {
    let source = building_source(FULL_ROOF);
    let urls = SolarLayerUrls {
        annual_flux_url: None,
        ..building_urls()
    };

    let err = load_layer(LayerKind::AnnualFlux, &urls, &source, &PaletteConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::MissingUrl("annualFluxUrl")));
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn test_missing_raster_is_a_source_error() {
    let source = MockRasterSource::new().with_raster("mask.tif", mask_tiff(FULL_ROOF));

    let err = load_layer(
        LayerKind::AnnualFlux,
        &building_urls(),
        &source,
        &PaletteConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LoadError::Source(SourceError::NotFound(location)) if location == "annual.tif"));
}

#[tokio::test]
async fn test_undecodable_raster_names_the_layer_input() {
    let source = MockRasterSource::new()
        .with_raster("mask.tif", mask_tiff(FULL_ROOF))
        .with_raster("annual.tif", b"definitely not a tiff".to_vec());

    let err = load_layer(
        LayerKind::AnnualFlux,
        &building_urls(),
        &source,
        &PaletteConfig::default(),
    )
    .await
    .unwrap_err();
    match err {
        LoadError::Decode { name, source } => {
            assert_eq!(name, "annualFlux");
            assert!(matches!(source, DecodeError::Malformed(_)));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_monthly_flux_with_too_few_bands() {
    let source = MockRasterSource::new()
        .with_raster("mask.tif", mask_tiff(FULL_ROOF))
        .with_raster("monthly.tif", flux_tiff(&[[1.0; 4]; 6]));

    let err = load_layer(
        LayerKind::MonthlyFlux,
        &building_urls(),
        &source,
        &PaletteConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LoadError::Render(_)));
}

#[tokio::test]
async fn test_short_hourly_list_rejected() {
    let mut urls = building_urls();
    urls.hourly_shade_urls.pop();

    let err = load_layer(
        LayerKind::HourlyShade,
        &urls,
        &building_source(FULL_ROOF),
        &PaletteConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LoadError::MissingUrl("hourlyShadeUrls")));
}

#[tokio::test]
async fn test_local_source_from_data_layers_document() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("mask.tif"), mask_tiff([0, 1, 1, 0])).unwrap();
    std::fs::write(
        dir.path().join("annual.tif"),
        flux_tiff(&[[0.0, 900.0, 1800.0, 450.0]]),
    )
    .unwrap();

    let document = r#"{
        "maskUrl": "mask.tif",
        "annualFluxUrl": "annual.tif",
        "hourlyShadeUrls": []
    }"#;
    let urls: SolarLayerUrls = serde_json::from_str(document).unwrap();

    let source = LocalRasterSource::new(dir.path());
    let layer = load_layer(LayerKind::AnnualFlux, &urls, &source, &PaletteConfig::default())
        .await
        .unwrap();

    assert_eq!(layer.kind(), LayerKind::AnnualFlux);
    assert_eq!(layer.mask().value(0, 1, 0), Some(1.0));
    assert!(layer.bounds().west < layer.bounds().east);
}
