//! GeoTIFF decoding and bounds tests.
//!
//! Files are produced by [`GeoTiffBuilder`] so each test controls byte
//! order, container variant, chunk layout and compression.

use solar_layers::error::{DecodeError, GeoTiffError, TiffError};
use solar_layers::{decode, read_geotiff, wgs84_bounds, BandData, SampleType};

use super::test_utils::{ByteOrderType, GeoTiffBuilder, Placement, SampleKind};

fn near(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}

// =============================================================================
// Layouts
// =============================================================================

#[test]
fn test_decode_little_endian_u16_strip() {
    let data = GeoTiffBuilder::new(3, 2, SampleKind::U16)
        .add_band(vec![1.0, 2.0, 3.0, 400.0, 500.0, 65535.0])
        .build();

    let decoded = decode(&data).unwrap();
    assert_eq!(decoded.raster.width(), 3);
    assert_eq!(decoded.raster.height(), 2);
    assert_eq!(
        decoded.raster.band(0),
        Some(&BandData::U16(vec![1, 2, 3, 400, 500, 65535]))
    );
}

#[test]
fn test_decode_big_endian_float_bands() {
    let data = GeoTiffBuilder::new(2, 2, SampleKind::F32)
        .with_byte_order(ByteOrderType::BigEndian)
        .add_band(vec![0.5, 1.5, 2.5, 3.5])
        .add_band(vec![-1.0, -2.0, -3.0, -4.0])
        .build();

    let decoded = decode(&data).unwrap();
    assert_eq!(decoded.raster.band_count(), 2);
    assert_eq!(decoded.raster.band(0), Some(&BandData::F32(vec![0.5, 1.5, 2.5, 3.5])));
    assert_eq!(decoded.raster.value(1, 1, 1), Some(-4.0));
}

#[test]
fn test_decode_bigtiff() {
    for order in [ByteOrderType::LittleEndian, ByteOrderType::BigEndian] {
        let data = GeoTiffBuilder::new(2, 1, SampleKind::I32)
            .with_byte_order(order)
            .with_bigtiff(true)
            .add_band(vec![-7.0, 1_000_000.0])
            .build();

        let decoded = decode(&data).unwrap();
        assert_eq!(decoded.raster.band(0), Some(&BandData::I32(vec![-7, 1_000_000])));
    }
}

#[test]
fn test_decode_tiled_deflate_clips_edges() {
    // 5x3 image in 4x2 tiles: 2x2 tiles with padding on the right and bottom
    let first: Vec<f64> = (0..15).map(|v| v as f64).collect();
    let second: Vec<f64> = (0..15).map(|v| v as f64 * -0.5).collect();

    let data = GeoTiffBuilder::new(5, 3, SampleKind::F64)
        .with_tiles(4, 2)
        .with_deflate()
        .add_band(first.clone())
        .add_band(second.clone())
        .build();

    let decoded = decode(&data).unwrap();
    assert_eq!(decoded.raster.band(0), Some(&BandData::F64(first)));
    assert_eq!(decoded.raster.band(1), Some(&BandData::F64(second)));
    assert_eq!(decoded.raster.bands()[0].sample_type(), SampleType::F64);
}

#[test]
fn test_layouts_agree() {
    let values: Vec<f64> = (0..12).map(|v| (v * 3) as f64).collect();
    let reference = GeoTiffBuilder::new(4, 3, SampleKind::U8)
        .add_band(values.clone())
        .build();
    let variants = [
        GeoTiffBuilder::new(4, 3, SampleKind::U8)
            .with_byte_order(ByteOrderType::BigEndian)
            .with_tiles(2, 2)
            .add_band(values.clone())
            .build(),
        GeoTiffBuilder::new(4, 3, SampleKind::U8)
            .with_bigtiff(true)
            .with_deflate()
            .add_band(values.clone())
            .build(),
    ];

    let expected = decode(&reference).unwrap();
    for variant in &variants {
        let decoded = decode(variant).unwrap();
        assert_eq!(decoded.raster, expected.raster);
        assert_eq!(decoded.native_box, expected.native_box);
    }
}

// =============================================================================
// Georeferencing
// =============================================================================

#[test]
fn test_utm_bounds() {
    let data = GeoTiffBuilder::new(2, 2, SampleKind::U8)
        .with_placement(Placement::Utm10 { pixel: 50.0 })
        .add_band(vec![1.0; 4])
        .build();

    let decoded = decode(&data).unwrap();
    assert_eq!(decoded.native_box.min_x, 551000.0);
    assert_eq!(decoded.native_box.max_x, 551100.0);
    assert_eq!(decoded.native_box.min_y, 4180000.0);
    assert_eq!(decoded.native_box.max_y, 4180100.0);

    let bounds = wgs84_bounds(&decoded).unwrap();
    assert!(near(bounds.south, 37.7659, 0.001), "south = {}", bounds.south);
    assert!(near(bounds.north, 37.7668, 0.001), "north = {}", bounds.north);
    assert!(near(bounds.west, -122.4210, 0.001), "west = {}", bounds.west);
    assert!(near(bounds.east, -122.4198, 0.001), "east = {}", bounds.east);
}

#[test]
fn test_geographic_bounds_pass_through() {
    let data = GeoTiffBuilder::new(2, 2, SampleKind::U8)
        .with_placement(Placement::Geographic {
            west: -122.5,
            north: 37.8,
            pixel: 0.05,
        })
        .add_band(vec![0.0; 4])
        .build();

    let geotiff = read_geotiff(&data).unwrap();
    assert!(near(geotiff.bounds.west, -122.5, 1e-9));
    assert!(near(geotiff.bounds.east, -122.4, 1e-9));
    assert!(near(geotiff.bounds.north, 37.8, 1e-9));
    assert!(near(geotiff.bounds.south, 37.7, 1e-9));
}

#[test]
fn test_read_geotiff_returns_plain_arrays() {
    let data = GeoTiffBuilder::new(2, 1, SampleKind::U16)
        .add_band(vec![10.0, 20.0])
        .add_band(vec![30.0, 40.0])
        .build();

    let geotiff = read_geotiff(&data).unwrap();
    assert_eq!((geotiff.width, geotiff.height), (2, 1));
    assert_eq!(geotiff.rasters, vec![vec![10.0, 20.0], vec![30.0, 40.0]]);

    let json = serde_json::to_value(&geotiff).unwrap();
    assert_eq!(json["rasters"][1][0], 30.0);
    assert!(json["bounds"]["north"].is_number());
}

#[test]
fn test_no_data_marker() {
    let data = GeoTiffBuilder::new(1, 1, SampleKind::F32)
        .with_no_data("-9999")
        .add_band(vec![-9999.0])
        .build();
    assert_eq!(decode(&data).unwrap().no_data, Some(-9999.0));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_plain_tiff_without_geo_tags() {
    let data = GeoTiffBuilder::new(1, 1, SampleKind::U8)
        .with_placement(Placement::None)
        .add_band(vec![1.0])
        .build();

    assert!(matches!(decode(&data), Err(DecodeError::MissingGeoTags(_))));
    assert!(matches!(
        read_geotiff(&data),
        Err(GeoTiffError::Decode(DecodeError::MissingGeoTags(_)))
    ));
}

#[test]
fn test_truncated_file() {
    let data = GeoTiffBuilder::new(4, 4, SampleKind::F32)
        .add_band(vec![1.0; 16])
        .build();

    // Cut into the pixel data and geo-tag blobs
    let truncated = &data[..data.len() / 2];
    assert!(matches!(decode(truncated), Err(DecodeError::Malformed(_))));
}

#[test]
fn test_empty_input() {
    assert!(matches!(decode(&[]), Err(DecodeError::Malformed(_))));
}

#[test]
fn test_huge_declared_dimensions() {
    for kind in [SampleKind::F64, SampleKind::U8] {
        let data = GeoTiffBuilder::new(1, 1, kind)
            .with_declared_size(u32::MAX, u32::MAX)
            .add_band(vec![1.0])
            .build();

        assert!(matches!(decode(&data), Err(DecodeError::Malformed(_))));
    }
}

#[test]
fn test_declared_size_larger_than_pixel_data() {
    let data = GeoTiffBuilder::new(1, 1, SampleKind::F32)
        .with_declared_size(4096, 4096)
        .add_band(vec![1.0])
        .build();

    assert!(matches!(
        decode(&data),
        Err(DecodeError::Malformed(TiffError::Truncated { .. }))
    ));
}

#[test]
fn test_deflate_size_mismatch() {
    let data = GeoTiffBuilder::new(1, 1, SampleKind::U8)
        .with_declared_size(60_000, 60_000)
        .with_deflate()
        .add_band(vec![1.0])
        .build();

    assert!(matches!(
        decode(&data),
        Err(DecodeError::Malformed(TiffError::ImageTooLarge(_)))
    ));
}
