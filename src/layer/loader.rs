//! Concurrent raster loading.
//!
//! A layer needs between two and thirteen GeoTIFFs. They are fetched
//! concurrently from a [`RasterSource`] and decoded on the blocking pool,
//! then handed to the assembler through a [`RasterStore`].

use bytes::Bytes;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PaletteConfig;
use crate::error::{GeoTiffError, LoadError};
use crate::format::decode;
use crate::geo::{wgs84_bounds, GeoBounds};
use crate::io::RasterSource;
use crate::raster::{RasterStore, StoredRaster};

use super::assembler::{assemble, hourly_shade_name, ANNUAL_FLUX, MASK, MONTHLY_FLUX};
use super::{LayerDescriptor, LayerKind, MONTHS};

// =============================================================================
// Data-layers document
// =============================================================================

/// Raster locations returned by the data-layers API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolarLayerUrls {
    #[serde(default)]
    pub mask_url: Option<String>,
    #[serde(default)]
    pub annual_flux_url: Option<String>,
    #[serde(default)]
    pub monthly_flux_url: Option<String>,
    #[serde(default)]
    pub hourly_shade_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsm_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagery_quality: Option<String>,
}

fn required<'a>(url: &'a Option<String>, field: &'static str) -> Result<&'a str, LoadError> {
    url.as_deref()
        .filter(|u| !u.is_empty())
        .ok_or(LoadError::MissingUrl(field))
}

/// `(store name, location)` for every raster `kind` needs, mask first.
pub fn layer_sources(kind: LayerKind, urls: &SolarLayerUrls) -> Result<Vec<(String, String)>, LoadError> {
    let mut sources = vec![(MASK.to_string(), required(&urls.mask_url, "maskUrl")?.to_string())];

    match kind {
        LayerKind::AnnualFlux => sources.push((
            ANNUAL_FLUX.to_string(),
            required(&urls.annual_flux_url, "annualFluxUrl")?.to_string(),
        )),
        LayerKind::MonthlyFlux => sources.push((
            MONTHLY_FLUX.to_string(),
            required(&urls.monthly_flux_url, "monthlyFluxUrl")?.to_string(),
        )),
        LayerKind::HourlyShade => {
            if urls.hourly_shade_urls.len() < MONTHS
                || urls.hourly_shade_urls.iter().take(MONTHS).any(String::is_empty)
            {
                return Err(LoadError::MissingUrl("hourlyShadeUrls"));
            }
            sources.extend(
                urls.hourly_shade_urls
                    .iter()
                    .take(MONTHS)
                    .enumerate()
                    .map(|(month, url)| (hourly_shade_name(month), url.clone())),
            );
        }
    }

    Ok(sources)
}

// =============================================================================
// Loading
// =============================================================================

/// Fetch, decode and georeference one raster.
///
/// Decoding runs on the blocking pool.
pub async fn download_geotiff<S>(source: &S, name: &str, location: &str) -> Result<StoredRaster, LoadError>
where
    S: RasterSource + ?Sized,
{
    let bytes = source.fetch(location).await?;
    debug!(name, location, size = bytes.len(), "fetched raster");

    let owned_name = name.to_string();
    tokio::task::spawn_blocking(move || decode_stored(&bytes, owned_name))
        .await
        .map_err(|e| LoadError::Task(e.to_string()))?
}

fn decode_stored(bytes: &Bytes, name: String) -> Result<StoredRaster, LoadError> {
    let decoded = decode(bytes).map_err(|source| LoadError::Decode {
        name: name.clone(),
        source,
    })?;
    let bounds = wgs84_bounds(&decoded)?;
    Ok(StoredRaster {
        image: decoded.raster,
        bounds,
    })
}

/// Load every raster `kind` needs and assemble the layer.
///
/// # Errors
/// `MissingUrl` if the document lacks a needed location; otherwise the first
/// fetch, decode, projection or assembly failure.
pub async fn load_layer<S>(
    kind: LayerKind,
    urls: &SolarLayerUrls,
    source: &S,
    config: &PaletteConfig,
) -> Result<LayerDescriptor, LoadError>
where
    S: RasterSource + ?Sized,
{
    let sources = layer_sources(kind, urls)?;
    info!(layer = kind.id(), rasters = sources.len(), "loading layer");

    let rasters = try_join_all(sources.iter().map(|(name, location)| async move {
        download_geotiff(source, name, location)
            .await
            .map(|raster| (name.clone(), raster))
    }))
    .await?;

    let store = rasters
        .into_iter()
        .fold(RasterStore::builder(), |builder, (name, raster)| {
            builder.insert(name, raster.image, raster.bounds)
        })
        .build();

    assemble(kind, &store, config)
}

// =============================================================================
// Pass-through
// =============================================================================

/// Decoded raster values plus WGS84 bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoTiff {
    pub width: u32,
    pub height: u32,
    /// One row-major array per band
    pub rasters: Vec<Vec<f64>>,
    pub bounds: GeoBounds,
}

/// Decode a GeoTIFF into plain numeric arrays and its WGS84 bounds.
pub fn read_geotiff(bytes: &[u8]) -> Result<GeoTiff, GeoTiffError> {
    let decoded = decode(bytes)?;
    let bounds = wgs84_bounds(&decoded)?;
    Ok(GeoTiff {
        width: decoded.raster.width(),
        height: decoded.raster.height(),
        rasters: decoded.raster.bands().iter().map(|b| b.to_f64_vec()).collect(),
        bounds,
    })
}
