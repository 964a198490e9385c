//! Solar Layers - render solar-potential GeoTIFFs into map overlays.
//!
//! `inspect` decodes a single GeoTIFF; `render` loads a whole layer from a
//! data-layers document and writes its frames as PNG.

use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use solar_layers::{
    config::{Cli, Command, InspectConfig, RenderConfig},
    decode, load_layer, read_geotiff, resolve, wgs84_bounds, LayerDescriptor, LocalRasterSource,
    PngFrameEncoder, RenderRequest, SolarLayerUrls,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Inspect(config) => run_inspect(config).await,
        Command::Render(config) => run_render(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "solar_layers=debug"
    } else {
        "solar_layers=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Inspect Command
// =============================================================================

async fn run_inspect(config: InspectConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match inspect(&config).await {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to inspect {}: {}", config.file.display(), e);
            ExitCode::FAILURE
        }
    }
}

async fn inspect(config: &InspectConfig) -> Result<String, String> {
    let bytes = tokio::fs::read(&config.file)
        .await
        .map_err(|e| e.to_string())?;

    let value = if config.with_data {
        let geotiff = read_geotiff(&bytes).map_err(|e| e.to_string())?;
        serde_json::to_value(&geotiff).map_err(|e| e.to_string())?
    } else {
        let decoded = decode(&bytes).map_err(|e| e.to_string())?;
        let projection = resolve(&decoded.geo_keys).map_err(|e| e.to_string())?;
        let bounds = wgs84_bounds(&decoded).map_err(|e| e.to_string())?;
        let sample_types: Vec<_> = decoded
            .raster
            .bands()
            .iter()
            .map(|band| band.sample_type())
            .collect();

        serde_json::json!({
            "width": decoded.raster.width(),
            "height": decoded.raster.height(),
            "bands": decoded.raster.band_count(),
            "sampleTypes": sample_types,
            "noData": decoded.no_data,
            "crs": projection.definition(),
            "bounds": bounds,
        })
    };

    serde_json::to_string_pretty(&value).map_err(|e| e.to_string())
}

// =============================================================================
// Render Command
// =============================================================================

async fn run_render(config: RenderConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    info!("  Layer: {}", config.layer.id());
    info!("  Data layers: {}", config.layers.display());
    info!("  Output: {}", config.out.display());
    info!("  Roof only: {}", config.roof_only);

    let layer = match load(&config).await {
        Ok(layer) => layer,
        Err(e) => {
            error!("Failed to load {}: {}", config.layer.id(), e);
            return ExitCode::FAILURE;
        }
    };

    match write_frames(&config, &layer).await {
        Ok(written) => {
            info!("Wrote {} frame(s) to {}", written, config.out.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to render {}: {}", config.layer.id(), e);
            ExitCode::FAILURE
        }
    }
}

async fn load(config: &RenderConfig) -> Result<LayerDescriptor, String> {
    let document = tokio::fs::read_to_string(&config.layers)
        .await
        .map_err(|e| format!("{}: {}", config.layers.display(), e))?;
    let urls: SolarLayerUrls = serde_json::from_str(&document)
        .map_err(|e| format!("{}: {}", config.layers.display(), e))?;

    let source = LocalRasterSource::new(config.layers_root());
    load_layer(config.layer, &urls, &source, &config.palette_config())
        .await
        .map_err(|e| e.to_string())
}

/// Render the requested frames and write them with a `layer.json` summary.
async fn write_frames(config: &RenderConfig, layer: &LayerDescriptor) -> Result<usize, String> {
    tokio::fs::create_dir_all(&config.out)
        .await
        .map_err(|e| e.to_string())?;

    let request = RenderRequest {
        show_roof_only: config.roof_only,
        month: config.month,
        day: config.day,
    };
    let encoder = if config.fast_png {
        PngFrameEncoder::fast()
    } else {
        PngFrameEncoder::new()
    };

    let indices: Vec<usize> = match config.frame {
        Some(index) => vec![index],
        None => (0..layer.frame_count()).collect(),
    };

    for &index in &indices {
        let frame = layer
            .render_frame(index, &request)
            .map_err(|e| e.to_string())?;
        let png = encoder.encode(&frame).map_err(|e| e.to_string())?;
        write_file(&config.out.join(format!("frame_{:02}.png", index)), &png).await?;
    }

    let summary = serde_json::to_vec_pretty(&layer.summary()).map_err(|e| e.to_string())?;
    write_file(&config.out.join("layer.json"), &summary).await?;

    Ok(indices.len())
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), String> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| format!("{}: {}", path.display(), e))
}
