//! Raster byte sources.
//!
//! A [`RasterSource`] turns a location string (a path or URL from the
//! data-layers document) into the complete bytes of one GeoTIFF.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::SourceError;

// =============================================================================
// RasterSource Trait
// =============================================================================

/// Fetches whole GeoTIFF payloads.
///
/// Implementations must be shareable across tasks; the loader fetches every
/// raster of a layer concurrently from the same source.
#[async_trait]
pub trait RasterSource: Send + Sync {
    /// Fetch the bytes stored at `location`.
    async fn fetch(&self, location: &str) -> Result<Bytes, SourceError>;
}

// =============================================================================
// LocalRasterSource
// =============================================================================

/// Reads rasters from the local filesystem.
///
/// Relative locations resolve against `root`; `file://` prefixes are
/// stripped.
#[derive(Debug, Clone)]
pub struct LocalRasterSource {
    root: PathBuf,
}

impl LocalRasterSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a location.
    pub fn resolve(&self, location: &str) -> PathBuf {
        let path = Path::new(location.strip_prefix("file://").unwrap_or(location));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl RasterSource for LocalRasterSource {
    async fn fetch(&self, location: &str) -> Result<Bytes, SourceError> {
        let path = self.resolve(location);
        debug!(path = %path.display(), "reading raster");

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(SourceError::Io {
                location: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }
}
