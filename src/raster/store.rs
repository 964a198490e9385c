//! Named rasters for a single rendering request.
//!
//! A [`RasterStore`] is built once through [`RasterStoreBuilder`] and is
//! read-only afterwards, so it can be shared across threads without locks.

use std::collections::HashMap;

use crate::error::StoreError;
use crate::geo::GeoBounds;

use super::RasterImage;

/// A decoded raster together with its reprojected WGS84 bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRaster {
    pub image: RasterImage,
    pub bounds: GeoBounds,
}

/// Collects rasters before freezing them into a [`RasterStore`].
#[derive(Debug, Default)]
pub struct RasterStoreBuilder {
    rasters: HashMap<String, StoredRaster>,
}

impl RasterStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raster under `name`, replacing any earlier entry.
    pub fn insert(mut self, name: impl Into<String>, image: RasterImage, bounds: GeoBounds) -> Self {
        self.rasters
            .insert(name.into(), StoredRaster { image, bounds });
        self
    }

    pub fn build(self) -> RasterStore {
        RasterStore {
            rasters: self.rasters,
        }
    }
}

/// Read-only collection of named rasters.
#[derive(Debug, Default)]
pub struct RasterStore {
    rasters: HashMap<String, StoredRaster>,
}

impl RasterStore {
    pub fn builder() -> RasterStoreBuilder {
        RasterStoreBuilder::new()
    }

    /// Look up a raster by name.
    ///
    /// # Errors
    /// `StoreError::NotFound` if nothing was registered under `name`.
    pub fn get(&self, name: &str) -> Result<&StoredRaster, StoreError> {
        self.rasters
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rasters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rasters.is_empty()
    }
}
