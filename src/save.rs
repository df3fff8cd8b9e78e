//! Writing a finished catalog to disk.
//!
//! ```text
//! <root>/
//!   slices/<plane>/<plane>_<coord>.png
//!   region_masks/<plane>/region_<code>/<plane>_<coord>.png
//!   coordinate_mappings.json
//!   extraction_summary.txt
//!   regions.json             (write_regions)
//!   region_lookup.json       (write_lookup)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageResult;
use rayon::prelude::*;
use thiserror::Error;
use tracing::info;

use crate::catalog::{Raster, SliceCatalog};
use crate::error::ConfigurationError;
use crate::registry::{LookupTable, RegionEntry};

pub const MAPPINGS_FILE: &str = "coordinate_mappings.json";
pub const SUMMARY_FILE: &str = "extraction_summary.txt";
pub const REGIONS_FILE: &str = "regions.json";
pub const LOOKUP_FILE: &str = "region_lookup.json";

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// A raster that can be stored as a PNG.
pub trait SavePng {
    fn save_png<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

impl SavePng for Raster {
    fn save_png<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        match self {
            Raster::Gray(img) => img.save_with_format(path, image::ImageFormat::Png),
            Raster::Rgba(img) => img.save_with_format(path, image::ImageFormat::Png),
        }
    }
}

pub struct CatalogWriter {
    root: PathBuf,
}

impl CatalogWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes every artifact plus the mapping and summary files. Returns
    /// the number of images written.
    pub fn write(&self, catalog: &SliceCatalog) -> Result<usize, SaveError> {
        let jobs = catalog
            .artifacts()
            .map(|(key, artifact)| Ok((self.root.join(key.relative_path()?), &artifact.raster)))
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        jobs.par_iter().try_for_each(|(path, raster)| -> Result<(), SaveError> {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            raster.save_png(path)?;
            Ok(())
        })?;

        fs::create_dir_all(&self.root)?;
        let mappings = serde_json::to_string_pretty(&catalog.mappings())?;
        fs::write(self.root.join(MAPPINGS_FILE), mappings)?;
        fs::write(self.root.join(SUMMARY_FILE), catalog.summary().to_text())?;

        info!(root = %self.root.display(), images = jobs.len(), "Catalog written");
        Ok(jobs.len())
    }

    /// Region list as a JSON array of `{id, name, category, description}`.
    pub fn write_regions(&self, regions: &[RegionEntry]) -> Result<PathBuf, SaveError> {
        let path = self.write_json(REGIONS_FILE, &regions)?;
        info!(path = %path.display(), regions = regions.len(), "Region list written");
        Ok(path)
    }

    pub fn write_lookup(&self, table: &LookupTable) -> Result<PathBuf, SaveError> {
        let path = self.write_json(LOOKUP_FILE, table)?;
        info!(path = %path.display(), points = table.len(), "Region lookup table written");
        Ok(path)
    }

    fn write_json<T: serde::Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf, SaveError> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(name);
        fs::write(&path, serde_json::to_string_pretty(value)?)?;
        Ok(path)
    }
}
