//! # Atlas-volume library
//!
//! This crate renders an anatomical template and one or more label atlases
//! into 2D slices that line up pixel for pixel, no matter how the volumes
//! differ in origin or resolution.
//!
//! Every volume carries its own affine. A slice position is a coordinate in
//! the shared physical space (millimetres for MNI data) and is resolved
//! separately through each volume's affine, so the same position can land on
//! different voxel indices in the anatomical and the label grid. Label
//! planes are then resampled onto the anatomical raster with nearest
//! neighbour, which keeps codes categorical.
//!
//! Volumes can be sliced in the three medical planes:
//!  - Sagittal
//!  - Coronal
//!  - Axial
//!
//! Rendering runs in parallel using rayon. Slices that fall outside a volume
//! are skipped and counted; only configuration problems (singular affines,
//! colliding label registries, unknown overlay targets) stop a run.
//!
//! # Examples
//!
//! ## Rendering a template with the Harvard-Oxford cortical atlas
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use atlas_volume::{harvard_oxford, RenderOptions, SliceCatalogBuilder, VolumeLoader, CatalogWriter};
//! let template = VolumeLoader::load_intensity("MNI152_T1_1mm.nii.gz")?;
//! let cortical = VolumeLoader::load_labels(
//!     "HarvardOxford-cort-maxprob-thr25-2mm.nii.gz",
//!     Arc::new(harvard_oxford::cortical_registry()?),
//! )?;
//! let targets = harvard_oxford::priority_targets()
//!     .into_iter()
//!     .filter(|t| cortical.registry.local_code(t.code).is_some())
//!     .collect();
//! let catalog = SliceCatalogBuilder::new(&template, RenderOptions::default())
//!     .with_layer(&cortical, targets)
//!     .build()?;
//! CatalogWriter::new("slice_catalog").write(&catalog)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod affine;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod enums;
pub mod error;
pub mod harvard_oxford;
pub mod intensity;
mod interpolator;
pub mod key;
pub mod overlay;
pub mod positions;
pub mod registry;
pub mod save;
pub mod volume;
pub mod volume_loader;

pub use affine::{AffineMapper, Coordinate, VoxelIndex};
pub use builder::SliceCatalogBuilder;
pub use catalog::{RunSummary, SliceCatalog, SliceRecord};
pub use config::RenderOptions;
pub use enums::{ArtifactRole, Orientation};
pub use error::{ConfigurationError, SliceError};
pub use key::ArtifactKey;
pub use save::CatalogWriter;
pub use volume::{IntensityVolume, LabelVolume, Volume};
pub use volume_loader::VolumeLoader;
