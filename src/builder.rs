use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, warn};
use web_time::Instant;

use crate::catalog::{
    ANATOMICAL_SOURCE, Artifact, CatalogSink, OverlayRecord, PlaneBounds, PreflightReport,
    Raster, RunSummary, SkipReason, SliceCatalog, SliceRecord, SliceStatus,
};
use crate::config::RenderOptions;
use crate::enums::Orientation;
use crate::error::{ConfigurationError, SliceError};
use crate::intensity::IntensityRasterizer;
use crate::key::ArtifactKey;
use crate::overlay::{OverlayRasterizer, OverlayTarget};
use crate::positions::SlicePositions;
use crate::registry::RegistrySet;
use crate::volume::{IntensityVolume, LabelVolume};

struct Layer<'a> {
    volume: &'a LabelVolume,
    targets: Vec<OverlayTarget>,
}

/// A target checked against its layer's registry.
#[derive(Clone, Copy)]
struct ResolvedTarget {
    global: u32,
    local: u32,
    color: [u8; 3],
}

struct ResolvedLayer<'a> {
    volume: &'a LabelVolume,
    targets: Vec<ResolvedTarget>,
}

/// What happened at one `(plane, coordinate)`.
struct PositionOutcome<'a> {
    plane: Orientation,
    coordinate: i32,
    anatomical: SliceStatus,
    /// `(namespace, status)` per overlay target.
    overlays: Vec<(&'a str, SliceStatus)>,
}

/// Renders every enumerated position of an anatomical volume, plus overlays
/// for the requested regions of each label layer, into a [`SliceCatalog`].
///
/// ```no_run
/// # use atlas_volume::{builder::SliceCatalogBuilder, config::RenderOptions};
/// # fn run(anatomical: &atlas_volume::volume::IntensityVolume,
/// #        cortical: &atlas_volume::volume::LabelVolume) -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = SliceCatalogBuilder::new(anatomical, RenderOptions::default())
///     .with_layer(cortical, atlas_volume::harvard_oxford::priority_targets()[..4].to_vec())
///     .build()?;
/// println!("{} artifacts", catalog.len());
/// # Ok(())
/// # }
/// ```
pub struct SliceCatalogBuilder<'a> {
    anatomical: &'a IntensityVolume,
    options: RenderOptions,
    positions: Option<SlicePositions>,
    layers: Vec<Layer<'a>>,
}

impl<'a> SliceCatalogBuilder<'a> {
    pub fn new(anatomical: &'a IntensityVolume, options: RenderOptions) -> Self {
        Self {
            anatomical,
            options,
            positions: None,
            layers: Vec::new(),
        }
    }

    /// Adds a label volume and the global codes to paint from it.
    pub fn with_layer(mut self, volume: &'a LabelVolume, targets: Vec<OverlayTarget>) -> Self {
        self.layers.push(Layer { volume, targets });
        self
    }

    /// Replaces the positions enumerated from the anatomical grid.
    pub fn with_positions(mut self, positions: SlicePositions) -> Self {
        self.positions = Some(positions);
        self
    }

    /// Positions this run will visit.
    pub fn positions(&self) -> Result<SlicePositions, ConfigurationError> {
        match &self.positions {
            Some(positions) => Ok(positions.clone()),
            None => SlicePositions::from_volume(self.anatomical.mapper(), self.anatomical.dim()),
        }
    }

    /// How many artifacts a run would produce at most, without rendering.
    pub fn preflight(&self) -> Result<PreflightReport, ConfigurationError> {
        let positions = self.positions()?;
        let layers = self.resolve_layers()?;
        let targets: usize = layers.iter().map(|l| l.targets.len()).sum();
        Ok(PreflightReport {
            positions: Orientation::ALL
                .into_iter()
                .map(|plane| (plane, positions.len(plane)))
                .collect(),
            anatomical_artifacts: positions.total(),
            max_overlay_artifacts: positions.total() * targets,
        })
    }

    pub fn build(&self) -> Result<SliceCatalog, ConfigurationError> {
        self.build_until(&AtomicBool::new(false))
    }

    /// Like [`build`](Self::build), but positions not yet started when `stop`
    /// is set are left out. Everything already in the catalog stays valid.
    ///
    /// # Errors
    ///
    /// Only configuration problems. Layers and targets are checked before
    /// any slice is rendered; a position whose artifact name cannot be
    /// encoded aborts the run. Per-slice failures are counted in the run
    /// summary.
    pub fn build_until(&self, stop: &AtomicBool) -> Result<SliceCatalog, ConfigurationError> {
        let start = Instant::now();
        let positions = self.positions()?;
        let layers = self.resolve_layers()?;

        info!(
            positions = positions.total(),
            layers = layers.len(),
            "Building slice catalog"
        );

        let sink = CatalogSink::new();
        let work: Vec<(Orientation, i32)> = positions.iter().collect();
        let outcomes: Vec<PositionOutcome<'a>> = work
            .into_par_iter()
            .filter_map(|(plane, coordinate)| {
                if stop.load(Ordering::Relaxed) {
                    return None;
                }
                Some(self.render_position(&sink, &positions, &layers, plane, coordinate))
            })
            .collect::<Result<_, _>>()?;

        let mut summary = RunSummary::default();
        summary.not_attempted = positions.total() - outcomes.len();
        for outcome in &outcomes {
            summary.record(
                ANATOMICAL_SOURCE,
                outcome.plane,
                outcome.coordinate,
                outcome.anatomical,
            );
            for &(namespace, status) in &outcome.overlays {
                summary.record(namespace, outcome.plane, outcome.coordinate, status);
            }
        }
        summary.find_clusters();
        for cluster in &summary.clusters {
            warn!(
                source = %cluster.source,
                plane = %cluster.plane,
                from = cluster.from,
                to = cluster.to,
                "{} consecutive positions skipped; check the volume's affine and extent",
                cluster.len
            );
        }
        summary.elapsed_ms = start.elapsed().as_millis();

        let total = summary.total();
        info!(
            produced = total.produced,
            omitted = total.omitted,
            skipped = total.skipped,
            not_attempted = summary.not_attempted,
            "Slice catalog built in {} ms",
            summary.elapsed_ms
        );

        Ok(sink.finish(summary))
    }

    fn resolve_layers(&self) -> Result<Vec<ResolvedLayer<'a>>, ConfigurationError> {
        RegistrySet::new(
            self.layers
                .iter()
                .map(|layer| layer.volume.registry.clone())
                .collect(),
        )?;

        // Slices are rotated in voxel space, so an axis running the other way
        // in a layer would mirror its overlays against the anatomy.
        let anatomical = self.anatomical.mapper().axis_signs();
        for layer in &self.layers {
            let signs = layer.volume.volume.mapper().axis_signs();
            if let Some(axis) =
                (0..3).find(|&a| anatomical[a] != 0 && signs[a] != 0 && anatomical[a] != signs[a])
            {
                return Err(ConfigurationError::AxisFlip {
                    namespace: layer.volume.namespace().to_owned(),
                    axis,
                });
            }
        }

        self.layers
            .iter()
            .map(|layer| {
                let registry = &layer.volume.registry;
                let mut seen = BTreeSet::new();
                let targets = layer
                    .targets
                    .iter()
                    .map(|target| {
                        let unknown = || ConfigurationError::UnknownTarget {
                            namespace: registry.namespace().to_owned(),
                            code: target.code,
                        };
                        let local = registry.local_code(target.code).ok_or_else(unknown)?;
                        if !seen.insert(target.code) {
                            return Err(ConfigurationError::DuplicateCode {
                                namespace: registry.namespace().to_owned(),
                                code: target.code,
                            });
                        }
                        Ok(ResolvedTarget {
                            global: target.code,
                            local,
                            color: target.color,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ResolvedLayer {
                    volume: layer.volume,
                    targets,
                })
            })
            .collect()
    }

    fn render_position(
        &self,
        sink: &CatalogSink,
        positions: &SlicePositions,
        layers: &[ResolvedLayer<'a>],
        plane: Orientation,
        coordinate: i32,
    ) -> Result<PositionOutcome<'a>, ConfigurationError> {
        let mut outcome = PositionOutcome {
            plane,
            coordinate,
            anatomical: SliceStatus::Produced,
            overlays: Vec::new(),
        };

        let rendered = self.anatomical.extract(plane, coordinate).and_then(|slice| {
            IntensityRasterizer::new(self.options.percentiles)
                .rasterize(slice.data.view())
                .map(|image| (slice.voxel, image))
        });

        let (voxel, image) = match rendered {
            Ok(rendered) => rendered,
            Err(err) => {
                log_skip(ANATOMICAL_SOURCE, &err);
                outcome.anatomical = SliceStatus::Skipped(skip_reason(&err));
                for layer in layers {
                    for _ in &layer.targets {
                        outcome.overlays.push((
                            layer_source(layer),
                            SliceStatus::Skipped(SkipReason::NoAnatomicalSlice),
                        ));
                    }
                }
                return Ok(outcome);
            }
        };

        let size = image.dimensions();
        let key = ArtifactKey::anatomical(plane, coordinate);
        let image_filename = format!("{}.png", key.stem()?);
        debug!(%plane, coordinate, ?voxel, "Rendered anatomical slice");
        sink.insert_artifact(
            key,
            Artifact {
                raster: Raster::Gray(image),
                voxel,
                coordinate,
            },
        );

        let overlay = OverlayRasterizer::new(self.options.overlay_alpha);
        let mut overlay_records = Vec::new();
        for layer in layers {
            let source = layer_source(layer);
            let label_slice = match layer.volume.volume.extract(plane, coordinate) {
                Ok(slice) => slice,
                Err(err) => {
                    log_skip(source, &err);
                    for _ in &layer.targets {
                        outcome
                            .overlays
                            .push((source, SliceStatus::Skipped(skip_reason(&err))));
                    }
                    continue;
                }
            };

            for target in &layer.targets {
                let status =
                    match overlay.rasterize(label_slice.data.view(), target.local, target.color, size) {
                        Ok(Some(image)) => {
                            sink.insert_artifact(
                                ArtifactKey::overlay(plane, coordinate, target.global),
                                Artifact {
                                    raster: Raster::Rgba(image),
                                    voxel: label_slice.voxel,
                                    coordinate,
                                },
                            );
                            overlay_records.push(OverlayRecord {
                                code: target.global,
                                namespace: source.to_owned(),
                                voxel_index: label_slice.voxel,
                            });
                            SliceStatus::Produced
                        }
                        Ok(None) => SliceStatus::Omitted,
                        Err(err) => {
                            log_skip(source, &err);
                            SliceStatus::Skipped(skip_reason(&err))
                        }
                    };
                outcome.overlays.push((source, status));
            }
        }

        let (min, max) = positions.bounds(plane).unwrap_or((coordinate, coordinate));
        sink.insert_record(SliceRecord {
            plane,
            coordinate,
            width: size.0,
            height: size.1,
            voxel_index: voxel,
            bounds: PlaneBounds { min, max },
            affine: self.anatomical.mapper().rows(),
            image_filename,
            overlays: overlay_records,
        });

        Ok(outcome)
    }
}

fn layer_source<'a>(layer: &ResolvedLayer<'a>) -> &'a str {
    let volume: &'a LabelVolume = layer.volume;
    volume.namespace()
}

fn skip_reason(err: &SliceError) -> SkipReason {
    match err {
        SliceError::OutOfBounds { .. } => SkipReason::OutOfBounds,
        SliceError::ResamplingMismatch { .. } => SkipReason::ResamplingMismatch,
    }
}

fn log_skip(source: &str, err: &SliceError) {
    match err {
        SliceError::OutOfBounds { .. } => debug!(source, "Skipping slice: {err}"),
        SliceError::ResamplingMismatch { .. } => warn!(source, "Skipping slice: {err}"),
    }
}
