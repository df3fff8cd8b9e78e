//! Rendered artifacts, their coordinate metadata and the run summary.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use image::{GrayImage, RgbaImage};
use serde::Serialize;

use crate::affine::VoxelIndex;
use crate::enums::Orientation;
use crate::key::ArtifactKey;

/// Role label used in summaries for the anatomical volume.
pub const ANATOMICAL_SOURCE: &str = "anatomical";

/// Skip runs at least this long are reported as clusters.
pub const MIN_SKIP_CLUSTER: usize = 3;

#[derive(Clone, Debug, PartialEq)]
pub enum Raster {
    Gray(GrayImage),
    Rgba(RgbaImage),
}

impl Raster {
    /// `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Raster::Gray(img) => img.dimensions(),
            Raster::Rgba(img) => img.dimensions(),
        }
    }
}

/// One rendered (plane, coordinate, volume) triple.
#[derive(Clone, Debug, PartialEq)]
pub struct Artifact {
    pub raster: Raster,
    /// Voxel index sampled in the source volume.
    pub voxel: VoxelIndex,
    pub coordinate: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PlaneBounds {
    pub min: i32,
    pub max: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OverlayRecord {
    pub code: u32,
    pub namespace: String,
    pub voxel_index: VoxelIndex,
}

/// Coordinate-mapping metadata for one rendered anatomical slice.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SliceRecord {
    pub plane: Orientation,
    pub coordinate: i32,
    pub width: u32,
    pub height: u32,
    pub voxel_index: VoxelIndex,
    pub bounds: PlaneBounds,
    pub affine: [[f64; 4]; 4],
    pub image_filename: String,
    pub overlays: Vec<OverlayRecord>,
}

/// Concurrent insertion point used while rendering. Keys are unique per
/// (plane, coordinate, role) so workers never contend for the same entry.
#[derive(Debug, Default)]
pub struct CatalogSink {
    artifacts: Mutex<BTreeMap<ArtifactKey, Artifact>>,
    records: Mutex<BTreeMap<(Orientation, i32), SliceRecord>>,
}

impl CatalogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` and keeps the existing entry if `key` is taken.
    pub fn insert_artifact(&self, key: ArtifactKey, artifact: Artifact) -> bool {
        let mut artifacts = self
            .artifacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if artifacts.contains_key(&key) {
            return false;
        }
        artifacts.insert(key, artifact);
        true
    }

    pub fn insert_record(&self, record: SliceRecord) -> bool {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (record.plane, record.coordinate);
        if records.contains_key(&key) {
            return false;
        }
        records.insert(key, record);
        true
    }

    pub fn finish(self, summary: RunSummary) -> SliceCatalog {
        SliceCatalog {
            summary,
            artifacts: self
                .artifacts
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
            records: self
                .records
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// Finished catalog, ordered by key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SliceCatalog {
    artifacts: BTreeMap<ArtifactKey, Artifact>,
    records: BTreeMap<(Orientation, i32), SliceRecord>,
    summary: RunSummary,
}

pub type CatalogParts = (
    BTreeMap<ArtifactKey, Artifact>,
    BTreeMap<(Orientation, i32), SliceRecord>,
    RunSummary,
);

impl SliceCatalog {
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn into_parts(self) -> CatalogParts {
        (self.artifacts, self.records, self.summary)
    }

    pub fn get(&self, key: &ArtifactKey) -> Option<&Artifact> {
        self.artifacts.get(key)
    }

    pub fn record(&self, plane: Orientation, coordinate: i32) -> Option<&SliceRecord> {
        self.records.get(&(plane, coordinate))
    }

    pub fn artifacts(&self) -> impl Iterator<Item = (&ArtifactKey, &Artifact)> {
        self.artifacts.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = &SliceRecord> {
        self.records.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ArtifactKey> {
        self.artifacts.keys()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Records grouped by plane, the layout of `coordinate_mappings.json`.
    pub fn mappings(&self) -> BTreeMap<&'static str, Vec<&SliceRecord>> {
        let mut out: BTreeMap<&'static str, Vec<&SliceRecord>> = BTreeMap::new();
        for record in self.records.values() {
            out.entry(record.plane.name()).or_default().push(record);
        }
        out
    }
}

/// Why a slice was not produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    OutOfBounds,
    ResamplingMismatch,
    /// The anatomical slice at this position failed, so there is no pixel
    /// grid to align an overlay to.
    NoAnatomicalSlice,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceStatus {
    Produced,
    /// Empty region; nothing to store.
    Omitted,
    Skipped(SkipReason),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SliceCounts {
    pub attempted: usize,
    pub produced: usize,
    pub omitted: usize,
    pub skipped: usize,
}

impl SliceCounts {
    fn add(&mut self, status: SliceStatus) {
        self.attempted += 1;
        match status {
            SliceStatus::Produced => self.produced += 1,
            SliceStatus::Omitted => self.omitted += 1,
            SliceStatus::Skipped(_) => self.skipped += 1,
        }
    }
}

/// Consecutive enumerated positions of one plane that were all skipped for
/// one source volume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkipCluster {
    pub source: String,
    pub plane: Orientation,
    pub from: i32,
    pub to: i32,
    pub len: usize,
}

/// Attempted / produced / omitted / skipped counts per (source, plane).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub counts: BTreeMap<String, BTreeMap<Orientation, SliceCounts>>,
    pub clusters: Vec<SkipCluster>,
    /// Positions that were never attempted because the run was stopped.
    pub not_attempted: usize,
    pub elapsed_ms: u128,
    #[serde(skip)]
    skipped_at: BTreeMap<(String, Orientation), BTreeMap<i32, bool>>,
}

impl RunSummary {
    pub(crate) fn record(&mut self, source: &str, plane: Orientation, coordinate: i32, status: SliceStatus) {
        self.counts
            .entry(source.to_owned())
            .or_default()
            .entry(plane)
            .or_default()
            .add(status);
        let skipped = matches!(status, SliceStatus::Skipped(_));
        let flag = self
            .skipped_at
            .entry((source.to_owned(), plane))
            .or_default()
            .entry(coordinate)
            .or_insert(skipped);
        *flag |= skipped;
    }

    /// Finds maximal runs of skipped positions, walking each plane's
    /// attempted positions in ascending order.
    pub(crate) fn find_clusters(&mut self) {
        let mut clusters = Vec::new();
        for ((source, plane), by_coordinate) in &self.skipped_at {
            let mut run: Vec<i32> = Vec::new();
            let mut flush = |run: &mut Vec<i32>| {
                if run.len() >= MIN_SKIP_CLUSTER {
                    clusters.push(SkipCluster {
                        source: source.clone(),
                        plane: *plane,
                        from: run[0],
                        to: run[run.len() - 1],
                        len: run.len(),
                    });
                }
                run.clear();
            };
            for (&coordinate, &skipped) in by_coordinate {
                if skipped {
                    run.push(coordinate);
                } else {
                    flush(&mut run);
                }
            }
            flush(&mut run);
        }
        self.clusters = clusters;
    }

    pub fn counts(&self, source: &str, plane: Orientation) -> SliceCounts {
        self.counts
            .get(source)
            .and_then(|planes| planes.get(&plane))
            .copied()
            .unwrap_or_default()
    }

    pub fn total(&self) -> SliceCounts {
        let mut total = SliceCounts::default();
        for c in self.counts.values().flat_map(BTreeMap::values) {
            total.attempted += c.attempted;
            total.produced += c.produced;
            total.omitted += c.omitted;
            total.skipped += c.skipped;
        }
        total
    }

    /// Plain-text report in the shape of `extraction_summary.txt`.
    pub fn to_text(&self) -> String {
        let mut out = String::from("Slice extraction summary\n");
        out.push_str(&"=".repeat(50));
        out.push_str("\n\n");
        for (source, planes) in &self.counts {
            out.push_str(&format!("{source}:\n"));
            for (plane, c) in planes {
                out.push_str(&format!(
                    "  {plane:<9} attempted {:>5}  produced {:>5}  omitted {:>5}  skipped {:>5}\n",
                    c.attempted, c.produced, c.omitted, c.skipped
                ));
            }
            out.push('\n');
        }
        for cluster in &self.clusters {
            out.push_str(&format!(
                "Skip cluster: {} {} {}..={} ({} positions)\n",
                cluster.source, cluster.plane, cluster.from, cluster.to, cluster.len
            ));
        }
        let total = self.total();
        out.push_str(&format!(
            "Total: {} attempted, {} produced, {} omitted, {} skipped, {} not attempted\n",
            total.attempted, total.produced, total.omitted, total.skipped, self.not_attempted
        ));
        out
    }
}

/// Size estimate for a run, computed before any rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PreflightReport {
    pub positions: BTreeMap<Orientation, usize>,
    pub anatomical_artifacts: usize,
    /// Upper bound; empty overlays are never stored.
    pub max_overlay_artifacts: usize,
}

impl PreflightReport {
    pub fn max_total(&self) -> usize {
        self.anatomical_artifacts + self.max_overlay_artifacts
    }
}
