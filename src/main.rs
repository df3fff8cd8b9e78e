use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use atlas_volume::{
    builder::SliceCatalogBuilder,
    config::RenderOptions,
    harvard_oxford,
    overlay::OverlayTarget,
    positions::SlicePositions,
    registry::{LabelRegistry, LookupGrid, RegistrySet},
    save::CatalogWriter,
    volume::LabelVolume,
    volume_loader::VolumeLoader,
};
use clap::Parser;
use nalgebra::Point3;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Render an anatomical template and Harvard-Oxford region overlays into
/// aligned PNG slices with coordinate metadata.
#[derive(Parser, Debug)]
#[command(author, about, version)]
struct Args {
    /// Anatomical NIfTI volume
    #[arg(short, long)]
    anatomical: PathBuf,

    /// Harvard-Oxford cortical max-probability atlas
    #[arg(long)]
    cortical: Option<PathBuf>,

    /// Harvard-Oxford subcortical max-probability atlas
    #[arg(long)]
    subcortical: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "slice_catalog")]
    output: PathBuf,

    /// JSON render options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render a handful of positions per plane instead of all of them
    #[arg(long)]
    sample: bool,

    /// Report how much would be rendered and exit
    #[arg(long)]
    dry_run: bool,

    /// List the atlas regions at a coordinate and exit
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    lookup: Option<Vec<f64>>,

    /// Write the region list and a coordinate -> region lookup table over
    /// the MNI bounding box, sampled every STEP mm, then exit
    #[arg(long, value_name = "STEP")]
    region_tables: Option<i32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("atlas_volume=info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let options = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            RenderOptions::from_json(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => RenderOptions::default(),
    };

    let anatomical = VolumeLoader::load_intensity(&args.anatomical)
        .with_context(|| format!("loading {}", args.anatomical.display()))?;

    let mut layers = Vec::new();
    let atlases = [
        (&args.cortical, harvard_oxford::cortical_registry()?),
        (&args.subcortical, harvard_oxford::subcortical_registry()?),
    ];
    for (path, registry) in atlases {
        if let Some(path) = path {
            let layer = VolumeLoader::load_labels(path, Arc::new(registry))
                .with_context(|| format!("loading {}", path.display()))?;
            layers.push(layer);
        }
    }

    if let Some(point) = &args.lookup {
        return lookup(&layers, Point3::new(point[0], point[1], point[2]));
    }

    if let Some(step) = args.region_tables {
        return region_tables(&layers, step, &CatalogWriter::new(&args.output));
    }

    let targets = harvard_oxford::priority_targets();
    let mut builder = SliceCatalogBuilder::new(&anatomical, options);
    if args.sample {
        builder = builder.with_positions(SlicePositions::sample());
    }
    for layer in &layers {
        builder = builder.with_layer(layer, targets_for(&layer.registry, &targets));
    }

    if args.dry_run {
        let report = builder.preflight()?;
        for (plane, count) in &report.positions {
            println!("{plane:<9} {count:>5} positions");
        }
        println!(
            "{} anatomical slices, up to {} overlays ({} artifacts at most)",
            report.anatomical_artifacts,
            report.max_overlay_artifacts,
            report.max_total()
        );
        return Ok(());
    }

    let catalog = builder.build()?;
    let written = CatalogWriter::new(&args.output)
        .write(&catalog)
        .with_context(|| format!("writing catalog to {}", args.output.display()))?;
    info!(written, output = %args.output.display(), "Done");
    print!("{}", catalog.summary().to_text());

    Ok(())
}

fn targets_for(registry: &LabelRegistry, targets: &[OverlayTarget]) -> Vec<OverlayTarget> {
    targets
        .iter()
        .filter(|t| registry.local_code(t.code).is_some())
        .copied()
        .collect()
}

fn lookup(layers: &[LabelVolume], point: Point3<f64>) -> Result<()> {
    let set = RegistrySet::new(layers.iter().map(|l| l.registry.clone()).collect())?;
    let hits = set.regions_at(&point, layers);
    if hits.is_empty() {
        println!("No labelled region at ({}, {}, {})", point.x, point.y, point.z);
    }
    for hit in hits {
        println!("{:>5}  {}  [{}]", hit.code, hit.name, hit.namespace);
    }
    Ok(())
}

fn region_tables(layers: &[LabelVolume], step: i32, writer: &CatalogWriter) -> Result<()> {
    let set = RegistrySet::new(layers.iter().map(|l| l.registry.clone()).collect())?;
    writer.write_regions(&set.region_list())?;
    let table = set.lookup_table(layers, &LookupGrid::mni(step));
    let path = writer.write_lookup(&table)?;
    println!("{} labelled coordinates written to {}", table.len(), path.display());
    Ok(())
}
