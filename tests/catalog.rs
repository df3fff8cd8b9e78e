mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use atlas_volume::{
    ArtifactKey, ArtifactRole, ConfigurationError, Coordinate, Orientation, RenderOptions,
    SliceCatalogBuilder,
    catalog::SkipCluster,
    overlay::OverlayTarget,
    positions::SlicePositions,
    registry::{LabelRegistry, LookupGrid, RegistrySet},
    save::{CatalogWriter, LOOKUP_FILE, MAPPINGS_FILE, REGIONS_FILE, SUMMARY_FILE},
    volume::LabelVolume,
};
use common::*;

fn cluster_target() -> OverlayTarget {
    OverlayTarget::new(CLUSTER_CODE, [0, 255, 0])
}

#[test]
fn preflight_counts_without_rendering() {
    let anat = anatomical();
    let labels = half_resolution_labels();
    let report = SliceCatalogBuilder::new(&anat, RenderOptions::default())
        .with_layer(&labels, vec![cluster_target(), OverlayTarget::new(7, [1, 2, 3])])
        .preflight()
        .unwrap();
    assert_eq!(report.positions[&Orientation::Sagittal], 40);
    assert_eq!(report.positions[&Orientation::Coronal], 48);
    assert_eq!(report.positions[&Orientation::Axial], 40);
    assert_eq!(report.anatomical_artifacts, 128);
    assert_eq!(report.max_overlay_artifacts, 256);
    assert_eq!(report.max_total(), 384);
}

#[test]
fn rebuilding_gives_identical_catalog() {
    let anat = anatomical();
    let labels = half_resolution_labels();
    let builder = SliceCatalogBuilder::new(&anat, RenderOptions::default())
        .with_layer(&labels, vec![cluster_target()]);
    let (first_artifacts, first_records, _) = builder.build().unwrap().into_parts();
    let (second_artifacts, second_records, _) = builder.build().unwrap().into_parts();
    assert_eq!(first_artifacts, second_artifacts);
    assert_eq!(first_records, second_records);
}

#[test]
fn keys_sort_by_plane_then_coordinate() {
    let anat = anatomical();
    let catalog = SliceCatalogBuilder::new(&anat, RenderOptions::default())
        .build()
        .unwrap();
    let axial: Vec<i32> = catalog
        .keys()
        .filter(|k| k.plane == Orientation::Axial)
        .map(|k| k.coordinate)
        .collect();
    assert_eq!(axial, (-20..20).collect::<Vec<_>>());
    let stems: Vec<String> = catalog
        .keys()
        .filter(|k| k.plane == Orientation::Axial)
        .map(|k| k.stem().unwrap())
        .collect();
    let mut sorted = stems.clone();
    sorted.sort();
    assert_eq!(stems, sorted);
}

#[test]
fn stop_flag_leaves_work_unstarted() {
    let anat = anatomical();
    let stop = AtomicBool::new(true);
    let catalog = SliceCatalogBuilder::new(&anat, RenderOptions::default())
        .build_until(&stop)
        .unwrap();
    assert!(catalog.is_empty());
    assert_eq!(catalog.summary().not_attempted, 128);
}

#[test]
fn unknown_target_is_fatal() {
    let anat = anatomical();
    let labels = half_resolution_labels();
    let err = SliceCatalogBuilder::new(&anat, RenderOptions::default())
        .with_layer(&labels, vec![OverlayTarget::new(99, [0, 0, 0])])
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::UnknownTarget {
            namespace: TEST_NAMESPACE.into(),
            code: 99
        }
    );
}

#[test]
fn layers_with_colliding_codes_are_fatal() {
    let anat = anatomical();
    let a = half_resolution_labels();
    let other = Arc::new(LabelRegistry::new("other-atlas", 0, [(CLUSTER_CODE, "Elsewhere")]).unwrap());
    let b = LabelVolume::new(a.volume.clone(), other);
    let err = SliceCatalogBuilder::new(&anat, RenderOptions::default())
        .with_layer(&a, vec![])
        .with_layer(&b, vec![])
        .preflight()
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::NamespaceOverlap { code: CLUSTER_CODE, .. }
    ));
}

#[test]
fn positions_outside_a_layer_are_skipped_and_clustered() {
    let anat = anatomical();
    let labels = narrow_labels();
    let catalog = SliceCatalogBuilder::new(&anat, RenderOptions::default())
        .with_layer(&labels, vec![cluster_target()])
        .build()
        .unwrap();
    let summary = catalog.summary();

    let sagittal = summary.counts(TEST_NAMESPACE, Orientation::Sagittal);
    // x = -11 is half a label voxel below the grid and still samples its
    // first plane.
    assert_eq!(sagittal.attempted, 40);
    assert_eq!(sagittal.produced, 21);
    assert_eq!(sagittal.skipped, 19);

    let anatomical = summary.counts("anatomical", Orientation::Sagittal);
    assert_eq!((anatomical.produced, anatomical.skipped), (40, 0));

    assert_eq!(
        summary.clusters,
        vec![
            SkipCluster {
                source: TEST_NAMESPACE.into(),
                plane: Orientation::Sagittal,
                from: -20,
                to: -12,
                len: 9
            },
            SkipCluster {
                source: TEST_NAMESPACE.into(),
                plane: Orientation::Sagittal,
                from: 10,
                to: 19,
                len: 10
            },
        ]
    );
    assert!(catalog.get(&ArtifactKey::overlay(Orientation::Sagittal, -12, CLUSTER_CODE)).is_none());
    assert!(catalog.get(&ArtifactKey::overlay(Orientation::Sagittal, -11, CLUSTER_CODE)).is_some());
    assert!(catalog.get(&ArtifactKey::overlay(Orientation::Sagittal, -10, CLUSTER_CODE)).is_some());
    assert!(catalog.get(&ArtifactKey::overlay(Orientation::Sagittal, 10, CLUSTER_CODE)).is_none());
    assert!(catalog.get(&ArtifactKey::overlay(Orientation::Sagittal, 9, CLUSTER_CODE)).is_some());
}

#[test]
fn anatomical_out_of_bounds_skips_its_overlays() {
    let anat = anatomical();
    let labels = half_resolution_labels();
    let positions = SlicePositions::from_map(BTreeMap::from([(Orientation::Axial, vec![-12, 30])]))
        .unwrap();
    let catalog = SliceCatalogBuilder::new(&anat, RenderOptions::default())
        .with_positions(positions)
        .with_layer(&labels, vec![cluster_target()])
        .build()
        .unwrap();
    assert_eq!(catalog.len(), 2);
    assert!(catalog.record(Orientation::Axial, 30).is_none());
    let layer = catalog.summary().counts(TEST_NAMESPACE, Orientation::Axial);
    assert_eq!((layer.produced, layer.skipped), (1, 1));
    let anat_counts = catalog.summary().counts("anatomical", Orientation::Axial);
    assert_eq!((anat_counts.produced, anat_counts.skipped), (1, 1));
}

#[test]
fn region_lookup_reports_namespaced_hits() {
    let labels = half_resolution_labels();
    let set = RegistrySet::new(vec![labels.registry.clone()]).unwrap();
    let layers = [labels];
    let hits = set.regions_at(&Coordinate::new(-10.0, -10.0, -10.0), &layers);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].code, CLUSTER_CODE);
    assert_eq!(hits[0].name, "Cluster Region");
    assert!(set.regions_at(&Coordinate::new(0.0, 0.0, 0.0), &layers).is_empty());
    assert!(set.regions_at(&Coordinate::new(500.0, 0.0, 0.0), &layers).is_empty());
}

#[test]
fn writer_lays_out_catalog_on_disk() {
    let anat = anatomical();
    let labels = half_resolution_labels();
    let positions = SlicePositions::from_map(BTreeMap::from([
        (Orientation::Axial, vec![-12, 0]),
        (Orientation::Sagittal, vec![-10]),
    ]))
    .unwrap();
    let catalog = SliceCatalogBuilder::new(&anat, RenderOptions::default())
        .with_positions(positions)
        .with_layer(&labels, vec![cluster_target()])
        .build()
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let written = CatalogWriter::new(dir.path()).write(&catalog).unwrap();
    assert_eq!(written, catalog.len());
    assert_eq!(written, 5);

    let root = dir.path();
    assert!(root.join("slices/axial/axial_m9988.png").is_file());
    assert!(root.join("slices/axial/axial_p0000.png").is_file());
    assert!(root.join("region_masks/axial/region_0013/axial_m9988.png").is_file());
    assert!(!root.join("region_masks/axial/region_0013/axial_p0000.png").exists());
    assert!(root.join("region_masks/sagittal/region_0013/sagittal_m9990.png").is_file());

    let reloaded = image::open(root.join("slices/axial/axial_p0000.png")).unwrap();
    assert_eq!((reloaded.width(), reloaded.height()), (40, 48));

    let text = std::fs::read_to_string(root.join(MAPPINGS_FILE)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let axial = json["axial"].as_array().unwrap();
    assert_eq!(axial.len(), 2);
    assert_eq!(axial[0]["coordinate"], -12);
    assert_eq!(axial[0]["voxel_index"][2], 8);
    assert_eq!(axial[0]["bounds"]["min"], -12);
    assert_eq!(axial[0]["bounds"]["max"], 0);
    assert_eq!(axial[0]["affine"][0][3], -20.0);
    assert_eq!(axial[0]["image_filename"], "axial_m9988.png");

    let summary = std::fs::read_to_string(root.join(SUMMARY_FILE)).unwrap();
    assert!(summary.contains("anatomical:"));
    assert!(summary.contains(TEST_NAMESPACE));

    assert!(catalog
        .keys()
        .any(|k| k.role == ArtifactRole::RegionOverlay { code: CLUSTER_CODE }));
}

#[test]
fn lookup_table_keeps_only_labelled_points() {
    let labels = half_resolution_labels();
    let set = RegistrySet::new(vec![labels.registry.clone()]).unwrap();
    let layers = [labels];
    let grid = LookupGrid {
        min: [-14, -14, -14],
        max: [-6, -6, -6],
        step: 2,
    };
    let table = set.lookup_table(&layers, &grid);

    // x in {-12, -10}, y and z in {-14, -12, -10}
    assert_eq!(table.len(), 18);
    assert_eq!(table["-12,-14,-14"][0].code, CLUSTER_CODE);
    assert!(!table.contains_key("-8,-10,-10"));
    assert!(!table.contains_key("-14,-12,-12"));

    // The single code-7 voxel sits at (10, 6, 10), on the 2 mm MNI grid.
    let full = set.lookup_table(&layers, &LookupGrid::mni(2));
    assert_eq!(full.len(), 19);
    assert_eq!(full["10,6,10"][0].name, "Neighbour Region");
}

#[test]
fn writer_exports_region_tables() {
    let labels = half_resolution_labels();
    let set = RegistrySet::new(vec![labels.registry.clone()]).unwrap();
    let table = set.lookup_table(&[labels], &LookupGrid::mni(2));

    let dir = tempfile::tempdir().unwrap();
    let writer = CatalogWriter::new(dir.path().join("tables"));
    let regions_path = writer.write_regions(&set.region_list()).unwrap();
    let lookup_path = writer.write_lookup(&table).unwrap();
    assert_eq!(regions_path, dir.path().join("tables").join(REGIONS_FILE));
    assert_eq!(lookup_path, dir.path().join("tables").join(LOOKUP_FILE));

    let regions: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(regions_path).unwrap()).unwrap();
    assert_eq!(regions.as_array().unwrap().len(), 2);
    assert_eq!(regions[1]["id"], CLUSTER_CODE);
    assert_eq!(regions[1]["name"], "Cluster Region");
    assert_eq!(regions[1]["category"], TEST_NAMESPACE);
    assert_eq!(regions[1]["description"], "Test-atlas region: Cluster Region");

    let lookup: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(lookup_path).unwrap()).unwrap();
    assert_eq!(lookup.as_object().unwrap().len(), 19);
    assert_eq!(lookup["-12,-14,-14"][0]["code"], CLUSTER_CODE);
    assert_eq!(lookup["-12,-14,-14"][0]["namespace"], TEST_NAMESPACE);
}
