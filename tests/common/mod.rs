//! Shared fixtures for atlas-volume integration tests

#![allow(dead_code)]

use std::sync::Arc;

use atlas_volume::{
    AffineMapper, Coordinate, IntensityVolume, LabelVolume, Orientation, Volume, VoxelIndex,
    registry::LabelRegistry,
};
use ndarray::Array3;

pub const CLUSTER_CODE: u32 = 13;
pub const TEST_NAMESPACE: &str = "test-atlas";

/// 1 mm anatomical grid covering x in [-20, 20), y in [-24, 24), z in [-20, 20).
pub fn anatomical() -> IntensityVolume {
    let data = Array3::from_shape_fn((40, 48, 40), |(i, j, k)| ((i + 2 * j + 3 * k) % 17) as f32 + 1.0);
    let mapper = AffineMapper::from_spacing_origin([1.0; 3], [-20.0, -24.0, -20.0]).unwrap();
    Volume::new(data, mapper)
}

pub fn registry() -> Arc<LabelRegistry> {
    Arc::new(
        LabelRegistry::new(
            TEST_NAMESPACE,
            0,
            [(7u32, "Neighbour Region"), (CLUSTER_CODE, "Cluster Region")],
        )
        .unwrap(),
    )
}

/// Same extent as [`anatomical`] at 2 mm. Code 13 fills label voxels
/// i in 4..6, j in 5..8, k in 3..6, which is x in [-12, -8),
/// y in [-14, -8), z in [-14, -8). Code 7 fills one voxel elsewhere.
pub fn half_resolution_labels() -> LabelVolume {
    let data = Array3::from_shape_fn((20, 24, 20), |(i, j, k)| {
        if (4..6).contains(&i) && (5..8).contains(&j) && (3..6).contains(&k) {
            CLUSTER_CODE
        } else if (i, j, k) == (15, 15, 15) {
            7
        } else {
            0
        }
    });
    let mapper = AffineMapper::from_spacing_origin([2.0; 3], [-20.0, -24.0, -20.0]).unwrap();
    LabelVolume::new(Volume::new(data, mapper), registry())
}

/// 2 mm labels covering only x in [-10, 10); sagittal positions outside
/// that band cannot be extracted from it.
pub fn narrow_labels() -> LabelVolume {
    let data = Array3::from_elem((10, 24, 20), CLUSTER_CODE);
    let mapper = AffineMapper::from_spacing_origin([2.0; 3], [-10.0, -24.0, -20.0]).unwrap();
    LabelVolume::new(Volume::new(data, mapper), registry())
}

/// Anatomical voxel shown at display pixel `(row, col)` of the slice at
/// `fixed` along `plane`. Slices are rotated a quarter turn, so display
/// columns run along the first free axis and rows run backwards along the
/// second.
pub fn display_to_voxel(
    plane: Orientation,
    fixed: i64,
    dim: (usize, usize, usize),
    row: u32,
    col: u32,
) -> VoxelIndex {
    let lens = [dim.0, dim.1, dim.2];
    let axis = plane.axis();
    let free: Vec<usize> = (0..3).filter(|&a| a != axis).collect();
    let mut index = [0i64; 3];
    index[axis] = fixed;
    index[free[0]] = i64::from(col);
    index[free[1]] = lens[free[1]] as i64 - 1 - i64::from(row);
    index
}

pub fn physical(volume: &IntensityVolume, index: VoxelIndex) -> Coordinate {
    volume.mapper().to_continuous(index)
}

/// 1 mm grid whose origin sits half a voxel off whole millimetres, like a
/// template with a `-91.5` corner. Enumerated positions land between
/// voxel centres.
pub fn half_voxel_anatomical() -> IntensityVolume {
    let data = Array3::from_shape_fn((10, 12, 8), |(i, j, k)| (i * j + k) as f32);
    let mapper = AffineMapper::from_spacing_origin([1.0; 3], [-91.5, -12.5, 3.5]).unwrap();
    Volume::new(data, mapper)
}

/// [`anatomical`]'s extent at 2 mm.
pub fn coarse_anatomical() -> IntensityVolume {
    let data = Array3::from_shape_fn((20, 24, 20), |(i, j, k)| ((i + j + k) % 5) as f32);
    let mapper = AffineMapper::from_spacing_origin([2.0; 3], [-20.0, -24.0, -20.0]).unwrap();
    Volume::new(data, mapper)
}

/// 1 mm labels over [`anatomical`]'s extent with code 13 in the single
/// voxel at the origin, `(20, 24, 20)`.
pub fn single_voxel_fine_labels() -> LabelVolume {
    let mut data = Array3::zeros((40, 48, 40));
    data[[20, 24, 20]] = CLUSTER_CODE;
    let mapper = AffineMapper::from_spacing_origin([1.0; 3], [-20.0, -24.0, -20.0]).unwrap();
    LabelVolume::new(Volume::new(data, mapper), registry())
}

/// [`half_resolution_labels`] with the first voxel axis running right to
/// left, as radiological-order files store it.
pub fn mirrored_labels() -> LabelVolume {
    let labels = half_resolution_labels();
    let mapper = AffineMapper::from_rows([
        [-2.0, 0.0, 0.0, 18.0],
        [0.0, 2.0, 0.0, -24.0],
        [0.0, 0.0, 2.0, -20.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
    .unwrap();
    LabelVolume::new(Volume::new(labels.volume.data().clone(), mapper), registry())
}

/// [`half_resolution_labels`] upsampled to 1 mm by repeating each voxel.
pub fn doubled_labels() -> LabelVolume {
    let coarse = half_resolution_labels();
    let data = Array3::from_shape_fn((40, 48, 40), |(i, j, k)| coarse.volume.data()[[i / 2, j / 2, k / 2]]);
    let mapper = AffineMapper::from_spacing_origin([1.0; 3], [-20.0, -24.0, -20.0]).unwrap();
    LabelVolume::new(Volume::new(data, mapper), registry())
}
