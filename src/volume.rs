use std::sync::Arc;

use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::affine::{AffineMapper, Coordinate, VoxelIndex};
use crate::enums::Orientation;
use crate::error::SliceError;
use crate::registry::LabelRegistry;

/// A 3D grid of samples indexed `[i, j, k]` together with the affine that
/// places it in physical space.
#[derive(Clone, Debug)]
pub struct Volume<T> {
    pub data: Array3<T>,
    pub mapper: AffineMapper,
}

/// Anatomical intensities.
pub type IntensityVolume = Volume<f32>;

/// One plane pulled out of a volume, already rotated into display order.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaneSlice<T> {
    pub orientation: Orientation,
    /// Coordinate that was requested.
    pub coordinate: i32,
    /// Voxel index the coordinate resolved to in the source volume.
    pub voxel: VoxelIndex,
    /// `(rows, cols)` display array.
    pub data: Array2<T>,
}

impl<T: Clone> Volume<T> {
    pub fn new(data: Array3<T>, mapper: AffineMapper) -> Self {
        Self { data, mapper }
    }

    /// Get the dimensions of the volume `(nx, ny, nz)`
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    pub fn mapper(&self) -> &AffineMapper {
        &self.mapper
    }

    pub fn get_slice_from_axis(&self, index: usize, orientation: Orientation) -> ArrayView2<'_, T> {
        self.data.index_axis(Axis(orientation.axis()), index)
    }

    fn len_along(&self, orientation: Orientation) -> usize {
        self.data.len_of(Axis(orientation.axis()))
    }

    fn is_valid_index(&self, index: i64, orientation: Orientation) -> bool {
        index >= 0 && (index as u64) < self.len_along(orientation) as u64
    }

    /// Extracts the plane at `coordinate` along `orientation`, resolved
    /// through this volume's own affine.
    ///
    /// The slice is rotated a quarter turn counter-clockwise so the high end
    /// of the second free axis ends up in row 0. Anatomical and label volumes
    /// go through the same rotation, which keeps their rasters aligned.
    ///
    /// # Errors
    ///
    /// [`SliceError::OutOfBounds`] if the resolved index on the fixed axis is
    /// outside the grid. Indices are never clamped or wrapped.
    pub fn extract(
        &self,
        orientation: Orientation,
        coordinate: i32,
    ) -> Result<PlaneSlice<T>, SliceError> {
        let mut point = Coordinate::origin();
        point[orientation.axis()] = f64::from(coordinate);
        let voxel = self.mapper.to_voxel(&point);
        let index = voxel[orientation.axis()];

        if !self.is_valid_index(index, orientation) {
            return Err(SliceError::OutOfBounds {
                plane: orientation,
                coordinate,
                index,
                len: self.len_along(orientation),
            });
        }

        let slice = self.get_slice_from_axis(index as usize, orientation);
        Ok(PlaneSlice {
            orientation,
            coordinate,
            voxel,
            data: rotate_quarter(slice),
        })
    }

    /// Sample at a continuous point, `None` outside the grid.
    pub fn value_at(&self, coord: &Coordinate) -> Option<T> {
        let [i, j, k] = self.mapper.to_voxel(coord);
        if i < 0 || j < 0 || k < 0 {
            return None;
        }
        self.data.get([i as usize, j as usize, k as usize]).cloned()
    }
}

/// `numpy.rot90(a, k=1)`: out[r, c] = a[c, cols - 1 - r].
fn rotate_quarter<T: Clone>(slice: ArrayView2<'_, T>) -> Array2<T> {
    let mut rotated = slice.reversed_axes();
    rotated.invert_axis(Axis(0));
    rotated.as_standard_layout().into_owned()
}

/// Categorical volume whose codes are local to `registry`.
#[derive(Clone, Debug)]
pub struct LabelVolume {
    pub volume: Volume<u32>,
    pub registry: Arc<LabelRegistry>,
}

impl LabelVolume {
    pub fn new(volume: Volume<u32>, registry: Arc<LabelRegistry>) -> Self {
        Self { volume, registry }
    }

    pub fn namespace(&self) -> &str {
        self.registry.namespace()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, array};

    fn mni_template() -> Volume<f32> {
        let data = Array3::from_shape_fn((181, 217, 181), |(i, j, k)| (i + j + k) as f32);
        let mapper =
            AffineMapper::from_spacing_origin([1.0, 1.0, 1.0], [-90.0, -108.0, -90.0]).unwrap();
        Volume::new(data, mapper)
    }

    #[test]
    fn rotation_matches_rot90() {
        let a = array![[1, 2, 3], [4, 5, 6]];
        let r = rotate_quarter(a.view());
        assert_eq!(r, array![[3, 6], [2, 5], [1, 4]]);
    }

    #[test]
    fn sagittal_origin_hits_centre_voxel() {
        let vol = mni_template();
        let slice = vol.extract(Orientation::Sagittal, 0).unwrap();
        assert_eq!(slice.voxel[0], 90);
        // (ny, nz) rotated to (nz, ny)
        assert_eq!(slice.data.dim(), (181, 217));
        // row 0 is the top of z, column 0 is j = 0
        assert_eq!(slice.data[[0, 0]], (90 + 180) as f32);
    }

    #[test]
    fn out_of_range_coordinate_is_reported() {
        let vol = mni_template();
        let err = vol.extract(Orientation::Sagittal, 200).unwrap_err();
        assert_eq!(
            err,
            SliceError::OutOfBounds {
                plane: Orientation::Sagittal,
                coordinate: 200,
                index: 290,
                len: 181,
            }
        );
    }

    #[test]
    fn edges_are_inclusive_and_one_past_is_not() {
        let vol = mni_template();
        assert_eq!(vol.extract(Orientation::Coronal, -108).unwrap().voxel[1], 0);
        assert_eq!(vol.extract(Orientation::Coronal, 108).unwrap().voxel[1], 216);
        assert!(vol.extract(Orientation::Coronal, -109).is_err());
        assert!(vol.extract(Orientation::Coronal, 109).is_err());
        assert_eq!(vol.extract(Orientation::Axial, 90).unwrap().voxel[2], 180);
        assert!(vol.extract(Orientation::Axial, 91).is_err());
    }

    #[test]
    fn value_lookup_rejects_outside_points() {
        let vol = mni_template();
        assert_eq!(vol.value_at(&Coordinate::new(-90.0, -108.0, -90.0)), Some(0.0));
        assert_eq!(vol.value_at(&Coordinate::new(-91.0, 0.0, 0.0)), None);
        assert_eq!(vol.value_at(&Coordinate::new(91.0, 0.0, 0.0)), None);
    }
}
