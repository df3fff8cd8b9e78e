use std::path::Path;
use std::sync::Arc;

use nalgebra::{Matrix4, Quaternion, UnitQuaternion};
use ndarray::Array3;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use thiserror::Error;
use tracing::{debug, info};

use crate::affine::AffineMapper;
use crate::error::ConfigurationError;
use crate::registry::LabelRegistry;
use crate::volume::{IntensityVolume, LabelVolume, Volume};

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::error::NiftiError),

    #[error("Expected a 3D volume, found shape {0:?}")]
    NotThreeDimensional(Vec<usize>),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Which header transform placed the grid in space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AffineSource {
    Sform,
    Qform,
    /// No usable transform; voxel sizes only.
    Pixdim,
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load an anatomical volume from a `.nii` / `.nii.gz` file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not 3D (trailing unit
    /// dimensions are accepted), or carries a singular affine.
    pub fn load_intensity(path: impl AsRef<Path>) -> Result<IntensityVolume, VolumeLoaderError> {
        let (values, shape, mapper) = Self::read(path.as_ref())?;
        let data = Array3::from_shape_vec(shape, values.into_iter().map(|v| v as f32).collect())
            .map_err(|_| Self::shape_mismatch(shape, &[]))?;
        Ok(Volume::new(data, mapper))
    }

    /// Load a label volume whose codes are local to `registry`.
    ///
    /// Stored values are rounded to the nearest integer; negative and
    /// non-finite values become background.
    pub fn load_labels(
        path: impl AsRef<Path>,
        registry: Arc<LabelRegistry>,
    ) -> Result<LabelVolume, VolumeLoaderError> {
        let (values, shape, mapper) = Self::read(path.as_ref())?;
        let codes = values.into_iter().map(Self::to_code).collect();
        let data =
            Array3::from_shape_vec(shape, codes).map_err(|_| Self::shape_mismatch(shape, &[]))?;
        Ok(LabelVolume::new(Volume::new(data, mapper), registry))
    }

    fn read(path: &Path) -> Result<(Vec<f64>, (usize, usize, usize), AffineMapper), VolumeLoaderError> {
        let obj = ReaderOptions::new().read_file(path)?;
        let header = obj.header().clone();
        let array = obj.into_volume().into_ndarray::<f64>()?;

        let full_shape = array.shape().to_vec();
        let shape = Self::spatial_shape(&full_shape)?;
        // Logical iteration order matches `[i, j, k]` row-major regardless of
        // how the file stores it.
        let values: Vec<f64> = array.iter().copied().collect();
        if values.len() != shape.0 * shape.1 * shape.2 {
            return Err(Self::shape_mismatch(shape, &full_shape).into());
        }

        let (matrix, source) = Self::affine_from_header(&header);
        let mapper = AffineMapper::new(matrix)?;
        info!(
            path = %path.display(),
            ?shape,
            ?source,
            "Loaded NIfTI volume"
        );
        debug!(affine = ?mapper.rows());

        Ok((values, shape, mapper))
    }

    fn spatial_shape(shape: &[usize]) -> Result<(usize, usize, usize), VolumeLoaderError> {
        match shape {
            [x, y, z, rest @ ..] if rest.iter().all(|&d| d == 1) => Ok((*x, *y, *z)),
            _ => Err(VolumeLoaderError::NotThreeDimensional(shape.to_vec())),
        }
    }

    fn shape_mismatch(expected: (usize, usize, usize), actual: &[usize]) -> ConfigurationError {
        ConfigurationError::ShapeMismatch {
            expected: [expected.0, expected.1, expected.2],
            actual: actual.to_vec(),
        }
    }

    fn to_code(value: f64) -> u32 {
        if value.is_finite() && value > 0.0 {
            value.round().min(f64::from(u32::MAX)) as u32
        } else {
            0
        }
    }

    /// sform if set, else qform, else a pixdim scaling.
    pub fn affine_from_header(header: &NiftiHeader) -> (Matrix4<f64>, AffineSource) {
        if header.sform_code > 0 {
            let rows = [header.srow_x, header.srow_y, header.srow_z];
            let mut m = Matrix4::identity();
            for (r, row) in rows.iter().enumerate() {
                for (c, &v) in row.iter().enumerate() {
                    m[(r, c)] = f64::from(v);
                }
            }
            return (m, AffineSource::Sform);
        }

        let spacing = [1, 2, 3].map(|d| match f64::from(header.pixdim[d]) {
            s if s > 0.0 && s.is_finite() => s,
            _ => 1.0,
        });

        if header.qform_code > 0 {
            return (Self::qform_matrix(header, spacing), AffineSource::Qform);
        }

        let mut m = Matrix4::identity();
        for axis in 0..3 {
            m[(axis, axis)] = spacing[axis];
        }
        (m, AffineSource::Pixdim)
    }

    fn qform_matrix(header: &NiftiHeader, spacing: [f64; 3]) -> Matrix4<f64> {
        let b = f64::from(header.quatern_b);
        let c = f64::from(header.quatern_c);
        let d = f64::from(header.quatern_d);
        let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(a, b, c, d))
            .to_rotation_matrix()
            .into_inner();
        let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let scale = [spacing[0], spacing[1], spacing[2] * qfac];
        let offset = [header.quatern_x, header.quatern_y, header.quatern_z].map(f64::from);

        let mut m = Matrix4::identity();
        for r in 0..3 {
            for c in 0..3 {
                m[(r, c)] = rotation[(r, c)] * scale[c];
            }
            m[(r, 3)] = offset[r];
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sform_wins_over_qform() {
        let mut header = NiftiHeader::default();
        header.sform_code = 4;
        header.qform_code = 1;
        header.srow_x = [2.0, 0.0, 0.0, -90.0];
        header.srow_y = [0.0, 2.0, 0.0, -126.0];
        header.srow_z = [0.0, 0.0, 2.0, -72.0];
        let (m, source) = VolumeLoader::affine_from_header(&header);
        assert_eq!(source, AffineSource::Sform);
        assert_eq!(m[(0, 0)], 2.0);
        assert_eq!(m[(1, 3)], -126.0);
        assert_eq!(m[(3, 3)], 1.0);
    }

    #[test]
    fn identity_quaternion_gives_scaled_grid() {
        let mut header = NiftiHeader::default();
        header.sform_code = 0;
        header.qform_code = 1;
        header.pixdim = [1.0, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0];
        header.quatern_b = 0.0;
        header.quatern_c = 0.0;
        header.quatern_d = 0.0;
        header.quatern_x = 10.0;
        header.quatern_y = 20.0;
        header.quatern_z = 30.0;
        let (m, source) = VolumeLoader::affine_from_header(&header);
        assert_eq!(source, AffineSource::Qform);
        let expected = Matrix4::new(
            2.0, 0.0, 0.0, 10.0, //
            0.0, 3.0, 0.0, 20.0, //
            0.0, 0.0, 4.0, 30.0, //
            0.0, 0.0, 0.0, 1.0,
        );
        assert!((m - expected).abs().max() < 1e-9);
    }

    #[test]
    fn negative_qfac_flips_third_axis() {
        let mut header = NiftiHeader::default();
        header.sform_code = 0;
        header.qform_code = 1;
        header.pixdim = [-1.0, 1.0, 1.0, 2.0, 0.0, 0.0, 0.0, 0.0];
        let (m, _) = VolumeLoader::affine_from_header(&header);
        assert!((m[(2, 2)] + 2.0).abs() < 1e-9);
    }

    #[test]
    fn trailing_unit_dimensions_are_accepted() {
        assert_eq!(VolumeLoader::spatial_shape(&[4, 5, 6, 1]).unwrap(), (4, 5, 6));
        assert!(matches!(
            VolumeLoader::spatial_shape(&[4, 5, 6, 2]),
            Err(VolumeLoaderError::NotThreeDimensional(_))
        ));
        assert!(VolumeLoader::spatial_shape(&[4, 5]).is_err());
    }

    #[test]
    fn label_values_round_to_codes() {
        assert_eq!(VolumeLoader::to_code(12.9999), 13);
        assert_eq!(VolumeLoader::to_code(-3.0), 0);
        assert_eq!(VolumeLoader::to_code(f64::NAN), 0);
    }
}
