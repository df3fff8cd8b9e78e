//! Voxel index <-> continuous coordinate mapping for a single volume.

use nalgebra::{Matrix4, Point3, Vector4};

use crate::error::ConfigurationError;

/// Signed voxel index. Signed so that lookups falling off the low edge of a
/// grid stay representable and can be rejected by the caller.
pub type VoxelIndex = [i64; 3];

/// Point in the shared physical space.
pub type Coordinate = Point3<f64>;

/// Components this close to an integer are treated as that integer before
/// truncation.
const SNAP_EPSILON: f64 = 1e-6;

/// Smallest determinant accepted as invertible.
const MIN_DETERMINANT: f64 = 1e-12;

/// Forward and inverse affine of one volume. Every volume carries its own;
/// mappers are never shared between grids of different origin or resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct AffineMapper {
    forward: Matrix4<f64>,
    inverse: Matrix4<f64>,
}

impl AffineMapper {
    /// Inverts `forward` once up front.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::DegenerateAffine`] if the matrix has non-finite
    /// entries or no usable inverse.
    pub fn new(forward: Matrix4<f64>) -> Result<Self, ConfigurationError> {
        if forward.iter().any(|v| !v.is_finite())
            || forward.determinant().abs() < MIN_DETERMINANT
        {
            return Err(ConfigurationError::DegenerateAffine);
        }
        let inverse = forward
            .try_inverse()
            .ok_or(ConfigurationError::DegenerateAffine)?;
        Ok(Self { forward, inverse })
    }

    /// Row-major rows, as stored in a NIfTI sform.
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Result<Self, ConfigurationError> {
        Self::new(Matrix4::from_fn(|r, c| rows[r][c]))
    }

    /// Axis-aligned affine: `coord = spacing * index + origin` per axis.
    pub fn from_spacing_origin(
        spacing: [f64; 3],
        origin: [f64; 3],
    ) -> Result<Self, ConfigurationError> {
        let mut m = Matrix4::identity();
        for axis in 0..3 {
            m[(axis, axis)] = spacing[axis];
            m[(axis, 3)] = origin[axis];
        }
        Self::new(m)
    }

    /// Direction of each voxel axis along the physical axis of the same
    /// index: `1`, `-1`, or `0` when that diagonal entry vanishes (permuted
    /// axes).
    pub fn axis_signs(&self) -> [i8; 3] {
        [0, 1, 2].map(|a| {
            let v = self.forward[(a, a)];
            if v.abs() < MIN_DETERMINANT {
                0
            } else if v > 0.0 {
                1
            } else {
                -1
            }
        })
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.forward
    }

    /// Row-major copy of the forward matrix for metadata.
    pub fn rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = self.forward[(r, c)];
            }
        }
        rows
    }

    pub fn to_continuous(&self, index: VoxelIndex) -> Coordinate {
        let h = self.forward
            * Vector4::new(index[0] as f64, index[1] as f64, index[2] as f64, 1.0);
        Point3::new(h[0], h[1], h[2])
    }

    /// Inverse mapping, truncated toward zero in voxel space. No clamping.
    pub fn to_voxel(&self, coord: &Coordinate) -> VoxelIndex {
        let h = self.inverse * Vector4::new(coord.x, coord.y, coord.z, 1.0);
        [truncate(h[0]), truncate(h[1]), truncate(h[2])]
    }
}

#[inline]
fn truncate(v: f64) -> i64 {
    let nearest = v.round();
    if (v - nearest).abs() < SNAP_EPSILON {
        nearest as i64
    } else {
        v.trunc() as i64
    }
}
