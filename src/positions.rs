//! Canonical slice positions.
//!
//! Positions are whole continuous-space units (millimetres for MNI data)
//! derived from a volume's native grid, so there is exactly one slice per
//! physical position the grid can address.

use std::collections::{BTreeMap, BTreeSet};

use crate::affine::AffineMapper;
use crate::enums::Orientation;
use crate::error::ConfigurationError;
use crate::key::MAX_KEY_COORDINATE;

/// Ascending, duplicate-free coordinates per plane.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlicePositions {
    by_plane: BTreeMap<Orientation, Vec<i32>>,
}

impl SlicePositions {
    /// Maps every index along each axis of `shape` through `mapper` and
    /// rounds (half to even) to whole units.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::CoordinateOutOfKeyRange`] if a position could not
    /// be written into an artifact key.
    pub fn from_volume(
        mapper: &AffineMapper,
        shape: (usize, usize, usize),
    ) -> Result<Self, ConfigurationError> {
        let lens = [shape.0, shape.1, shape.2];
        let mut by_plane = BTreeMap::new();
        for plane in Orientation::ALL {
            let axis = plane.axis();
            let mut set = BTreeSet::new();
            for n in 0..lens[axis] {
                let mut index = [0i64; 3];
                index[axis] = n as i64;
                let value = mapper.to_continuous(index)[axis].round_ties_even();
                set.insert(checked_position(value)?);
            }
            by_plane.insert(plane, set.into_iter().collect());
        }
        Ok(Self { by_plane })
    }

    /// Explicit position lists; sorted and deduplicated here.
    pub fn from_map(map: BTreeMap<Orientation, Vec<i32>>) -> Result<Self, ConfigurationError> {
        let mut by_plane = BTreeMap::new();
        for plane in Orientation::ALL {
            let mut positions = map.get(&plane).cloned().unwrap_or_default();
            positions.sort_unstable();
            positions.dedup();
            for &p in &positions {
                checked_position(f64::from(p))?;
            }
            by_plane.insert(plane, positions);
        }
        Ok(Self { by_plane })
    }

    /// Five evenly spread positions per plane for quick previews.
    pub fn sample() -> Self {
        let by_plane = BTreeMap::from([
            (Orientation::Sagittal, vec![-60, -30, 0, 30, 60]),
            (Orientation::Coronal, vec![-60, -30, 0, 30, 60]),
            (Orientation::Axial, vec![-30, -15, 0, 15, 30]),
        ]);
        Self { by_plane }
    }

    pub fn positions(&self, plane: Orientation) -> &[i32] {
        self.by_plane.get(&plane).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self, plane: Orientation) -> usize {
        self.positions(plane).len()
    }

    pub fn total(&self) -> usize {
        self.by_plane.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// `(min, max)` of a plane's positions.
    pub fn bounds(&self, plane: Orientation) -> Option<(i32, i32)> {
        let p = self.positions(plane);
        Some((*p.first()?, *p.last()?))
    }

    /// Every `(plane, coordinate)` pair, sagittal first, ascending within a plane.
    pub fn iter(&self) -> impl Iterator<Item = (Orientation, i32)> + '_ {
        Orientation::ALL
            .into_iter()
            .flat_map(move |plane| self.positions(plane).iter().map(move |&c| (plane, c)))
    }
}

fn checked_position(value: f64) -> Result<i32, ConfigurationError> {
    if !value.is_finite() || value.abs() > f64::from(MAX_KEY_COORDINATE) {
        return Err(ConfigurationError::CoordinateOutOfKeyRange(value as i64));
    }
    Ok(value as i32)
}
