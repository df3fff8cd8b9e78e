use std::fmt;

use serde::{Deserialize, Serialize};

/// Orthogonal slicing plane. Each plane fixes one axis of the continuous
/// space, which is also the voxel axis it slices along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Sagittal,
    Coronal,
    Axial,
}

impl Orientation {
    /// Every plane, in catalog order.
    pub const ALL: [Orientation; 3] = [
        Orientation::Sagittal,
        Orientation::Coronal,
        Orientation::Axial,
    ];

    /// Index of the fixed axis: x for sagittal, y for coronal, z for axial.
    pub fn axis(self) -> usize {
        match self {
            Orientation::Sagittal => 0,
            Orientation::Coronal => 1,
            Orientation::Axial => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Orientation::Sagittal => "sagittal",
            Orientation::Coronal => "coronal",
            Orientation::Axial => "axial",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a rendered artifact shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "role")]
pub enum ArtifactRole {
    Anatomical,
    /// Overlay for one region, identified by its global (namespaced) code.
    RegionOverlay { code: u32 },
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactRole::Anatomical => f.write_str("anatomical"),
            ArtifactRole::RegionOverlay { code } => write!(f, "region_{code:04}"),
        }
    }
}
