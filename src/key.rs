//! Artifact keys and their file names.
//!
//! Coordinates are written with a sign letter and a fixed number of digits so
//! that sorting names as strings gives the same order as sorting the
//! coordinates as numbers:
//!
//! - `c >= 0` is written `p` followed by `c`, zero padded: `p0000`, `p0090`;
//! - `c < 0` is written `m` followed by `10000 + c`: `-1` is `m9999`,
//!   `-126` is `m9874`.
//!
//! `m` sorts before `p`, and within `m` a larger complement is a larger
//! (closer to zero) coordinate.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::enums::{ArtifactRole, Orientation};
use crate::error::ConfigurationError;

pub const KEY_DIGITS: usize = 4;
pub const MAX_KEY_COORDINATE: i32 = 9999;
const MODULUS: i32 = MAX_KEY_COORDINATE + 1;

pub fn encode_coordinate(coordinate: i32) -> Result<String, ConfigurationError> {
    match coordinate {
        0..=MAX_KEY_COORDINATE => Ok(format!("p{coordinate:0KEY_DIGITS$}")),
        c if c < 0 && c >= -MAX_KEY_COORDINATE => Ok(format!("m{:0KEY_DIGITS$}", MODULUS + c)),
        c => Err(ConfigurationError::CoordinateOutOfKeyRange(i64::from(c))),
    }
}

pub fn parse_coordinate(text: &str) -> Option<i32> {
    if text.len() != KEY_DIGITS + 1 || !text.is_ascii() {
        return None;
    }
    let (sign, digits) = text.split_at(1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i32 = digits.parse().ok()?;
    match sign {
        "p" => Some(value),
        "m" if value > 0 => Some(value - MODULUS),
        _ => None,
    }
}

/// Unique identity of one rendered artifact. Ordering is plane, then
/// coordinate (numeric), then role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub plane: Orientation,
    pub coordinate: i32,
    pub role: ArtifactRole,
}

impl ArtifactKey {
    pub fn anatomical(plane: Orientation, coordinate: i32) -> Self {
        Self {
            plane,
            coordinate,
            role: ArtifactRole::Anatomical,
        }
    }

    pub fn overlay(plane: Orientation, coordinate: i32, code: u32) -> Self {
        Self {
            plane,
            coordinate,
            role: ArtifactRole::RegionOverlay { code },
        }
    }

    /// `sagittal_m9990`, shared by an anatomical slice and all its overlays.
    pub fn stem(&self) -> Result<String, ConfigurationError> {
        Ok(format!("{}_{}", self.plane, encode_coordinate(self.coordinate)?))
    }

    /// Location relative to a catalog root.
    pub fn relative_path(&self) -> Result<PathBuf, ConfigurationError> {
        let file_name = format!("{}.png", self.stem()?);
        let plane = self.plane.name();
        Ok(match self.role {
            ArtifactRole::Anatomical => ["slices", plane, file_name.as_str()].iter().collect(),
            role @ ArtifactRole::RegionOverlay { .. } => {
                let region_dir = role.to_string();
                ["region_masks", plane, region_dir.as_str(), file_name.as_str()]
                    .iter()
                    .collect()
            }
        })
    }
}
