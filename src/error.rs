use thiserror::Error;

use crate::enums::Orientation;

/// Problems with the inputs themselves. Nothing rendered from a badly
/// configured run can be trusted, so these abort the whole run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Affine matrix is not invertible")]
    DegenerateAffine,

    #[error("Registry `{namespace}` declares code {code} more than once")]
    DuplicateCode { namespace: String, code: u32 },

    #[error("Registry `{namespace}` maps code {code} past the end of the code space")]
    CodeOverflow { namespace: String, code: u32 },

    #[error("Registry `{0}` uses the reserved code 0")]
    ReservedCode(String),

    #[error("Namespace `{0}` is registered twice")]
    DuplicateNamespace(String),

    #[error("Registries `{first}` and `{second}` both claim global code {code}")]
    NamespaceOverlap {
        first: String,
        second: String,
        code: u32,
    },

    #[error("Code {code} is not defined in registry `{namespace}`")]
    UnknownTarget { namespace: String, code: u32 },

    #[error("Layer `{namespace}` runs voxel axis {axis} opposite to the anatomical volume; its overlays would be mirrored")]
    AxisFlip { namespace: String, axis: usize },

    #[error("Volume data has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        actual: Vec<usize>,
    },

    #[error("Coordinate {0} cannot be encoded in a fixed-width artifact key")]
    CoordinateOutOfKeyRange(i64),
}

/// Failure to render one (plane, coordinate, volume) triple. The run goes on
/// without it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SliceError {
    #[error("{plane} coordinate {coordinate} maps to voxel {index}, outside 0..{len}")]
    OutOfBounds {
        plane: Orientation,
        coordinate: i32,
        index: i64,
        len: usize,
    },

    #[error("Cannot resample {source_dim:?} slice onto {target_dim:?} raster")]
    ResamplingMismatch {
        source_dim: (usize, usize),
        target_dim: (u32, u32),
    },
}
