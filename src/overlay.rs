use image::RgbaImage;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::error::SliceError;
use crate::interpolator::Interpolator;

/// Region to paint, by global code, and its color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayTarget {
    pub code: u32,
    pub color: [u8; 3],
}

impl OverlayTarget {
    pub fn new(code: u32, color: [u8; 3]) -> Self {
        Self { code, color }
    }
}

/// Paints one label code of a label plane as a translucent RGBA raster at the
/// anatomical raster's size.
#[derive(Clone, Copy, Debug)]
pub struct OverlayRasterizer {
    alpha: u8,
}

impl Default for OverlayRasterizer {
    fn default() -> Self {
        Self { alpha: 128 }
    }
}

impl OverlayRasterizer {
    pub fn new(alpha: u8) -> Self {
        Self { alpha }
    }

    /// Renders `label_slice == code` at `(width, height)`.
    ///
    /// Returns `Ok(None)` when no output pixel is painted, either because the
    /// code does not occur in the slice or because downsampling missed every
    /// matching cell. Empty overlays are left out rather than stored as blank
    /// images.
    ///
    /// # Errors
    ///
    /// [`SliceError::ResamplingMismatch`] if either grid is empty.
    pub fn rasterize(
        &self,
        label_slice: ArrayView2<'_, u32>,
        code: u32,
        color: [u8; 3],
        (width, height): (u32, u32),
    ) -> Result<Option<RgbaImage>, SliceError> {
        let source_dim = label_slice.dim();
        if source_dim.0 == 0 || source_dim.1 == 0 || width == 0 || height == 0 {
            return Err(SliceError::ResamplingMismatch {
                source_dim,
                target_dim: (width, height),
            });
        }

        let mask = label_slice.mapv(|v| v == code);
        if !mask.iter().any(|&m| m) {
            return Ok(None);
        }

        let resampled = Interpolator::resample_nearest(&mask.view(), width, height);
        if !resampled.contains(&true) {
            return Ok(None);
        }

        let [r, g, b] = color;
        let painted = [r, g, b, self.alpha];
        let pixel_data: Vec<u8> = resampled
            .into_iter()
            .flat_map(|hit| if hit { painted } else { [0; 4] })
            .collect();

        Ok(RgbaImage::from_raw(width, height, pixel_data))
    }
}
