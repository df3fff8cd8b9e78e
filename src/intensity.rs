use image::GrayImage;
use ndarray::ArrayView2;
use rayon::prelude::*;

use crate::config::Percentiles;
use crate::error::SliceError;

/// Output value for slices with no contrast left after clipping.
pub const FLAT_GRAY: u8 = 128;

/// Turns a raw scalar plane into an 8-bit display raster.
///
/// Normalization is per slice: background below the background percentile is
/// zeroed, the rest is clipped to the low/high percentiles and stretched to
/// `0..=255`. Absolute intensities are therefore not comparable between
/// slices.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntensityRasterizer {
    percentiles: Percentiles,
}

impl IntensityRasterizer {
    pub fn new(percentiles: Percentiles) -> Self {
        Self { percentiles }
    }

    pub fn rasterize(&self, slice: ArrayView2<'_, f32>) -> Result<GrayImage, SliceError> {
        let (height, width) = slice.dim();
        if height == 0 || width == 0 {
            return Err(SliceError::ResamplingMismatch {
                source_dim: (height, width),
                target_dim: (width as u32, height as u32),
            });
        }

        let mut values: Vec<f64> = slice
            .iter()
            .map(|&v| if v.is_finite() { f64::from(v) } else { 0.0 })
            .collect();

        let background = percentile(&sorted(&values), self.percentiles.background);
        for v in values.iter_mut() {
            if *v < background {
                *v = 0.0;
            }
        }

        let cleaned = sorted(&values);
        let lo = percentile(&cleaned, self.percentiles.low);
        let hi = percentile(&cleaned, self.percentiles.high).max(lo);

        let (min, max) = values
            .iter()
            .map(|v| v.clamp(lo, hi))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), v| (a.min(v), b.max(v)));
        let range = max - min;

        let pixel_data: Vec<u8> = values
            .par_iter()
            .map(|&v| {
                if range > 0.0 {
                    Self::normalize_to_u8((v.clamp(lo, hi) - min) / range)
                } else {
                    FLAT_GRAY
                }
            })
            .collect();

        GrayImage::from_raw(width as u32, height as u32, pixel_data).ok_or(
            SliceError::ResamplingMismatch {
                source_dim: (height, width),
                target_dim: (width as u32, height as u32),
            },
        )
    }

    #[inline]
    fn normalize_to_u8(unit: f64) -> u8 {
        (unit * 255.0).round().clamp(0.0, 255.0) as u8
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut s = values.to_vec();
    s.sort_by(f64::total_cmp);
    s
}

/// Linear interpolation between order statistics, like `numpy.percentile`.
/// `sorted` must be non-empty.
pub(crate) fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}
