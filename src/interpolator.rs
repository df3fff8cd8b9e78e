use ndarray::ArrayView2;
use rayon::prelude::*;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Source cell whose centre is nearest to the centre of destination cell `dst`.
    #[inline]
    pub(crate) fn nearest_source_index(dst: u32, dst_len: u32, src_len: usize) -> usize {
        let pos = (dst as f64 + 0.5) * src_len as f64 / dst_len as f64;
        (pos.floor() as usize).min(src_len - 1)
    }

    /// Nearest-neighbour resample of `slice` onto a `width` x `height` grid,
    /// row-major. Both grids must be non-empty.
    pub(crate) fn resample_nearest<T>(slice: &ArrayView2<'_, T>, width: u32, height: u32) -> Vec<T>
    where
        T: Copy + Send + Sync,
    {
        let (slice_height, slice_width) = slice.dim();
        let columns: Vec<usize> = (0..width)
            .map(|x| Self::nearest_source_index(x, width, slice_width))
            .collect();

        (0..height)
            .into_par_iter()
            .flat_map_iter(|y| {
                let src_y = Self::nearest_source_index(y, height, slice_height);
                let row = slice.row(src_y);
                columns.iter().map(move |&src_x| row[src_x]).collect::<Vec<T>>()
            })
            .collect()
    }
}
