//! Tiled execution of field computations.
//!
//! Each field is a pure function of the fields it reads. The executor decides
//! only where the values land: a field is either written once into an owned
//! plane ([`Materialization::Materialized`]) or recomputed inside the row
//! segment of its consumer ([`Materialization::Fused`]).
//!
//! Window sums and resampled planes are always materialized. The pointwise
//! products `I·I` and `I·p` are always fused into the horizontal pass that
//! consumes them. The regression coefficients are configurable: the slope
//! `a` through [`Schedule::slope`] and the intercept `b` through
//! [`Schedule::intercept`].
//!
//! A materialized field is split into row bands of one tile height. Bands are
//! dispatched to rayon workers; inside a band, tiles are walked column by
//! column and each tile row is handed to the kernel as a disjoint output slice.
//! Every call returns only after all bands are written, which is the barrier
//! between pipeline stages.

use crate::error::GuidedFilterError;
use image::Luma;
use imageproc::definitions::Image;
use log::trace;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Whether a field is stored in full or recomputed at its point of use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Materialization {
    /// Computed once over its whole extent into an owned plane.
    Materialized,
    /// Recomputed per row segment inside the consumer; never allocated at full size.
    #[default]
    Fused,
}

/// Tile geometry and parallelism used to evaluate the pipeline.
///
/// Changing the schedule never changes the result: every tile reads only
/// immutable source fields and writes only its own output region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Tile width for window sums, resampled planes and the output image
    pub tile_width: u32,
    /// Tile height for window sums, resampled planes and the output image
    pub tile_height: u32,
    /// Tile width for the horizontal-sum intermediates
    pub sum_tile_width: u32,
    /// Tile height for the horizontal-sum intermediates
    pub sum_tile_height: u32,
    /// Lane width of the vectorized inner loops
    pub lanes: usize,
    /// Dispatch row bands to worker threads (requires the `rayon` feature)
    pub parallel: bool,
    /// Storage policy of the regression slope `a`
    pub slope: Materialization,
    /// Storage policy of the regression intercept `b`
    pub intercept: Materialization,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            tile_width: 64,
            tile_height: 64,
            sum_tile_width: 128,
            sum_tile_height: 64,
            lanes: 8,
            parallel: true,
            slope: Materialization::Fused,
            intercept: Materialization::Fused,
        }
    }
}

impl Schedule {
    /// Default tiling evaluated on the calling thread only.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    pub const fn with_tiles(mut self, tile_width: u32, tile_height: u32) -> Self {
        self.tile_width = tile_width;
        self.tile_height = tile_height;
        self
    }

    pub const fn with_slope(mut self, slope: Materialization) -> Self {
        self.slope = slope;
        self
    }

    pub const fn with_intercept(mut self, intercept: Materialization) -> Self {
        self.intercept = intercept;
        self
    }

    pub fn validate(&self) -> Result<(), GuidedFilterError> {
        if self.tile_width == 0
            || self.tile_height == 0
            || self.sum_tile_width == 0
            || self.sum_tile_height == 0
        {
            return Err(GuidedFilterError::InvalidParameter(
                "tile dimensions must be non-zero".to_string(),
            ));
        }
        if self.lanes == 0 {
            return Err(GuidedFilterError::InvalidParameter(
                "lane width must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which tile geometry of the [`Schedule`] a field is evaluated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tiling {
    Output,
    HorizontalSum,
}

/// Evaluates kernels over tiled, disjoint output regions.
#[derive(Debug, Clone, Copy)]
pub struct Executor {
    schedule: Schedule,
}

impl Executor {
    pub const fn new(schedule: Schedule) -> Self {
        Self { schedule }
    }

    pub const fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub const fn lanes(&self) -> usize {
        self.schedule.lanes
    }

    const fn tile(&self, tiling: Tiling) -> (usize, usize) {
        match tiling {
            Tiling::Output => (
                self.schedule.tile_width as usize,
                self.schedule.tile_height as usize,
            ),
            Tiling::HorizontalSum => (
                self.schedule.sum_tile_width as usize,
                self.schedule.sum_tile_height as usize,
            ),
        }
    }

    /// Materializes a single-channel float field of the given extent.
    ///
    /// `kernel(scratch, x0, y, out)` must fill `out` with the field values at
    /// `(x0 + i, y)`. `scratch` is a worker-local buffer the kernel may resize
    /// freely.
    pub fn materialize<K>(
        &self,
        field: &'static str,
        width: u32,
        height: u32,
        tiling: Tiling,
        kernel: K,
    ) -> Image<Luma<f32>>
    where
        K: Fn(&mut Vec<f32>, u32, u32, &mut [f32]) + Sync,
    {
        let mut plane = Image::new(width, height);
        self.run(field, &mut *plane, width, height, 1, tiling, kernel);
        plane
    }

    /// Runs `kernel` over every tile row of an interleaved buffer.
    ///
    /// `buffer` holds `height` rows of `width * channels` elements; the slice
    /// handed to the kernel covers `channels` elements per pixel.
    #[allow(clippy::too_many_arguments)]
    pub fn run<T, K>(
        &self,
        field: &'static str,
        buffer: &mut [T],
        width: u32,
        height: u32,
        channels: usize,
        tiling: Tiling,
        kernel: K,
    ) where
        T: Send,
        K: Fn(&mut Vec<f32>, u32, u32, &mut [T]) + Sync,
    {
        if buffer.is_empty() {
            return;
        }
        debug_assert_eq!(buffer.len(), width as usize * height as usize * channels);

        let (tile_width, tile_height) = self.tile(tiling);
        let band_len = width as usize * channels * tile_height;
        trace!(
            "{field}: {width}x{height}x{channels} in {tile_width}x{tile_height} tiles, parallel={}",
            self.schedule.parallel
        );

        #[cfg(feature = "rayon")]
        {
            if self.schedule.parallel {
                buffer
                    .par_chunks_mut(band_len)
                    .enumerate()
                    .for_each_init(Vec::new, |scratch, (band, rows)| {
                        process_band(
                            &kernel,
                            scratch,
                            band,
                            rows,
                            width,
                            channels,
                            tile_width,
                            tile_height,
                        );
                    });
                return;
            }
        }

        let mut scratch = Vec::new();
        for (band, rows) in buffer.chunks_mut(band_len).enumerate() {
            process_band(
                &kernel,
                &mut scratch,
                band,
                rows,
                width,
                channels,
                tile_width,
                tile_height,
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
#[inline]
fn process_band<T, K>(
    kernel: &K,
    scratch: &mut Vec<f32>,
    band: usize,
    rows: &mut [T],
    width: u32,
    channels: usize,
    tile_width: usize,
    tile_height: usize,
) where
    K: Fn(&mut Vec<f32>, u32, u32, &mut [T]),
{
    let width = width as usize;
    let stride = width * channels;
    let y0 = band * tile_height;

    for x0 in (0..width).step_by(tile_width) {
        let x1 = (x0 + tile_width).min(width);
        for (dy, row) in rows.chunks_exact_mut(stride).enumerate() {
            kernel(
                scratch,
                x0 as u32,
                (y0 + dy) as u32,
                &mut row[x0 * channels..x1 * channels],
            );
        }
    }
}

/// `dst[i] += src[i]`, processed in groups of `lanes` elements.
#[inline]
pub fn add_lanes(dst: &mut [f32], src: &[f32], lanes: usize) {
    debug_assert_eq!(dst.len(), src.len());
    let mut dst_chunks = dst.chunks_exact_mut(lanes);
    let mut src_chunks = src.chunks_exact(lanes);

    for (d, s) in (&mut dst_chunks).zip(&mut src_chunks) {
        for (d, s) in d.iter_mut().zip(s) {
            *d += *s;
        }
    }
    for (d, s) in dst_chunks.into_remainder().iter_mut().zip(src_chunks.remainder()) {
        *d += *s;
    }
}
