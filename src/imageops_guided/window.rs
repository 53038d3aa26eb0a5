//! Separable window sums and the local statistics built from them.
//!
//! A window of side `2·radius+1` is summed in two 1-D passes: a horizontal
//! pass into a materialized `*_sx` intermediate, then a vertical pass over
//! that intermediate. Sums are left unnormalized; division by the window
//! area happens where the statistics are combined.

use crate::imageops_guided::border::{reflect, BorderMode, Bordered};
use crate::imageops_guided::executor::{add_lanes, Executor, Tiling};
use image::Luma;
use imageproc::definitions::Image;

/// Number of samples in a window of the given radius.
#[inline]
pub fn window_area(radius: u32) -> f32 {
    let side = 2 * radius as usize + 1;
    (side * side) as f32
}

/// Horizontal window sum of a row source.
///
/// `source(y, x_start, out, aux)` fills `out` with source values at
/// `(x_start + i, y)` for any integer coordinates, including the halo of
/// `radius` samples on either side of the tile. `aux` is a worker-local row
/// of the same length the source may use for a second operand.
pub fn horizontal_sum<S>(
    executor: &Executor,
    field: &'static str,
    width: u32,
    height: u32,
    radius: u32,
    source: S,
) -> Image<Luma<f32>>
where
    S: Fn(i64, i64, &mut [f32], &mut [f32]) + Sync,
{
    let side = 2 * radius as usize + 1;
    executor.materialize(field, width, height, Tiling::HorizontalSum, |scratch, x0, y, out| {
        let len = out.len() + side - 1;
        scratch.resize(2 * len, 0.0);
        let (row, aux) = scratch.split_at_mut(len);
        source(i64::from(y), i64::from(x0) - i64::from(radius), row, aux);
        for (value, window) in out.iter_mut().zip(row.windows(side)) {
            *value = window.iter().sum();
        }
    })
}

/// Vertical window sum of a materialized horizontal sum.
pub fn vertical_sum(
    executor: &Executor,
    field: &'static str,
    horizontal: &Image<Luma<f32>>,
    radius: u32,
    border: BorderMode,
) -> Image<Luma<f32>> {
    let (width, height) = horizontal.dimensions();
    let view = Bordered::new(horizontal, border);
    let lanes = executor.lanes();
    let radius = i64::from(radius);

    executor.materialize(field, width, height, Tiling::Output, |_, x0, y, out| {
        out.fill(0.0);
        let x0 = x0 as usize;
        let y = i64::from(y);
        for dy in -radius..=radius {
            let row = view.row(y + dy);
            add_lanes(out, &row[x0..x0 + out.len()], lanes);
        }
    })
}

/// Full 2-D window sum: `fields[0]` names the horizontal intermediate, `fields[1]` the result.
pub fn window_sum<S>(
    executor: &Executor,
    fields: [&'static str; 2],
    width: u32,
    height: u32,
    radius: u32,
    border: BorderMode,
    source: S,
) -> Image<Luma<f32>>
where
    S: Fn(i64, i64, &mut [f32], &mut [f32]) + Sync,
{
    let horizontal = horizontal_sum(executor, fields[0], width, height, radius, source);
    vertical_sum(executor, fields[1], &horizontal, radius, border)
}

/// Window sums of the guide `I` and the input `p` over one channel.
///
/// The four sums are materialized; covariance and variance are derived
/// pointwise on demand.
pub struct WindowStats {
    pub mean_i: Image<Luma<f32>>,
    pub mean_p: Image<Luma<f32>>,
    pub corr_i: Image<Luma<f32>>,
    pub corr_ip: Image<Luma<f32>>,
    radius: u32,
    area: f32,
    border: BorderMode,
}

impl WindowStats {
    pub fn compute(
        executor: &Executor,
        guide: &Image<Luma<f32>>,
        input: &Image<Luma<f32>>,
        radius: u32,
        border: BorderMode,
    ) -> Self {
        debug_assert_eq!(guide.dimensions(), input.dimensions());
        let (width, height) = guide.dimensions();
        let guide_view = Bordered::new(guide, border);
        let input_view = Bordered::new(input, border);

        let mean_i = window_sum(
            executor,
            ["mean_I_sx", "mean_I"],
            width,
            height,
            radius,
            border,
            |y, x, out, _| guide_view.fill_row(y, x, out),
        );

        let mean_p = window_sum(
            executor,
            ["mean_p_sx", "mean_p"],
            width,
            height,
            radius,
            border,
            |y, x, out, _| input_view.fill_row(y, x, out),
        );

        // I·I is fused into the horizontal pass
        let corr_i = window_sum(
            executor,
            ["corr_I_sx", "corr_I"],
            width,
            height,
            radius,
            border,
            |y, x, out, _| {
                guide_view.fill_row(y, x, out);
                out.iter_mut().for_each(|v| *v *= *v);
            },
        );

        // I·p is fused into the horizontal pass
        let corr_ip = window_sum(
            executor,
            ["corr_Ip_sx", "corr_Ip"],
            width,
            height,
            radius,
            border,
            |y, x, out, guide_row| {
                input_view.fill_row(y, x, out);
                guide_view.fill_row(y, x, guide_row);
                out.iter_mut().zip(guide_row.iter()).for_each(|(v, g)| *v *= g);
            },
        );

        Self {
            mean_i,
            mean_p,
            corr_i,
            corr_ip,
            radius,
            area: window_area(radius),
            border,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.mean_i.dimensions()
    }

    pub const fn radius(&self) -> u32 {
        self.radius
    }

    pub const fn area(&self) -> f32 {
        self.area
    }

    pub const fn border(&self) -> BorderMode {
        self.border
    }

    /// Linear index of `(x, y)` after reflecting it into the field extent.
    #[inline]
    pub fn index(&self, x: i64, y: i64) -> usize {
        let (width, height) = self.dimensions();
        let x = reflect(x, width, self.border) as usize;
        let y = reflect(y, height, self.border) as usize;
        y * width as usize + x
    }

    /// Window mean of the guide, `mean_I / area`.
    ///
    /// Exact for integer-valued guides, so a flat guide window has a variance
    /// of exactly zero.
    #[inline]
    fn guide_mean(&self, index: usize) -> f32 {
        self.mean_i.as_raw()[index] / self.area
    }

    /// `corr_Ip − mean_I·mean_p / area` at a linear index.
    #[inline]
    pub fn cov_ip(&self, index: usize) -> f32 {
        self.corr_ip.as_raw()[index] - self.guide_mean(index) * self.mean_p.as_raw()[index]
    }

    /// `corr_I − mean_I·mean_I / area` at a linear index.
    #[inline]
    pub fn var_i(&self, index: usize) -> f32 {
        self.corr_i.as_raw()[index] - self.guide_mean(index) * self.mean_i.as_raw()[index]
    }
}
