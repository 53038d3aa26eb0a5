//! Per-window least-squares fit `p ≈ a·I + b` with ridge regularization.

use crate::imageops_guided::border::Bordered;
use crate::imageops_guided::executor::{Executor, Materialization, Tiling};
use crate::imageops_guided::window::{window_sum, WindowStats};
use image::Luma;
use imageproc::definitions::Image;

/// Window-summed regression coefficients of one channel.
///
/// Both planes hold unnormalized window sums of `a` and `b`; the composer
/// divides by the window area.
pub struct Coefficients {
    pub mean_a: Image<Luma<f32>>,
    pub mean_b: Image<Luma<f32>>,
}

pub struct LocalRegression<'a> {
    stats: &'a WindowStats,
    eps_area: f32,
}

impl<'a> LocalRegression<'a> {
    pub fn new(stats: &'a WindowStats, epsilon: f32) -> Self {
        Self {
            stats,
            eps_area: epsilon * stats.area(),
        }
    }

    /// `a = cov_Ip / (var_I + eps·area)`.
    ///
    /// A zero denominator (flat guide with `eps = 0`) yields `a = 0`, so the
    /// window falls back to its local mean.
    #[inline]
    pub fn slope(&self, index: usize) -> f32 {
        let denominator = self.stats.var_i(index) + self.eps_area;
        if denominator == 0.0 {
            0.0
        } else {
            self.stats.cov_ip(index) / denominator
        }
    }

    /// `b = (mean_p − a·mean_I) / area`.
    #[inline]
    pub fn intercept(&self, index: usize, slope: f32) -> f32 {
        let mean_i = self.stats.mean_i.as_raw()[index];
        let mean_p = self.stats.mean_p.as_raw()[index];
        (mean_p - slope * mean_i) / self.stats.area()
    }

    /// Solves every window and averages `a` and `b` over the same window.
    pub fn solve(&self, executor: &Executor) -> Coefficients {
        let stats = self.stats;
        let (width, height) = stats.dimensions();
        let radius = stats.radius();
        let border = stats.border();

        let slope_plane = match executor.schedule().slope {
            Materialization::Materialized => {
                Some(executor.materialize("a", width, height, Tiling::Output, |_, x0, y, out| {
                    let start = y as usize * width as usize + x0 as usize;
                    for (i, value) in out.iter_mut().enumerate() {
                        *value = self.slope(start + i);
                    }
                }))
            }
            Materialization::Fused => None,
        };
        let slope_view = slope_plane.as_ref().map(|a| Bordered::new(a, border));
        let slope_at = |x: i64, y: i64| match &slope_view {
            Some(view) => view.get(x, y),
            None => self.slope(stats.index(x, y)),
        };

        let mean_a = window_sum(
            executor,
            ["mean_a_sx", "mean_a"],
            width,
            height,
            radius,
            border,
            |y, x_start, out, _| {
                for (x, value) in (x_start..).zip(out.iter_mut()) {
                    *value = slope_at(x, y);
                }
            },
        );

        let intercept_plane = match executor.schedule().intercept {
            Materialization::Materialized => {
                Some(executor.materialize("b", width, height, Tiling::Output, |_, x0, y, out| {
                    let (x0, y) = (i64::from(x0), i64::from(y));
                    for (x, value) in (x0..).zip(out.iter_mut()) {
                        *value = self.intercept(stats.index(x, y), slope_at(x, y));
                    }
                }))
            }
            Materialization::Fused => None,
        };
        let intercept_view = intercept_plane.as_ref().map(|b| Bordered::new(b, border));

        let mean_b = window_sum(
            executor,
            ["mean_b_sx", "mean_b"],
            width,
            height,
            radius,
            border,
            |y, x_start, out, _| match &intercept_view {
                Some(view) => view.fill_row(y, x_start, out),
                None => {
                    for (x, value) in (x_start..).zip(out.iter_mut()) {
                        *value = self.intercept(stats.index(x, y), slope_at(x, y));
                    }
                }
            },
        );

        Coefficients { mean_a, mean_b }
    }
}
