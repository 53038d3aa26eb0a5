//! Downsampling and upsampling of float planes for the fast filter variants.
//!
//! Two policies exist and are never mixed:
//!
//! * **Box**: 1-3-3-1 low-pass then 2× decimation, paired with a fixed
//!   bilinear 2× upsampler. Only power-of-two factors, one level per halving.
//! * **Nearest**: decimation at an arbitrary ratio `s ≥ 1` without
//!   anti-aliasing, paired with a bilinear upsampler whose taps and weight
//!   are derived from `s`.

use crate::imageops_guided::border::{reflect, BorderMode, Bordered};
use crate::imageops_guided::executor::{Executor, Tiling};
use image::Luma;
use imageproc::definitions::Image;

/// Reduced extent of one box level.
///
/// One more than `n / 2` so that every tap the 2× upsampler reads back at
/// full resolution lies inside the reduced plane.
#[inline]
pub const fn halved_extent(n: u32) -> u32 {
    n / 2 + 1
}

/// Reduced extent for nearest decimation by `scale`.
#[inline]
pub fn reduced_extent(n: u32, scale: f32) -> u32 {
    ((n as f32 / scale).ceil() as u32).max(1)
}

#[inline]
fn lerp(a: f32, b: f32, weight: f32) -> f32 {
    a * (1.0 - weight) + b * weight
}

/// One box level: separable `(1, 3, 3, 1) / 8` filter followed by 2× decimation.
pub fn downsample_box(
    executor: &Executor,
    plane: &Image<Luma<f32>>,
    border: BorderMode,
) -> Image<Luma<f32>> {
    let (width, height) = plane.dimensions();
    let (reduced_width, reduced_height) = (halved_extent(width), halved_extent(height));
    let view = Bordered::new(plane, border);

    let down_x = executor.materialize(
        "down_x",
        reduced_width,
        height,
        Tiling::HorizontalSum,
        |scratch, x0, y, out| {
            scratch.resize(2 * out.len() + 2, 0.0);
            view.fill_row(i64::from(y), 2 * i64::from(x0) - 1, scratch);
            for (value, taps) in out.iter_mut().zip(scratch.windows(4).step_by(2)) {
                *value = (taps[0] + 3.0 * (taps[1] + taps[2]) + taps[3]) / 8.0;
            }
        },
    );

    let rows = Bordered::new(&down_x, border);
    executor.materialize(
        "down_y",
        reduced_width,
        reduced_height,
        Tiling::Output,
        |_, x0, y, out| {
            let y = 2 * i64::from(y);
            let (r0, r1, r2, r3) = (rows.row(y - 1), rows.row(y), rows.row(y + 1), rows.row(y + 2));
            let x0 = x0 as usize;
            for (i, value) in out.iter_mut().enumerate() {
                let x = x0 + i;
                *value = (r0[x] + 3.0 * (r1[x] + r2[x]) + r3[x]) / 8.0;
            }
        },
    )
}

/// Taps and weight of the fixed 2× upsampler for destination index `i`.
///
/// Returns `((i + 1) / 2, (i - 1) / 2, ((i % 2)·2 + 1) / 4)` with floor
/// division, blended as `lerp(f(near), f(far), weight)`. This pairing keeps
/// the reconstruction in phase with the 1-3-3-1 decimation.
#[inline]
pub fn box_phase(i: u32) -> (i64, i64, f32) {
    let i = i64::from(i);
    let weight = ((i % 2) * 2 + 1) as f32 / 4.0;
    ((i + 1).div_euclid(2), (i - 1).div_euclid(2), weight)
}

/// Fixed bilinear 2× upsampling of a reduced plane, sampled at one destination pixel.
#[inline]
pub fn sample_box(view: &Bordered<'_>, x: u32, y: u32) -> f32 {
    let (x_near, x_far, wx) = box_phase(x);
    let (y_near, y_far, wy) = box_phase(y);
    let up_x = |row: i64| lerp(view.get(x_near, row), view.get(x_far, row), wx);
    lerp(up_x(y_near), up_x(y_far), wy)
}

/// Materialized fixed 2× upsampling onto a `width × height` plane.
pub fn upsample_box(
    executor: &Executor,
    plane: &Image<Luma<f32>>,
    width: u32,
    height: u32,
    border: BorderMode,
) -> Image<Luma<f32>> {
    let view = Bordered::new(plane, border);
    executor.materialize("up", width, height, Tiling::Output, |_, x0, y, out| {
        for (x, value) in (x0..).zip(out.iter_mut()) {
            *value = sample_box(&view, x, y);
        }
    })
}

/// Source index of nearest decimation: `ceil((i + 0.5)·s − 0.5)`, evaluated in f32.
#[inline]
pub fn nearest_source(i: u32, scale: f32) -> i64 {
    ((i as f32 + 0.5) * scale - 0.5).ceil() as i64
}

/// Nearest-neighbour decimation by an arbitrary ratio, without anti-aliasing.
pub fn decimate_nearest(
    executor: &Executor,
    plane: &Image<Luma<f32>>,
    scale: f32,
    border: BorderMode,
) -> Image<Luma<f32>> {
    let (width, height) = plane.dimensions();
    let view = Bordered::new(plane, border);

    executor.materialize(
        "decimate",
        reduced_extent(width, scale),
        reduced_extent(height, scale),
        Tiling::Output,
        |_, x0, y, out| {
            let row = view.row(nearest_source(y, scale));
            for (x, value) in (x0..).zip(out.iter_mut()) {
                *value = row[reflect(nearest_source(x, scale), width, border) as usize];
            }
        },
    )
}

/// Taps and weight of the ratio upsampler for destination index `i`.
///
/// The destination sample centre maps to `u = (i + 0.5) / s − 0.5` in the
/// reduced plane; the taps are `floor(u)` and `floor(u) + 1`.
#[inline]
pub fn ratio_phase(i: u32, scale: f32) -> (i64, i64, f32) {
    let u = (i as f32 + 0.5) / scale - 0.5;
    let lower = u.floor();
    (lower as i64, lower as i64 + 1, u - lower)
}

/// Bilinear upsampling by an arbitrary ratio, sampled at one destination pixel.
#[inline]
pub fn sample_ratio(view: &Bordered<'_>, x: u32, y: u32, scale: f32) -> f32 {
    let (x_lo, x_hi, wx) = ratio_phase(x, scale);
    let (y_lo, y_hi, wy) = ratio_phase(y, scale);
    let up_x = |row: i64| lerp(view.get(x_lo, row), view.get(x_hi, row), wx);
    lerp(up_x(y_lo), up_x(y_hi), wy)
}
