//! Boundary-extended reads over float planes.
//!
//! Every windowed or resampling stage reads through [`Bordered`], so a read
//! at any integer coordinate is well defined and maps back into the plane by
//! mirror reflection.

use image::Luma;
use imageproc::definitions::Image;

/// How out-of-range coordinates are folded back into `[0, extent)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderMode {
    /// Mirror without repeating the edge sample: `dcb|abcd|cba`.
    #[default]
    Reflect101,
    /// Mirror with the edge sample repeated: `cba|abcd|dcb`.
    Reflect,
}

/// Folds `index` into `[0, extent)` by mirror reflection, as many times as needed.
///
/// An extent of one (or zero) always maps to index 0.
///
/// # Examples
///
/// ```
/// use imageops_guided::{reflect, BorderMode};
///
/// assert_eq!(reflect(-1, 4, BorderMode::Reflect101), 1);
/// assert_eq!(reflect(-1, 4, BorderMode::Reflect), 0);
/// assert_eq!(reflect(4, 4, BorderMode::Reflect101), 2);
/// ```
#[inline]
pub fn reflect(index: i64, extent: u32, mode: BorderMode) -> u32 {
    let n = i64::from(extent);
    if (0..n).contains(&index) {
        return index as u32;
    }
    if n <= 1 {
        return 0;
    }

    let folded = match mode {
        BorderMode::Reflect101 => {
            let period = 2 * n - 2;
            let v = index.rem_euclid(period);
            if v >= n {
                period - v
            } else {
                v
            }
        }
        BorderMode::Reflect => {
            let period = 2 * n;
            let v = index.rem_euclid(period);
            if v >= n {
                period - 1 - v
            } else {
                v
            }
        }
    };

    folded as u32
}

/// Read-only view of a plane that reflects out-of-range coordinates.
#[derive(Clone, Copy)]
pub struct Bordered<'a> {
    plane: &'a Image<Luma<f32>>,
    mode: BorderMode,
}

impl<'a> Bordered<'a> {
    pub const fn new(plane: &'a Image<Luma<f32>>, mode: BorderMode) -> Self {
        Self { plane, mode }
    }

    /// Row `y` of the plane after reflecting `y`.
    #[inline]
    pub fn row(&self, y: i64) -> &'a [f32] {
        let width = self.plane.width() as usize;
        let row = reflect(y, self.plane.height(), self.mode) as usize;
        &self.plane.as_raw()[row * width..(row + 1) * width]
    }

    #[inline]
    pub fn get(&self, x: i64, y: i64) -> f32 {
        self.row(y)[reflect(x, self.plane.width(), self.mode) as usize]
    }

    /// Fills `out` with the samples at `(x_start + i, y)`.
    pub fn fill_row(&self, y: i64, x_start: i64, out: &mut [f32]) {
        let row = self.row(y);
        let end = x_start + out.len() as i64;

        if x_start >= 0 && end <= row.len() as i64 {
            out.copy_from_slice(&row[x_start as usize..end as usize]);
            return;
        }

        let width = self.plane.width();
        for (x, value) in (x_start..end).zip(out.iter_mut()) {
            *value = row[reflect(x, width, self.mode) as usize];
        }
    }
}
