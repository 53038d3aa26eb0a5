//! Recombination of averaged coefficients with the guide and 8-bit quantization.

use crate::imageops_guided::border::{BorderMode, Bordered};
use crate::imageops_guided::executor::{Executor, Tiling};
use crate::imageops_guided::regression::Coefficients;
use crate::imageops_guided::resample::{sample_box, sample_ratio};
use crate::utils::clamp_f32_to_primitive;

/// How reduced-resolution coefficients are brought back to the output grid.
///
/// The last upsampling step is always fused into the composer; it is never
/// materialized at full resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Upsampler {
    /// Coefficients are already at output resolution
    Identity,
    /// Fixed bilinear 2× step
    Box,
    /// Bilinear step by an arbitrary ratio
    Ratio(f32),
}

impl Upsampler {
    #[inline]
    pub fn sample(&self, view: &Bordered<'_>, x: u32, y: u32) -> f32 {
        match *self {
            Self::Identity => view.get(i64::from(x), i64::from(y)),
            Self::Box => sample_box(view, x, y),
            Self::Ratio(scale) => sample_ratio(view, x, y, scale),
        }
    }
}

/// Rounds to nearest and clamps into `[0, 255]`.
#[inline]
pub fn quantize(value: f32) -> u8 {
    clamp_f32_to_primitive(value.round())
}

pub struct Composer<'a> {
    views: Vec<(Bordered<'a>, Bordered<'a>)>,
    upsampler: Upsampler,
    factor: f32,
}

impl<'a> Composer<'a> {
    /// `coefficients` holds one entry per channel; `area` is the window area
    /// the coefficients were summed over.
    pub fn new(
        coefficients: &'a [Coefficients],
        upsampler: Upsampler,
        border: BorderMode,
        area: f32,
    ) -> Self {
        let views = coefficients
            .iter()
            .map(|c| {
                (
                    Bordered::new(&c.mean_a, border),
                    Bordered::new(&c.mean_b, border),
                )
            })
            .collect();

        Self {
            views,
            upsampler,
            factor: 255.0 / area,
        }
    }

    pub fn channels(&self) -> usize {
        self.views.len()
    }

    /// `clamp(round((Σa·guide + Σb) · 255 / area))` for one output sample.
    #[inline]
    pub fn value(&self, channel: usize, x: u32, y: u32, guide: u8) -> u8 {
        let (mean_a, mean_b) = &self.views[channel];
        let a = self.upsampler.sample(mean_a, x, y);
        let b = self.upsampler.sample(mean_b, x, y);
        quantize(a.mul_add(f32::from(guide), b) * self.factor)
    }

    /// Writes the whole interleaved output image, tile by tile.
    pub fn compose(
        &self,
        executor: &Executor,
        guide: &[u8],
        width: u32,
        height: u32,
        output: &mut [u8],
    ) {
        let channels = self.channels();
        debug_assert_eq!(guide.len(), output.len());

        executor.run(
            "result",
            output,
            width,
            height,
            channels,
            Tiling::Output,
            |_, x0, y, out| {
                let start = (y as usize * width as usize + x0 as usize) * channels;
                let guide_row = &guide[start..start + out.len()];
                let pixels = out.chunks_exact_mut(channels).zip(guide_row.chunks_exact(channels));
                for (x, (pixel, guide_pixel)) in (x0..).zip(pixels) {
                    for (channel, (value, &g)) in pixel.iter_mut().zip(guide_pixel).enumerate() {
                        *value = self.value(channel, x, y, g);
                    }
                }
            },
        );
    }
}
