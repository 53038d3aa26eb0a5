//! Test utilities for imageops-guided
//!
//! Image builders and tolerance comparisons shared by the unit tests.
//! It is only compiled when running tests.

use image::{Pixel, Primitive, Rgb};
use imageproc::definitions::Image;

/// Creates an RGB image with a horizontal ramp in red, a vertical ramp in
/// green and a constant blue channel.
pub fn create_gradient_rgb_image(width: u32, height: u32) -> Image<Rgb<u8>> {
    let ramp = |v: u32, extent: u32| (v * 255 / extent.saturating_sub(1).max(1)) as u8;
    Image::from_fn(width, height, |x, y| {
        Rgb([ramp(x, width), ramp(y, height), 96])
    })
}

/// Creates an RGB image split vertically into a dark left half and a bright
/// right half.
pub fn create_step_rgb_image(width: u32, height: u32) -> Image<Rgb<u8>> {
    Image::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([20, 40, 60])
        } else {
            Rgb([220, 200, 180])
        }
    })
}

/// Creates an RGB checkerboard of single-pixel cells.
pub fn create_checkerboard_rgb_image(width: u32, height: u32) -> Image<Rgb<u8>> {
    Image::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            Rgb([200, 150, 100])
        } else {
            Rgb([100, 150, 200])
        }
    })
}

/// Compares two pixels channel by channel with a tolerance.
pub fn pixels_approx_equal<P>(expected: P, actual: P, tolerance: f32) -> bool
where
    P: Pixel,
    P::Subpixel: Primitive,
    f32: From<P::Subpixel>,
{
    expected.channels().len() == actual.channels().len()
        && expected
            .channels()
            .iter()
            .zip(actual.channels())
            .all(|(&e, &a)| (f32::from(e) - f32::from(a)).abs() <= tolerance)
}

/// Compares two images pixel by pixel with a tolerance.
///
/// Images of different dimensions never compare equal.
pub fn images_approx_equal<P>(expected: &Image<P>, actual: &Image<P>, tolerance: f32) -> bool
where
    P: Pixel,
    P::Subpixel: Primitive,
    f32: From<P::Subpixel>,
{
    expected.dimensions() == actual.dimensions()
        && expected
            .pixels()
            .zip(actual.pixels())
            .all(|(&e, &a)| pixels_approx_equal(e, a, tolerance))
}

/// Largest absolute channel difference between two images of equal size.
pub fn max_abs_difference<P>(expected: &Image<P>, actual: &Image<P>) -> f32
where
    P: Pixel,
    P::Subpixel: Primitive,
    f32: From<P::Subpixel>,
{
    expected
        .iter()
        .zip(actual.iter())
        .map(|(&e, &a)| (f32::from(e) - f32::from(a)).abs())
        .fold(0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_gradient_rgb_image_spans_full_range() {
        let image = create_gradient_rgb_image(16, 4);
        assert_eq!(image.get_pixel(0, 0), &Rgb([0, 0, 96]));
        assert_eq!(image.get_pixel(15, 3), &Rgb([255, 255, 96]));
    }

    #[test]
    fn create_gradient_rgb_image_with_unit_extent() {
        let image = create_gradient_rgb_image(1, 1);
        assert_eq!(image.get_pixel(0, 0), &Rgb([0, 0, 96]));
    }

    #[test]
    fn create_step_rgb_image_splits_at_half_width() {
        let image = create_step_rgb_image(8, 2);
        assert_eq!(image.get_pixel(3, 1), &Rgb([20, 40, 60]));
        assert_eq!(image.get_pixel(4, 1), &Rgb([220, 200, 180]));
    }

    #[test]
    fn images_approx_equal_respects_tolerance() {
        let a = create_checkerboard_rgb_image(4, 4);
        let mut b = a.clone();
        b.put_pixel(2, 2, Rgb([203, 150, 100]));

        assert!(images_approx_equal(&a, &b, 3.0));
        assert!(!images_approx_equal(&a, &b, 2.0));
        assert_eq!(max_abs_difference(&a, &b), 3.0);
    }

    #[test]
    fn images_approx_equal_rejects_dimension_mismatch() {
        let a = create_checkerboard_rgb_image(4, 4);
        let b = create_checkerboard_rgb_image(4, 3);
        assert!(!images_approx_equal(&a, &b, 255.0));
    }
}
