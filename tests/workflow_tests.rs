//! End-to-end tests for imageops-guided
//!
//! These tests run whole filter invocations on synthetic scenes and check
//! the behaviour a caller relies on: flat regions stay flat, edges of the
//! guide survive, and the fast variants stay close to the direct filter.

use image::{Luma, Rgb};
use imageops_guided::{
    reflect, BorderMode, FilterParameters, GuidedFilter, GuidedFilterExt, Image, Schedule,
    Variant,
};
use itertools::iproduct;

/// Smooth three-channel scene built from slow sinusoids and a diagonal ramp.
fn create_smooth_image(width: u32, height: u32) -> Image<Rgb<u8>> {
    Image::from_fn(width, height, |x, y| {
        let r = 128.0 + 100.0 * (x as f32 / 9.0).sin();
        let g = 128.0 + 100.0 * (y as f32 / 7.0).cos();
        let b = ((x + y) * 255 / (width + height)) as f32;
        Rgb([r as u8, g as u8, b as u8])
    })
}

/// Vertical step from dark to bright at `width / 2`.
fn create_step_image(width: u32, height: u32) -> Image<Rgb<u8>> {
    Image::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([20, 20, 20])
        } else {
            Rgb([220, 220, 220])
        }
    })
}

/// The step image with a ±20 checkerboard on top.
fn create_noisy_step_image(width: u32, height: u32) -> Image<Rgb<u8>> {
    let clean = create_step_image(width, height);
    Image::from_fn(width, height, |x, y| {
        let base = clean.get_pixel(x, y)[0];
        let value = if (x + y) % 2 == 0 { base + 20 } else { base - 20 };
        Rgb([value, value, value])
    })
}

fn max_abs_difference(a: &Image<Rgb<u8>>, b: &Image<Rgb<u8>>) -> u8 {
    a.iter().zip(b.iter()).map(|(&x, &y)| x.abs_diff(y)).max().unwrap_or(0)
}

/// Mean of window means of `input / 255`, evaluated directly on mirrored coordinates.
fn brute_force_double_box_mean(input: &Image<Luma<u8>>, radius: i64) -> Vec<f64> {
    let (width, height) = input.dimensions();
    let side = (2 * radius + 1) as f64;
    let area = side * side;
    let sample = |x: i64, y: i64| {
        let x = reflect(x, width, BorderMode::Reflect101);
        let y = reflect(y, height, BorderMode::Reflect101);
        f64::from(input.get_pixel(x, y)[0]) / 255.0
    };
    let window_mean = |cx: i64, cy: i64| {
        iproduct!(-radius..=radius, -radius..=radius)
            .map(|(dy, dx)| sample(cx + dx, cy + dy))
            .sum::<f64>()
            / area
    };

    iproduct!(0..i64::from(height), 0..i64::from(width))
        .map(|(y, x)| {
            iproduct!(-radius..=radius, -radius..=radius)
                .map(|(dy, dx)| {
                    let cx = i64::from(reflect(x + dx, width, BorderMode::Reflect101));
                    let cy = i64::from(reflect(y + dy, height, BorderMode::Reflect101));
                    window_mean(cx, cy)
                })
                .sum::<f64>()
                / area
        })
        .collect()
}

#[test]
fn constant_gray_image_is_unchanged() {
    let image: Image<Rgb<u8>> = Image::from_pixel(4, 4, Rgb([128, 128, 128]));

    let result = image
        .clone()
        .guided_filter(&image, 1, 0.0004)
        .expect("Filtering should succeed");

    assert_eq!(result.dimensions(), (4, 4));
    assert!(result.pixels().all(|p| *p == Rgb([128, 128, 128])));
}

#[test]
fn self_guided_filter_preserves_step_edge() {
    let image = create_step_image(32, 24);

    let result = image
        .clone()
        .guided_filter(&image, 4, 0.01)
        .expect("Filtering should succeed");

    assert!(max_abs_difference(&image, &result) <= 2);
    let contrast = i32::from(result.get_pixel(16, 12)[0]) - i32::from(result.get_pixel(15, 12)[0]);
    assert!(contrast >= 190, "edge contrast collapsed to {contrast}");
}

#[test]
fn clean_guide_denoises_flat_regions_and_keeps_edge() {
    let (width, height) = (40, 20);
    let guide = create_step_image(width, height);
    let noisy = create_noisy_step_image(width, height);

    let result = noisy
        .guided_filter(&guide, 2, 0.01)
        .expect("Filtering should succeed");

    for (x, y) in iproduct!(0..width, 0..height) {
        let distance = (i64::from(x) - i64::from(width / 2)).abs();
        if distance >= 6 {
            let expected = guide.get_pixel(x, y)[0];
            assert!(
                result.get_pixel(x, y)[0].abs_diff(expected) <= 1,
                "flat pixel ({x}, {y}) not denoised"
            );
        }
    }

    let dark = i32::from(result.get_pixel(width / 2 - 1, height / 2)[0]);
    let bright = i32::from(result.get_pixel(width / 2, height / 2)[0]);
    assert!(bright - dark >= 150, "edge contrast collapsed to {}", bright - dark);
}

#[test]
fn huge_epsilon_reduces_to_double_box_mean() {
    let input: Image<Luma<u8>> =
        Image::from_fn(12, 10, |x, y| Luma([((x * 37 + y * 91) % 256) as u8]));
    let radius = 2;

    let result = input
        .clone()
        .guided_filter(&input, radius, 1.0e12)
        .expect("Filtering should succeed");

    let expected = brute_force_double_box_mean(&input, i64::from(radius));
    for (actual, expected) in result.iter().zip(expected) {
        let expected = expected * 255.0;
        assert!(
            (f64::from(*actual) - expected).abs() <= 1.0,
            "expected {expected}, got {actual}"
        );
    }
}

#[test]
fn fast_variants_approximate_direct_filter() {
    let image = create_smooth_image(96, 64);

    let direct = image
        .clone()
        .guided_filter(&image, 8, 0.01)
        .expect("Direct filtering should succeed");

    let fast_box = image
        .clone()
        .fast_guided_filter(&image, 8, 0.01, 2)
        .expect("Box variant should succeed");
    assert!(max_abs_difference(&direct, &fast_box) <= 2);

    let fast_box_4 = image
        .clone()
        .fast_guided_filter(&image, 8, 0.01, 4)
        .expect("Two-level box variant should succeed");
    assert!(max_abs_difference(&direct, &fast_box_4) <= 2);

    let fast_ratio = image
        .clone()
        .fast_guided_filter_with_ratio(&image, 8, 0.01, 2.5)
        .expect("Ratio variant should succeed");
    assert!(max_abs_difference(&direct, &fast_ratio) <= 2);
}

#[test]
fn unit_ratio_matches_direct_filter_exactly() {
    let guide = create_smooth_image(30, 20);
    let input = create_noisy_step_image(30, 20);

    let direct = input
        .clone()
        .guided_filter(&guide, 3, 0.1)
        .expect("Direct filtering should succeed");
    let ratio = input
        .fast_guided_filter_with_ratio(&guide, 3, 0.1, 1.0)
        .expect("Ratio variant should succeed");

    assert_eq!(direct, ratio);
}

#[test]
fn reusable_filter_with_custom_schedule() {
    let guide = create_smooth_image(50, 40);
    let input = create_noisy_step_image(50, 40);
    let filter = GuidedFilter::new(
        FilterParameters::new(3, 0.05)
            .with_variant(Variant::FastBox { factor: 2 })
            .with_border(BorderMode::Reflect),
    )
    .with_schedule(Schedule::sequential().with_tiles(16, 8));

    let first = filter.filter(&guide, &input).expect("Filtering should succeed");
    let mut second: Image<Rgb<u8>> = Image::new(50, 40);
    filter
        .filter_into(&guide, &input, &mut second)
        .expect("Filtering into a buffer should succeed");

    assert_eq!(first, second);
    assert_eq!(filter.parameters().radius, 3);
    assert!(!filter.schedule().parallel);
}

#[test]
fn in_place_filtering_chains() {
    let guide = create_step_image(24, 24);
    let mut image = create_noisy_step_image(24, 24);

    image
        .guided_filter_mut(&guide, 2, 0.01)
        .and_then(|image| image.guided_filter_mut(&guide, 2, 0.01))
        .expect("Chained filtering should succeed");

    assert_eq!(image.get_pixel(2, 12)[0], 20);
    assert_eq!(image.get_pixel(21, 12)[0], 220);
}
