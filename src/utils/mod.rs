//! Internal utility functions for imageops-guided.
//!
//! Sample conversion and argument validation shared by the filter entry points.

use crate::error::GuidedFilterError;
use image::Primitive;
use imageproc::definitions::Clamp;

/// Clamps a floating-point value to the range of a primitive type.
///
/// # Arguments
///
/// * `value` - The floating-point value to clamp
///
/// # Returns
///
/// The clamped value as the target primitive type
#[inline]
pub fn clamp_f32_to_primitive<T: Primitive + Clamp<f32>>(value: f32) -> T {
    T::clamp(value)
}

/// Normalizes a sample using a pre-computed max value.
///
/// # Arguments
///
/// * `sample` - The sample to normalize
/// * `max_value` - The value that maps to 1.0
#[inline]
pub fn normalize_with_max<S>(sample: S, max_value: f32) -> f32
where
    S: Into<f32> + Primitive,
{
    sample.into() / max_value
}

/// Validates that an image has non-zero dimensions.
pub const fn validate_non_empty_image(width: u32, height: u32) -> Result<(), GuidedFilterError> {
    if width == 0 || height == 0 {
        Err(GuidedFilterError::EmptyImage)
    } else {
        Ok(())
    }
}

/// Validates that the guidance and input images have matching dimensions.
pub fn validate_matching_dimensions(
    guidance_dims: (u32, u32),
    input_dims: (u32, u32),
) -> Result<(), GuidedFilterError> {
    if guidance_dims != input_dims {
        Err(GuidedFilterError::DimensionMismatch {
            guidance_dims,
            input_dims,
        })
    } else {
        Ok(())
    }
}

/// Validates that a caller-provided output buffer has the expected dimensions.
pub fn validate_output_dimensions(
    expected: (u32, u32),
    actual: (u32, u32),
) -> Result<(), GuidedFilterError> {
    if expected != actual {
        Err(GuidedFilterError::BufferSizeMismatch { expected, actual })
    } else {
        Ok(())
    }
}
