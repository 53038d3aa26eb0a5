use thiserror::Error;

/// Error type for guided filter operations
///
/// Every variant is produced by input validation, before any intermediate
/// field is computed. A call that returns an error has not touched the
/// output buffer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GuidedFilterError {
    /// Guidance and input images do not have the same dimensions
    ///
    /// The local linear model pairs every input sample with the guidance
    /// sample at the same coordinate, so both images must cover the same
    /// domain.
    #[error("Guidance and input dimensions do not match: guidance {guidance_dims:?}, input {input_dims:?}")]
    DimensionMismatch {
        /// Guidance dimensions (width, height)
        guidance_dims: (u32, u32),
        /// Input dimensions (width, height)
        input_dims: (u32, u32),
    },

    /// Invalid parameter provided to the filter
    ///
    /// Returned for a zero radius, a negative or non-finite epsilon, an
    /// unsupported downsampling factor, or a degenerate execution schedule.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The filter window does not fit inside the image
    ///
    /// `radius` and the extent are reported at the resolution the window
    /// statistics are computed at, which for the fast variants is the
    /// reduced resolution.
    #[error("Window radius {radius} is too large for a {width}x{height} working image")]
    WindowTooLarge { radius: u32, width: u32, height: u32 },

    /// Output buffer was allocated with the wrong dimensions
    #[error("Output buffer dimensions mismatch: expected {expected:?}, got {actual:?}")]
    BufferSizeMismatch {
        /// Expected dimensions (width, height)
        expected: (u32, u32),
        /// Actual dimensions (width, height)
        actual: (u32, u32),
    },

    /// Image has zero width or height
    #[error("Image dimensions must be non-zero")]
    EmptyImage,
}
