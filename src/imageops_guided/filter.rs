use crate::error::GuidedFilterError;
use crate::imageops_guided::border::BorderMode;
use crate::imageops_guided::compose::{Composer, Upsampler};
use crate::imageops_guided::executor::{Executor, Schedule, Tiling};
use crate::imageops_guided::regression::{Coefficients, LocalRegression};
use crate::imageops_guided::resample::{
    decimate_nearest, downsample_box, halved_extent, reduced_extent, upsample_box,
};
use crate::imageops_guided::window::{window_area, WindowStats};
use crate::utils::{
    normalize_with_max, validate_matching_dimensions, validate_non_empty_image,
    validate_output_dimensions,
};
use crate::Image;
use image::{ImageBuffer, Luma, Pixel};
use log::{debug, trace};

/// Guided filtering of 8-bit images.
///
/// `self` is the image to be filtered; `guidance` supplies the edges to
/// preserve. Every channel is filtered independently against the guidance
/// channel of the same index.
pub trait GuidedFilterExt<P>
where
    P: Pixel,
{
    /// Full-resolution guided filter.
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` if `guidance` and `self` differ in size
    /// * `InvalidParameter` if `radius == 0` or `epsilon` is negative or not finite
    /// * `WindowTooLarge` if `2·radius` is not smaller than both image dimensions
    /// * `EmptyImage` for zero-sized images
    fn guided_filter(
        self,
        guidance: &Image<P>,
        radius: u32,
        epsilon: f32,
    ) -> Result<Image<P>, GuidedFilterError>;

    /// In-place variant of [`guided_filter`](Self::guided_filter).
    fn guided_filter_mut(
        &mut self,
        guidance: &Image<P>,
        radius: u32,
        epsilon: f32,
    ) -> Result<&mut Self, GuidedFilterError>;

    /// Fast guided filter with 1-3-3-1 box downsampling by a power-of-two `scale`.
    ///
    /// The statistics are computed at `1/scale` resolution with radius
    /// `max(radius / scale, 1)`.
    fn fast_guided_filter(
        self,
        guidance: &Image<P>,
        radius: u32,
        epsilon: f32,
        scale: u32,
    ) -> Result<Image<P>, GuidedFilterError>;

    /// Fast guided filter with nearest-neighbour decimation by any `scale >= 1`.
    fn fast_guided_filter_with_ratio(
        self,
        guidance: &Image<P>,
        radius: u32,
        epsilon: f32,
        scale: f32,
    ) -> Result<Image<P>, GuidedFilterError>;
}

impl<P> GuidedFilterExt<P> for Image<P>
where
    P: Pixel<Subpixel = u8>,
{
    fn guided_filter(
        self,
        guidance: &Self,
        radius: u32,
        epsilon: f32,
    ) -> Result<Self, GuidedFilterError> {
        GuidedFilter::new(FilterParameters::new(radius, epsilon)).filter(guidance, &self)
    }

    fn guided_filter_mut(
        &mut self,
        guidance: &Self,
        radius: u32,
        epsilon: f32,
    ) -> Result<&mut Self, GuidedFilterError> {
        let filtered =
            GuidedFilter::new(FilterParameters::new(radius, epsilon)).filter(guidance, self)?;
        *self = filtered;
        Ok(self)
    }

    fn fast_guided_filter(
        self,
        guidance: &Self,
        radius: u32,
        epsilon: f32,
        scale: u32,
    ) -> Result<Self, GuidedFilterError> {
        let params = FilterParameters::new(radius, epsilon)
            .with_variant(Variant::FastBox { factor: scale });
        GuidedFilter::new(params).filter(guidance, &self)
    }

    fn fast_guided_filter_with_ratio(
        self,
        guidance: &Self,
        radius: u32,
        epsilon: f32,
        scale: f32,
    ) -> Result<Self, GuidedFilterError> {
        let params = FilterParameters::new(radius, epsilon)
            .with_variant(Variant::FastNearest { scale });
        GuidedFilter::new(params).filter(guidance, &self)
    }
}

/// Resolution at which the window statistics are computed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Variant {
    /// Statistics at full resolution.
    #[default]
    Direct,
    /// 1-3-3-1 box downsampling by a power-of-two `factor`, fixed bilinear upsampling.
    FastBox { factor: u32 },
    /// Nearest decimation by `scale >= 1`, ratio bilinear upsampling.
    FastNearest { scale: f32 },
}

impl Variant {
    pub fn validate(&self) -> Result<(), GuidedFilterError> {
        match *self {
            Self::Direct => Ok(()),
            Self::FastBox { factor } if factor < 2 || !factor.is_power_of_two() => {
                Err(GuidedFilterError::InvalidParameter(format!(
                    "box downsampling factor must be a power of two >= 2, got {factor}"
                )))
            }
            Self::FastNearest { scale } if !scale.is_finite() || scale < 1.0 => {
                Err(GuidedFilterError::InvalidParameter(format!(
                    "decimation scale must be finite and >= 1, got {scale}"
                )))
            }
            Self::FastBox { .. } | Self::FastNearest { .. } => Ok(()),
        }
    }

    const fn box_levels(&self) -> u32 {
        match *self {
            Self::FastBox { factor } => factor.trailing_zeros(),
            _ => 0,
        }
    }

    fn working_geometry(&self, width: u32, height: u32, radius: u32) -> WorkingGeometry {
        match *self {
            Self::Direct => WorkingGeometry {
                width,
                height,
                radius,
            },
            Self::FastBox { factor } => {
                let (width, height) = (0..self.box_levels())
                    .fold((width, height), |(w, h), _| (halved_extent(w), halved_extent(h)));
                WorkingGeometry {
                    width,
                    height,
                    radius: (radius / factor).max(1),
                }
            }
            Self::FastNearest { scale } => WorkingGeometry {
                width: reduced_extent(width, scale),
                height: reduced_extent(height, scale),
                radius: ((radius as f32 / scale) as u32).max(1),
            },
        }
    }

    const fn upsampler(&self) -> Upsampler {
        match *self {
            Self::Direct => Upsampler::Identity,
            Self::FastBox { .. } => Upsampler::Box,
            Self::FastNearest { scale } => Upsampler::Ratio(scale),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WorkingGeometry {
    width: u32,
    height: u32,
    radius: u32,
}

/// What the filter computes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParameters {
    /// Window half-width; the window side is `2·radius + 1`
    pub radius: u32,
    /// Ridge regularization added to the guide variance
    pub epsilon: f32,
    pub variant: Variant,
    pub border: BorderMode,
}

impl FilterParameters {
    pub const fn new(radius: u32, epsilon: f32) -> Self {
        Self {
            radius,
            epsilon,
            variant: Variant::Direct,
            border: BorderMode::Reflect101,
        }
    }

    pub const fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub const fn with_border(mut self, border: BorderMode) -> Self {
        self.border = border;
        self
    }

    pub fn validate(&self) -> Result<(), GuidedFilterError> {
        if self.radius == 0 {
            return Err(GuidedFilterError::InvalidParameter(
                "radius must be positive".to_string(),
            ));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(GuidedFilterError::InvalidParameter(format!(
                "epsilon must be finite and non-negative, got {}",
                self.epsilon
            )));
        }
        self.variant.validate()
    }
}

/// A configured guided filter, reusable across images.
///
/// # Examples
///
/// ```
/// use image::Rgb;
/// use imageops_guided::{FilterParameters, GuidedFilter, Image, Schedule, Variant};
///
/// let guide: Image<Rgb<u8>> = Image::from_pixel(32, 32, Rgb([90, 120, 200]));
/// let input = guide.clone();
///
/// let filter = GuidedFilter::new(
///     FilterParameters::new(4, 1e-3).with_variant(Variant::FastBox { factor: 2 }),
/// )
/// .with_schedule(Schedule::sequential());
///
/// let output = filter.filter(&guide, &input).unwrap();
/// assert_eq!(output, guide);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidedFilter {
    params: FilterParameters,
    schedule: Schedule,
}

impl GuidedFilter {
    pub fn new(params: FilterParameters) -> Self {
        Self {
            params,
            schedule: Schedule::default(),
        }
    }

    pub const fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub const fn parameters(&self) -> &FilterParameters {
        &self.params
    }

    pub const fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Filters `input` using `guidance` into a newly allocated image.
    pub fn filter<P>(
        &self,
        guidance: &Image<P>,
        input: &Image<P>,
    ) -> Result<Image<P>, GuidedFilterError>
    where
        P: Pixel<Subpixel = u8>,
    {
        let (width, height) = input.dimensions();
        let mut output = ImageBuffer::new(width, height);
        self.filter_into(guidance, input, &mut output)?;
        Ok(output)
    }

    /// Filters `input` using `guidance` into a caller-provided buffer.
    ///
    /// The buffer is written only after every argument has been validated.
    pub fn filter_into<P>(
        &self,
        guidance: &Image<P>,
        input: &Image<P>,
        output: &mut Image<P>,
    ) -> Result<(), GuidedFilterError>
    where
        P: Pixel<Subpixel = u8>,
    {
        let geometry = self.validate(
            guidance.dimensions(),
            input.dimensions(),
            output.dimensions(),
        )?;
        let (width, height) = input.dimensions();
        let channels = usize::from(P::CHANNEL_COUNT);
        debug!(
            "guided filter {:?} on {width}x{height}x{channels}: r={} eps={} working {}x{} r={}",
            self.params.variant,
            self.params.radius,
            self.params.epsilon,
            geometry.width,
            geometry.height,
            geometry.radius
        );

        let executor = Executor::new(self.schedule);
        let pipeline = ChannelPipeline {
            executor: &executor,
            params: &self.params,
            geometry,
            width,
            height,
            channels,
        };
        let coefficients: Vec<Coefficients> = (0..channels)
            .map(|channel| pipeline.coefficients(guidance.as_raw(), input.as_raw(), channel))
            .collect();

        let composer = Composer::new(
            &coefficients,
            self.params.variant.upsampler(),
            self.params.border,
            window_area(geometry.radius),
        );
        composer.compose(&executor, guidance.as_raw(), width, height, &mut **output);
        Ok(())
    }

    fn validate(
        &self,
        guidance_dims: (u32, u32),
        input_dims: (u32, u32),
        output_dims: (u32, u32),
    ) -> Result<WorkingGeometry, GuidedFilterError> {
        self.params.validate()?;
        self.schedule.validate()?;
        validate_matching_dimensions(guidance_dims, input_dims)?;
        validate_non_empty_image(input_dims.0, input_dims.1)?;
        validate_output_dimensions(input_dims, output_dims)?;

        let geometry =
            self.params
                .variant
                .working_geometry(input_dims.0, input_dims.1, self.params.radius);
        if 2 * u64::from(geometry.radius) >= u64::from(geometry.width.min(geometry.height)) {
            return Err(GuidedFilterError::WindowTooLarge {
                radius: geometry.radius,
                width: geometry.width,
                height: geometry.height,
            });
        }
        Ok(geometry)
    }
}

/// Per-channel evaluation of the field graph up to the averaged coefficients.
struct ChannelPipeline<'a> {
    executor: &'a Executor,
    params: &'a FilterParameters,
    geometry: WorkingGeometry,
    width: u32,
    height: u32,
    channels: usize,
}

impl ChannelPipeline<'_> {
    fn coefficients(&self, guidance: &[u8], input: &[u8], channel: usize) -> Coefficients {
        trace!("channel {channel}");
        let guide = self.reduce(self.plane("guided_float", guidance, channel, f32::from));
        let input = self.reduce(self.plane("input_float", input, channel, |v| {
            normalize_with_max(v, 255.0)
        }));

        let stats = WindowStats::compute(
            self.executor,
            &guide,
            &input,
            self.geometry.radius,
            self.params.border,
        );
        let coefficients = LocalRegression::new(&stats, self.params.epsilon).solve(self.executor);
        self.expand(coefficients)
    }

    /// One channel of an interleaved 8-bit buffer as a float plane.
    fn plane<F>(
        &self,
        field: &'static str,
        samples: &[u8],
        channel: usize,
        convert: F,
    ) -> Image<Luma<f32>>
    where
        F: Fn(u8) -> f32 + Sync,
    {
        let (width, channels) = (self.width as usize, self.channels);
        self.executor.materialize(
            field,
            self.width,
            self.height,
            Tiling::Output,
            |_, x0, y, out| {
                let start = (y as usize * width + x0 as usize) * channels + channel;
                let row = samples[start..].iter().step_by(channels);
                for (value, &sample) in out.iter_mut().zip(row) {
                    *value = convert(sample);
                }
            },
        )
    }

    /// Brings a full-resolution plane down to the working resolution.
    fn reduce(&self, plane: Image<Luma<f32>>) -> Image<Luma<f32>> {
        let border = self.params.border;
        match self.params.variant {
            Variant::Direct => plane,
            Variant::FastBox { .. } => (0..self.params.variant.box_levels())
                .fold(plane, |plane, _| downsample_box(self.executor, &plane, border)),
            Variant::FastNearest { scale } => {
                decimate_nearest(self.executor, &plane, scale, border)
            }
        }
    }

    /// Upsamples box-level coefficients to one level below full resolution.
    ///
    /// The final 2× step is left to the composer.
    fn expand(&self, coefficients: Coefficients) -> Coefficients {
        let levels = self.params.variant.box_levels() as usize;
        if levels < 2 {
            return coefficients;
        }

        let mut extents = vec![(self.width, self.height)];
        for level in 0..levels {
            let (w, h) = extents[level];
            extents.push((halved_extent(w), halved_extent(h)));
        }

        let border = self.params.border;
        extents[1..levels]
            .iter()
            .rev()
            .fold(coefficients, |coefficients, &(width, height)| Coefficients {
                mean_a: upsample_box(self.executor, &coefficients.mean_a, width, height, border),
                mean_b: upsample_box(self.executor, &coefficients.mean_b, width, height, border),
            })
    }
}
