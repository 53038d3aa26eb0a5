mod error;
mod imageops_guided;
#[cfg(test)]
mod test_utils;
mod utils;

use image::{ImageBuffer, Pixel};

pub use error::GuidedFilterError;
pub use imageops_guided::border::{reflect, BorderMode};
pub use imageops_guided::executor::{Materialization, Schedule};
pub use imageops_guided::filter::{FilterParameters, GuidedFilter, GuidedFilterExt, Variant};

pub type Image<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;
