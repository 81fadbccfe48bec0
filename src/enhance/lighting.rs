//! Local lighting normalization
//!
//! Divides the image by a heavily blurred copy of itself so that slow
//! illumination gradients cancel out, then rescales the whole result to [0, 1]
//! with one global min/max shared by all channels.

use crate::error::EnhanceError;
use crate::raster::{FloatImage, Plane};
use image::Luma;
use imageproc::filter::gaussian_blur_f32;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Guard added to every denominator and logarithm argument
pub const EPSILON: f32 = 1e-7;

/// Default sigma is the image height divided by this
const SIGMA_HEIGHT_DIVISOR: f32 = 30.0;

/// Offset applied in the log domain before rescaling
const LOG_OFFSET: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LightingMode {
    /// Leave lighting untouched
    #[default]
    None,
    /// `image / (blurred + eps)`
    Ratio,
    /// `ln(image / blurred + eps) + 0.5`
    Log,
}

impl LightingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ratio => "ratio",
            Self::Log => "log",
        }
    }
}

impl FromStr for LightingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "ratio" => Ok(Self::Ratio),
            "log" | "log-ratio" => Ok(Self::Log),
            other => Err(format!(
                "unknown lighting mode '{}' (expected 'none', 'ratio' or 'log')",
                other
            )),
        }
    }
}

impl fmt::Display for LightingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blur extent used when none is configured
pub fn default_sigma(height: u32) -> f32 {
    height as f32 / SIGMA_HEIGHT_DIVISOR
}

pub fn validate_sigma(sigma: f32) -> Result<(), EnhanceError> {
    if sigma.is_finite() && sigma > 0.0 {
        Ok(())
    } else {
        Err(EnhanceError::InvalidParameter(format!(
            "sigma must be a positive number, got {}",
            sigma
        )))
    }
}

/// Remove large-scale illumination from `image`
///
/// `LightingMode::None` returns an unmodified copy.
pub fn normalize_lighting(
    image: &FloatImage,
    sigma: f32,
    mode: LightingMode,
) -> Result<FloatImage, EnhanceError> {
    if mode == LightingMode::None {
        return Ok(image.clone());
    }
    validate_sigma(sigma)?;

    let blurred = blur_channels(image, sigma);
    let planes: Vec<Plane> = image
        .planes()
        .iter()
        .zip(&blurred)
        .map(|(plane, blur)| {
            Plane::from_fn(plane.width(), plane.height(), |x, y| {
                let v = plane.get_pixel(x, y).0[0];
                let b = blur.get_pixel(x, y).0[0];
                let ratio = v / (b + EPSILON);
                let out = match mode {
                    LightingMode::Log => (ratio.max(0.0) + EPSILON).ln() + LOG_OFFSET,
                    _ => ratio,
                };
                Luma([out])
            })
        })
        .collect();

    let ratio_image = image.with_planes(planes)?;
    rescale_global(&ratio_image)
}

/// Gaussian blur of each channel on its own
fn blur_channels(image: &FloatImage, sigma: f32) -> Vec<Plane> {
    image
        .planes()
        .iter()
        .map(|plane| gaussian_blur_f32(plane, sigma))
        .collect()
}

/// Min-max rescale over every sample of every channel, then clamp
///
/// A constant image has no range to stretch and comes back as zeros.
fn rescale_global(image: &FloatImage) -> Result<FloatImage, EnhanceError> {
    let (min, max) = image.min_max();
    let range = max - min;
    let degenerate = !(range.is_finite() && range > 0.0);
    if degenerate {
        tracing::warn!("Lighting result is flat (min={}, max={}), emitting zeros", min, max);
    }

    let planes: Vec<Plane> = image
        .planes()
        .iter()
        .map(|plane| {
            let mut out = plane.clone();
            for pixel in out.pixels_mut() {
                pixel.0[0] = if degenerate {
                    0.0
                } else {
                    ((pixel.0[0] - min) / range).clamp(0.0, 1.0)
                };
            }
            out
        })
        .collect();

    image.with_planes(planes)
}
