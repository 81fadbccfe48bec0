use crate::error::EnhanceError;
use crate::raster::FloatImage;
use serde::Serialize;
use std::time::Instant;

use super::histogram::{RangeMethod, Thresholds};
use super::lighting::{self, LightingMode};
use super::white_balance::{self, ChannelBounds};

/// What the pipeline runs and with which parameters
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Collapse to luminance before anything else
    pub grayscale: bool,
    pub lighting: LightingMode,
    /// Blur extent; image height / 30 when unset
    pub sigma: Option<f32>,
    pub range_method: RangeMethod,
    /// Defaults depend on `range_method` when unset
    pub thresholds: Option<Thresholds>,
}

/// Timing information for a single step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of enhancement including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct EnhanceResult {
    /// Enhanced image (not serialized)
    #[serde(skip)]
    pub image: FloatImage,
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
    /// Sigma actually used for lighting normalization, if it ran
    pub sigma: Option<f32>,
    pub range_method: RangeMethod,
    pub thresholds: Thresholds,
    pub channels: Vec<ChannelBounds>,
    pub warnings: Vec<String>,
}

/// Grayscale, then lighting normalization, then per-channel white balance
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Result<Self, EnhanceError> {
        if let Some(sigma) = options.sigma {
            lighting::validate_sigma(sigma)?;
        }
        if let Some(thresholds) = options.thresholds {
            thresholds.validate(options.range_method)?;
        }
        Ok(Self { options })
    }

    pub fn thresholds(&self) -> Thresholds {
        self.options
            .thresholds
            .unwrap_or_else(|| Thresholds::default_for(self.options.range_method))
    }

    /// Enhance one image; the result is always within [0, 1]
    pub fn process(&self, image: FloatImage) -> Result<EnhanceResult, EnhanceError> {
        let start = Instant::now();
        let mut steps_timing = Vec::new();
        let mut img = image;

        if self.options.grayscale {
            img = self.run_step("grayscale", &mut steps_timing, || Ok(img.to_grayscale()))?;
        }

        let mut sigma_used = None;
        if self.options.lighting != LightingMode::None {
            let sigma = self
                .options
                .sigma
                .unwrap_or_else(|| lighting::default_sigma(img.height()));
            sigma_used = Some(sigma);
            img = self.run_step("lighting", &mut steps_timing, || {
                lighting::normalize_lighting(&img, sigma, self.options.lighting)
            })?;
        }

        let thresholds = self.thresholds();
        let balanced = self.run_step("white_balance", &mut steps_timing, || {
            white_balance::auto_white_balance(&img, self.options.range_method, thresholds)
        })?;

        Ok(EnhanceResult {
            image: balanced.image,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: steps_timing,
            sigma: sigma_used,
            range_method: self.options.range_method,
            thresholds,
            channels: balanced.channels,
            warnings: balanced.warnings,
        })
    }

    fn run_step<T, F>(
        &self,
        name: &str,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<T, EnhanceError>
    where
        F: FnOnce() -> Result<T, EnhanceError>,
    {
        let step_start = Instant::now();
        let result = step_fn()?;
        let time_ms = step_start.elapsed().as_millis() as u64;
        tracing::debug!("Step {} took {}ms", name, time_ms);
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms,
        });
        Ok(result)
    }
}
