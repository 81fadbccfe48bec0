//! Histogram analysis and stretch-range detection
//!
//! A channel is quantized into 256 buckets and one of two strategies picks the
//! `(down, up)` stretch bounds from the resulting histogram:
//!
//! - **Mode**: bounds are fractions of the most populated bucket's index.
//! - **Percentile**: bounds are where the cumulative histogram crosses the
//!   given percentiles.
//!
//! Bounds are expressed in bucket units (0-255) until `BucketRange::to_values`
//! moves them into the [0, 1] sample domain.

use crate::error::EnhanceError;
use crate::raster::Plane;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Number of histogram buckets
pub const NUM_BUCKETS: usize = 256;

const MAX_BUCKET: f32 = (NUM_BUCKETS - 1) as f32;

/// Range detection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeMethod {
    /// Fractions of the modal bucket index
    #[default]
    Mode,
    /// Cumulative-distribution percentiles
    Percentile,
}

impl RangeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mode => "mode",
            Self::Percentile => "percentile",
        }
    }
}

impl FromStr for RangeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mode" => Ok(Self::Mode),
            "percentile" | "cdf" => Ok(Self::Percentile),
            other => Err(format!(
                "unknown range method '{}' (expected 'mode' or 'percentile')",
                other
            )),
        }
    }
}

impl fmt::Display for RangeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Low/high threshold pair
///
/// For `RangeMethod::Mode` these are multipliers of the modal bucket index;
/// for `RangeMethod::Percentile` they are percentiles in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub low: f64,
    pub high: f64,
}

impl Thresholds {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Defaults used when no thresholds are given
    pub fn default_for(method: RangeMethod) -> Self {
        match method {
            RangeMethod::Mode => Self::new(0.7, 1.0),
            RangeMethod::Percentile => Self::new(0.1, 99.9),
        }
    }

    pub fn validate(&self, method: RangeMethod) -> Result<(), EnhanceError> {
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(EnhanceError::InvalidParameter(format!(
                "thresholds must be finite, got ({}, {})",
                self.low, self.high
            )));
        }
        if self.low > self.high {
            return Err(EnhanceError::InvalidParameter(format!(
                "low threshold {} exceeds high threshold {}",
                self.low, self.high
            )));
        }
        match method {
            RangeMethod::Mode if self.low < 0.0 => Err(EnhanceError::InvalidParameter(format!(
                "mode thresholds must be non-negative, got ({}, {})",
                self.low, self.high
            ))),
            RangeMethod::Percentile if self.low < 0.0 || self.high > 100.0 => {
                Err(EnhanceError::InvalidParameter(format!(
                    "percentile thresholds must lie in [0, 100], got ({}, {})",
                    self.low, self.high
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Map a [0, 1] sample onto its bucket index
pub fn bucket_of(value: f32) -> usize {
    ((value.clamp(0.0, 1.0) * MAX_BUCKET).round() as usize).min(NUM_BUCKETS - 1)
}

/// 256-bucket intensity histogram of one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: [u64; NUM_BUCKETS],
}

impl Histogram {
    pub fn from_plane(plane: &Plane) -> Self {
        let mut counts = [0u64; NUM_BUCKETS];
        for pixel in plane.pixels() {
            counts[bucket_of(pixel.0[0])] += 1;
        }
        Self { counts }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Index of the most populated bucket; ties go to the lowest index
    pub fn mode(&self) -> usize {
        let mut best = 0;
        for (i, &count) in self.counts.iter().enumerate() {
            if count > self.counts[best] {
                best = i;
            }
        }
        best
    }

    /// Running sum of counts divided by the total, non-decreasing in [0, 1]
    pub fn cumulative(&self) -> Vec<f64> {
        let total = self.total();
        if total == 0 {
            return vec![0.0; NUM_BUCKETS];
        }
        let total = total as f64;
        let mut running = 0u64;
        self.counts
            .iter()
            .map(|&c| {
                running += c;
                running as f64 / total
            })
            .collect()
    }
}

#[cfg(test)]
impl Histogram {
    pub fn from_counts(counts: [u64; NUM_BUCKETS]) -> Self {
        Self { counts }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }
}

/// Stretch bounds in bucket units
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketRange {
    pub down: f64,
    pub up: f64,
}

impl BucketRange {
    /// Bounds in the sample domain, as bucket / 255
    ///
    /// Mode bounds are scaled as-is and may land above 1. The percentile
    /// search can report one past the last bucket (256), so its upper bound
    /// is pulled back onto the histogram first.
    pub fn to_values(&self, method: RangeMethod) -> (f32, f32) {
        let up = match method {
            RangeMethod::Mode => self.up,
            RangeMethod::Percentile => self.up.min(MAX_BUCKET as f64),
        };
        (
            (self.down / MAX_BUCKET as f64) as f32,
            (up / MAX_BUCKET as f64) as f32,
        )
    }
}

/// Pick stretch bounds from a histogram
pub fn find_range(histogram: &Histogram, method: RangeMethod, thresholds: Thresholds) -> BucketRange {
    match method {
        RangeMethod::Mode => {
            let mode = histogram.mode() as f64;
            BucketRange {
                down: mode * thresholds.low,
                up: mode * thresholds.high,
            }
        }
        RangeMethod::Percentile => {
            let cumulative = histogram.cumulative();
            let low = thresholds.low / 100.0;
            let high = thresholds.high / 100.0;
            // First index not below `low`, first index strictly above `high`
            let down = cumulative.partition_point(|&c| c < low);
            let up = cumulative.partition_point(|&c| c <= high);
            BucketRange {
                down: down as f64,
                up: up as f64,
            }
        }
    }
}
