//! Image enhancement core
//!
//! Contrast stretching driven by histogram analysis, and lighting
//! normalization by division with a blurred copy of the image.

pub mod histogram;
pub mod lighting;
pub mod pipeline;
pub mod stretch;
pub mod white_balance;

pub use histogram::{RangeMethod, Thresholds};
pub use lighting::LightingMode;
pub use pipeline::{EnhanceResult, Pipeline, PipelineOptions};
