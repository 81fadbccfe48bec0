//! Per-channel auto white balance
//!
//! Each channel gets its own histogram, its own bounds and its own stretch;
//! nothing is shared between channels.

use super::histogram::{find_range, BucketRange, Histogram, RangeMethod, Thresholds};
use super::stretch::{clamp_unit, stretch};
use crate::error::EnhanceError;
use crate::raster::FloatImage;
use serde::Serialize;

/// Bounds chosen for one channel
#[derive(Debug, Clone, Serialize)]
pub struct ChannelBounds {
    pub channel: usize,
    /// Bounds in bucket units, as found on the histogram
    pub buckets: BucketRange,
    /// Bounds in the sample domain, as passed to the stretcher
    pub down: f32,
    pub up: f32,
    /// The range collapsed and the channel was only clamped
    pub degenerate: bool,
}

#[derive(Debug, Clone)]
pub struct WhiteBalanceResult {
    pub image: FloatImage,
    pub channels: Vec<ChannelBounds>,
    pub warnings: Vec<String>,
}

/// Stretch every channel of `image` between its own detected bounds
pub fn auto_white_balance(
    image: &FloatImage,
    method: RangeMethod,
    thresholds: Thresholds,
) -> Result<WhiteBalanceResult, EnhanceError> {
    thresholds.validate(method)?;

    let mut planes = Vec::with_capacity(image.channels());
    let mut channels = Vec::with_capacity(image.channels());
    let mut warnings = Vec::new();

    for (channel, plane) in image.planes().iter().enumerate() {
        let buckets = find_range(&Histogram::from_plane(plane), method, thresholds);
        let (down, up) = buckets.to_values(method);

        let (stretched, degenerate) = match stretch(plane, down, up) {
            Ok(stretched) => (stretched, false),
            Err(err @ EnhanceError::DegenerateRange { .. }) => {
                tracing::warn!("Channel {}: {}, leaving it unstretched", channel, err);
                warnings.push(format!("channel {}: {}", channel, err));
                (clamp_unit(plane), true)
            }
            Err(err) => return Err(err),
        };

        tracing::debug!(
            "Channel {}: {} bounds {:.3}..{:.3} (buckets {:.1}..{:.1})",
            channel,
            method,
            down,
            up,
            buckets.down,
            buckets.up
        );

        planes.push(stretched);
        channels.push(ChannelBounds {
            channel,
            buckets,
            down,
            up,
            degenerate,
        });
    }

    Ok(WhiteBalanceResult {
        image: image.with_planes(planes)?,
        channels,
        warnings,
    })
}
