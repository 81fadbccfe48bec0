//! In-memory floating-point images
//!
//! A `FloatImage` is either a single 2-D plane of shape `(H, W)` or a stack of
//! per-channel planes of shape `(H, W, C)`. Samples are nominally in [0, 1].

use crate::error::EnhanceError;
use image::{ImageBuffer, Luma};

/// One channel of floating-point samples
pub type Plane = ImageBuffer<Luma<f32>, Vec<f32>>;

/// BT.709 luminance weights
const LUMA_WEIGHTS: [f32; 3] = [0.2125, 0.7154, 0.0721];

#[derive(Debug, Clone)]
pub struct FloatImage {
    planes: Vec<Plane>,
    multichannel: bool,
}

impl FloatImage {
    /// Wrap a single plane as a 2-D image
    pub fn from_plane(plane: Plane) -> Self {
        Self {
            planes: vec![plane],
            multichannel: false,
        }
    }

    /// Stack planes into a 3-D image with a trailing channel dimension
    pub fn from_planes(planes: Vec<Plane>) -> Result<Self, EnhanceError> {
        let first = planes
            .first()
            .ok_or_else(|| EnhanceError::InvalidInput("image has no channels".to_string()))?;
        let dims = first.dimensions();
        if dims.0 == 0 || dims.1 == 0 {
            return Err(EnhanceError::InvalidInput(format!(
                "image has zero extent: {}x{}",
                dims.0, dims.1
            )));
        }
        if planes.iter().any(|p| p.dimensions() != dims) {
            return Err(EnhanceError::InvalidInput(
                "channel planes differ in size".to_string(),
            ));
        }
        Ok(Self {
            planes,
            multichannel: true,
        })
    }

    /// Build from a row-major shape (`[H, W]` or `[H, W, C]`) and interleaved samples
    pub fn from_shape_vec(shape: &[usize], samples: Vec<f32>) -> Result<Self, EnhanceError> {
        let (height, width, channels) = match *shape {
            [h, w] => (h, w, 1),
            [h, w, c] => (h, w, c),
            _ => {
                return Err(EnhanceError::InvalidInput(format!(
                    "unsupported dimensionality {} (expected 2 or 3)",
                    shape.len()
                )))
            }
        };
        if height == 0 || width == 0 || channels == 0 {
            return Err(EnhanceError::InvalidInput(format!(
                "shape {:?} has a zero extent",
                shape
            )));
        }
        if samples.len() != height * width * channels {
            return Err(EnhanceError::InvalidInput(format!(
                "shape {:?} needs {} samples, got {}",
                shape,
                height * width * channels,
                samples.len()
            )));
        }

        let (w, h) = (width as u32, height as u32);
        if shape.len() == 2 {
            let plane = Plane::from_raw(w, h, samples)
                .ok_or_else(|| EnhanceError::Internal("plane buffer size mismatch".to_string()))?;
            return Ok(Self::from_plane(plane));
        }

        let planes = (0..channels)
            .map(|c| {
                let data: Vec<f32> = samples.iter().skip(c).step_by(channels).copied().collect();
                Plane::from_raw(w, h, data)
                    .ok_or_else(|| EnhanceError::Internal("plane buffer size mismatch".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_planes(planes)
    }

    /// Rebuild an image with this image's layout from replacement planes
    pub fn with_planes(&self, planes: Vec<Plane>) -> Result<Self, EnhanceError> {
        if planes.len() != self.planes.len() {
            return Err(EnhanceError::Internal(format!(
                "expected {} planes, got {}",
                self.planes.len(),
                planes.len()
            )));
        }
        if self.is_multichannel() {
            Self::from_planes(planes)
        } else {
            Ok(Self::from_plane(planes.into_iter().next().ok_or_else(|| {
                EnhanceError::Internal("missing plane".to_string())
            })?))
        }
    }

    pub fn width(&self) -> u32 {
        self.planes[0].width()
    }

    pub fn height(&self) -> u32 {
        self.planes[0].height()
    }

    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    pub fn is_multichannel(&self) -> bool {
        self.multichannel
    }

    /// Array shape, `[H, W]` or `[H, W, C]`
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = vec![self.height() as usize, self.width() as usize];
        if self.is_multichannel() {
            shape.push(self.channels());
        }
        shape
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// All samples, plane by plane
    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        self.planes.iter().flat_map(|p| p.as_raw().iter().copied())
    }

    /// Samples in row-major `(H, W, C)` order
    pub fn to_interleaved(&self) -> Vec<f32> {
        let pixels = (self.width() * self.height()) as usize;
        let channels = self.channels();
        let mut out = vec![0.0f32; pixels * channels];
        for (c, plane) in self.planes.iter().enumerate() {
            for (i, &v) in plane.as_raw().iter().enumerate() {
                out[i * channels + c] = v;
            }
        }
        out
    }

    /// Global (min, max) over every sample of every channel
    pub fn min_max(&self) -> (f32, f32) {
        self.samples()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Collapse to a single luminance plane
    ///
    /// Channels past the third (alpha) are ignored; a luma+alpha image keeps its luma.
    pub fn to_grayscale(&self) -> FloatImage {
        if self.channels() < 3 {
            return Self::from_plane(self.planes[0].clone());
        }
        let (r, g, b) = (&self.planes[0], &self.planes[1], &self.planes[2]);
        let gray = Plane::from_fn(self.width(), self.height(), |x, y| {
            let v = LUMA_WEIGHTS[0] * r.get_pixel(x, y).0[0]
                + LUMA_WEIGHTS[1] * g.get_pixel(x, y).0[0]
                + LUMA_WEIGHTS[2] * b.get_pixel(x, y).0[0];
            Luma([v])
        });
        Self::from_plane(gray)
    }
}
