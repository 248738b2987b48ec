use crate::{
    foundation::error::{DepthFlowError, DepthFlowResult},
    raster::buffer::{Channel, RgbaBuffer},
};

/// Per-channel ImageNet mean used for model input normalization.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Per-channel ImageNet standard deviation used for model input normalization.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Dense `float32` tensor in row-major (NCHW) order.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    dims: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Wrap `data`; its length must equal the product of `dims`.
    pub fn new(dims: Vec<usize>, data: Vec<f32>) -> DepthFlowResult<Self> {
        let expected = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| DepthFlowError::configuration("tensor shape overflows usize"))?;
        if dims.is_empty() || expected != data.len() {
            return Err(DepthFlowError::configuration(format!(
                "tensor of shape {dims:?} expects {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self { dims, data })
    }

    /// Shape.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Flat values.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// `float32[1,3,h,w]` from the RGB channels, scaled to [0,1] and optionally
    /// ImageNet-normalized. Alpha is ignored.
    pub fn from_rgb(image: &RgbaBuffer, normalize: bool) -> Self {
        let (width, height) = image.dimensions();
        let plane = image.pixel_count();
        let mut data = vec![0f32; plane * 3];
        for (i, px) in image.as_bytes().chunks_exact(4).enumerate() {
            for c in 0..3 {
                let v = f32::from(px[c]) / 255.0;
                data[i + plane * c] = if normalize {
                    (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c]
                } else {
                    v
                };
            }
        }
        Self {
            dims: vec![1, 3, height as usize, width as usize],
            data,
        }
    }

    /// `float32[1,1,h,w]` holding one channel scaled to [0,1].
    pub fn from_channel(image: &RgbaBuffer, channel: Channel) -> Self {
        let (width, height) = image.dimensions();
        let data = image
            .channel(channel)
            .map(|v| f32::from(v) / 255.0)
            .collect();
        Self {
            dims: vec![1, 1, height as usize, width as usize],
            data,
        }
    }

    /// Spatial `(width, height)` of a `[1,h,w]`, `[1,1,h,w]` or `[1,3,h,w]` tensor.
    pub fn spatial_size(&self) -> DepthFlowResult<(u32, u32)> {
        let (h, w) = match self.dims.as_slice() {
            [1, h, w] | [1, 1, h, w] | [1, 3, h, w] => (*h, *w),
            other => {
                return Err(DepthFlowError::configuration(format!(
                    "unexpected tensor shape {other:?}"
                )));
            }
        };
        let w = u32::try_from(w)
            .map_err(|_| DepthFlowError::configuration("tensor width exceeds u32"))?;
        let h = u32::try_from(h)
            .map_err(|_| DepthFlowError::configuration("tensor height exceeds u32"))?;
        Ok((w, h))
    }

    /// Grey image from a single-plane tensor, stretched to [0,255] by the global min/max.
    ///
    /// Accepts `[1,h,w]` and `[1,1,h,w]`. A constant tensor maps to all zeros; non-finite
    /// values are treated as the minimum.
    pub fn to_grayscale(&self) -> DepthFlowResult<RgbaBuffer> {
        let (width, height) = match self.dims.as_slice() {
            [1, _, _] | [1, 1, _, _] => self.spatial_size()?,
            other => {
                return Err(DepthFlowError::configuration(format!(
                    "grayscale conversion expects [1,h,w] or [1,1,h,w], got {other:?}"
                )));
            }
        };

        let (min, max) = self
            .data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;

        let values: Vec<u8> = self
            .data
            .iter()
            .map(|&v| {
                if range <= 0.0 || !v.is_finite() {
                    return 0;
                }
                (((v - min) / range) * 255.0).round().clamp(0.0, 255.0) as u8
            })
            .collect();
        RgbaBuffer::from_gray(width, height, &values)
    }

    /// Opaque RGB image from a `[1,3,h,w]` tensor. With `scale`, values are taken to be in
    /// [0,1] and multiplied by 255. Results are clamped to [0,255].
    pub fn to_rgb(&self, scale: bool) -> DepthFlowResult<RgbaBuffer> {
        let [1, 3, _, _] = self.dims.as_slice() else {
            return Err(DepthFlowError::configuration(format!(
                "rgb conversion expects [1,3,h,w], got {:?}",
                self.dims
            )));
        };
        let (width, height) = self.spatial_size()?;
        let plane = self.data.len() / 3;
        let factor = if scale { 255.0 } else { 1.0 };

        let mut out = RgbaBuffer::new(width, height)?;
        for (i, px) in out.as_bytes_mut().chunks_exact_mut(4).enumerate() {
            for c in 0..3 {
                let v = self.data[i + plane * c] * factor;
                px[c] = if v.is_finite() {
                    v.clamp(0.0, 255.0) as u8
                } else {
                    0
                };
            }
            px[3] = 255;
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/tensor.rs"]
mod tests;
