use anyhow::Context;
use image::imageops::FilterType;

use crate::{
    foundation::error::{DepthFlowError, DepthFlowResult},
    raster::buffer::RgbaBuffer,
};

/// Resampling filter quality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResizeQuality {
    /// Bilinear.
    Low,
    /// Bicubic (Catmull-Rom).
    Medium,
    /// Lanczos3.
    #[default]
    High,
}

impl ResizeQuality {
    fn filter(self) -> FilterType {
        match self {
            Self::Low => FilterType::Triangle,
            Self::Medium => FilterType::CatmullRom,
            Self::High => FilterType::Lanczos3,
        }
    }
}

/// Resize `src` to exactly `width x height`. Same-size requests return a copy.
pub fn resample(
    src: &RgbaBuffer,
    width: u32,
    height: u32,
    quality: ResizeQuality,
) -> DepthFlowResult<RgbaBuffer> {
    if width == 0 || height == 0 {
        return Err(DepthFlowError::configuration(
            "resample target width/height must be non-zero",
        ));
    }
    if src.dimensions() == (width, height) {
        return Ok(src.clone());
    }

    let img = image::RgbaImage::from_raw(src.width(), src.height(), src.as_bytes().to_vec())
        .context("wrap rgba buffer for resampling")?;
    let resized = image::imageops::resize(&img, width, height, quality.filter());
    RgbaBuffer::from_raw(width, height, resized.into_raw())
}

#[cfg(test)]
#[path = "../../tests/unit/raster/resample.rs"]
mod tests;
