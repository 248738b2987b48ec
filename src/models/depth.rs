use crate::{
    foundation::error::{DepthFlowError, DepthFlowResult},
    models::tensor::Tensor,
    raster::{
        buffer::RgbaBuffer,
        resample::{ResizeQuality, resample},
    },
};

/// Target length of the shorter image edge fed to the depth model.
pub const DEPTH_INPUT_EDGE: u32 = 518;
/// The longer edge is rounded to a multiple of this patch size.
pub const DEPTH_PATCH: u32 = 14;

/// Monocular depth estimator.
///
/// Input is a normalized `float32[1,3,h,w]` tensor sized by [`depth_input_size`]; output is a
/// single-plane tensor (`[1,h,w]` or `[1,1,h,w]`) in arbitrary units where larger means nearer.
pub trait DepthModel: Send {
    /// Run one inference.
    fn predict(&mut self, image: &Tensor) -> DepthFlowResult<Tensor>;
}

/// Model input size for an image of `width x height`.
///
/// The shorter edge becomes [`DEPTH_INPUT_EDGE`]; the other edge keeps the aspect ratio and is
/// rounded to the nearest multiple of [`DEPTH_PATCH`] (never below one patch).
pub fn depth_input_size(width: u32, height: u32) -> DepthFlowResult<(u32, u32)> {
    if width == 0 || height == 0 {
        return Err(DepthFlowError::configuration(
            "depth input image width/height must be non-zero",
        ));
    }
    let aspect = f64::from(width) / f64::from(height);
    let edge = f64::from(DEPTH_INPUT_EDGE);
    let round_to_patch = |v: f64| {
        let patches = (v / f64::from(DEPTH_PATCH)).round().max(1.0);
        (patches as u32).saturating_mul(DEPTH_PATCH)
    };
    Ok(if width < height {
        (DEPTH_INPUT_EDGE, round_to_patch(edge / aspect))
    } else {
        (round_to_patch(edge * aspect), DEPTH_INPUT_EDGE)
    })
}

/// Resize `image` to the depth model's input size and convert it to a normalized tensor.
pub fn prepare_depth_input(image: &RgbaBuffer) -> DepthFlowResult<Tensor> {
    let (w, h) = depth_input_size(image.width(), image.height())?;
    let scaled = resample(image, w, h, ResizeQuality::High)?;
    Ok(Tensor::from_rgb(&scaled, true))
}

/// Run `model` on `image` and return the raw depth as a grey map in [0,255] at the model's
/// output resolution.
#[tracing::instrument(skip(model, image), fields(width = image.width(), height = image.height()))]
pub fn estimate_depth(model: &mut dyn DepthModel, image: &RgbaBuffer) -> DepthFlowResult<RgbaBuffer> {
    let input = prepare_depth_input(image)?;
    let output = model.predict(&input)?;
    tracing::debug!(input = ?input.dims(), output = ?output.dims(), "depth inference done");
    output.to_grayscale()
}

#[cfg(test)]
#[path = "../../tests/unit/models/depth.rs"]
mod tests;
