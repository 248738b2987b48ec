use crate::{
    foundation::error::{DepthFlowError, DepthFlowResult},
    models::tensor::Tensor,
    raster::{
        buffer::{Channel, RgbaBuffer},
        resample::{ResizeQuality, resample},
    },
};

/// Fixed square input/output resolution of the inpainting model.
pub const INPAINT_SIZE: u32 = 512;
/// Mask values at or above this become "fill" (1.0) after downscaling.
pub const MASK_THRESHOLD: u8 = 128;

/// Image inpainting model.
///
/// `image` is `float32[1,3,512,512]` in [0,1], `mask` is `float32[1,1,512,512]` holding 0.0 or
/// 1.0 (1.0 = fill). The result is `float32[1,3,512,512]`.
pub trait InpaintModel: Send {
    /// Run one inference.
    fn inpaint(&mut self, image: &Tensor, mask: &Tensor) -> DepthFlowResult<Tensor>;

    /// Whether the output is in [0,1] (scaled by 255 on conversion) rather than [0,255].
    fn output_is_unit_range(&self) -> bool {
        false
    }
}

/// Fill the masked region of `image` using `model`, returning a full-resolution opaque image.
///
/// `mask` carries its value in the R channel; the caller composites the result with its own
/// soft mask, so unmasked pixels here are whatever the model produced.
#[tracing::instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn run_inpaint(
    model: &mut dyn InpaintModel,
    image: &RgbaBuffer,
    mask: &RgbaBuffer,
) -> DepthFlowResult<RgbaBuffer> {
    image.ensure_same_size(mask, "run_inpaint")?;

    let small_image = resample(image, INPAINT_SIZE, INPAINT_SIZE, ResizeQuality::High)?;
    let small_mask = binarize(&resample(mask, INPAINT_SIZE, INPAINT_SIZE, ResizeQuality::High)?);

    let output = model.inpaint(
        &Tensor::from_rgb(&small_image, false),
        &Tensor::from_channel(&small_mask, Channel::R),
    )?;
    if output.spatial_size()? != (INPAINT_SIZE, INPAINT_SIZE) {
        return Err(DepthFlowError::model_inference(format!(
            "inpaint output has shape {:?}, expected [1,3,{INPAINT_SIZE},{INPAINT_SIZE}]",
            output.dims()
        )));
    }

    let filled = output.to_rgb(model.output_is_unit_range())?;
    resample(&filled, image.width(), image.height(), ResizeQuality::High)
}

fn binarize(mask: &RgbaBuffer) -> RgbaBuffer {
    let mut out = mask.clone();
    for px in out.as_bytes_mut().chunks_exact_mut(4) {
        let v = if px[0] >= MASK_THRESHOLD { 255 } else { 0 };
        px.copy_from_slice(&[v, v, v, 255]);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/models/inpaint.rs"]
mod tests;
