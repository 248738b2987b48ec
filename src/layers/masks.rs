use crate::{
    foundation::error::DepthFlowResult,
    raster::{
        blur::gaussian_blur,
        buffer::{Channel, RgbaBuffer},
        composite::{alpha_blend, write_channel},
        dilate::{Combine, dilate},
    },
};

/// Mask value for "set" pixels.
pub const MASK_ON: u8 = 255;

/// Blur radius of each depth diffusion round.
pub const DIFFUSION_RADIUS: u32 = 12;
/// Number of depth diffusion rounds.
pub const DIFFUSION_ITERATIONS: usize = 12;

/// Output of [`occlusion_mask`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occlusion {
    /// Depth map with every value above the bound clamped down to it.
    pub clamped: RgbaBuffer,
    /// 255 where the original depth exceeded the bound (owned by a nearer layer), else 0.
    pub mask: RgbaBuffer,
}

/// Clamp depths above `upper` and mark them as occluded.
pub fn occlusion_mask(depth: &RgbaBuffer, upper: u8) -> Occlusion {
    let mut clamped = Vec::with_capacity(depth.as_bytes().len());
    let mut mask = Vec::with_capacity(depth.as_bytes().len());
    for v in depth.channel(Channel::R) {
        let (c, m) = if v > upper { (upper, MASK_ON) } else { (v, 0) };
        clamped.extend_from_slice(&[c, c, c, 255]);
        mask.extend_from_slice(&[m, m, m, 255]);
    }
    Occlusion {
        clamped: depth.with_bytes(clamped),
        mask: depth.with_bytes(mask),
    }
}

/// 255 where depth is at or above `lower` (this band and anything nearer), else 0.
pub fn visibility_mask(depth: &RgbaBuffer, lower: u8) -> RgbaBuffer {
    let mut mask = Vec::with_capacity(depth.as_bytes().len());
    for v in depth.channel(Channel::R) {
        let m = if v >= lower { MASK_ON } else { 0 };
        mask.extend_from_slice(&[m, m, m, 255]);
    }
    depth.with_bytes(mask)
}

/// Spread surrounding depth into the masked region by repeated compositing.
///
/// The clamped map is blurred by [`DIFFUSION_RADIUS`] and takes `mask` as its alpha; that copy
/// is then composited over the running map [`DIFFUSION_ITERATIONS`] times. Fully masked pixels
/// end up at the blurred clamped value, partially masked ones converge toward it and unmasked
/// pixels keep their clamped depth.
pub fn diffuse_occluded_depth(
    clamped: &RgbaBuffer,
    mask: &RgbaBuffer,
) -> DepthFlowResult<RgbaBuffer> {
    clamped.ensure_same_size(mask, "diffuse_occluded_depth")?;

    // Every round blurs the same clamped map, so one blur serves all of them.
    let mut blurred = gaussian_blur(clamped, DIFFUSION_RADIUS)?;
    write_channel(mask, Channel::R, &mut blurred, Channel::A)?;

    let mut current = clamped.clone();
    for _ in 0..DIFFUSION_ITERATIONS {
        current = alpha_blend(&current, &[&blurred])?;
    }
    Ok(current)
}

/// Build the renderer-facing layer depth buffer.
///
/// R holds the dilated and blurred depth, G the visibility mask blurred by `mask_blur_radius`
/// (display feathering) and B the unblurred occlusion mask.
pub fn pack_layer_depth(
    depth: &RgbaBuffer,
    visibility: &RgbaBuffer,
    occlusion: &RgbaBuffer,
    dilate_radius: u32,
    blur_radius: u32,
    mask_blur_radius: u32,
) -> DepthFlowResult<RgbaBuffer> {
    depth.ensure_same_size(visibility, "pack_layer_depth")?;
    depth.ensure_same_size(occlusion, "pack_layer_depth")?;

    let dilated = dilate(depth, dilate_radius, Combine::Max);
    let mut packed = gaussian_blur(&dilated, blur_radius)?;
    let feather = gaussian_blur(visibility, mask_blur_radius)?;
    write_channel(&feather, Channel::R, &mut packed, Channel::G)?;
    write_channel(occlusion, Channel::R, &mut packed, Channel::B)?;
    Ok(packed)
}

#[cfg(test)]
#[path = "../../tests/unit/layers/masks.rs"]
mod tests;
