use crate::{
    foundation::error::{DepthFlowError, DepthFlowResult},
    foundation::math::{div_round_u32, mul_div255_u16},
    raster::buffer::{Channel, RgbaBuffer},
};

/// Straight-alpha RGBA8 pixel.
pub type Rgba8 = [u8; 4];

/// Source-over compositing of straight-alpha pixels.
///
/// An opaque `src` replaces `dst` exactly; a fully transparent `src` leaves `dst` untouched.
pub fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let sa = u32::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let inv = 255 - sa;
    let da = u32::from(dst[3]);
    // dst alpha scaled by (1 - src alpha), in 0..=255.
    let da_inv = u32::from(mul_div255_u16(da as u16, inv as u16));
    let out_a = sa + da_inv;
    if out_a == 0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    out[3] = out_a.min(255) as u8;
    for i in 0..3 {
        let num = u32::from(src[i]) * sa + u32::from(dst[i]) * da_inv;
        out[i] = div_round_u32(num, out_a).min(255) as u8;
    }
    out
}

/// Composite every `front` over `back` in order ("over" with each front's own alpha).
///
/// All operands must share `back`'s dimensions.
pub fn alpha_blend(back: &RgbaBuffer, fronts: &[&RgbaBuffer]) -> DepthFlowResult<RgbaBuffer> {
    for front in fronts {
        back.ensure_same_size(front, "alpha_blend")?;
    }

    let mut out = back.as_bytes().to_vec();
    for front in fronts {
        for (d, s) in out.chunks_exact_mut(4).zip(front.as_bytes().chunks_exact(4)) {
            let px = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
            d.copy_from_slice(&px);
        }
    }
    Ok(back.with_bytes(out))
}

/// Copy one channel of `source` into one channel of `target`, pixel by pixel.
pub fn write_channel(
    source: &RgbaBuffer,
    source_channel: Channel,
    target: &mut RgbaBuffer,
    target_channel: Channel,
) -> DepthFlowResult<()> {
    if source.dimensions() != target.dimensions() {
        return Err(DepthFlowError::configuration(format!(
            "write_channel source and target must have the same size, got {}x{} and {}x{}",
            source.width(),
            source.height(),
            target.width(),
            target.height()
        )));
    }

    let (sc, tc) = (source_channel.index(), target_channel.index());
    for (t, s) in target
        .as_bytes_mut()
        .chunks_exact_mut(4)
        .zip(source.as_bytes().chunks_exact(4))
    {
        t[tc] = s[sc];
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/raster/composite.rs"]
mod tests;
