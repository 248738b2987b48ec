use std::io::Cursor;

use anyhow::Context;

use crate::{foundation::error::DepthFlowResult, raster::buffer::RgbaBuffer};

/// Decode any format supported by the `image` crate into straight RGBA8.
pub fn decode_image(bytes: &[u8]) -> DepthFlowResult<RgbaBuffer> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    RgbaBuffer::from_raw(width, height, rgba.into_raw())
}

/// Encode a buffer as PNG (RGBA8).
pub fn encode_png(buf: &RgbaBuffer) -> DepthFlowResult<Vec<u8>> {
    let img = image::RgbaImage::from_raw(buf.width(), buf.height(), buf.as_bytes().to_vec())
        .context("wrap rgba buffer for png encoding")?;
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/raster/codec.rs"]
mod tests;
