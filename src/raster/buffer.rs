use crate::foundation::error::{DepthFlowError, DepthFlowResult};

/// One channel of an RGBA8 pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Red; the "primary" scalar channel for depth maps and masks.
    R,
    /// Green.
    G,
    /// Blue.
    B,
    /// Alpha.
    A,
}

impl Channel {
    /// Byte offset of this channel inside a pixel.
    pub fn index(self) -> usize {
        match self {
            Self::R => 0,
            Self::G => 1,
            Self::B => 2,
            Self::A => 3,
        }
    }
}

/// Straight (non-premultiplied) RGBA8 pixel buffer, row-major and tightly packed.
///
/// Depth maps and masks use the same layout: the scalar value lives in [`Channel::R`]
/// (mirrored into G/B for plain grey images) and alpha is opaque unless a step says otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbaBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbaBuffer {
    /// Allocate a fully transparent black buffer.
    pub fn new(width: u32, height: u32) -> DepthFlowResult<Self> {
        let len = byte_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Wrap existing RGBA8 bytes; `data.len()` must equal `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> DepthFlowResult<Self> {
        let len = byte_len(width, height)?;
        if data.len() != len {
            return Err(DepthFlowError::configuration(format!(
                "rgba buffer of {width}x{height} expects {len} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build an opaque grey buffer from one scalar per pixel.
    pub fn from_gray(width: u32, height: u32, values: &[u8]) -> DepthFlowResult<Self> {
        let mut out = Self::new(width, height)?;
        if values.len() != out.pixel_count() {
            return Err(DepthFlowError::configuration(format!(
                "gray plane of {width}x{height} expects {} values, got {}",
                out.pixel_count(),
                values.len()
            )));
        }
        for (px, &v) in out.data.chunks_exact_mut(4).zip(values) {
            px.copy_from_slice(&[v, v, v, 255]);
        }
        Ok(out)
    }

    /// Build a buffer where every pixel is `px`.
    pub fn filled(width: u32, height: u32, px: [u8; 4]) -> DepthFlowResult<Self> {
        let len = byte_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: px.repeat(len / 4),
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.data.len() / 4
    }

    /// Raw RGBA8 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw RGBA8 bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume into raw RGBA8 bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at `(x, y)`. Panics when out of bounds, like slice indexing.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Overwrite the pixel at `(x, y)`.
    pub fn set_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&px);
    }

    /// Iterator over one channel, in pixel order.
    pub fn channel(&self, channel: Channel) -> impl Iterator<Item = u8> + '_ {
        let c = channel.index();
        self.data.chunks_exact(4).map(move |px| px[c])
    }

    /// Fail unless `other` has the same dimensions.
    pub fn ensure_same_size(&self, other: &Self, what: &str) -> DepthFlowResult<()> {
        if self.dimensions() != other.dimensions() {
            return Err(DepthFlowError::configuration(format!(
                "{what} expects equal dimensions, got {}x{} and {}x{}",
                self.width, self.height, other.width, other.height
            )));
        }
        Ok(())
    }

    /// New buffer with this buffer's dimensions and the given bytes (same length).
    pub(crate) fn with_bytes(&self, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), self.data.len());
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }
}

fn byte_len(width: u32, height: u32) -> DepthFlowResult<usize> {
    if width == 0 || height == 0 {
        return Err(DepthFlowError::configuration(
            "rgba buffer width/height must be non-zero",
        ));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| DepthFlowError::configuration("rgba buffer size overflow"))
}

#[cfg(test)]
#[path = "../../tests/unit/raster/buffer.rs"]
mod tests;
