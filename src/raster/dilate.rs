use rayon::prelude::*;

use crate::raster::buffer::RgbaBuffer;

/// Reduction applied over the dilation window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combine {
    /// Morphological dilation (grows bright regions).
    Max,
    /// Morphological erosion (grows dark regions).
    Min,
}

impl Combine {
    fn apply(self, a: u8, b: u8) -> u8 {
        match self {
            Self::Max => a.max(b),
            Self::Min => a.min(b),
        }
    }
}

/// Separable square min/max filter over a `2 * radius + 1` window, per channel (alpha included).
///
/// Windows are clipped at the buffer edges; out-of-bounds neighbours are ignored rather than
/// clamped or wrapped. Radius 0 returns an identical copy.
pub fn dilate(src: &RgbaBuffer, radius: u32, combine: Combine) -> RgbaBuffer {
    if radius == 0 {
        return src.clone();
    }

    let (width, height) = src.dimensions();
    let row_len = width as usize * 4;
    let r = radius as i64;

    let mut tmp = src.as_bytes().to_vec();
    tmp.par_chunks_exact_mut(row_len)
        .zip(src.as_bytes().par_chunks_exact(row_len))
        .for_each(|(dst_row, src_row)| {
            let w = width as i64;
            for x in 0..w {
                let lo = (x - r).max(0);
                let hi = (x + r).min(w - 1);
                for c in 0..4 {
                    let mut acc = src_row[(x as usize) * 4 + c];
                    for nx in lo..=hi {
                        acc = combine.apply(acc, src_row[(nx as usize) * 4 + c]);
                    }
                    dst_row[(x as usize) * 4 + c] = acc;
                }
            }
        });

    let mut out = tmp.clone();
    out.par_chunks_exact_mut(row_len)
        .enumerate()
        .for_each(|(y, dst_row)| {
            let h = height as i64;
            let y = y as i64;
            let lo = (y - r).max(0);
            let hi = (y + r).min(h - 1);
            for (i, dst) in dst_row.iter_mut().enumerate() {
                let mut acc = tmp[(y as usize) * row_len + i];
                for ny in lo..=hi {
                    acc = combine.apply(acc, tmp[(ny as usize) * row_len + i]);
                }
                *dst = acc;
            }
        });

    src.with_bytes(out)
}

#[cfg(test)]
#[path = "../../tests/unit/raster/dilate.rs"]
mod tests;
