use rayon::prelude::*;

use crate::{
    foundation::error::{DepthFlowError, DepthFlowResult},
    raster::buffer::RgbaBuffer,
};

/// Separable Gaussian blur with standard deviation `radius` pixels.
///
/// The kernel spans `ceil(3 * radius)` taps on each side, uses Q16 fixed-point weights that sum
/// to exactly 1.0 and clamps samples at the buffer edges. All four channels are blurred
/// independently. Radius 0 returns an identical copy.
pub fn gaussian_blur(src: &RgbaBuffer, radius: u32) -> DepthFlowResult<RgbaBuffer> {
    if radius == 0 {
        return Ok(src.clone());
    }

    let kernel = gaussian_kernel_q16(radius.saturating_mul(3), radius as f32)?;
    let (width, height) = src.dimensions();
    let mut tmp = vec![0u8; src.as_bytes().len()];
    let mut out = vec![0u8; src.as_bytes().len()];

    horizontal_pass(src.as_bytes(), &mut tmp, width, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(src.with_bytes(out))
}

fn gaussian_kernel_q16(half_width: u32, sigma: f32) -> DepthFlowResult<Vec<u32>> {
    if half_width == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(DepthFlowError::configuration("blur sigma must be > 0"));
    }

    let r = half_width as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = sigma as f64;
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = i as f64;
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Rounding drift goes to the centre tap so the kernel sums to exactly 1.0.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        let new_mid = (i64::from(weights[mid]) + delta).clamp(0, 65536);
        weights[mid] = new_mid as u32;
    }

    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let row_len = width as usize * 4;
    dst.par_chunks_exact_mut(row_len)
        .zip(src.par_chunks_exact(row_len))
        .for_each(|(dst_row, src_row)| {
            for x in 0..w {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                    let idx = (sx as usize) * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(src_row[idx + c]);
                    }
                }
                let out_idx = (x as usize) * 4;
                for c in 0..4 {
                    dst_row[out_idx + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let h = height as i32;
    let row_len = width as usize * 4;
    dst.par_chunks_exact_mut(row_len)
        .enumerate()
        .for_each(|(y, dst_row)| {
            let y = y as i32;
            for (i, out) in dst_row.iter_mut().enumerate() {
                let mut acc = 0u64;
                for (ki, &kw) in k.iter().enumerate() {
                    let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                    acc += u64::from(kw) * u64::from(src[(sy as usize) * row_len + i]);
                }
                *out = q16_to_u8(acc);
            }
        });
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    (v.min(255)) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/raster/blur.rs"]
mod tests;
