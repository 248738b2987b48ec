pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Rounded unsigned division, `num / den` to the nearest integer (halves round up).
pub(crate) fn div_round_u32(num: u32, den: u32) -> u32 {
    if den == 0 {
        return 0;
    }
    (num + den / 2) / den
}

pub(crate) fn clamp_radius(radius: u32, max: u32) -> u32 {
    radius.min(max)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
