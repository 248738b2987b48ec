use crate::foundation::error::{DepthFlowError, DepthFlowResult};

/// Depth band `[lower, upper]` of one layer, in depth-map units (0 = far, 255 = near).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct LayerBound {
    /// Inclusive lower depth.
    pub lower: u8,
    /// Upper depth; pixels above it belong to nearer layers.
    pub upper: u8,
}

impl LayerBound {
    /// Build a bound, rejecting `lower >= upper`.
    pub fn new(lower: u8, upper: u8) -> DepthFlowResult<Self> {
        if lower >= upper {
            return Err(DepthFlowError::configuration(format!(
                "layer bound requires lower < upper, got ({lower}, {upper})"
            )));
        }
        Ok(Self { lower, upper })
    }

    /// The band reaches the top of the depth range, so no pixel lies above it and nothing needs
    /// inpainting.
    pub fn is_background(self) -> bool {
        self.upper == u8::MAX
    }

    /// Grow the band by `overlap` on both sides, clipped to `0..=255`.
    pub fn widen(self, overlap: u8) -> Self {
        Self {
            lower: self.lower.saturating_sub(overlap),
            upper: self.upper.saturating_add(overlap),
        }
    }
}

/// Turn division points into per-layer bounds, nearest layer first.
///
/// `[0, points.., 255]` is sorted and paired into consecutive `(lower, upper)` bands, which tile
/// the full depth range; the result is reversed so index 0 holds the highest depths, ending at
/// 255, and the last entry starts at 0.
pub fn bounds_from_divisions(points: &[u8]) -> DepthFlowResult<Vec<LayerBound>> {
    if points.is_empty() {
        return Err(DepthFlowError::configuration(
            "division points must have at least one element",
        ));
    }
    if let Some(bad) = points.iter().find(|p| !(1..=254).contains(*p)) {
        return Err(DepthFlowError::configuration(format!(
            "division points must be in range [1, 254], got {bad}"
        )));
    }

    let mut edges = Vec::with_capacity(points.len() + 2);
    edges.push(0u8);
    edges.extend_from_slice(points);
    edges.push(u8::MAX);
    edges.sort_unstable();
    if edges.windows(2).any(|w| w[0] == w[1]) {
        return Err(DepthFlowError::configuration(
            "division points must not contain duplicates",
        ));
    }

    let mut bounds: Vec<LayerBound> = edges
        .windows(2)
        .map(|w| LayerBound {
            lower: w[0],
            upper: w[1],
        })
        .collect();
    bounds.reverse();
    Ok(bounds)
}

#[cfg(test)]
#[path = "../../tests/unit/layers/bounds.rs"]
mod tests;
