use serde::{Deserialize, Serialize};

use crate::{
    flow::model::ProcessArgs,
    foundation::{
        error::{DepthFlowError, DepthFlowResult},
        math::clamp_radius,
    },
};

/// Upper bound of every depth/mask dilation radius.
pub const MAX_DILATE_RADIUS: u32 = 20;
/// Upper bound of the inpaint mask dilation radius.
pub const MAX_INPAINT_MASK_DILATE_RADIUS: u32 = 30;
/// Upper bound of every blur radius.
pub const MAX_BLUR_RADIUS: u32 = 10;
/// Upper bound of the layer bound overlap.
pub const MAX_BOUND_OVERLAP: u8 = 10;

/// Options of the simple (single depth map) flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimpleFlowOpts {
    /// Max-dilation radius of the final depth map, 0..=20.
    pub depth_map_dilate_radius: u32,
}

impl Default for SimpleFlowOpts {
    fn default() -> Self {
        Self {
            depth_map_dilate_radius: 4,
        }
    }
}

impl SimpleFlowOpts {
    /// Copy with every field clamped to its range.
    pub fn clamped(&self) -> Self {
        Self {
            depth_map_dilate_radius: clamp_radius(self.depth_map_dilate_radius, MAX_DILATE_RADIUS),
        }
    }

    /// Serialized form recorded as the flow's `processArgs`.
    pub fn process_args(&self) -> DepthFlowResult<ProcessArgs> {
        to_process_args(self)
    }
}

/// Worker settings for per-layer preparation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayerThreading {
    /// Prepare layer masks and depth on a rayon pool. Inpainting stays sequential.
    pub parallel: bool,
    /// Pool size; `None` lets rayon decide. Must be at least 1 when set.
    pub threads: Option<usize>,
}

/// Options of the multilayer flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MultilayerFlowOpts {
    /// Max-dilation radius of the full depth map, 0..=20.
    pub depth_map_dilate_radius: u32,
    /// Dilation of each layer's occlusion mask before inpainting, 0..=30.
    pub layer_inpaint_mask_dilate_radius: u32,
    /// Blur of the dilated inpaint mask, 0..=10.
    pub layer_inpaint_mask_blur_radius: u32,
    /// Dilation of each layer's depth, 0..=20.
    pub layer_depth_map_dilate_radius: u32,
    /// Blur of each layer's depth, 0..=10.
    pub layer_depth_map_blur_radius: u32,
    /// Blur of the display (feather) mask, 0..=10.
    pub layer_display_mask_blur_radius: u32,
    /// Widening of each layer bound on both sides, 0..=10.
    pub bound_overlap: u8,
    /// Execution settings; not recorded in `processArgs` since they never change the output.
    #[serde(skip)]
    pub threading: LayerThreading,
}

impl Default for MultilayerFlowOpts {
    fn default() -> Self {
        Self {
            depth_map_dilate_radius: 1,
            layer_inpaint_mask_dilate_radius: 8,
            layer_inpaint_mask_blur_radius: 2,
            layer_depth_map_dilate_radius: 6,
            layer_depth_map_blur_radius: 2,
            layer_display_mask_blur_radius: 2,
            bound_overlap: 8,
            threading: LayerThreading::default(),
        }
    }
}

impl MultilayerFlowOpts {
    /// Copy with every field clamped to its range.
    pub fn clamped(&self) -> Self {
        Self {
            depth_map_dilate_radius: clamp_radius(self.depth_map_dilate_radius, MAX_DILATE_RADIUS),
            layer_inpaint_mask_dilate_radius: clamp_radius(
                self.layer_inpaint_mask_dilate_radius,
                MAX_INPAINT_MASK_DILATE_RADIUS,
            ),
            layer_inpaint_mask_blur_radius: clamp_radius(
                self.layer_inpaint_mask_blur_radius,
                MAX_BLUR_RADIUS,
            ),
            layer_depth_map_dilate_radius: clamp_radius(
                self.layer_depth_map_dilate_radius,
                MAX_DILATE_RADIUS,
            ),
            layer_depth_map_blur_radius: clamp_radius(
                self.layer_depth_map_blur_radius,
                MAX_BLUR_RADIUS,
            ),
            layer_display_mask_blur_radius: clamp_radius(
                self.layer_display_mask_blur_radius,
                MAX_BLUR_RADIUS,
            ),
            bound_overlap: self.bound_overlap.min(MAX_BOUND_OVERLAP),
            threading: self.threading,
        }
    }

    /// Serialized form recorded as the flow's `processArgs`.
    pub fn process_args(&self) -> DepthFlowResult<ProcessArgs> {
        to_process_args(self)
    }
}

fn to_process_args<T: Serialize>(opts: &T) -> DepthFlowResult<ProcessArgs> {
    match serde_json::to_value(opts) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(DepthFlowError::serde(format!(
            "options serialized to a non-object: {other}"
        ))),
        Err(e) => Err(DepthFlowError::serde(format!("serialize options: {e}"))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/flow/opts.rs"]
mod tests;
