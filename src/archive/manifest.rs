use serde::{Deserialize, Serialize};

use crate::{
    flow::model::{Flow, ProcessArgs},
    foundation::error::{DepthFlowError, DepthFlowResult},
};

/// Archive entry holding the manifest.
pub const MANIFEST_NAME: &str = "depth-flow.json";
/// Archive entry holding the original depth map.
pub const DEPTH_MAP_NAME: &str = "depth-map.png";

/// Archive entry of layer `index` (0-based) color.
pub fn layer_image_name(index: usize) -> String {
    format!("layer-{}.png", index + 1)
}

/// Archive entry of layer `index` (0-based) packed depth.
pub fn layer_depth_map_name(index: usize) -> String {
    format!("layer-{}-depth-map.png", index + 1)
}

/// Explicit flow discriminator written by this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    /// [`Flow::Simple`].
    Simple,
    /// [`Flow::Multilayer`].
    Multilayer,
}

/// Asset names of one layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerEntry {
    /// Color entry.
    pub image: String,
    /// Packed depth entry.
    pub depth_map: String,
}

/// `depth-flow.json` contents.
///
/// Manifests written before the `kind` field existed are told apart by the presence of
/// `layers`/`inpaintLayers`. Division points are read from `inpaintBreakpoints` or its later
/// alias `inpaintDivisionPoints`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowManifest {
    /// Explicit discriminator; absent in older manifests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FlowKind>,
    /// Entry name of the original image.
    pub original_image: String,
    /// Entry name of the original depth map.
    pub original_depth_map: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Layer count (multilayer only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inpaint_layers: Option<usize>,
    /// Division points (multilayer only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inpaint_breakpoints: Option<Vec<u8>>,
    /// Later name of `inpaint_breakpoints`; read but never written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inpaint_division_points: Option<Vec<u8>>,
    /// Layer entries, nearest first (multilayer only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<LayerEntry>>,
    /// Producer tag.
    #[serde(default)]
    pub processed_by: String,
    /// Parameters the flow was built with.
    #[serde(default)]
    pub process_args: ProcessArgs,
}

impl FlowManifest {
    /// Manifest describing `flow` with deterministic entry names.
    pub fn for_flow(flow: &Flow) -> Self {
        let base = flow.base();
        let mut manifest = Self {
            kind: Some(FlowKind::Simple),
            original_image: base.original_image_name.clone(),
            original_depth_map: DEPTH_MAP_NAME.to_owned(),
            width: base.width,
            height: base.height,
            inpaint_layers: None,
            inpaint_breakpoints: None,
            inpaint_division_points: None,
            layers: None,
            processed_by: base.processed_by.clone(),
            process_args: base.process_args.clone(),
        };
        if let Flow::Multilayer(flow) = flow {
            manifest.kind = Some(FlowKind::Multilayer);
            manifest.inpaint_layers = Some(flow.inpaint_layers);
            manifest.inpaint_breakpoints = Some(flow.division_points.clone());
            manifest.layers = Some(
                (0..flow.layers.len())
                    .map(|i| LayerEntry {
                        image: layer_image_name(i),
                        depth_map: layer_depth_map_name(i),
                    })
                    .collect(),
            );
        }
        manifest
    }

    /// Parse manifest JSON.
    pub fn from_json(bytes: &[u8]) -> DepthFlowResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| DepthFlowError::serde(format!("invalid {MANIFEST_NAME}: {e}")))
    }

    /// Pretty JSON (2-space indent). Identical manifests give identical bytes.
    pub fn to_json(&self) -> DepthFlowResult<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| DepthFlowError::serde(format!("serialize {MANIFEST_NAME}: {e}")))
    }

    /// Flow kind, from `kind` when present, else from field presence.
    pub fn resolved_kind(&self) -> DepthFlowResult<FlowKind> {
        let has_layers = self.layers.is_some() || self.inpaint_layers.is_some();
        match (self.kind, has_layers) {
            (Some(FlowKind::Simple), true) => Err(DepthFlowError::configuration(
                "manifest kind is 'simple' but it lists layers",
            )),
            (Some(FlowKind::Multilayer), _) if self.layers.is_none() => Err(
                DepthFlowError::configuration("manifest kind is 'multilayer' but has no layers"),
            ),
            (Some(kind), _) => Ok(kind),
            (None, true) => Ok(FlowKind::Multilayer),
            (None, false) => Ok(FlowKind::Simple),
        }
    }

    /// Division points under either field name.
    ///
    /// Both names with different values is an error; both absent yields an empty list.
    pub fn division_points(&self) -> DepthFlowResult<Vec<u8>> {
        match (&self.inpaint_breakpoints, &self.inpaint_division_points) {
            (Some(a), Some(b)) if a != b => Err(DepthFlowError::configuration(format!(
                "manifest has conflicting inpaintBreakpoints {a:?} and inpaintDivisionPoints {b:?}"
            ))),
            (Some(a), _) => Ok(a.clone()),
            (None, Some(b)) => {
                tracing::warn!("manifest uses inpaintDivisionPoints alias for inpaintBreakpoints");
                Ok(b.clone())
            }
            (None, None) => Ok(Vec::new()),
        }
    }

    /// Every entry name the manifest references, in archive order.
    pub fn asset_names(&self) -> Vec<&str> {
        let mut names = vec![self.original_image.as_str(), self.original_depth_map.as_str()];
        for layer in self.layers.iter().flatten() {
            names.push(&layer.image);
            names.push(&layer.depth_map);
        }
        names
    }
}

#[cfg(test)]
#[path = "../../tests/unit/archive/manifest.rs"]
mod tests;
