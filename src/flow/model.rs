use serde_json::{Map, Value};

/// Default archive name of the original image when the caller gives none.
pub const DEFAULT_ORIGINAL_IMAGE_NAME: &str = "image.png";

/// Free-form processing parameters recorded alongside a flow.
pub type ProcessArgs = Map<String, Value>;

/// Assets and metadata shared by both flow kinds.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowSimple {
    /// Original image file bytes, stored verbatim.
    pub original_image: Vec<u8>,
    /// Archive name of the original image.
    pub original_image_name: String,
    /// Post-processed depth map (PNG).
    pub original_depth_map: Vec<u8>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Producer tag, e.g. `depthflow 0.1.0`.
    pub processed_by: String,
    /// Parameters the flow was built with.
    pub process_args: ProcessArgs,
}

/// One depth band: color plus packed depth (R depth, G feather mask, B occlusion mask).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    /// Color image (PNG, or the original image bytes for the background layer).
    pub image: Vec<u8>,
    /// Packed depth buffer (PNG).
    pub depth_map: Vec<u8>,
}

/// Layered flow, layers ordered nearest to farthest.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowMultilayer {
    /// Shared assets and metadata.
    pub base: FlowSimple,
    /// Number of layers.
    pub inpaint_layers: usize,
    /// Division points the layers were built from, ascending.
    pub division_points: Vec<u8>,
    /// Layers, nearest first.
    pub layers: Vec<Layer>,
}

/// A depth flow asset.
#[derive(Clone, Debug, PartialEq)]
pub enum Flow {
    /// Image plus depth map.
    Simple(FlowSimple),
    /// Image plus depth map plus depth-ordered layers.
    Multilayer(FlowMultilayer),
}

impl Flow {
    /// Shared assets and metadata.
    pub fn base(&self) -> &FlowSimple {
        match self {
            Self::Simple(flow) => flow,
            Self::Multilayer(flow) => &flow.base,
        }
    }

    /// Layers (empty for a simple flow).
    pub fn layers(&self) -> &[Layer] {
        match self {
            Self::Simple(_) => &[],
            Self::Multilayer(flow) => &flow.layers,
        }
    }

    /// Wire name of the flow kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Simple(_) => "simple",
            Self::Multilayer(_) => "multilayer",
        }
    }
}
