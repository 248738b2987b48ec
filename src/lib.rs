//! depthflow turns one photo plus a monocular depth estimate into a "depth flow" asset that a
//! parallax renderer can animate.
//!
//! # Pipeline overview
//!
//! 1. **Depth**: run an external depth model on the image, stretch the output to `[0,255]`,
//!    scale it back to the image size and dilate it.
//! 2. **Split** (multilayer only): pick division points from the depth histogram
//!    ([`combined_divisions`]) and turn them into near-to-far [`LayerBound`]s.
//! 3. **Layers**: per bound, compute occlusion/visibility masks, diffuse depth into occluded
//!    regions, pack the layer depth buffer and inpaint the hidden color with an external model.
//! 4. **Archive**: store everything as a zip with a `depth-flow.json` manifest
//!    ([`encode_flow`] / [`decode_flow`]).
//!
//! Model runtimes are plugged in through [`ModelRuntime`], weights come from a [`WeightCache`]
//! managed by a [`ModelStore`], and [`FlowCreator`] drives the whole thing.
//!
//! Depth maps and masks share the straight RGBA8 [`RgbaBuffer`] layout with the scalar value in
//! the R channel. Depth 0 is far and 255 is near.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod archive;
mod cache;
mod flow;
mod foundation;
mod layers;
mod models;
mod raster;

pub use archive::codec::{
    RENAMED_ORIGINAL_PREFIX, decode_flow, encode_flow, normalize_entry_name, read_entries,
    read_manifest,
};
pub use archive::manifest::{
    DEPTH_MAP_NAME, FlowKind, FlowManifest, LayerEntry, MANIFEST_NAME, layer_depth_map_name,
    layer_image_name,
};
pub use cache::models::{
    DEFAULT_DEPTH_MODEL_URL, DEFAULT_INPAINT_MODEL_URL, DirFetcher, Fetcher, ModelStatus,
    ModelStore, ModelUrls, model_file_name,
};
#[cfg(feature = "http")]
pub use cache::http::{DEFAULT_CONNECT_TIMEOUT, HttpFetcher};
pub use cache::store::{DirCache, MemoryCache, WeightCache};
pub use flow::create::{FlowCreator, ImageInput, processed_by};
pub use flow::model::{
    DEFAULT_ORIGINAL_IMAGE_NAME, Flow, FlowMultilayer, FlowSimple, Layer, ProcessArgs,
};
pub use flow::opts::{
    LayerThreading, MAX_BLUR_RADIUS, MAX_BOUND_OVERLAP, MAX_DILATE_RADIUS,
    MAX_INPAINT_MASK_DILATE_RADIUS, MultilayerFlowOpts, SimpleFlowOpts,
};
pub use flow::progress::{FlowStep, LogProgress, NoProgress, ProgressSink};
pub use foundation::error::{DepthFlowError, DepthFlowResult};
pub use layers::bounds::{LayerBound, bounds_from_divisions};
pub use layers::histogram::{
    BUCKETS, Divisions, Histogram, MIN_BAND_MASS, PERCENTILE_CANDIDATES, VALLEY_CANDIDATES,
    combined_divisions, percentile_division, valley_division,
};
pub use layers::masks::{
    DIFFUSION_ITERATIONS, DIFFUSION_RADIUS, MASK_ON, Occlusion, diffuse_occluded_depth,
    occlusion_mask, pack_layer_depth, visibility_mask,
};
pub use models::depth::{
    DEPTH_INPUT_EDGE, DEPTH_PATCH, DepthModel, depth_input_size, estimate_depth,
    prepare_depth_input,
};
pub use models::inpaint::{INPAINT_SIZE, InpaintModel, MASK_THRESHOLD, run_inpaint};
pub use models::session::{LazySession, ModelRuntime, SharedSession, with_session};
pub use models::tensor::{IMAGENET_MEAN, IMAGENET_STD, Tensor};
pub use raster::blur::gaussian_blur;
pub use raster::buffer::{Channel, RgbaBuffer};
pub use raster::codec::{decode_image, encode_png};
pub use raster::composite::{Rgba8, alpha_blend, over, write_channel};
pub use raster::dilate::{Combine, dilate};
pub use raster::resample::{ResizeQuality, resample};
