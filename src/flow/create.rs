use std::{path::Path, sync::Arc};

use anyhow::Context;
use rayon::prelude::*;

use crate::{
    cache::models::ModelStore,
    flow::{
        model::{
            DEFAULT_ORIGINAL_IMAGE_NAME, Flow, FlowMultilayer, FlowSimple, Layer, ProcessArgs,
        },
        opts::{MultilayerFlowOpts, SimpleFlowOpts},
        progress::{FlowStep, ProgressSink},
    },
    foundation::error::{DepthFlowError, DepthFlowResult},
    layers::{
        bounds::{LayerBound, bounds_from_divisions},
        histogram::combined_divisions,
        masks::{diffuse_occluded_depth, occlusion_mask, pack_layer_depth, visibility_mask},
    },
    models::{
        depth::{DepthModel, estimate_depth},
        inpaint::{InpaintModel, run_inpaint},
        session::{LazySession, ModelRuntime, SharedSession, with_session},
    },
    raster::{
        blur::gaussian_blur,
        buffer::{Channel, RgbaBuffer},
        codec::{decode_image, encode_png},
        composite::{alpha_blend, write_channel},
        dilate::{Combine, dilate},
        resample::{ResizeQuality, resample},
    },
};

/// Source image for a flow: encoded file bytes plus the name they are archived under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageInput {
    /// Encoded image (any format the `image` crate decodes).
    pub bytes: Vec<u8>,
    /// Archive name of the original image.
    pub name: String,
}

impl ImageInput {
    /// Unnamed input, archived as [`DEFAULT_ORIGINAL_IMAGE_NAME`].
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            name: DEFAULT_ORIGINAL_IMAGE_NAME.to_owned(),
        }
    }

    /// Replace the archive name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Read a file, keeping its file name.
    pub fn from_path(path: &Path) -> DepthFlowResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
        let input = Self::new(bytes);
        Ok(match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => input.with_name(name),
            None => input,
        })
    }
}

/// Producer tag recorded in every flow.
pub fn processed_by() -> String {
    format!("depthflow {}", env!("CARGO_PKG_VERSION"))
}

/// Drives flow construction: depth inference, layer splitting, inpainting.
///
/// Model sessions are created on first use from weights in the [`ModelStore`] and kept for the
/// creator's lifetime; a failed creation is retried on the next run.
pub struct FlowCreator {
    store: Arc<ModelStore>,
    runtime: Arc<dyn ModelRuntime>,
    depth: LazySession<dyn DepthModel>,
    inpaint: LazySession<dyn InpaintModel>,
}

struct Prepared {
    image: RgbaBuffer,
    depth: RgbaBuffer,
    depth_png: Vec<u8>,
}

struct PreparedLayer {
    depth_png: Vec<u8>,
    /// Soft inpaint mask; `None` for the background layer.
    fill_mask: Option<RgbaBuffer>,
}

impl FlowCreator {
    /// Creator over `store` using `runtime` to build sessions.
    pub fn new(store: Arc<ModelStore>, runtime: Arc<dyn ModelRuntime>) -> Self {
        Self {
            store,
            runtime,
            depth: LazySession::new(),
            inpaint: LazySession::new(),
        }
    }

    /// Weight store.
    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    fn depth_session(&self) -> DepthFlowResult<SharedSession<dyn DepthModel>> {
        self.depth.get_or_load(|| {
            let weights = self.store.depth_weights()?;
            self.runtime.load_depth(&weights)
        })
    }

    fn inpaint_session(&self) -> DepthFlowResult<SharedSession<dyn InpaintModel>> {
        self.inpaint.get_or_load(|| {
            let weights = self.store.inpaint_weights()?;
            self.runtime.load_inpaint(&weights)
        })
    }

    /// Image plus post-processed depth map.
    #[tracing::instrument(skip_all, fields(image = %input.name))]
    pub fn create_simple_flow(
        &self,
        input: &ImageInput,
        opts: &SimpleFlowOpts,
        progress: &dyn ProgressSink,
    ) -> DepthFlowResult<Flow> {
        let opts = opts.clamped();
        let prepared = self.prepare(input, opts.depth_map_dilate_radius, progress)?;
        let base = base_flow(input, &prepared, opts.process_args()?);
        FlowStep::Done.report(progress);
        Ok(Flow::Simple(base))
    }

    /// Image plus depth map plus one inpainted layer per depth band, nearest first.
    #[tracing::instrument(skip_all, fields(image = %input.name))]
    pub fn create_multilayer_flow(
        &self,
        input: &ImageInput,
        opts: &MultilayerFlowOpts,
        progress: &dyn ProgressSink,
    ) -> DepthFlowResult<Flow> {
        let opts = opts.clamped();
        let prepared = self.prepare(input, opts.depth_map_dilate_radius, progress)?;

        FlowStep::SplittingByDepth.report(progress);
        let divisions = combined_divisions(&prepared.depth);
        let bounds = if divisions.points.is_empty() {
            tracing::warn!("depth histogram has no usable divisions, using a single layer");
            vec![LayerBound::new(0, 255)?]
        } else {
            bounds_from_divisions(&divisions.points)?
        };
        tracing::info!(points = ?divisions.points, layers = bounds.len(), "split by depth");

        FlowStep::LoadingInpaintModel.report(progress);
        let inpaint = self.inpaint_session()?;

        let mut eager = if opts.threading.parallel {
            let pool = build_thread_pool(opts.threading.threads)?;
            let depth = &prepared.depth;
            let results: Vec<DepthFlowResult<PreparedLayer>> = pool.install(|| {
                bounds
                    .par_iter()
                    .map(|&bound| prepare_layer(depth, bound, &opts))
                    .collect()
            });
            Some(
                results
                    .into_iter()
                    .collect::<DepthFlowResult<Vec<_>>>()?
                    .into_iter(),
            )
        } else {
            None
        };

        let total = bounds.len();
        let mut layers = Vec::with_capacity(total);
        for (index, &bound) in bounds.iter().enumerate() {
            FlowStep::ProcessingLayer { index, total }.report(progress);
            let layer = match eager.as_mut() {
                Some(ready) => ready.next().ok_or_else(|| {
                    DepthFlowError::from(anyhow::anyhow!(
                        "internal error: layer preparation returned too few layers"
                    ))
                })?,
                None => prepare_layer(&prepared.depth, bound, &opts)?,
            };
            layers.push(finish_layer(input, &prepared.image, layer, &inpaint)?);
        }

        let base = base_flow(input, &prepared, opts.process_args()?);
        FlowStep::Done.report(progress);
        Ok(Flow::Multilayer(FlowMultilayer {
            base,
            inpaint_layers: layers.len(),
            division_points: divisions.points,
            layers,
        }))
    }

    fn prepare(
        &self,
        input: &ImageInput,
        dilate_radius: u32,
        progress: &dyn ProgressSink,
    ) -> DepthFlowResult<Prepared> {
        FlowStep::LoadingDepthModel.report(progress);
        let session = self.depth_session()?;

        FlowStep::LoadingImage.report(progress);
        let image = decode_image(&input.bytes)?;

        FlowStep::RunningDepthModel.report(progress);
        let raw = with_session(&session, |model| estimate_depth(model, &image))?;

        FlowStep::PostprocessingDepth.report(progress);
        let scaled = resample(&raw, image.width(), image.height(), ResizeQuality::High)?;
        let depth = dilate(&scaled, dilate_radius, Combine::Max);
        let depth_png = encode_png(&depth)?;
        Ok(Prepared {
            image,
            depth,
            depth_png,
        })
    }
}

fn base_flow(input: &ImageInput, prepared: &Prepared, process_args: ProcessArgs) -> FlowSimple {
    FlowSimple {
        original_image: input.bytes.clone(),
        original_image_name: input.name.clone(),
        original_depth_map: prepared.depth_png.clone(),
        width: prepared.image.width(),
        height: prepared.image.height(),
        processed_by: processed_by(),
        process_args,
    }
}

fn finish_layer(
    input: &ImageInput,
    image: &RgbaBuffer,
    layer: PreparedLayer,
    inpaint: &SharedSession<dyn InpaintModel>,
) -> DepthFlowResult<Layer> {
    let Some(mask) = layer.fill_mask else {
        return Ok(Layer {
            image: input.bytes.clone(),
            depth_map: layer.depth_png,
        });
    };

    let mut filled = with_session(inpaint, |model| run_inpaint(model, image, &mask))?;
    write_channel(&mask, Channel::R, &mut filled, Channel::A)?;
    let color = alpha_blend(image, &[&filled])?;
    Ok(Layer {
        image: encode_png(&color)?,
        depth_map: layer.depth_png,
    })
}

fn prepare_layer(
    depth: &RgbaBuffer,
    bound: LayerBound,
    opts: &MultilayerFlowOpts,
) -> DepthFlowResult<PreparedLayer> {
    let bound = bound.widen(opts.bound_overlap);
    let visibility = visibility_mask(depth, bound.lower);
    let occlusion = occlusion_mask(depth, bound.upper);
    tracing::debug!(lower = bound.lower, upper = bound.upper, "preparing layer");

    if bound.is_background() {
        let packed = pack_layer_depth(
            depth,
            &visibility,
            &occlusion.mask,
            opts.layer_depth_map_dilate_radius,
            opts.layer_depth_map_blur_radius,
            opts.layer_display_mask_blur_radius,
        )?;
        return Ok(PreparedLayer {
            depth_png: encode_png(&packed)?,
            fill_mask: None,
        });
    }

    let fill_mask = gaussian_blur(
        &dilate(
            &occlusion.mask,
            opts.layer_inpaint_mask_dilate_radius,
            Combine::Max,
        ),
        opts.layer_inpaint_mask_blur_radius,
    )?;
    let diffused = diffuse_occluded_depth(&occlusion.clamped, &fill_mask)?;
    let packed = pack_layer_depth(
        &diffused,
        &visibility,
        &occlusion.mask,
        opts.layer_depth_map_dilate_radius,
        opts.layer_depth_map_blur_radius,
        opts.layer_display_mask_blur_radius,
    )?;
    Ok(PreparedLayer {
        depth_png: encode_png(&packed)?,
        fill_mask: Some(fill_mask),
    })
}

fn build_thread_pool(threads: Option<usize>) -> DepthFlowResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(DepthFlowError::configuration(
            "layer threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| DepthFlowError::concurrency(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/flow/create.rs"]
mod tests;
