use std::{
    fs::File,
    io::Read,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    cache::store::WeightCache,
    flow::progress::ProgressSink,
    foundation::error::{DepthFlowError, DepthFlowResult},
};

/// Default depth-estimation weights (Depth Anything V2 base, fp16 ONNX).
pub const DEFAULT_DEPTH_MODEL_URL: &str = "https://huggingface.co/onnx-community/depth-anything-v2-base/resolve/d13a228/onnx/model_fp16.onnx?download=true";
/// Default inpainting weights (LaMa, fp32 ONNX).
pub const DEFAULT_INPAINT_MODEL_URL: &str =
    "https://huggingface.co/Carve/LaMa-ONNX/resolve/c3c0c9e/lama_fp32.onnx?download=true";

/// Source URLs of the two models; they double as weight-cache keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUrls {
    /// Depth model URL.
    pub depth: String,
    /// Inpaint model URL.
    pub inpaint: String,
}

impl Default for ModelUrls {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH_MODEL_URL.to_owned(),
            inpaint: DEFAULT_INPAINT_MODEL_URL.to_owned(),
        }
    }
}

impl ModelUrls {
    /// Every model URL in download order.
    pub fn all(&self) -> [&str; 2] {
        [&self.depth, &self.inpaint]
    }
}

/// File name of a model URL: the last path segment, without query or fragment.
pub fn model_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    if name.is_empty() { url } else { name }
}

/// Retrieves model weights from their source.
pub trait Fetcher: Send + Sync {
    /// Fetch `url`, calling `on_progress` with a fraction in [0,1] when the size is known.
    fn fetch(&self, url: &str, on_progress: &mut dyn FnMut(f32)) -> DepthFlowResult<Vec<u8>>;
}

/// Reads weights from a local directory, looking up each URL by [`model_file_name`].
#[derive(Clone, Debug)]
pub struct DirFetcher {
    dir: PathBuf,
}

impl DirFetcher {
    /// Fetch from files in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

pub(crate) const FETCH_CHUNK: usize = 1 << 20;

/// Drain `reader` in chunks, reporting `loaded / total` after each one when `total` is known and
/// non-zero.
pub(crate) fn read_with_progress(
    reader: &mut dyn Read,
    total: Option<u64>,
    on_progress: &mut dyn FnMut(f32),
    source: &str,
) -> DepthFlowResult<Vec<u8>> {
    let total = total.unwrap_or(0);
    let mut out = Vec::with_capacity(usize::try_from(total).unwrap_or(0));
    let mut buf = vec![0u8; FETCH_CHUNK];
    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("read {source}"))?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
        if total > 0 {
            on_progress((out.len() as f32 / total as f32).min(1.0));
        }
    }
    Ok(out)
}

impl Fetcher for DirFetcher {
    fn fetch(&self, url: &str, on_progress: &mut dyn FnMut(f32)) -> DepthFlowResult<Vec<u8>> {
        let path = self.dir.join(model_file_name(url));
        if !path.is_file() {
            return Err(DepthFlowError::resource_missing(format!(
                "model file '{}' for {url}",
                path.display()
            )));
        }
        let mut file = File::open(&path).with_context(|| format!("open '{}'", path.display()))?;
        let total = file
            .metadata()
            .with_context(|| format!("stat '{}'", path.display()))?
            .len();
        read_with_progress(
            &mut file,
            Some(total),
            on_progress,
            &format!("'{}'", path.display()),
        )
    }
}

/// Per-model cache status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelStatus {
    /// Source URL (cache key).
    pub url: String,
    /// Whether the weights are cached.
    pub cached: bool,
}

/// Model weights on top of a [`WeightCache`].
///
/// Downloads are single-flight per cache: the guard is the cache's
/// [`WeightCache::download_flag`], so stores sharing a cache also share the guard.
pub struct ModelStore {
    cache: Arc<dyn WeightCache>,
    urls: ModelUrls,
}

struct DownloadTicket<'a>(&'a AtomicBool);

impl Drop for DownloadTicket<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ModelStore {
    /// Store over `cache` serving `urls`.
    pub fn new(cache: Arc<dyn WeightCache>, urls: ModelUrls) -> Self {
        Self { cache, urls }
    }

    /// Model URLs.
    pub fn urls(&self) -> &ModelUrls {
        &self.urls
    }

    /// Underlying cache.
    pub fn cache(&self) -> &Arc<dyn WeightCache> {
        &self.cache
    }

    /// Cache status of every model.
    pub fn status(&self) -> DepthFlowResult<Vec<ModelStatus>> {
        let keys = self.cache.keys()?;
        Ok(self
            .urls
            .all()
            .into_iter()
            .map(|url| ModelStatus {
                url: url.to_owned(),
                cached: keys.iter().any(|k| k == url),
            })
            .collect())
    }

    /// Whether every model is cached.
    pub fn all_models_cached(&self) -> DepthFlowResult<bool> {
        Ok(self.status()?.iter().all(|s| s.cached))
    }

    /// Depth weights, or [`DepthFlowError::ResourceMissing`] naming the depth model.
    pub fn depth_weights(&self) -> DepthFlowResult<Vec<u8>> {
        self.weights("depth", &self.urls.depth)
    }

    /// Inpaint weights, or [`DepthFlowError::ResourceMissing`] naming the inpaint model.
    pub fn inpaint_weights(&self) -> DepthFlowResult<Vec<u8>> {
        self.weights("inpaint", &self.urls.inpaint)
    }

    fn weights(&self, what: &str, url: &str) -> DepthFlowResult<Vec<u8>> {
        self.cache.get(url)?.ok_or_else(|| {
            DepthFlowError::resource_missing(format!(
                "{what} model '{}' not found in cache ({url})",
                model_file_name(url)
            ))
        })
    }

    /// Download every model that is not cached yet, in order.
    ///
    /// Only one download batch may run per cache; a second caller while one is in flight gets
    /// [`DepthFlowError::Concurrency`] immediately. Nothing is retried.
    #[tracing::instrument(skip_all)]
    pub fn download_missing(
        &self,
        fetcher: &dyn Fetcher,
        progress: &dyn ProgressSink,
    ) -> DepthFlowResult<()> {
        let _ticket = self.begin_download()?;

        let keys = self.cache.keys()?;
        let missing: Vec<&str> = self
            .urls
            .all()
            .into_iter()
            .filter(|url| !keys.iter().any(|k| k == url))
            .collect();

        let total = missing.len();
        for (i, url) in missing.into_iter().enumerate() {
            let file = model_file_name(url);
            let step = format!("Downloading {file} ({}/{total})", i + 1);
            progress.report(&step, None);
            let bytes = fetcher.fetch(url, &mut |p| progress.report(&step, Some(p * 100.0)))?;

            progress.report(&format!("Saving {file} to cache..."), None);
            self.cache.put(url, &bytes)?;
            tracing::info!(file, size = bytes.len(), "model cached");
        }

        progress.report("Downloading models completed", None);
        Ok(())
    }

    /// Remove every model's weights; other cache entries are kept.
    pub fn clear_models(&self) -> DepthFlowResult<()> {
        self.cache.delete(&self.urls.all())
    }

    fn begin_download(&self) -> DepthFlowResult<DownloadTicket<'_>> {
        let flag = self.cache.download_flag();
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                DepthFlowError::concurrency("downloading models is already in progress")
            })?;
        Ok(DownloadTicket(flag))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/models.rs"]
mod tests;
