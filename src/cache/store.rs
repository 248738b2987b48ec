use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError, atomic::AtomicBool},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use crate::foundation::error::{DepthFlowError, DepthFlowResult};

/// Persistent byte store for model weights, keyed by an opaque string (the source URL).
pub trait WeightCache: Send + Sync {
    /// Bytes stored under `key`, or `None` on a miss.
    fn get(&self, key: &str) -> DepthFlowResult<Option<Vec<u8>>>;
    /// Store `bytes` under `key`, replacing any previous value.
    fn put(&self, key: &str, bytes: &[u8]) -> DepthFlowResult<()>;
    /// Every stored key, sorted.
    fn keys(&self) -> DepthFlowResult<Vec<String>>;
    /// Remove the given keys; absent keys are ignored.
    fn delete(&self, keys: &[&str]) -> DepthFlowResult<()>;
    /// Remove everything.
    fn clear(&self) -> DepthFlowResult<()>;
    /// Set while a model download into this cache is running.
    ///
    /// Every [`crate::ModelStore`] over the same cache handle shares it.
    fn download_flag(&self) -> &AtomicBool;

    /// Whether `key` is stored.
    fn contains(&self, key: &str) -> DepthFlowResult<bool> {
        Ok(self.keys()?.iter().any(|k| k == key))
    }
}

/// In-process cache, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
    downloading: AtomicBool,
}

impl MemoryCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WeightCache for MemoryCache {
    fn get(&self, key: &str) -> DepthFlowResult<Option<Vec<u8>>> {
        Ok(self.entries().get(key).cloned())
    }

    fn put(&self, key: &str, bytes: &[u8]) -> DepthFlowResult<()> {
        self.entries().insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn keys(&self) -> DepthFlowResult<Vec<String>> {
        Ok(self.entries().keys().cloned().collect())
    }

    fn delete(&self, keys: &[&str]) -> DepthFlowResult<()> {
        let mut entries = self.entries();
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    fn clear(&self) -> DepthFlowResult<()> {
        self.entries().clear();
        Ok(())
    }

    fn contains(&self, key: &str) -> DepthFlowResult<bool> {
        Ok(self.entries().contains_key(key))
    }

    fn download_flag(&self) -> &AtomicBool {
        &self.downloading
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    url: String,
    size: u64,
}

/// Directory-backed cache.
///
/// Each entry is `<sha256(key)>.bin` holding the bytes plus a `<sha256(key)>.json` sidecar with
/// the original key and byte size. Files not following that scheme are left alone. An entry
/// whose blob is gone counts as absent.
///
/// Clones share one download flag; separately opened handles on the same directory do not.
#[derive(Clone, Debug)]
pub struct DirCache {
    root: PathBuf,
    downloading: Arc<AtomicBool>,
}

impl DirCache {
    /// Open (creating if needed) a cache rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> DepthFlowResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("create cache dir '{}'", root.display()))?;
        Ok(Self {
            root,
            downloading: Arc::default(),
        })
    }

    /// Cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn stem(key: &str) -> String {
        let digest = sha2::Sha256::digest(key.as_bytes());
        let mut out = String::with_capacity(digest.len() * 2);
        for b in digest {
            out.push_str(&format!("{b:02x}"));
        }
        out
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.bin", Self::stem(key)))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", Self::stem(key)))
    }

    fn sidecars(&self) -> DepthFlowResult<Vec<(PathBuf, EntryMeta)>> {
        let mut out = Vec::new();
        let dir = fs::read_dir(&self.root)
            .with_context(|| format!("read cache dir '{}'", self.root.display()))?;
        for entry in dir {
            let path = entry.context("read cache dir entry")?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes =
                fs::read(&path).with_context(|| format!("read '{}'", path.display()))?;
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            match serde_json::from_slice::<EntryMeta>(&bytes) {
                Ok(meta) if stem == Self::stem(&meta.url) => out.push((path, meta)),
                _ => tracing::warn!(path = %path.display(), "ignoring foreign file in cache dir"),
            }
        }
        Ok(out)
    }
}

fn remove_if_exists(path: &Path) -> DepthFlowResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("remove '{}'", path.display()))
            .into()),
    }
}

impl WeightCache for DirCache {
    fn get(&self, key: &str) -> DepthFlowResult<Option<Vec<u8>>> {
        if !self.meta_path(key).is_file() {
            return Ok(None);
        }
        let path = self.blob_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("read '{}'", path.display()))
                .into()),
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> DepthFlowResult<()> {
        let blob = self.blob_path(key);
        fs::write(&blob, bytes).with_context(|| format!("write '{}'", blob.display()))?;

        let meta = EntryMeta {
            url: key.to_owned(),
            size: bytes.len() as u64,
        };
        let json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| DepthFlowError::serde(format!("cache sidecar: {e}")))?;
        let meta_path = self.meta_path(key);
        fs::write(&meta_path, json).with_context(|| format!("write '{}'", meta_path.display()))?;
        tracing::debug!(key, size = bytes.len(), "cached weight entry");
        Ok(())
    }

    fn keys(&self) -> DepthFlowResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .sidecars()?
            .into_iter()
            .filter(|(_, meta)| self.blob_path(&meta.url).is_file())
            .map(|(_, meta)| meta.url)
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn delete(&self, keys: &[&str]) -> DepthFlowResult<()> {
        for key in keys {
            remove_if_exists(&self.meta_path(key))?;
            remove_if_exists(&self.blob_path(key))?;
        }
        Ok(())
    }

    fn clear(&self) -> DepthFlowResult<()> {
        for (path, meta) in self.sidecars()? {
            remove_if_exists(&path)?;
            remove_if_exists(&self.blob_path(&meta.url))?;
        }
        Ok(())
    }

    fn contains(&self, key: &str) -> DepthFlowResult<bool> {
        Ok(self.meta_path(key).is_file() && self.blob_path(key).is_file())
    }

    fn download_flag(&self) -> &AtomicBool {
        &self.downloading
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/store.rs"]
mod tests;
