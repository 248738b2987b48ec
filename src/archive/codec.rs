use std::{
    collections::{BTreeMap, BTreeSet},
    io::{Cursor, Read, Write},
};

use anyhow::Context;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter, write::SimpleFileOptions};

use crate::{
    archive::manifest::{
        FlowKind, FlowManifest, MANIFEST_NAME, layer_depth_map_name, layer_image_name,
    },
    flow::model::{Flow, FlowMultilayer, FlowSimple, Layer},
    foundation::error::{DepthFlowError, DepthFlowResult},
};

/// Normalize and validate an archive entry name.
///
/// The result uses `/` separators with `.` segments removed; absolute names and `..` segments
/// are rejected.
pub fn normalize_entry_name(name: &str) -> DepthFlowResult<String> {
    let s = name.replace('\\', "/");
    if s.starts_with('/') {
        return Err(DepthFlowError::configuration(format!(
            "archive entry '{name}' must be relative"
        )));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(DepthFlowError::configuration(format!(
                "archive entry '{name}' must not contain '..'"
            )));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(DepthFlowError::configuration(format!(
            "archive entry '{name}' must contain a file name"
        )));
    }
    Ok(out.join("/"))
}

/// Prefix for an original image whose name clashes with a generated entry.
pub const RENAMED_ORIGINAL_PREFIX: &str = "original-";

/// Serialize `flow` to a zip archive.
///
/// The manifest comes first, then the original image, the depth map and each layer's color and
/// depth. Timestamps are fixed, so equal flows give byte-identical archives.
///
/// An original image named like the manifest, the depth map or a layer entry is stored as
/// `original-<name>` (repeated until free) and the manifest records that name.
#[tracing::instrument(skip_all, fields(kind = flow.kind_name(), layers = flow.layers().len()))]
pub fn encode_flow(flow: &Flow) -> DepthFlowResult<Vec<u8>> {
    let mut manifest = FlowManifest::for_flow(flow);

    let base = flow.base();
    let mut entries: Vec<(String, &[u8])> = vec![(
        manifest.original_depth_map.clone(),
        base.original_depth_map.as_slice(),
    )];
    for (i, layer) in flow.layers().iter().enumerate() {
        entries.push((layer_image_name(i), layer.image.as_slice()));
        entries.push((layer_depth_map_name(i), layer.depth_map.as_slice()));
    }

    let mut reserved: BTreeSet<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    reserved.insert(MANIFEST_NAME);
    let original = free_entry_name(normalize_entry_name(&manifest.original_image)?, &reserved);
    if original != base.original_image_name {
        tracing::debug!(from = %base.original_image_name, to = %original, "original image renamed");
    }
    manifest.original_image = original.clone();
    entries.insert(0, (original, base.original_image.as_slice()));

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file(MANIFEST_NAME, options)
        .context("start manifest entry")?;
    zip.write_all(&manifest.to_json()?)
        .context("write manifest entry")?;
    for (name, bytes) in entries {
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("start entry '{name}'"))?;
        zip.write_all(bytes)
            .with_context(|| format!("write entry '{name}'"))?;
    }

    let out = zip.finish().context("finish zip archive")?.into_inner();
    tracing::debug!(bytes = out.len(), "flow archive encoded");
    Ok(out)
}

fn free_entry_name(name: String, reserved: &BTreeSet<&str>) -> String {
    let mut name = name;
    while reserved.contains(name.as_str()) {
        name = format!("{RENAMED_ORIGINAL_PREFIX}{name}");
    }
    name
}

/// Every file entry of an archive by normalized name.
pub fn read_entries(bytes: &[u8]) -> DepthFlowResult<BTreeMap<String, Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).context("open zip archive")?;
    let mut entries = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .with_context(|| format!("read zip entry #{i}"))?;
        if file.is_dir() {
            continue;
        }
        let name = normalize_entry_name(file.name())?;
        let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut data)
            .with_context(|| format!("read zip entry '{name}'"))?;
        if entries.insert(name.clone(), data).is_some() {
            return Err(DepthFlowError::configuration(format!(
                "archive contains '{name}' more than once"
            )));
        }
    }
    Ok(entries)
}

/// Parse only the manifest of an archive.
pub fn read_manifest(bytes: &[u8]) -> DepthFlowResult<FlowManifest> {
    let entries = read_entries(bytes)?;
    manifest_from_entries(&entries)
}

fn manifest_from_entries(entries: &BTreeMap<String, Vec<u8>>) -> DepthFlowResult<FlowManifest> {
    let raw = entries.get(MANIFEST_NAME).ok_or_else(|| {
        DepthFlowError::resource_missing(format!("{MANIFEST_NAME} not found in archive"))
    })?;
    FlowManifest::from_json(raw)
}

/// Deserialize a flow archive.
///
/// Fails with [`DepthFlowError::ResourceMissing`] naming the first referenced entry that the
/// archive lacks.
#[tracing::instrument(skip_all, fields(bytes = bytes.len()))]
pub fn decode_flow(bytes: &[u8]) -> DepthFlowResult<Flow> {
    let entries = read_entries(bytes)?;
    let manifest = manifest_from_entries(&entries)?;
    let kind = manifest.resolved_kind()?;

    let fetch = |name: &str| -> DepthFlowResult<Vec<u8>> {
        let key = normalize_entry_name(name)?;
        entries.get(&key).cloned().ok_or_else(|| {
            DepthFlowError::resource_missing(format!("{key} not found in archive"))
        })
    };

    let base = FlowSimple {
        original_image: fetch(&manifest.original_image)?,
        original_image_name: manifest.original_image.clone(),
        original_depth_map: fetch(&manifest.original_depth_map)?,
        width: manifest.width,
        height: manifest.height,
        processed_by: manifest.processed_by.clone(),
        process_args: manifest.process_args.clone(),
    };

    match kind {
        FlowKind::Simple => Ok(Flow::Simple(base)),
        FlowKind::Multilayer => {
            let mut layers = Vec::new();
            for entry in manifest.layers.iter().flatten() {
                layers.push(Layer {
                    image: fetch(&entry.image)?,
                    depth_map: fetch(&entry.depth_map)?,
                });
            }
            let inpaint_layers = manifest.inpaint_layers.unwrap_or(layers.len());
            if inpaint_layers != layers.len() {
                tracing::warn!(
                    inpaint_layers,
                    listed = layers.len(),
                    "manifest layer count disagrees with layer list"
                );
            }
            Ok(Flow::Multilayer(FlowMultilayer {
                base,
                inpaint_layers,
                division_points: manifest.division_points()?,
                layers,
            }))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/archive/codec.rs"]
mod tests;
