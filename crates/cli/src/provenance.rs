//! `<out>.provenance.json`: where a PLY file came from and how it was made.

use anyhow::{Context, Result};
use serde::Serialize;
use shp2ply::{ComponentSet, Conversion, ConvertOptions};
use std::fs;
use std::path::{Path, PathBuf};

/// The input as the converter saw it.
#[derive(Debug, Serialize)]
pub struct InputRecord {
    pub path: String,
    /// Name of the `.shp` member that was decoded.
    pub geometry: Option<String>,
    /// Declared definition, truncated as in the summary.
    pub reference: Option<String>,
    pub epsg: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct OutputRecord {
    pub path: String,
    pub media_type: &'static str,
    /// Reference of the written coordinates; absent when source coordinates were kept
    /// without a declared reference.
    pub reference: Option<String>,
    pub polygons: usize,
}

#[derive(Debug, Serialize)]
pub struct Provenance<'a> {
    pub version: &'static str,
    pub input: InputRecord,
    pub options: &'a ConvertOptions,
    pub output: OutputRecord,
}

impl<'a> Provenance<'a> {
    pub fn new(
        input: &Path,
        components: &ComponentSet,
        options: &'a ConvertOptions,
        conversion: &Conversion,
        out: &Path,
    ) -> Self {
        Self {
            version: shp2ply::VERSION,
            input: InputRecord {
                path: input.to_string_lossy().into_owned(),
                geometry: components.geometry().map(|(name, _)| name.to_string()),
                reference: conversion.summary.reference.clone(),
                epsg: conversion.summary.epsg,
            },
            options,
            output: OutputRecord {
                path: out.to_string_lossy().into_owned(),
                media_type: shp2ply::ply::MIME_TYPE,
                reference: conversion.reference.as_ref().map(|r| r.to_string()),
                polygons: conversion.polygons,
            },
        }
    }
}

/// Write the record next to `artifact` and return its path.
pub fn write_sidecar(artifact: &Path, record: &Provenance<'_>) -> Result<PathBuf> {
    let path = sidecar_path(artifact);
    let json = serde_json::to_vec_pretty(record)?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// `dir/name.ply` → `dir/name.provenance.json`.
fn sidecar_path(artifact: &Path) -> PathBuf {
    let mut name = artifact
        .file_stem()
        .map_or_else(|| "output".into(), |s| s.to_os_string());
    name.push(".provenance.json");
    artifact.with_file_name(name)
}
