//! Filesystem adapters: explicit files, a `.shp` path, a directory tree.

use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use super::{Component, ComponentSet};
use crate::loader::LoadError;

fn read(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

pub(super) fn from_files<I, P>(paths: I) -> Result<ComponentSet, LoadError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut set = ComponentSet::new("selected files");
    for path in paths {
        let path = path.as_ref();
        if Component::of(&file_name(path)).is_none() {
            debug!(path = %path.display(), "not a shapefile component");
            continue;
        }
        set.insert(file_name(path), read(path)?);
    }
    Ok(set)
}

/// Collect the components sharing `shp`'s stem from its directory.
pub(super) fn from_shp_path(shp: &Path) -> Result<ComponentSet, LoadError> {
    let dir = match shp.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let stem = shp
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut set = ComponentSet::new(shp.display().to_string());
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let same_stem = path
            .file_stem()
            .is_some_and(|s| s.to_string_lossy().eq_ignore_ascii_case(&stem));
        if same_stem && path.is_file() && Component::of(&file_name(&path)).is_some() {
            set.insert(file_name(&path), read(&path)?);
        }
    }
    if set.geometry().is_none() {
        // Surface the missing file itself rather than an empty set.
        read(shp)?;
    }
    Ok(set)
}

pub(super) fn from_dir(dir: &Path) -> Result<ComponentSet, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::Io {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }
    let mut set = ComponentSet::new(dir.display().to_string());
    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = path.strip_prefix(dir).unwrap_or(path);
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if Component::of(&name).is_some() {
            set.insert(name, read(path)?);
        }
    }
    debug!(dir = %dir.display(), members = set.len(), "collected directory");
    Ok(set)
}
