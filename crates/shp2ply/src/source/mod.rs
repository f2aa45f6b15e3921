//! Input acquisition: shapefile components as named byte blobs.
//!
//! Each adapter (direct files, ZIP archive, directory walk) only fills a
//! `ComponentSet`; decoding is the loader's job. Members that are not
//! shapefile components are skipped.

mod archive;
mod fs;

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::loader::LoadError;

/// One file of a shapefile bundle, keyed by extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    /// `.shp`: record geometry.
    Geometry,
    /// `.shx`: record offsets.
    Index,
    /// `.dbf`: attribute table (accepted, never decoded).
    Attributes,
    /// `.prj`: WKT spatial reference.
    Projection,
    /// `.cpg`: attribute code page (accepted, never decoded).
    Encoding,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::Geometry,
        Component::Index,
        Component::Attributes,
        Component::Projection,
        Component::Encoding,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            Component::Geometry => "shp",
            Component::Index => "shx",
            Component::Attributes => "dbf",
            Component::Projection => "prj",
            Component::Encoding => "cpg",
        }
    }

    /// Component kind of a member name, by case-insensitive extension.
    pub fn of(name: &str) -> Option<Component> {
        let (_, ext) = split_extension(name)?;
        Component::ALL
            .into_iter()
            .find(|c| ext.eq_ignore_ascii_case(c.extension()))
    }
}

/// `("dir/parcels", "shp")` for `"dir/parcels.shp"`.
fn split_extension(name: &str) -> Option<(&str, &str)> {
    let dot = name.rfind('.')?;
    let slash = name.rfind('/').map_or(0, |s| s + 1);
    (dot > slash).then(|| (&name[..dot], &name[dot + 1..]))
}

/// macOS archive noise (`__MACOSX/`, `._name`) that mimics real members.
fn is_resource_fork(name: &str) -> bool {
    let file = name.rsplit('/').next().unwrap_or(name);
    name.starts_with("__MACOSX/") || file.starts_with("._")
}

/// Shapefile components keyed by member name (`/`-separated relative path).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComponentSet {
    origin: String,
    members: BTreeMap<String, Vec<u8>>,
}

impl ComponentSet {
    /// Empty set; `origin` names the upload, archive or directory in errors.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            members: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Add a member; returns `false` (and keeps nothing) for non-components.
    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> bool {
        let name = name.into().replace('\\', "/");
        if is_resource_fork(&name) || Component::of(&name).is_none() {
            debug!(member = %name, "skipping non-shapefile member");
            return false;
        }
        self.members.insert(name, bytes);
        true
    }

    pub fn with(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(name, bytes);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.members.get(name).map(Vec::as_slice)
    }

    /// The geometry member: lexicographically first `.shp` by name.
    pub fn geometry(&self) -> Option<(&str, &[u8])> {
        self.members
            .iter()
            .find(|(name, _)| Component::of(name) == Some(Component::Geometry))
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }

    /// Member of kind `kind` sharing `geometry_name`'s stem (case-insensitive).
    pub fn sibling(&self, geometry_name: &str, kind: Component) -> Option<(&str, &[u8])> {
        let (stem, _) = split_extension(geometry_name)?;
        self.members
            .iter()
            .find(|(name, _)| {
                split_extension(name).is_some_and(|(s, ext)| {
                    s.eq_ignore_ascii_case(stem) && ext.eq_ignore_ascii_case(kind.extension())
                })
            })
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }

    /// Individually chosen files (the batch-upload mode).
    pub fn from_files<I, P>(paths: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        fs::from_files(paths)
    }

    /// Every component below `dir`, recursively.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        fs::from_dir(dir.as_ref())
    }

    /// Members of an in-memory ZIP archive.
    pub fn from_zip_bytes(origin: impl Into<String>, bytes: &[u8]) -> Result<Self, LoadError> {
        archive::from_reader(origin.into(), std::io::Cursor::new(bytes))
    }

    pub fn from_zip_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        archive::from_path(path.as_ref())
    }

    /// Dispatch on what `path` is: `.zip` archive, directory, or a `.shp`
    /// file whose siblings are collected from its directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let is_zip = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
        if is_zip {
            Self::from_zip_path(path)
        } else if path.is_dir() {
            Self::from_dir(path)
        } else {
            fs::from_shp_path(path)
        }
    }
}
