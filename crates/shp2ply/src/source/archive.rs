//! ZIP archive adapter.

use std::io::{Read, Seek};
use std::path::Path;

use tracing::debug;

use super::ComponentSet;
use crate::loader::LoadError;

/// Upper bound on the buffer reserved up front for one member.
const MAX_PREALLOC: u64 = 1 << 24;

/// Initial capacity for a member whose header declares `declared` bytes.
/// The declared size is untrusted; larger members grow while reading.
fn capacity_hint(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0)
}

pub(super) fn from_path(path: &Path) -> Result<ComponentSet, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_reader(path.display().to_string(), std::io::BufReader::new(file))
}

pub(super) fn from_reader<R: Read + Seek>(origin: String, reader: R) -> Result<ComponentSet, LoadError> {
    let archive_error = |source| LoadError::Archive {
        archive: origin.clone(),
        source,
    };
    let mut archive = zip::ZipArchive::new(reader).map_err(archive_error)?;
    let mut set = ComponentSet::new(origin.clone());
    for i in 0..archive.len() {
        let mut member = archive.by_index(i).map_err(archive_error)?;
        if member.is_dir() {
            continue;
        }
        let name = member.name().to_string();
        let mut bytes = Vec::with_capacity(capacity_hint(member.size()));
        member.read_to_end(&mut bytes).map_err(|source| LoadError::Io {
            path: Path::new(&origin).join(&name),
            source,
        })?;
        set.insert(name, bytes);
    }
    debug!(archive = %origin, members = set.len(), "unpacked archive");
    Ok(set)
}
