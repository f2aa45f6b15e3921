//! Shapefile decoding: `ComponentSet` → `FeatureCollection`.
//!
//! Contract
//! - `.shp` and its `.shx` are mandatory and must agree on the record count.
//! - `.prj` is optional; a missing or unparsable definition leaves the
//!   collection without spatial reference and does not fail the load.
//! - Geometry content is decoded as stored; filtering happens elsewhere.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use geo::Contains;
use geo_types::{Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use shapefile::{PolygonRing, Shape, ShapeReader};
use tracing::{debug, info, warn};

use crate::crs::SpatialReference;
use crate::geometry::{Feature, FeatureCollection, Geometry};
use crate::source::{Component, ComponentSet};

/// Main-file and index header size, bytes.
const HEADER_LEN: usize = 100;
/// Index record: offset and content length, two big-endian i32.
const INDEX_RECORD_LEN: usize = 8;
/// Main-file record header: record number and content length.
const RECORD_HEADER_LEN: usize = 8;
const FILE_CODE: i32 = 9994;

/// Errors surfaced while acquiring or decoding shapefile components.
#[derive(Debug)]
pub enum LoadError {
    /// No `.shp` member in the input.
    NoGeometry { origin: String },
    /// The `.shp` has no `.shx` next to it.
    MissingIndex { geometry: String },
    /// Reading a file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The ZIP container is unreadable.
    Archive {
        archive: String,
        source: zip::result::ZipError,
    },
    /// The `.shp` content is corrupt.
    Decode {
        geometry: String,
        source: shapefile::Error,
    },
    /// The `.shx` header or size is invalid.
    BadIndex { index: String, reason: String },
    /// `.shp` and `.shx` disagree on the number of records.
    IndexMismatch {
        geometry: String,
        records: usize,
        indexed: usize,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NoGeometry { origin } => {
                write!(f, "{origin}: no .shp found; select all shapefile components")
            }
            LoadError::MissingIndex { geometry } => {
                write!(f, "{geometry}: the matching .shx index is missing")
            }
            LoadError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            LoadError::Archive { archive, source } => {
                write!(f, "{archive}: unreadable ZIP archive: {source}")
            }
            LoadError::Decode { geometry, source } => {
                write!(f, "{geometry}: corrupt geometry file: {source}")
            }
            LoadError::BadIndex { index, reason } => write!(f, "{index}: invalid index: {reason}"),
            LoadError::IndexMismatch {
                geometry,
                records,
                indexed,
            } => write!(
                f,
                "{geometry}: {records} records but the index lists {indexed}"
            ),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Archive { source, .. } => Some(source),
            LoadError::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Decode the geometry member of `components` with its index and projection.
pub fn load(components: &ComponentSet) -> Result<FeatureCollection, LoadError> {
    let (shp_name, shp) = components.geometry().ok_or_else(|| LoadError::NoGeometry {
        origin: components.origin().to_string(),
    })?;
    let (shx_name, shx) = components
        .sibling(shp_name, Component::Index)
        .ok_or_else(|| LoadError::MissingIndex {
            geometry: shp_name.to_string(),
        })?;
    let indexed = index_record_count(shx_name, shx)?;

    let decode_error = |source| LoadError::Decode {
        geometry: shp_name.to_string(),
        source,
    };
    let mut reader =
        ShapeReader::with_shx(Cursor::new(shp), Cursor::new(shx)).map_err(decode_error)?;
    let mut features = Vec::with_capacity(indexed);
    for (i, shape) in reader.iter_shapes().enumerate() {
        features.push(Feature {
            record: i + 1,
            geometry: decode_shape(shape.map_err(decode_error)?),
        });
    }
    let records = features.len() + unindexed_records(shp, shx);
    if records != indexed {
        return Err(LoadError::IndexMismatch {
            geometry: shp_name.to_string(),
            records,
            indexed,
        });
    }

    let reference = components
        .sibling(shp_name, Component::Projection)
        .and_then(|(name, bytes)| read_projection(name, bytes));
    info!(
        geometry = shp_name,
        features = features.len(),
        reference = %reference.as_ref().map_or_else(|| "none".to_string(), |r| r.to_string()),
        "loaded shapefile"
    );
    Ok(FeatureCollection::new(features, reference))
}

/// Resolve `path` with `ComponentSet::from_path` and load it.
pub fn load_path(path: impl AsRef<Path>) -> Result<FeatureCollection, LoadError> {
    load(&ComponentSet::from_path(path)?)
}

/// Record count implied by a `.shx`: fixed header plus 8 bytes per record.
/// The header length must match the size, since records are read through it.
fn index_record_count(name: &str, shx: &[u8]) -> Result<usize, LoadError> {
    let bad = |reason: &str| LoadError::BadIndex {
        index: name.to_string(),
        reason: reason.to_string(),
    };
    if shx.len() < HEADER_LEN {
        return Err(bad("shorter than the 100-byte header"));
    }
    let code = i32::from_be_bytes([shx[0], shx[1], shx[2], shx[3]]);
    if code != FILE_CODE {
        return Err(bad(&format!("file code {code}, expected {FILE_CODE}")));
    }
    let declared = i32::from_be_bytes([shx[24], shx[25], shx[26], shx[27]]);
    if usize::try_from(declared).ok().map(|w| w * 2) != Some(shx.len()) {
        return Err(bad(&format!(
            "header declares {declared} words, file has {} bytes",
            shx.len()
        )));
    }
    let body = shx.len() - HEADER_LEN;
    if body % INDEX_RECORD_LEN != 0 {
        return Err(bad("truncated record"));
    }
    Ok(body / INDEX_RECORD_LEN)
}

fn be_i32(bytes: &[u8], at: usize) -> Option<i32> {
    let word: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(i32::from_be_bytes(word))
}

/// Records stored after the last one the index points at.
///
/// Records are read through the index, so gaps between them are skipped;
/// a well-formed record header past the indexed range means the index is
/// short. Zero or truncated headers there are treated as padding.
fn unindexed_records(shp: &[u8], shx: &[u8]) -> usize {
    let words = |at: usize| be_i32(shp, at).and_then(|w| usize::try_from(w).ok());
    let declared = words(24).map_or(0, |w| w * 2).min(shp.len());
    let mut pos = if shx.len() >= HEADER_LEN + INDEX_RECORD_LEN {
        let last = shx.len() - INDEX_RECORD_LEN;
        let offset = be_i32(shx, last).and_then(|w| usize::try_from(w).ok());
        let length = be_i32(shx, last + 4).and_then(|w| usize::try_from(w).ok());
        match (offset, length) {
            (Some(offset), Some(length)) => offset * 2 + RECORD_HEADER_LEN + length * 2,
            _ => return 0,
        }
    } else {
        HEADER_LEN
    };
    let mut count = 0;
    while pos + RECORD_HEADER_LEN <= declared {
        let (Some(number), Some(length)) = (words(pos), words(pos + 4)) else {
            break;
        };
        let end = pos + RECORD_HEADER_LEN + length * 2;
        if number == 0 || length == 0 || end > declared {
            break;
        }
        count += 1;
        pos = end;
    }
    if count > 0 {
        debug!(count, "records beyond the index");
    }
    count
}

fn read_projection(name: &str, bytes: &[u8]) -> Option<SpatialReference> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches('\u{feff}').trim();
    if text.is_empty() {
        debug!(projection = name, "empty projection file");
        return None;
    }
    match SpatialReference::from_wkt(text) {
        Ok(r) => Some(r),
        Err(e) => {
            warn!(projection = name, error = %e, "ignoring unparsable projection");
            None
        }
    }
}

fn decode_shape(shape: Shape) -> Geometry {
    match shape {
        Shape::NullShape => Geometry::Null,
        Shape::Point(p) => Geometry::Point(Point::new(p.x, p.y)),
        Shape::PointM(p) => Geometry::Point(Point::new(p.x, p.y)),
        Shape::PointZ(p) => Geometry::Point(Point::new(p.x, p.y)),
        Shape::Multipoint(m) => multi_point(m.points(), |p| Coord { x: p.x, y: p.y }),
        Shape::MultipointM(m) => multi_point(m.points(), |p| Coord { x: p.x, y: p.y }),
        Shape::MultipointZ(m) => multi_point(m.points(), |p| Coord { x: p.x, y: p.y }),
        Shape::Polyline(l) => lines(l.parts(), |p| Coord { x: p.x, y: p.y }),
        Shape::PolylineM(l) => lines(l.parts(), |p| Coord { x: p.x, y: p.y }),
        Shape::PolylineZ(l) => lines(l.parts(), |p| Coord { x: p.x, y: p.y }),
        Shape::Polygon(p) => polygons(p.rings(), |p| Coord { x: p.x, y: p.y }),
        Shape::PolygonM(p) => polygons(p.rings(), |p| Coord { x: p.x, y: p.y }),
        Shape::PolygonZ(p) => polygons(p.rings(), |p| Coord { x: p.x, y: p.y }),
        Shape::Multipatch(_) => Geometry::Multipatch,
    }
}

fn multi_point<P>(points: &[P], xy: impl Fn(&P) -> Coord<f64>) -> Geometry {
    Geometry::MultiPoint(MultiPoint::new(
        points.iter().map(|p| Point::from(xy(p))).collect(),
    ))
}

fn lines<P>(parts: &[Vec<P>], xy: impl Fn(&P) -> Coord<f64>) -> Geometry {
    let mut lines: Vec<LineString<f64>> = parts
        .iter()
        .map(|part| part.iter().map(&xy).collect())
        .collect();
    if lines.len() == 1 {
        Geometry::LineString(lines.remove(0))
    } else {
        Geometry::MultiLineString(MultiLineString::new(lines))
    }
}

/// Group rings into polygons in stored order.
///
/// A record with a single outer ring is one polygon and every inner ring is
/// one of its holes. Otherwise an outer ring opens a polygon, and an inner
/// ring becomes a hole of the most recent polygon with one of the ring's
/// vertices strictly inside; failing that it opens a polygon of its own
/// (ring orientation in the wild is unreliable).
fn polygons<P>(rings: &[PolygonRing<P>], xy: impl Fn(&P) -> Coord<f64>) -> Geometry {
    let line = |points: &[P]| -> LineString<f64> { points.iter().map(&xy).collect() };
    let outers = rings
        .iter()
        .filter(|r| matches!(r, PolygonRing::Outer(_)))
        .count();
    if outers == 1 {
        let mut exterior = LineString::new(Vec::new());
        let mut holes = Vec::new();
        for ring in rings {
            match ring {
                PolygonRing::Outer(points) => exterior = line(&points[..]),
                PolygonRing::Inner(points) => holes.push(line(&points[..])),
            }
        }
        return Geometry::Polygon(Polygon::new(exterior, holes));
    }

    let mut out: Vec<Polygon<f64>> = Vec::new();
    for ring in rings {
        let ring_line = match ring {
            PolygonRing::Outer(points) => {
                out.push(Polygon::new(line(&points[..]), Vec::new()));
                continue;
            }
            PolygonRing::Inner(points) => line(&points[..]),
        };
        let host = out
            .iter_mut()
            .rev()
            .find(|p| ring_line.0.iter().any(|c| p.contains(c)));
        match host {
            Some(host) => host.interiors_push(ring_line),
            None => out.push(Polygon::new(ring_line, Vec::new())),
        }
    }
    match out.len() {
        0 => Geometry::Polygon(Polygon::new(LineString::new(Vec::new()), Vec::new())),
        1 => Geometry::Polygon(out.remove(0)),
        _ => Geometry::MultiPolygon(MultiPolygon::new(out)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    struct Xy {
        x: f64,
        y: f64,
    }

    fn ring(points: &[(f64, f64)]) -> Vec<Xy> {
        points.iter().map(|&(x, y)| Xy { x, y }).collect()
    }

    fn xy(p: &Xy) -> Coord<f64> {
        Coord { x: p.x, y: p.y }
    }

    const OUTER: &[(f64, f64)] = &[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (0.0, 0.0)];
    const HOLE: &[(f64, f64)] = &[(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 4.0), (2.0, 2.0)];
    const AWAY: &[(f64, f64)] = &[(20.0, 20.0), (22.0, 20.0), (22.0, 22.0), (20.0, 20.0)];

    #[test]
    fn hole_attaches_to_containing_outer() {
        let g = polygons(
            &[PolygonRing::Outer(ring(OUTER)), PolygonRing::Inner(ring(HOLE))],
            xy,
        );
        match g {
            Geometry::Polygon(p) => {
                assert_eq!(p.exterior().0.len(), 5);
                assert_eq!(p.interiors().len(), 1);
            }
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn hole_touching_the_outer_ring() {
        let touching = [(0.0, 5.0), (2.0, 4.0), (2.0, 6.0), (0.0, 5.0)];
        let g = polygons(
            &[PolygonRing::Outer(ring(OUTER)), PolygonRing::Inner(ring(&touching))],
            xy,
        );
        match g {
            Geometry::Polygon(p) => assert_eq!(p.interiors().len(), 1),
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn touching_hole_finds_its_host_among_several_outers() {
        let second = [(20.0, 0.0), (20.0, 10.0), (30.0, 10.0), (30.0, 0.0), (20.0, 0.0)];
        let touching = [(0.0, 5.0), (2.0, 4.0), (2.0, 6.0), (0.0, 5.0)];
        let g = polygons(
            &[
                PolygonRing::Outer(ring(OUTER)),
                PolygonRing::Outer(ring(&second)),
                PolygonRing::Inner(ring(&touching)),
            ],
            xy,
        );
        match g {
            Geometry::MultiPolygon(mp) => {
                assert_eq!(mp.0.len(), 2);
                assert_eq!(mp.0[0].interiors().len(), 1);
                assert!(mp.0[1].interiors().is_empty());
            }
            other => panic!("expected multipolygon, got {other:?}"),
        }
    }

    #[test]
    fn uncontained_inner_rings_become_parts() {
        let g = polygons(
            &[PolygonRing::Inner(ring(AWAY)), PolygonRing::Inner(ring(OUTER))],
            xy,
        );
        match g {
            Geometry::MultiPolygon(mp) => {
                assert_eq!(mp.0.len(), 2);
                assert_eq!(mp.0[0].exterior().0[0], Coord { x: 20.0, y: 20.0 });
            }
            other => panic!("expected multipolygon, got {other:?}"),
        }
    }

    #[test]
    fn no_rings_is_an_empty_polygon() {
        match polygons::<Xy>(&[], xy) {
            Geometry::Polygon(p) => assert!(p.exterior().0.is_empty()),
            other => panic!("expected empty polygon, got {other:?}"),
        }
    }

    #[test]
    fn single_and_multi_part_lines() {
        let one = lines(&[ring(&[(0.0, 0.0), (1.0, 1.0)])], xy);
        assert!(matches!(one, Geometry::LineString(_)));
        let two = lines(&[ring(&[(0.0, 0.0), (1.0, 1.0)]), ring(&[(2.0, 2.0), (3.0, 3.0)])], xy);
        assert!(matches!(two, Geometry::MultiLineString(ref m) if m.0.len() == 2));
    }

    #[test]
    fn index_count_from_size() {
        let len = HEADER_LEN + 3 * INDEX_RECORD_LEN;
        let mut shx = vec![0u8; len];
        shx[..4].copy_from_slice(&FILE_CODE.to_be_bytes());
        shx[24..28].copy_from_slice(&((len / 2) as i32).to_be_bytes());
        assert_eq!(index_record_count("a.shx", &shx).unwrap(), 3);
        let mut long = shx.clone();
        long.extend_from_slice(&[0u8; INDEX_RECORD_LEN]);
        assert!(matches!(
            index_record_count("a.shx", &long),
            Err(LoadError::BadIndex { .. })
        ));
        shx.push(0);
        assert!(matches!(
            index_record_count("a.shx", &shx),
            Err(LoadError::BadIndex { .. })
        ));
        assert!(matches!(
            index_record_count("a.shx", &[0u8; 10]),
            Err(LoadError::BadIndex { .. })
        ));
    }

    #[test]
    fn unparsable_projection_is_none() {
        assert!(read_projection("a.prj", b"garbage [").is_none());
        assert!(read_projection("a.prj", b"  \n").is_none());
        let with_bom = "\u{feff}GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",SPHEROID[\"WGS_1984\",6378137.0,298.257223563]]]";
        assert_eq!(
            read_projection("a.prj", with_bom.as_bytes()).and_then(|r| r.epsg()),
            Some(4326)
        );
    }

    #[test]
    fn missing_components_are_named() {
        let empty = ComponentSet::new("upload");
        assert!(matches!(load(&empty), Err(LoadError::NoGeometry { ref origin }) if origin == "upload"));
        let lonely = ComponentSet::new("upload").with("a.shp", vec![0; 100]);
        match load(&lonely) {
            Err(LoadError::MissingIndex { geometry }) => assert_eq!(geometry, "a.shp"),
            other => panic!("expected MissingIndex, got {other:?}"),
        }
    }
}
