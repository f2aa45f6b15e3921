//! Reprojection of a filtered polygon collection.
//!
//! Contract
//! - The source reference must be known; a missing one is `UnknownSource`.
//! - Every vertex goes through one forward transform built once per call.
//! - Source and target denoting the same system is an exact identity.
//! - Any failure aborts the whole call; no partially transformed collection
//!   is ever returned.
//!
//! Backends
//! - `builtin`: pure-Rust geographic, Mercator and transverse Mercator math.
//! - `proj` (cargo feature `proj`): libproj for any EPSG/WKT pair.

pub mod builtin;
#[cfg(feature = "proj")]
pub mod proj;

use std::fmt;

use geo::MapCoords;
use geo_types::Coord;
use tracing::{debug, info};

use crate::crs::{ResolveError, SpatialReference};
use crate::geometry::{PolygonFeature, PolygonFeatureCollection, PolygonGeometry};

/// Point transform between two fixed spatial references.
pub trait CoordTransform {
    /// Transformed coordinate, or `None` when the point has no finite image.
    fn transform(&self, c: Coord<f64>) -> Option<Coord<f64>>;

    fn is_identity(&self) -> bool {
        false
    }
}

/// Transform that returns its input.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl CoordTransform for Identity {
    #[inline]
    fn transform(&self, c: Coord<f64>) -> Option<Coord<f64>> {
        Some(c)
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// Errors surfaced by reprojection.
#[derive(Debug)]
pub enum ReprojectionError {
    /// The collection carries no spatial reference.
    UnknownSource { target: SpatialReference },
    /// Source or target cannot be resolved by the active backend.
    Unsupported {
        reference: SpatialReference,
        cause: ResolveError,
    },
    /// The datums differ and the built-in backend applies no datum shift.
    DatumShift {
        source: SpatialReference,
        target: SpatialReference,
    },
    /// A vertex has no finite image under the transform.
    NonFinite {
        record: usize,
        x: f64,
        y: f64,
        target: SpatialReference,
    },
    /// The external backend refused the pair.
    Backend {
        source: SpatialReference,
        target: SpatialReference,
        message: String,
    },
}

impl fmt::Display for ReprojectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReprojectionError::UnknownSource { target } => write!(
                f,
                "cannot reproject to {target}: the input declares no spatial reference"
            ),
            ReprojectionError::Unsupported { reference, cause } => {
                write!(f, "cannot use {reference} for reprojection: {cause}")
            }
            ReprojectionError::DatumShift { source, target } => write!(
                f,
                "reprojecting {source} to {target} needs a datum shift the built-in backend does not provide"
            ),
            ReprojectionError::NonFinite {
                record,
                x,
                y,
                target,
            } => write!(
                f,
                "record {record}: vertex ({x}, {y}) has no finite coordinates in {target}"
            ),
            ReprojectionError::Backend {
                source,
                target,
                message,
            } => write!(f, "PROJ cannot transform {source} to {target}: {message}"),
        }
    }
}

impl std::error::Error for ReprojectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReprojectionError::Unsupported { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Build the transform for `source → target` using the compiled-in backend.
pub fn transformer(
    source: &SpatialReference,
    target: &SpatialReference,
) -> Result<Box<dyn CoordTransform>, ReprojectionError> {
    if source.same_as(target) {
        return Ok(Box::new(Identity));
    }
    #[cfg(feature = "proj")]
    {
        Ok(Box::new(proj::ProjTransform::new(source, target)?))
    }
    #[cfg(not(feature = "proj"))]
    {
        builtin::BuiltinTransform::new(source, target)
            .map(|t| Box::new(t) as Box<dyn CoordTransform>)
    }
}

/// Reproject every polygon of `collection` into `target`.
pub fn reproject(
    collection: PolygonFeatureCollection,
    target: &SpatialReference,
) -> Result<PolygonFeatureCollection, ReprojectionError> {
    let Some(source) = collection.reference.clone() else {
        return Err(ReprojectionError::UnknownSource {
            target: target.clone(),
        });
    };
    let transform = transformer(&source, target)?;
    if transform.is_identity() {
        debug!(%source, %target, "identity reprojection");
        return Ok(PolygonFeatureCollection {
            features: collection.features,
            reference: Some(target.clone()),
        });
    }

    let mut features = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let record = feature.record;
        let apply = |c: Coord<f64>| {
            transform
                .transform(c)
                .filter(|t| t.x.is_finite() && t.y.is_finite())
                .ok_or_else(|| ReprojectionError::NonFinite {
                    record,
                    x: c.x,
                    y: c.y,
                    target: target.clone(),
                })
        };
        let geometry = match &feature.geometry {
            PolygonGeometry::Polygon(p) => PolygonGeometry::Polygon(p.try_map_coords(apply)?),
            PolygonGeometry::MultiPolygon(mp) => {
                PolygonGeometry::MultiPolygon(mp.try_map_coords(apply)?)
            }
        };
        features.push(PolygonFeature { record, geometry });
    }
    info!(%source, %target, features = features.len(), "reprojected");
    Ok(PolygonFeatureCollection {
        features,
        reference: Some(target.clone()),
    })
}
