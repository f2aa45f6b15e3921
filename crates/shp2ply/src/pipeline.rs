//! One conversion: load → filter → reproject → serialize.
//!
//! Every step owns its collection; the call either returns the complete text
//! or an error, never a partial result.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::crs::SpatialReference;
use crate::diagnostics::Summary;
use crate::filter::filter;
use crate::geometry::FeatureCollection;
use crate::loader::{load, LoadError};
use crate::ply::serialize;
use crate::reproject::{reproject, ReprojectionError};
use crate::source::ComponentSet;

/// Target when neither the caller nor the input names one (WGS 84).
pub const FALLBACK_EPSG: u32 = 4326;

/// Host parameters of a conversion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Output EPSG code; defaults to the source code, then `FALLBACK_EPSG`.
    pub target_epsg: Option<u32>,
    /// Write source coordinates untouched, skipping reprojection.
    #[serde(default)]
    pub keep_source: bool,
}

/// Result of a successful conversion.
#[derive(Clone, Debug)]
pub struct Conversion {
    pub text: String,
    /// Number of `poly` blocks in `text`.
    pub polygons: usize,
    /// Reference of the written coordinates.
    pub reference: Option<SpatialReference>,
    /// Summary of the filtered input, before reprojection.
    pub summary: Summary,
}

#[derive(Debug)]
pub enum ConvertError {
    Load(LoadError),
    /// No Polygon/MultiPolygon record survived filtering.
    EmptyResult { origin: String },
    /// Reprojection requested but the input declares no spatial reference.
    UnknownSourceReference { target: SpatialReference },
    Reprojection(ReprojectionError),
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::Load(e) => write!(f, "failed to load shapefile: {e}"),
            ConvertError::EmptyResult { origin } => {
                write!(f, "{origin}: no polygon geometries found")
            }
            ConvertError::UnknownSourceReference { target } => write!(
                f,
                "cannot reproject to {target}: the input declares no spatial reference"
            ),
            ConvertError::Reprojection(e) => write!(f, "CRS reprojection error: {e}"),
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConvertError::Load(e) => Some(e),
            ConvertError::Reprojection(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LoadError> for ConvertError {
    fn from(e: LoadError) -> Self {
        ConvertError::Load(e)
    }
}

impl From<ReprojectionError> for ConvertError {
    fn from(e: ReprojectionError) -> Self {
        match e {
            ReprojectionError::UnknownSource { target } => {
                ConvertError::UnknownSourceReference { target }
            }
            other => ConvertError::Reprojection(other),
        }
    }
}

/// Output EPSG code: explicit option, else the source code, else `FALLBACK_EPSG`.
pub fn target_epsg(options: &ConvertOptions, source: Option<&SpatialReference>) -> u32 {
    options
        .target_epsg
        .or_else(|| source.and_then(SpatialReference::epsg))
        .unwrap_or(FALLBACK_EPSG)
}

/// Convert the shapefile in `components`.
pub fn convert(
    components: &ComponentSet,
    options: &ConvertOptions,
) -> Result<Conversion, ConvertError> {
    let collection = load(components)?;
    convert_collection(components.origin(), collection, options)
}

/// Convert an already decoded collection; `origin` names it in errors.
pub fn convert_collection(
    origin: &str,
    collection: FeatureCollection,
    options: &ConvertOptions,
) -> Result<Conversion, ConvertError> {
    let polygons = filter(collection);
    if polygons.is_empty() {
        return Err(ConvertError::EmptyResult {
            origin: origin.to_string(),
        });
    }
    let summary = Summary::of_polygons(&polygons);

    let polygons = if options.keep_source {
        if options.target_epsg.is_some() {
            warn!("--keep-source set; ignoring the requested target EPSG");
        }
        polygons
    } else {
        let target = SpatialReference::from_epsg(target_epsg(options, polygons.reference.as_ref()));
        reproject(polygons, &target)?
    };

    let text = serialize(&polygons);
    let count = polygons.polygon_count();
    info!(
        origin,
        polygons = count,
        reference = %polygons.reference.as_ref().map_or_else(|| "none".to_string(), |r| r.to_string()),
        "converted"
    );
    Ok(Conversion {
        text,
        polygons: count,
        reference: polygons.reference,
        summary,
    })
}
