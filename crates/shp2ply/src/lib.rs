//! Shapefile polygons to Geosoft-style PLY text.
//!
//! Pipeline
//! - `source`: input adapters that gather shapefile components as named blobs.
//! - `loader`: decode `.shp`/`.shx`/`.prj` into a `FeatureCollection`.
//! - `filter`: keep Polygon/MultiPolygon features only.
//! - `reproject`: move every vertex into a target spatial reference.
//! - `ply`: deterministic text serialization.
//! - `pipeline`: the four steps above as one fallible call.
//!
//! Every conversion owns its collection from load to serialization; nothing is
//! shared between calls.

pub mod crs;
pub mod diagnostics;
pub mod filter;
pub mod geometry;
pub mod loader;
pub mod pipeline;
pub mod ply;
pub mod reproject;
pub mod source;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crs::SpatialReference;
pub use diagnostics::Summary;
pub use filter::filter;
pub use geometry::{
    Feature, FeatureCollection, Geometry, GeometryType, PolygonFeature, PolygonFeatureCollection,
    PolygonGeometry,
};
pub use loader::{load, LoadError};
pub use pipeline::{convert, convert_collection, ConvertError, ConvertOptions, Conversion};
pub use ply::serialize;
pub use reproject::{reproject, ReprojectionError};
pub use source::ComponentSet;
