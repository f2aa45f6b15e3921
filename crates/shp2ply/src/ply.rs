//! Geosoft-style PLY text.
//!
//! Format
//! - One block per polygon: `poly <N>`, one line per exterior vertex, one
//!   blank line.
//! - `N` counts from 1 across all features and MultiPolygon parts.
//! - Vertex lines are `"   {x:.2}   {y:.2} \n"`; the closing vertex is written
//!   like any other.
//! - Interior rings are not written.

use std::fmt::{self, Write};

use geo_types::Polygon;
use tracing::debug;

use crate::geometry::PolygonFeatureCollection;

/// File extension of serialized output.
pub const EXTENSION: &str = "ply";
/// MIME type of serialized output.
pub const MIME_TYPE: &str = "text/plain";

/// Write every polygon of `collection` to `out`; returns the number of blocks.
pub fn write_ply<W: Write>(
    out: &mut W,
    collection: &PolygonFeatureCollection,
) -> Result<usize, fmt::Error> {
    let mut id = 1usize;
    for feature in &collection.features {
        for polygon in feature.geometry.parts() {
            write_block(out, id, polygon)?;
            id += 1;
        }
    }
    Ok(id - 1)
}

fn write_block<W: Write>(out: &mut W, id: usize, polygon: &Polygon<f64>) -> fmt::Result {
    writeln!(out, "poly {id}")?;
    for c in polygon.exterior().coords() {
        writeln!(out, "   {:.2}   {:.2} ", c.x, c.y)?;
    }
    writeln!(out)
}

/// Serialize `collection` to a string. Deterministic: equal input gives
/// byte-identical output.
pub fn serialize(collection: &PolygonFeatureCollection) -> String {
    let mut text = String::new();
    // Writing into a String cannot fail.
    let blocks = write_ply(&mut text, collection).unwrap_or_default();
    debug!(blocks, bytes = text.len(), "serialized polygons");
    text
}

/// The first `lines` lines of `text`, newline-joined without a trailing newline.
pub fn preview(text: &str, lines: usize) -> String {
    text.lines().take(lines).collect::<Vec<_>>().join("\n")
}
