//! Collection summary for display and JSON reports.
//!
//! Mirrors what a GIS user checks before converting: which spatial reference
//! was declared, whether it maps to an EPSG code, how many features of which
//! type, and where they lie.

use std::collections::BTreeMap;
use std::fmt;

use geo_types::Rect;
use serde::Serialize;

use crate::geometry::{FeatureCollection, PolygonFeatureCollection};

/// Longest definition shown, in characters.
pub const DEFINITION_DISPLAY_LIMIT: usize = 400;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    /// Declared definition, truncated to `DEFINITION_DISPLAY_LIMIT` characters.
    pub reference: Option<String>,
    pub epsg: Option<u32>,
    pub features: usize,
    /// Feature count per geometry type name.
    pub geometry_types: BTreeMap<String, usize>,
    /// `[min_x, min_y, max_x, max_y]` over all features.
    pub bounds: Option<[f64; 4]>,
}

impl Summary {
    pub fn of(collection: &FeatureCollection) -> Self {
        let mut geometry_types = BTreeMap::new();
        let mut bounds: Option<Rect<f64>> = None;
        for feature in &collection.features {
            *geometry_types
                .entry(feature.geometry.geometry_type().to_string())
                .or_insert(0) += 1;
            if let Some(r) = feature.geometry.bounding_rect() {
                bounds = Some(bounds.map_or(r, |b| union(b, r)));
            }
        }
        let reference = collection.reference.as_ref();
        Summary {
            reference: reference
                .and_then(|r| r.definition().map(truncate).or_else(|| Some(r.to_string()))),
            epsg: reference.and_then(|r| r.epsg()),
            features: collection.len(),
            geometry_types,
            bounds: bounds.map(|b| [b.min().x, b.min().y, b.max().x, b.max().y]),
        }
    }

    /// Summary of a filtered collection (what the converter will write).
    pub fn of_polygons(collection: &PolygonFeatureCollection) -> Self {
        Self::of(&collection.clone().into())
    }
}

fn union(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
        (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
    )
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(DEFINITION_DISPLAY_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "reference:      {}",
            self.reference.as_deref().unwrap_or("none")
        )?;
        match self.epsg {
            Some(code) => writeln!(f, "detected EPSG:  {code}")?,
            None => writeln!(f, "detected EPSG:  unknown")?,
        }
        writeln!(f, "features:       {}", self.features)?;
        writeln!(f, "geometry types:")?;
        for (name, count) in &self.geometry_types {
            writeln!(f, "  {name:<16}{count}")?;
        }
        match self.bounds {
            Some([x0, y0, x1, y1]) => write!(f, "bounds:         [{x0}, {y0}, {x1}, {y1}]"),
            None => write!(f, "bounds:         none"),
        }
    }
}
