//! Geometry filter: keep polygon-family records, drop everything else.

use tracing::debug;

use crate::geometry::{
    FeatureCollection, Geometry, PolygonFeature, PolygonFeatureCollection, PolygonGeometry,
};

/// Narrow `collection` to Polygon/MultiPolygon features, preserving order
/// and record numbers. Never fails; the result may be empty.
pub fn filter(collection: FeatureCollection) -> PolygonFeatureCollection {
    let total = collection.features.len();
    let features: Vec<PolygonFeature> = collection
        .features
        .into_iter()
        .filter_map(|f| {
            let geometry = match f.geometry {
                Geometry::Polygon(p) => PolygonGeometry::Polygon(p),
                Geometry::MultiPolygon(mp) => PolygonGeometry::MultiPolygon(mp),
                Geometry::Null
                | Geometry::Point(_)
                | Geometry::MultiPoint(_)
                | Geometry::LineString(_)
                | Geometry::MultiLineString(_)
                | Geometry::Multipatch => return None,
            };
            Some(PolygonFeature {
                record: f.record,
                geometry,
            })
        })
        .collect();
    debug!(kept = features.len(), dropped = total - features.len(), "filtered features");
    PolygonFeatureCollection {
        features,
        reference: collection.reference,
    }
}
