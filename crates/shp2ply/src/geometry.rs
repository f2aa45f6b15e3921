//! Feature geometry as decoded from shapefile records.
//!
//! - `Geometry`: tagged union over every record kind a shapefile can hold.
//! - `FeatureCollection`: loader output, one spatial reference for all features.
//! - `PolygonFeatureCollection`: filter output; the type admits polygon-family
//!   geometry only, so serializer and reprojection never see other kinds.

use std::fmt;

use geo::BoundingRect;
use geo_types::{LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon, Rect};

use crate::crs::SpatialReference;

/// Geometry of one shapefile record (x/y only; M and Z are discarded).
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Null,
    Point(Point<f64>),
    MultiPoint(MultiPoint<f64>),
    LineString(LineString<f64>),
    MultiLineString(MultiLineString<f64>),
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
    /// Multipatch surfaces are recognised but not decoded.
    Multipatch,
}

/// Type tag of a `Geometry`, named the way GIS tooling reports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeometryType {
    Null,
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    Multipatch,
}

impl GeometryType {
    pub fn as_str(self) -> &'static str {
        match self {
            GeometryType::Null => "Null",
            GeometryType::Point => "Point",
            GeometryType::MultiPoint => "MultiPoint",
            GeometryType::LineString => "LineString",
            GeometryType::MultiLineString => "MultiLineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPolygon => "MultiPolygon",
            GeometryType::Multipatch => "Multipatch",
        }
    }

    #[inline]
    pub fn is_polygonal(self) -> bool {
        matches!(self, GeometryType::Polygon | GeometryType::MultiPolygon)
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Geometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Null => GeometryType::Null,
            Geometry::Point(_) => GeometryType::Point,
            Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
            Geometry::Multipatch => GeometryType::Multipatch,
        }
    }

    /// Axis-aligned bounds; `None` for null, empty and undecoded geometry.
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            Geometry::Null | Geometry::Multipatch => None,
            Geometry::Point(p) => Some(p.bounding_rect()),
            Geometry::MultiPoint(mp) => mp.bounding_rect(),
            Geometry::LineString(ls) => ls.bounding_rect(),
            Geometry::MultiLineString(mls) => mls.bounding_rect(),
            Geometry::Polygon(p) => p.bounding_rect(),
            Geometry::MultiPolygon(mp) => mp.bounding_rect(),
        }
    }
}

/// One record: its 1-based position in the shapefile and its geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub record: usize,
    pub geometry: Geometry,
}

/// All records of one shapefile plus the collection-wide spatial reference.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub reference: Option<SpatialReference>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>, reference: Option<SpatialReference>) -> Self {
        Self {
            features,
            reference,
        }
    }

    /// Build a collection from bare geometries, numbering records from 1.
    pub fn from_geometries<I>(geometries: I, reference: Option<SpatialReference>) -> Self
    where
        I: IntoIterator<Item = Geometry>,
    {
        let features = geometries
            .into_iter()
            .enumerate()
            .map(|(i, geometry)| Feature {
                record: i + 1,
                geometry,
            })
            .collect();
        Self::new(features, reference)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Polygon-family geometry, the only kind that reaches the serializer.
#[derive(Clone, Debug, PartialEq)]
pub enum PolygonGeometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl PolygonGeometry {
    /// Constituent polygons in stored order; a `Polygon` is a sequence of one.
    pub fn parts(&self) -> std::slice::Iter<'_, Polygon<f64>> {
        match self {
            PolygonGeometry::Polygon(p) => std::slice::from_ref(p).iter(),
            PolygonGeometry::MultiPolygon(mp) => mp.0.iter(),
        }
    }

    pub fn geometry_type(&self) -> GeometryType {
        match self {
            PolygonGeometry::Polygon(_) => GeometryType::Polygon,
            PolygonGeometry::MultiPolygon(_) => GeometryType::MultiPolygon,
        }
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            PolygonGeometry::Polygon(p) => p.bounding_rect(),
            PolygonGeometry::MultiPolygon(mp) => mp.bounding_rect(),
        }
    }
}

impl From<PolygonGeometry> for Geometry {
    fn from(g: PolygonGeometry) -> Self {
        match g {
            PolygonGeometry::Polygon(p) => Geometry::Polygon(p),
            PolygonGeometry::MultiPolygon(mp) => Geometry::MultiPolygon(mp),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolygonFeature {
    pub record: usize,
    pub geometry: PolygonGeometry,
}

/// Filtered collection. Invariant: every feature is polygon-family and all of
/// them share `reference`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolygonFeatureCollection {
    pub features: Vec<PolygonFeature>,
    pub reference: Option<SpatialReference>,
}

impl PolygonFeatureCollection {
    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Total number of polygons the serializer will emit.
    pub fn polygon_count(&self) -> usize {
        self.features.iter().map(|f| f.geometry.parts().len()).sum()
    }
}

impl From<PolygonFeatureCollection> for FeatureCollection {
    fn from(c: PolygonFeatureCollection) -> Self {
        let features = c
            .features
            .into_iter()
            .map(|f| Feature {
                record: f.record,
                geometry: f.geometry.into(),
            })
            .collect();
        FeatureCollection::new(features, c.reference)
    }
}
