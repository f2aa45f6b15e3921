//! Spatial references: what a `.prj` declares and what a transform needs.
//!
//! - `SpatialReference`: identifier attached to a whole collection (EPSG code
//!   when resolvable, otherwise the raw WKT definition, often both).
//! - `CrsDef`: resolved parameters (datum, ellipsoid, projection) consumed by
//!   the built-in reprojection backend.
//!
//! Resolution order: the EPSG table first, then the WKT definition.

pub mod epsg;
pub mod wkt;

#[cfg(test)]
mod tests;

use std::fmt;

pub use wkt::{WktError, WktNode, WktValue};

/// Coordinate reference of a collection.
///
/// Invariant: at least one of `epsg` and `definition` is present.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialReference {
    epsg: Option<u32>,
    definition: Option<String>,
}

impl SpatialReference {
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            definition: None,
        }
    }

    /// Parse a WKT definition (WKT1 OGC/ESRI or WKT2) and identify its EPSG code.
    ///
    /// Fails only when the text is not well-formed WKT; an unknown but valid
    /// definition yields a reference without EPSG code.
    pub fn from_wkt(text: &str) -> Result<Self, WktError> {
        let text = text.trim();
        let root = wkt::parse(text)?;
        Ok(Self {
            epsg: wkt::identify_epsg(&root),
            definition: Some(text.to_string()),
        })
    }

    #[inline]
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    #[inline]
    pub fn definition(&self) -> Option<&str> {
        self.definition.as_deref()
    }

    /// Both references denote the same system without needing a transform.
    pub fn same_as(&self, other: &SpatialReference) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            _ => self.definition.is_some() && self.definition == other.definition,
        }
    }

    /// Resolve to transform parameters: EPSG table first, then the WKT text.
    pub fn resolve(&self) -> Result<CrsDef, ResolveError> {
        if let Some(def) = self.epsg.and_then(epsg::definition) {
            return Ok(def);
        }
        match &self.definition {
            Some(text) => {
                let root = wkt::parse(text).map_err(ResolveError::Wkt)?;
                wkt::to_definition(&root).map_err(ResolveError::Unsupported)
            }
            None => Err(ResolveError::Unsupported(format!(
                "EPSG:{} is not in the built-in table",
                self.epsg.unwrap_or_default()
            ))),
        }
    }

    /// Name from the WKT root node, if a definition is attached.
    pub fn name(&self) -> Option<String> {
        let text = self.definition.as_deref()?;
        let root = wkt::parse(text).ok()?;
        root.name().map(str::to_string)
    }
}

impl fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.epsg, self.name()) {
            (Some(code), _) => write!(f, "EPSG:{code}"),
            (None, Some(name)) => write!(f, "custom ({name})"),
            (None, None) => f.write_str("custom definition"),
        }
    }
}

/// Why a reference could not be turned into a `CrsDef`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    Wkt(WktError),
    Unsupported(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Wkt(e) => write!(f, "invalid WKT definition: {e}"),
            ResolveError::Unsupported(why) => write!(f, "unsupported definition: {why}"),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::Wkt(e) => Some(e),
            ResolveError::Unsupported(_) => None,
        }
    }
}

/// Reference ellipsoid: semi-major axis (metres) and inverse flattening
/// (`0.0` for a sphere).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    pub a: f64,
    pub inv_f: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        inv_f: 298.257_223_563,
    };
    pub const GRS80: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        inv_f: 298.257_222_101,
    };

    #[inline]
    pub fn flattening(&self) -> f64 {
        if self.inv_f == 0.0 {
            0.0
        } else {
            1.0 / self.inv_f
        }
    }

    /// First eccentricity.
    #[inline]
    pub fn e(&self) -> f64 {
        let f = self.flattening();
        (f * (2.0 - f)).sqrt()
    }
}

/// Geodetic datum. WGS 84, NAD83 and ETRS89 agree to within a metre and are
/// grouped; any other datum is carried by name.
#[derive(Clone, Debug, PartialEq)]
pub enum Datum {
    Wgs84Compatible,
    Other(String),
}

impl Datum {
    pub fn from_name(name: &str) -> Self {
        match wkt::normalize_name(name).as_str() {
            "d_wgs_1984" | "wgs_1984" | "wgs84" | "wgs_84" | "world_geodetic_system_1984"
            | "world_geodetic_system_1984_ensemble"
            | "d_north_american_1983" | "north_american_datum_1983" | "nad83"
            | "d_etrs_1989" | "etrs_1989" | "etrs89"
            | "european_terrestrial_reference_system_1989" => Datum::Wgs84Compatible,
            other => Datum::Other(other.to_string()),
        }
    }

    /// Coordinates can move between the two datums without a shift.
    pub fn compatible_with(&self, other: &Datum) -> bool {
        match (self, other) {
            (Datum::Wgs84Compatible, Datum::Wgs84Compatible) => true,
            (Datum::Other(a), Datum::Other(b)) => a == b,
            _ => false,
        }
    }
}

/// Map projection with parameters in degrees and metres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// Longitude/latitude in degrees.
    Geographic,
    /// Spherical Mercator on the ellipsoid's semi-major axis (EPSG:3857).
    WebMercator,
    /// Ellipsoidal Mercator, variant A.
    Mercator {
        lon0: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    },
    TransverseMercator {
        lon0: f64,
        lat0: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    },
}

/// Resolved coordinate reference system.
#[derive(Clone, Debug, PartialEq)]
pub struct CrsDef {
    pub name: String,
    pub datum: Datum,
    pub ellipsoid: Ellipsoid,
    /// Prime meridian longitude east of Greenwich, degrees.
    pub prime_meridian: f64,
    pub projection: Projection,
    /// Metres per projected unit (ignored for geographic systems).
    pub linear_unit: f64,
}

impl CrsDef {
    pub fn geographic(name: &str, datum: Datum, ellipsoid: Ellipsoid) -> Self {
        Self {
            name: name.to_string(),
            datum,
            ellipsoid,
            prime_meridian: 0.0,
            projection: Projection::Geographic,
            linear_unit: 1.0,
        }
    }

    pub fn projected(name: &str, datum: Datum, ellipsoid: Ellipsoid, projection: Projection) -> Self {
        Self {
            name: name.to_string(),
            datum,
            ellipsoid,
            prime_meridian: 0.0,
            projection,
            linear_unit: 1.0,
        }
    }

    #[inline]
    pub fn is_geographic(&self) -> bool {
        matches!(self.projection, Projection::Geographic)
    }
}
