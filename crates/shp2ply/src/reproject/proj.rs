//! libproj backend, enabled with the `proj` cargo feature.

use geo_types::Coord;

use super::{CoordTransform, ReprojectionError};
use crate::crs::SpatialReference;

/// Transform built by `proj::Proj::new_known_crs`; axis order is normalized
/// to (x, y) / (lon, lat).
pub struct ProjTransform {
    inner: proj::Proj,
}

impl ProjTransform {
    pub fn new(
        source: &SpatialReference,
        target: &SpatialReference,
    ) -> Result<Self, ReprojectionError> {
        let from = proj_definition(source);
        let to = proj_definition(target);
        let inner = proj::Proj::new_known_crs(&from, &to, None).map_err(|e| {
            ReprojectionError::Backend {
                source: source.clone(),
                target: target.clone(),
                message: e.to_string(),
            }
        })?;
        tracing::debug!(from = %from, to = %to, "PROJ transform ready");
        Ok(Self { inner })
    }
}

impl CoordTransform for ProjTransform {
    fn transform(&self, c: Coord<f64>) -> Option<Coord<f64>> {
        let (x, y): (f64, f64) = self.inner.convert((c.x, c.y)).ok()?;
        Some(Coord { x, y })
    }
}

/// `EPSG:<code>` when known, otherwise the WKT text itself.
fn proj_definition(reference: &SpatialReference) -> String {
    match (reference.epsg(), reference.definition()) {
        (Some(code), _) => format!("EPSG:{code}"),
        (None, Some(wkt)) => wkt.to_string(),
        (None, None) => String::new(),
    }
}
