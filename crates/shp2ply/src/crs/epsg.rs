//! Built-in EPSG table: the geographic and projected systems shapefiles
//! most often declare.

use super::{CrsDef, Datum, Ellipsoid, Projection};

pub const WGS84: u32 = 4326;
pub const NAD83: u32 = 4269;
pub const ETRS89: u32 = 4258;
pub const WEB_MERCATOR: u32 = 3857;
/// Legacy alias of EPSG:3857.
pub const GOOGLE_MERCATOR: u32 = 900_913;
pub const WORLD_MERCATOR: u32 = 3395;

const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Parameters for `code`, or `None` if the code is outside the table.
pub fn definition(code: u32) -> Option<CrsDef> {
    let def = match code {
        WGS84 => CrsDef::geographic("WGS 84", Datum::Wgs84Compatible, Ellipsoid::WGS84),
        NAD83 => CrsDef::geographic("NAD83", Datum::Wgs84Compatible, Ellipsoid::GRS80),
        ETRS89 => CrsDef::geographic("ETRS89", Datum::Wgs84Compatible, Ellipsoid::GRS80),
        WEB_MERCATOR | GOOGLE_MERCATOR => CrsDef::projected(
            "WGS 84 / Pseudo-Mercator",
            Datum::Wgs84Compatible,
            Ellipsoid::WGS84,
            Projection::WebMercator,
        ),
        WORLD_MERCATOR => CrsDef::projected(
            "WGS 84 / World Mercator",
            Datum::Wgs84Compatible,
            Ellipsoid::WGS84,
            Projection::Mercator {
                lon0: 0.0,
                k0: 1.0,
                false_easting: 0.0,
                false_northing: 0.0,
            },
        ),
        32601..=32660 => utm("WGS 84", Ellipsoid::WGS84, code - 32600, true),
        32701..=32760 => utm("WGS 84", Ellipsoid::WGS84, code - 32700, false),
        26901..=26923 => utm("NAD83", Ellipsoid::GRS80, code - 26900, true),
        25828..=25838 => utm("ETRS89", Ellipsoid::GRS80, code - 25800, true),
        _ => return None,
    };
    Some(def)
}

fn utm(datum_name: &str, ellipsoid: Ellipsoid, zone: u32, north: bool) -> CrsDef {
    let hemisphere = if north { 'N' } else { 'S' };
    CrsDef::projected(
        &format!("{datum_name} / UTM zone {zone}{hemisphere}"),
        Datum::Wgs84Compatible,
        ellipsoid,
        Projection::TransverseMercator {
            lon0: utm_central_meridian(zone),
            lat0: 0.0,
            k0: UTM_K0,
            false_easting: UTM_FALSE_EASTING,
            false_northing: if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH },
        },
    )
}

/// Central meridian of UTM `zone` (1..=60), degrees.
#[inline]
pub fn utm_central_meridian(zone: u32) -> f64 {
    -183.0 + 6.0 * zone as f64
}

/// EPSG code for a well-known CRS name (ESRI or EPSG spelling, already
/// normalized by `wkt::normalize_name`).
pub fn code_for_name(normalized: &str) -> Option<u32> {
    match normalized {
        "gcs_wgs_1984" | "wgs_84" | "wgs84" | "wgs_1984" => return Some(WGS84),
        "gcs_north_american_1983" | "nad83" => return Some(NAD83),
        "gcs_etrs_1989" | "etrs89" => return Some(ETRS89),
        "wgs_1984_web_mercator_auxiliary_sphere"
        | "wgs_1984_web_mercator"
        | "wgs_84_pseudo_mercator"
        | "web_mercator" => return Some(WEB_MERCATOR),
        "wgs_1984_world_mercator" | "wgs_84_world_mercator" => return Some(WORLD_MERCATOR),
        _ => {}
    }
    for (prefixes, north_base, south_base, zones) in [
        (
            &["wgs_1984_utm_zone_", "wgs_84_utm_zone_"][..],
            32600,
            Some(32700),
            1..=60,
        ),
        (&["nad_1983_utm_zone_", "nad83_utm_zone_"][..], 26900, None, 1..=23),
        (&["etrs_1989_utm_zone_", "etrs89_utm_zone_"][..], 25800, None, 28..=38),
    ] {
        for prefix in prefixes {
            let Some(rest) = normalized.strip_prefix(prefix) else {
                continue;
            };
            let (digits, hemisphere) = rest.split_at(rest.len().saturating_sub(1));
            let Ok(zone) = digits.parse::<u32>() else {
                continue;
            };
            if !zones.contains(&zone) {
                continue;
            }
            return match (hemisphere, south_base) {
                ("n", _) => Some(north_base + zone),
                ("s", Some(base)) => Some(base + zone),
                _ => None,
            };
        }
    }
    None
}
