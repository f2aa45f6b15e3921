//! Well-known-text CRS definitions (`.prj` contents).
//!
//! Grammar accepted (WKT1 OGC/ESRI and the WKT2 subset shapefiles carry):
//! ```text
//! node  := KEYWORD ('[' | '(') value (',' value)* (']' | ')')
//! value := "quoted text" | number | node | BARE_KEYWORD
//! ```
//! Quotes inside text are doubled (`""`).

use std::fmt;

use super::{epsg, CrsDef, Datum, Ellipsoid, Projection};

#[derive(Clone, Debug, PartialEq)]
pub enum WktValue {
    Text(String),
    Number(f64),
    Keyword(String),
    Node(WktNode),
}

#[derive(Clone, Debug, PartialEq)]
pub struct WktNode {
    pub keyword: String,
    pub args: Vec<WktValue>,
}

impl WktNode {
    /// First quoted argument, the conventional name slot.
    pub fn name(&self) -> Option<&str> {
        match self.args.first() {
            Some(WktValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn children(&self) -> impl Iterator<Item = &WktNode> {
        self.args.iter().filter_map(|v| match v {
            WktValue::Node(n) => Some(n),
            _ => None,
        })
    }

    /// First direct child with one of `keywords` (case-insensitive).
    pub fn child(&self, keywords: &[&str]) -> Option<&WktNode> {
        self.children()
            .find(|n| keywords.iter().any(|k| n.keyword.eq_ignore_ascii_case(k)))
    }

    /// Depth-first search over all descendants.
    pub fn find(&self, keywords: &[&str]) -> Option<&WktNode> {
        for c in self.children() {
            if keywords.iter().any(|k| c.keyword.eq_ignore_ascii_case(k)) {
                return Some(c);
            }
            if let Some(found) = c.find(keywords) {
                return Some(found);
            }
        }
        None
    }

    /// Numeric argument at `index` (numbers only; quoted numbers are accepted
    /// because ESRI and EPSG disagree on authority codes).
    pub fn number(&self, index: usize) -> Option<f64> {
        match self.args.get(index)? {
            WktValue::Number(x) => Some(*x),
            WktValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn is(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.keyword.eq_ignore_ascii_case(k))
    }
}

/// Malformed WKT: what was expected and the byte offset where it failed.
#[derive(Clone, Debug, PartialEq)]
pub struct WktError {
    pub message: String,
    pub offset: usize,
}

impl fmt::Display for WktError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.offset)
    }
}

impl std::error::Error for WktError {}

pub fn parse(input: &str) -> Result<WktNode, WktError> {
    let mut p = Parser {
        src: input.as_bytes(),
        pos: 0,
    };
    p.skip_ws();
    let root = match p.value()? {
        WktValue::Node(n) => n,
        _ => return Err(p.error("expected a WKT node")),
    };
    p.skip_ws();
    if p.pos != p.src.len() {
        return Err(p.error("trailing input after WKT node"));
    }
    Ok(root)
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> WktError {
        WktError {
            message: message.to_string(),
            offset: self.pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Result<WktValue, WktError> {
        self.skip_ws();
        match self.peek() {
            Some(b'"') => self.text().map(WktValue::Text),
            Some(b) if b == b'-' || b == b'+' || b == b'.' || b.is_ascii_digit() => {
                self.number().map(WktValue::Number)
            }
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => self.keyword_or_node(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn text(&mut self) -> Result<String, WktError> {
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                Some(b'"') if self.src.get(self.pos + 1) == Some(&b'"') => {
                    out.push(b'"');
                    self.pos += 2;
                }
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(String::from_utf8_lossy(&out).into_owned());
                }
                Some(b) => {
                    out.push(b);
                    self.pos += 1;
                }
                None => return Err(self.error("unterminated quoted text")),
            }
        }
    }

    fn number(&mut self) -> Result<f64, WktError> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(b) if b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E')
        ) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.src[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| WktError {
                message: "malformed number".to_string(),
                offset: start,
            })
    }

    fn keyword_or_node(&mut self) -> Result<WktValue, WktError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        let keyword = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        self.skip_ws();
        let close = match self.peek() {
            Some(b'[') => b']',
            Some(b'(') => b')',
            _ => return Ok(WktValue::Keyword(keyword)),
        };
        self.pos += 1;
        let mut args = Vec::new();
        self.skip_ws();
        if self.peek() == Some(close) {
            self.pos += 1;
            return Ok(WktValue::Node(WktNode { keyword, args }));
        }
        loop {
            args.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b) if b == close => {
                    self.pos += 1;
                    return Ok(WktValue::Node(WktNode { keyword, args }));
                }
                Some(_) => return Err(self.error("expected ',' or closing bracket")),
                None => return Err(self.error("unexpected end of input")),
            }
        }
    }
}

/// Lowercase, runs of non-alphanumerics collapsed to `_`, trimmed.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

const PROJECTED: &[&str] = &["PROJCS", "PROJCRS", "PROJECTEDCRS"];
const GEOGRAPHIC: &[&str] = &[
    "GEOGCS",
    "GEOGCRS",
    "GEODCRS",
    "GEOGRAPHICCRS",
    "BASEGEOGCRS",
    "BASEGEODCRS",
];

/// EPSG code from a top-level authority clause, else from a well-known name.
pub fn identify_epsg(root: &WktNode) -> Option<u32> {
    if let Some(code) = authority_code(root) {
        return Some(code);
    }
    let name = normalize_name(root.name()?);
    let code = epsg::code_for_name(&name)?;
    // A geographic name must not identify a projected system and vice versa.
    let projected = epsg::definition(code).is_some_and(|d| !d.is_geographic());
    (projected == root.is(PROJECTED)).then_some(code)
}

fn authority_code(node: &WktNode) -> Option<u32> {
    let auth = node.child(&["AUTHORITY", "ID"])?;
    if !auth.name()?.eq_ignore_ascii_case("EPSG") {
        return None;
    }
    let code = auth.number(1)?;
    (code >= 0.0 && code.fract() == 0.0 && code <= u32::MAX as f64).then_some(code as u32)
}

/// Build transform parameters from a parsed definition.
///
/// Errors name the unsupported piece (projection method, missing spheroid).
pub fn to_definition(root: &WktNode) -> Result<CrsDef, String> {
    let name = root.name().unwrap_or("unnamed").to_string();
    let geog = if root.is(GEOGRAPHIC) {
        root
    } else if root.is(PROJECTED) {
        root.child(GEOGRAPHIC)
            .ok_or_else(|| format!("{name}: projected CRS without a geographic base"))?
    } else {
        return Err(format!("{name}: unsupported CRS kind {}", root.keyword));
    };

    let datum_node = geog.find(&["DATUM", "GEODETICDATUM", "TRF", "ENSEMBLE"]);
    let datum = datum_node
        .and_then(WktNode::name)
        .map(Datum::from_name)
        .ok_or_else(|| format!("{name}: missing DATUM"))?;
    let spheroid = geog
        .find(&["SPHEROID", "ELLIPSOID"])
        .ok_or_else(|| format!("{name}: missing SPHEROID"))?;
    let ellipsoid = match (spheroid.number(1), spheroid.number(2)) {
        (Some(a), Some(inv_f)) if a > 0.0 && inv_f >= 0.0 => Ellipsoid { a, inv_f },
        _ => return Err(format!("{name}: malformed SPHEROID")),
    };
    let prime_meridian = geog
        .child(&["PRIMEM", "PRIMEMERIDIAN"])
        .and_then(|pm| pm.number(1))
        .unwrap_or(0.0);

    if root.is(GEOGRAPHIC) {
        return Ok(CrsDef {
            name,
            datum,
            ellipsoid,
            prime_meridian,
            projection: Projection::Geographic,
            linear_unit: 1.0,
        });
    }

    let linear_unit = root
        .child(&["UNIT", "LENGTHUNIT"])
        .or_else(|| root.find(&["LENGTHUNIT"]))
        .and_then(|u| u.number(1))
        .filter(|f| *f > 0.0)
        .unwrap_or(1.0);
    let params = Params {
        root,
        linear_unit,
    };

    let method = root
        .child(&["PROJECTION"])
        .or_else(|| root.find(&["METHOD", "PROJECTION"]))
        .and_then(WktNode::name)
        .map(normalize_name)
        .ok_or_else(|| format!("{name}: missing PROJECTION"))?;

    let projection = match method.as_str() {
        "transverse_mercator" | "gauss_kruger" => Projection::TransverseMercator {
            lon0: params.angle(&["central_meridian", "longitude_of_natural_origin", "longitude_of_origin"]),
            lat0: params.angle(&["latitude_of_origin", "latitude_of_natural_origin"]),
            k0: params.scale(),
            false_easting: params.length(&["false_easting"]),
            false_northing: params.length(&["false_northing"]),
        },
        "mercator_auxiliary_sphere"
        | "popular_visualisation_pseudo_mercator"
        | "popular_visualization_pseudo_mercator" => Projection::WebMercator,
        "mercator" | "mercator_1sp" | "mercator_2sp" | "mercator_variant_a"
        | "mercator_variant_b" => Projection::Mercator {
            lon0: params.angle(&["central_meridian", "longitude_of_natural_origin", "longitude_of_origin"]),
            k0: mercator_scale(&params, &ellipsoid),
            false_easting: params.length(&["false_easting"]),
            false_northing: params.length(&["false_northing"]),
        },
        other => return Err(format!("{name}: projection method {other} is not supported")),
    };

    Ok(CrsDef {
        name,
        datum,
        ellipsoid,
        prime_meridian,
        projection,
        linear_unit,
    })
}

/// Mercator scale on the equator. A standard parallel, when given, sets it
/// to the parallel's radius ratio `cos φ1 / sqrt(1 - e² sin² φ1)`.
fn mercator_scale(params: &Params<'_>, ellipsoid: &Ellipsoid) -> f64 {
    let parallel = params
        .lookup(&[
            "standard_parallel_1",
            "latitude_of_1st_standard_parallel",
            "latitude_of_true_scale",
        ])
        .and_then(|p| p.number(1))
        .filter(|lat| *lat != 0.0);
    match parallel {
        Some(lat) => {
            let phi = lat.to_radians();
            let e = ellipsoid.e();
            phi.cos() / (1.0 - (e * phi.sin()).powi(2)).sqrt()
        }
        None => params.scale(),
    }
}

struct Params<'a> {
    root: &'a WktNode,
    linear_unit: f64,
}

impl Params<'_> {
    fn lookup(&self, names: &[&str]) -> Option<&WktNode> {
        let mut stack: Vec<&WktNode> = vec![self.root];
        while let Some(node) = stack.pop() {
            for c in node.children() {
                if c.is(&["PARAMETER"]) {
                    if let Some(n) = c.name() {
                        if names.contains(&normalize_name(n).as_str()) {
                            return Some(c);
                        }
                    }
                } else if !c.is(GEOGRAPHIC) {
                    stack.push(c);
                }
            }
        }
        None
    }

    fn angle(&self, names: &[&str]) -> f64 {
        self.lookup(names).and_then(|p| p.number(1)).unwrap_or(0.0)
    }

    fn scale(&self) -> f64 {
        self.lookup(&["scale_factor", "scale_factor_at_natural_origin"])
            .and_then(|p| p.number(1))
            .unwrap_or(1.0)
    }

    /// Linear parameter in metres. WKT2 parameters carry their own unit; WKT1
    /// parameters use the CRS unit.
    fn length(&self, names: &[&str]) -> f64 {
        let Some(p) = self.lookup(names) else {
            return 0.0;
        };
        let unit = p
            .child(&["LENGTHUNIT", "UNIT"])
            .and_then(|u| u.number(1))
            .unwrap_or(self.linear_unit);
        p.number(1).unwrap_or(0.0) * unit
    }
}
