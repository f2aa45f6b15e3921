//! Pure-Rust forward/inverse projections.
//!
//! Model
//! - Every transform goes source → geodetic (λ, φ in radians, Greenwich) →
//!   target. Datums in the WGS 84 group share geodetic coordinates (null
//!   shift); other datums must match exactly.
//! - Transverse Mercator uses Krüger's series to order n⁶ (Karney 2011),
//!   accurate to well below a millimetre within a UTM zone.
//! - Ellipsoidal Mercator and the inverse of both conformal projections share
//!   the conformal-latitude solver `tau_from_taup`.

use std::f64::consts::{FRAC_PI_2, PI};

use geo_types::Coord;

use super::{CoordTransform, ReprojectionError};
use crate::crs::{CrsDef, Ellipsoid, Projection, SpatialReference};

const NEWTON_TOL: f64 = 1e-14;
const NEWTON_MAX_ITER: usize = 10;
/// Mercator variants are undefined this close to a pole.
const POLE_EPS: f64 = 1e-10;

/// Forward transform between two resolved definitions.
#[derive(Clone, Debug)]
pub struct BuiltinTransform {
    source: Projector,
    target: Projector,
}

impl BuiltinTransform {
    pub fn new(
        source: &SpatialReference,
        target: &SpatialReference,
    ) -> Result<Self, ReprojectionError> {
        let resolve = |r: &SpatialReference| {
            r.resolve().map_err(|cause| ReprojectionError::Unsupported {
                reference: r.clone(),
                cause,
            })
        };
        let (src, dst) = (resolve(source)?, resolve(target)?);
        if !src.datum.compatible_with(&dst.datum) {
            return Err(ReprojectionError::DatumShift {
                source: source.clone(),
                target: target.clone(),
            });
        }
        Ok(Self::from_definitions(&src, &dst))
    }

    pub fn from_definitions(source: &CrsDef, target: &CrsDef) -> Self {
        Self {
            source: Projector::new(source),
            target: Projector::new(target),
        }
    }
}

impl CoordTransform for BuiltinTransform {
    fn transform(&self, c: Coord<f64>) -> Option<Coord<f64>> {
        let (lam, phi) = self.source.inverse(c)?;
        self.target.forward(lam, phi)
    }
}

/// One CRS, with series coefficients precomputed.
#[derive(Clone, Debug)]
struct Projector {
    kind: Kind,
    /// Prime meridian, radians east of Greenwich.
    pm: f64,
    /// Metres per projected unit.
    unit: f64,
}

#[derive(Clone, Debug)]
enum Kind {
    Geographic,
    WebMercator {
        r: f64,
    },
    Mercator {
        lam0: f64,
        ka: f64,
        e: f64,
        fe: f64,
        fn_: f64,
    },
    TransverseMercator(Box<Kruger>),
}

impl Projector {
    fn new(def: &CrsDef) -> Self {
        let ell = def.ellipsoid;
        let kind = match def.projection {
            Projection::Geographic => Kind::Geographic,
            Projection::WebMercator => Kind::WebMercator { r: ell.a },
            Projection::Mercator {
                lon0,
                k0,
                false_easting,
                false_northing,
            } => Kind::Mercator {
                lam0: lon0.to_radians(),
                ka: k0 * ell.a,
                e: ell.e(),
                fe: false_easting,
                fn_: false_northing,
            },
            Projection::TransverseMercator {
                lon0,
                lat0,
                k0,
                false_easting,
                false_northing,
            } => Kind::TransverseMercator(Box::new(Kruger::new(
                ell,
                lon0.to_radians(),
                lat0.to_radians(),
                k0,
                false_easting,
                false_northing,
            ))),
        };
        Self {
            kind,
            pm: def.prime_meridian.to_radians(),
            unit: def.linear_unit,
        }
    }

    /// CRS coordinate → Greenwich (λ, φ) radians.
    fn inverse(&self, c: Coord<f64>) -> Option<(f64, f64)> {
        let (lam, phi) = match &self.kind {
            Kind::Geographic => (c.x.to_radians(), c.y.to_radians()),
            Kind::WebMercator { r } => {
                let (x, y) = (c.x * self.unit, c.y * self.unit);
                (x / r, (y / r).sinh().atan())
            }
            Kind::Mercator {
                lam0,
                ka,
                e,
                fe,
                fn_,
            } => {
                let (x, y) = (c.x * self.unit, c.y * self.unit);
                let psi = (y - fn_) / ka;
                let tau = tau_from_taup(psi.sinh(), *e)?;
                (lam0 + (x - fe) / ka, tau.atan())
            }
            Kind::TransverseMercator(k) => k.inverse(c.x * self.unit, c.y * self.unit)?,
        };
        Some((adjust_lon(lam + self.pm), phi))
    }

    /// Greenwich (λ, φ) radians → CRS coordinate.
    fn forward(&self, lam: f64, phi: f64) -> Option<Coord<f64>> {
        let lam = adjust_lon(lam - self.pm);
        let (x, y) = match &self.kind {
            Kind::Geographic => return Some(Coord {
                x: lam.to_degrees(),
                y: phi.to_degrees(),
            }),
            Kind::WebMercator { .. } | Kind::Mercator { .. } if FRAC_PI_2 - phi.abs() < POLE_EPS => {
                return None
            }
            Kind::WebMercator { r } => (r * lam, r * phi.tan().asinh()),
            Kind::Mercator {
                lam0,
                ka,
                e,
                fe,
                fn_,
            } => {
                let psi = phi.tan().asinh() - e * (e * phi.sin()).atanh();
                (fe + ka * adjust_lon(lam - lam0), fn_ + ka * psi)
            }
            Kind::TransverseMercator(k) => k.forward(lam, phi),
        };
        let out = Coord {
            x: x / self.unit,
            y: y / self.unit,
        };
        (out.x.is_finite() && out.y.is_finite()).then_some(out)
    }
}

/// Krüger series transverse Mercator on one ellipsoid.
#[derive(Clone, Debug)]
struct Kruger {
    lam0: f64,
    k0a: f64,
    e: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
    fe: f64,
    /// False northing minus the projected northing of the origin latitude.
    y0: f64,
}

impl Kruger {
    fn new(ell: Ellipsoid, lam0: f64, phi0: f64, k0: f64, fe: f64, fn_: f64) -> Self {
        let f = ell.flattening();
        let n = f / (2.0 - f);
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;
        let rectifying = ell.a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);
        let alpha = [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0 + 41.0 * n4 / 180.0 - 127.0 * n5 / 288.0
                + 7891.0 * n6 / 37800.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0 + 557.0 * n4 / 1440.0 + 281.0 * n5 / 630.0
                - 1983433.0 * n6 / 1935360.0,
            61.0 * n3 / 240.0 - 103.0 * n4 / 140.0 + 15061.0 * n5 / 26880.0
                + 167603.0 * n6 / 181440.0,
            49561.0 * n4 / 161280.0 - 179.0 * n5 / 168.0 + 6601661.0 * n6 / 7257600.0,
            34729.0 * n5 / 80640.0 - 3418889.0 * n6 / 1995840.0,
            212378941.0 * n6 / 319334400.0,
        ];
        let beta = [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0 - 81.0 * n5 / 512.0
                + 96199.0 * n6 / 604800.0,
            n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0 + 46.0 * n5 / 105.0
                - 1118711.0 * n6 / 3870720.0,
            17.0 * n3 / 480.0 - 37.0 * n4 / 840.0 - 209.0 * n5 / 4480.0 + 5569.0 * n6 / 90720.0,
            4397.0 * n4 / 161280.0 - 11.0 * n5 / 504.0 - 830251.0 * n6 / 7257600.0,
            4583.0 * n5 / 161280.0 - 108847.0 * n6 / 3991680.0,
            20648693.0 * n6 / 638668800.0,
        ];
        let mut k = Self {
            lam0,
            k0a: k0 * rectifying,
            e: ell.e(),
            alpha,
            beta,
            fe,
            y0: fn_,
        };
        // Northing of (lam0, phi0) before offsets; subtract so the origin maps to (fe, fn).
        let (_, origin_northing) = k.project(0.0, phi0);
        k.y0 = fn_ - origin_northing;
        k
    }

    /// Unshifted (easting, northing) for longitude offset `dlam`.
    fn project(&self, dlam: f64, phi: f64) -> (f64, f64) {
        let sin_phi = phi.sin();
        let t = (sin_phi.atanh() - self.e * (self.e * sin_phi).atanh()).sinh();
        let xi_p = t.atan2(dlam.cos());
        let eta_p = (dlam.sin() / (1.0 + t * t).sqrt()).atanh();
        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, a) in self.alpha.iter().enumerate() {
            let m = 2.0 * (j + 1) as f64;
            xi += a * (m * xi_p).sin() * (m * eta_p).cosh();
            eta += a * (m * xi_p).cos() * (m * eta_p).sinh();
        }
        (self.k0a * eta, self.k0a * xi)
    }

    fn forward(&self, lam: f64, phi: f64) -> (f64, f64) {
        let (x, y) = self.project(adjust_lon(lam - self.lam0), phi);
        (self.fe + x, self.y0 + y)
    }

    fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let xi = (y - self.y0) / self.k0a;
        let eta = (x - self.fe) / self.k0a;
        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, b) in self.beta.iter().enumerate() {
            let m = 2.0 * (j + 1) as f64;
            xi_p -= b * (m * xi).sin() * (m * eta).cosh();
            eta_p -= b * (m * xi).cos() * (m * eta).sinh();
        }
        let sinh_eta = eta_p.sinh();
        let cos_xi = xi_p.cos();
        let taup = xi_p.sin() / (sinh_eta * sinh_eta + cos_xi * cos_xi).sqrt();
        let dlam = sinh_eta.atan2(cos_xi);
        let tau = tau_from_taup(taup, self.e)?;
        Some((self.lam0 + dlam, tau.atan()))
    }
}

/// tan of the conformal latitude from tan of the geodetic latitude.
#[inline]
fn taup(tau: f64, e: f64) -> f64 {
    let tau1 = (1.0 + tau * tau).sqrt();
    let sig = (e * (e * tau / tau1).atanh()).sinh();
    tau * (1.0 + sig * sig).sqrt() - sig * tau1
}

/// Invert `taup` by Newton's method (Karney 2011, eq. 19–21).
fn tau_from_taup(taup_target: f64, e: f64) -> Option<f64> {
    if !taup_target.is_finite() {
        return None;
    }
    let e2m = 1.0 - e * e;
    let mut tau = taup_target / e2m;
    for _ in 0..NEWTON_MAX_ITER {
        let taup_i = taup(tau, e);
        let dtau = (taup_target - taup_i) * (1.0 + e2m * tau * tau)
            / (e2m * (1.0 + tau * tau).sqrt() * (1.0 + taup_i * taup_i).sqrt());
        tau += dtau;
        if dtau.abs() <= NEWTON_TOL * tau.abs().max(1.0) {
            break;
        }
    }
    tau.is_finite().then_some(tau)
}

/// Wrap a longitude into [-π, π], leaving values already inside untouched.
#[inline]
fn adjust_lon(lam: f64) -> f64 {
    if lam.abs() <= PI + 1e-12 {
        lam
    } else {
        lam - 2.0 * PI * ((lam + PI) / (2.0 * PI)).floor()
    }
}
