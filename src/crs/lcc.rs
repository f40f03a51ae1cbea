//! Ellipsoidal Lambert Conformal Conic, one- and two-standard-parallel forms.

use std::f64::consts::FRAC_PI_4;

use super::{Ellipsoid, MapProjection, conformal_factor, latitude_from_t};
use crate::consts::SINGULAR_EPSILON;
use crate::coords::{GeodeticPoint, ProjectedPoint};
use crate::error::GeoError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertConformalConic {
    e: f64,
    lon0: f64,
    /// Cone constant.
    n: f64,
    /// `a * F * k0`.
    big_f: f64,
    /// Radius of the parallel of origin.
    rho0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl LambertConformalConic {
    /// 1SP form: the latitude of origin is the standard parallel, scaled by `scale_factor`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::UnsupportedProjection`] when the parallel is the equator (flat cone).
    pub fn one_parallel(
        ellipsoid: Ellipsoid,
        central_meridian: f64,
        latitude_of_origin: f64,
        scale_factor: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Result<Self, GeoError> {
        let e = ellipsoid.e();
        let phi0 = latitude_of_origin.to_radians();
        let n = phi0.sin();
        check_cone(n)?;

        let t0 = t_of(e, phi0);
        let big_f = ellipsoid.a * scale_factor * m_of(e, phi0) / (n * t0.powf(n));
        Ok(Self {
            e,
            lon0: central_meridian.to_radians(),
            n,
            big_f,
            rho0: big_f * t0.powf(n),
            false_easting,
            false_northing,
        })
    }

    /// 2SP form: true scale along both `parallel_1` and `parallel_2`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::UnsupportedProjection`] when the parallels give a flat cone.
    pub fn two_parallel(
        ellipsoid: Ellipsoid,
        central_meridian: f64,
        latitude_of_origin: f64,
        parallel_1: f64,
        parallel_2: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Result<Self, GeoError> {
        let e = ellipsoid.e();
        let phi1 = parallel_1.to_radians();
        let phi2 = parallel_2.to_radians();
        let m1 = m_of(e, phi1);
        let t1 = t_of(e, phi1);

        let n = if (phi1 - phi2).abs() < SINGULAR_EPSILON {
            phi1.sin()
        } else {
            (m1.ln() - m_of(e, phi2).ln()) / (t1.ln() - t_of(e, phi2).ln())
        };
        check_cone(n)?;

        let big_f = ellipsoid.a * m1 / (n * t1.powf(n));
        let t0 = t_of(e, latitude_of_origin.to_radians());
        Ok(Self {
            e,
            lon0: central_meridian.to_radians(),
            n,
            big_f,
            rho0: big_f * t0.powf(n),
            false_easting,
            false_northing,
        })
    }
}

impl MapProjection for LambertConformalConic {
    fn forward(&self, p: GeodeticPoint) -> ProjectedPoint {
        let rho = self.big_f * t_of(self.e, p.lat.to_radians()).powf(self.n);
        let theta = self.n * (p.lng.to_radians() - self.lon0);
        ProjectedPoint::new(
            self.false_easting + rho * theta.sin(),
            self.false_northing + self.rho0 - rho * theta.cos(),
        )
    }

    fn inverse(&self, p: ProjectedPoint) -> GeodeticPoint {
        let dx = p.x - self.false_easting;
        let dy = self.rho0 - (p.y - self.false_northing);
        let sign = self.n.signum();
        let rho = sign * dx.hypot(dy);
        let theta = (sign * dx).atan2(sign * dy);

        let t = (rho / self.big_f).powf(1.0 / self.n);
        let phi = latitude_from_t(self.e, t);
        let lambda = theta / self.n + self.lon0;
        GeodeticPoint::new(phi.to_degrees(), lambda.to_degrees())
    }
}

fn check_cone(n: f64) -> Result<(), GeoError> {
    if n.abs() < SINGULAR_EPSILON || !n.is_finite() {
        return Err(GeoError::UnsupportedProjection("lambert standard parallels give a flat cone".into()));
    }
    Ok(())
}

fn m_of(e: f64, phi: f64) -> f64 {
    let es = e * phi.sin();
    phi.cos() / (1.0 - es * es).sqrt()
}

fn t_of(e: f64, phi: f64) -> f64 {
    (FRAC_PI_4 - phi / 2.0).tan() / conformal_factor(e, phi)
}
