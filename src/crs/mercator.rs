//! Ellipsoidal normal-aspect Mercator.

use std::f64::consts::FRAC_PI_4;

use super::{Ellipsoid, MapProjection, conformal_factor, latitude_from_t};
use crate::coords::{GeodeticPoint, ProjectedPoint};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mercator {
    a: f64,
    e: f64,
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl Mercator {
    #[must_use]
    pub fn new(
        ellipsoid: Ellipsoid,
        central_meridian: f64,
        scale_factor: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        Self {
            a: ellipsoid.a,
            e: ellipsoid.e(),
            lon0: central_meridian.to_radians(),
            k0: scale_factor,
            false_easting,
            false_northing,
        }
    }
}

impl MapProjection for Mercator {
    fn forward(&self, p: GeodeticPoint) -> ProjectedPoint {
        let phi = p.lat.to_radians();
        let x = self.false_easting + self.a * self.k0 * (p.lng.to_radians() - self.lon0);
        let y = self.false_northing + self.a * self.k0 * ((FRAC_PI_4 + phi / 2.0).tan() * conformal_factor(self.e, phi)).ln();
        ProjectedPoint::new(x, y)
    }

    fn inverse(&self, p: ProjectedPoint) -> GeodeticPoint {
        let t = (-(p.y - self.false_northing) / (self.a * self.k0)).exp();
        let phi = latitude_from_t(self.e, t);
        let lambda = (p.x - self.false_easting) / (self.a * self.k0) + self.lon0;
        GeodeticPoint::new(phi.to_degrees(), lambda.to_degrees())
    }
}
