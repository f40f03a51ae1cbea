//! Transverse Mercator (Snyder series), shared by UTM and the general TM family.

use super::{Ellipsoid, MapProjection};
use crate::coords::{GeodeticPoint, ProjectedPoint};

/// Transverse Mercator on an ellipsoid with arbitrary origin, scale, and false offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    a: f64,
    e2: f64,
    ep2: f64,
    /// Central meridian in radians.
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
    /// Meridian arc length at the latitude of origin.
    m0: f64,
}

impl TransverseMercator {
    /// Angles in degrees, offsets in meters.
    #[must_use]
    pub fn new(
        ellipsoid: Ellipsoid,
        central_meridian: f64,
        latitude_of_origin: f64,
        scale_factor: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let e2 = ellipsoid.e2();
        let mut tm = Self {
            a: ellipsoid.a,
            e2,
            ep2: ellipsoid.ep2(),
            lon0: central_meridian.to_radians(),
            k0: scale_factor,
            false_easting,
            false_northing,
            m0: 0.0,
        };
        tm.m0 = tm.meridian_arc(latitude_of_origin.to_radians());
        tm
    }

    /// Central meridian in degrees.
    #[must_use]
    pub fn central_meridian(&self) -> f64 {
        self.lon0.to_degrees()
    }

    /// Distance along the meridian from the equator to latitude `phi` (radians).
    #[must_use]
    pub fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }
}

impl MapProjection for TransverseMercator {
    fn forward(&self, p: GeodeticPoint) -> ProjectedPoint {
        let phi = p.lat.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = self.a / (1.0 - self.e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = self.ep2 * cos_phi * cos_phi;
        let a = (p.lng.to_radians() - self.lon0) * cos_phi;
        let m = self.meridian_arc(phi);

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let x = self.false_easting
            + self.k0
                * n
                * (a + (1.0 - t + c) * a3 / 6.0 + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * self.ep2) * a5 / 120.0);
        let y = self.false_northing
            + self.k0
                * (m - self.m0
                    + n * tan_phi
                        * (a2 / 2.0
                            + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                            + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * self.ep2) * a6 / 720.0));

        ProjectedPoint::new(x, y)
    }

    fn inverse(&self, p: ProjectedPoint) -> GeodeticPoint {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let root = (1.0 - e2).sqrt();
        let e1 = (1.0 - root) / (1.0 + root);

        let m = self.m0 + (p.y - self.false_northing) / self.k0;
        let mu = m / (self.a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

        // Footpoint latitude.
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1) = phi1.sin_cos();
        let tan1 = phi1.tan();
        let c1 = self.ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let w = 1.0 - e2 * sin1 * sin1;
        let n1 = self.a / w.sqrt();
        let r1 = self.a * (1.0 - e2) / w.powf(1.5);
        let d = (p.x - self.false_easting) / (n1 * self.k0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let phi = phi1
            - (n1 * tan1 / r1)
                * (d2 / 2.0 - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * self.ep2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * self.ep2 - 3.0 * c1 * c1) * d6
                        / 720.0);
        let lambda = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * self.ep2 + 24.0 * t1 * t1) * d5 / 120.0)
                / cos1;

        GeodeticPoint::new(phi.to_degrees(), lambda.to_degrees())
    }
}
