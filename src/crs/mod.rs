//! Geodetic <-> projected coordinate conversion.
//!
//! A [`CoordinateConverter`] is built once from [`ProjectionParameters`] and is
//! immutable afterwards. UTM and Geographic are handled in closed form; the
//! other families (Transverse Mercator, Mercator, Lambert Conformal Conic) are
//! built from their supplied parameters by the projection types in the
//! submodules. Every family that projects forward also inverts.
//!
//! UTM without a forced zone picks the zone of each point it projects. Its
//! inverse has no point to take a zone from and uses [`UTM_REFERENCE_ZONE`];
//! fits pin the zone from their control points instead (see
//! [`ProjectionParameters::with_utm_zone_for`]).
//!
//! There is no fallback: an unknown family or a missing required parameter is
//! [`GeoError::UnsupportedProjection`].

pub mod lcc;
pub mod mercator;
pub mod tmerc;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

use crate::consts::{
    UTM_FALSE_EASTING, UTM_K0, UTM_MAX_ZONE, UTM_REFERENCE_ZONE, UTM_SOUTH_FALSE_NORTHING, WGS84_A, WGS84_INV_F,
};
use crate::coords::{GeodeticPoint, ProjectedPoint};
use crate::error::GeoError;

pub use lcc::LambertConformalConic;
pub use mercator::Mercator;
pub use tmerc::TransverseMercator;

// =============================================================================
// ELLIPSOID
// =============================================================================

/// Reference ellipsoid shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in meters.
    pub a: f64,
    /// Flattening.
    pub f: f64,
}

impl Ellipsoid {
    /// First eccentricity squared.
    #[must_use]
    pub fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }

    /// First eccentricity.
    #[must_use]
    pub fn e(&self) -> f64 {
        self.e2().sqrt()
    }

    /// Second eccentricity squared.
    #[must_use]
    pub fn ep2(&self) -> f64 {
        let e2 = self.e2();
        e2 / (1.0 - e2)
    }
}

pub const WGS84: Ellipsoid = Ellipsoid { a: WGS84_A, f: 1.0 / WGS84_INV_F };

// =============================================================================
// PARAMETERS
// =============================================================================

/// Projection family named by the georeference record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionFamily {
    Utm,
    TransverseMercator,
    LambertConformalConic,
    Mercator,
    Geographic,
    #[serde(other)]
    Unknown,
}

/// Hemisphere for UTM false northing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
    #[default]
    North,
    South,
}

impl Hemisphere {
    /// Hemisphere containing `lat` (the equator counts as north).
    #[must_use]
    pub fn of_latitude(lat: f64) -> Self {
        if lat < 0.0 { Self::South } else { Self::North }
    }
}

/// Projection description extracted from the document's georeference metadata.
///
/// Angles are in degrees, distances in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionParameters {
    pub family: ProjectionFamily,
    /// Datum name; `None` or any WGS84 spelling is accepted.
    #[serde(default)]
    pub datum: Option<String>,
    /// Forced UTM zone. Decoded wide so an out-of-range value reaches
    /// [`CoordinateConverter::new`] instead of failing in serde.
    #[serde(default)]
    pub utm_zone: Option<i64>,
    #[serde(default)]
    pub hemisphere: Option<Hemisphere>,
    #[serde(default)]
    pub central_meridian: Option<f64>,
    #[serde(default)]
    pub scale_factor: Option<f64>,
    #[serde(default)]
    pub false_easting: Option<f64>,
    #[serde(default)]
    pub false_northing: Option<f64>,
    #[serde(default)]
    pub latitude_of_origin: Option<f64>,
    /// Two standard parallels for the 2SP Lambert variant.
    #[serde(default)]
    pub standard_parallels: Option<(f64, f64)>,
}

impl ProjectionParameters {
    /// Parameters for `family` with every optional field unset.
    #[must_use]
    pub fn new(family: ProjectionFamily) -> Self {
        Self {
            family,
            datum: None,
            utm_zone: None,
            hemisphere: None,
            central_meridian: None,
            scale_factor: None,
            false_easting: None,
            false_northing: None,
            latitude_of_origin: None,
            standard_parallels: None,
        }
    }

    /// UTM with a forced zone and hemisphere.
    #[must_use]
    pub fn utm(zone: u8, hemisphere: Hemisphere) -> Self {
        Self { utm_zone: Some(i64::from(zone)), hemisphere: Some(hemisphere), ..Self::new(ProjectionFamily::Utm) }
    }

    /// Identity lat/lng mapping.
    #[must_use]
    pub fn geographic() -> Self {
        Self::new(ProjectionFamily::Geographic)
    }

    /// Fill in a missing UTM zone and hemisphere from a reference position.
    ///
    /// Non-UTM parameters and already-forced fields are returned unchanged.
    #[must_use]
    pub fn with_utm_zone_for(mut self, reference: GeodeticPoint) -> Self {
        if self.family == ProjectionFamily::Utm {
            if self.utm_zone.is_none() {
                self.utm_zone = Some(i64::from(utm_zone_for(reference.lng)));
            }
            if self.hemisphere.is_none() {
                self.hemisphere = Some(Hemisphere::of_latitude(reference.lat));
            }
        }
        self
    }
}

/// UTM zone containing longitude `lng`: `floor((lng + 180) / 6) + 1`, clamped to 1..=60.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn utm_zone_for(lng: f64) -> u8 {
    let zone = ((lng + 180.0) / 6.0).floor() + 1.0;
    zone.clamp(1.0, f64::from(UTM_MAX_ZONE)) as u8
}

/// Central meridian in degrees of UTM `zone`.
#[must_use]
pub fn utm_central_meridian(zone: u8) -> f64 {
    -183.0 + 6.0 * f64::from(zone)
}

fn utm_projection(zone: u8, hemisphere: Hemisphere) -> TransverseMercator {
    let false_northing = match hemisphere {
        Hemisphere::North => 0.0,
        Hemisphere::South => UTM_SOUTH_FALSE_NORTHING,
    };
    TransverseMercator::new(WGS84, utm_central_meridian(zone), 0.0, UTM_K0, UTM_FALSE_EASTING, false_northing)
}

// =============================================================================
// PROJECTION TRAIT
// =============================================================================

/// A reversible map projection on a fixed ellipsoid.
pub trait MapProjection {
    /// Geodetic degrees to projected meters.
    fn forward(&self, p: GeodeticPoint) -> ProjectedPoint;
    /// Projected meters to geodetic degrees.
    fn inverse(&self, p: ProjectedPoint) -> GeodeticPoint;
}

// =============================================================================
// CONVERTER
// =============================================================================

/// Immutable geodetic <-> projected converter for one CRS.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateConverter {
    /// Identity: x = lng, y = lat.
    Geographic,
    Utm { zone: u8, hemisphere: Hemisphere, projection: TransverseMercator },
    /// UTM with the zone taken from each projected point's longitude.
    UtmPerPoint { hemisphere: Hemisphere },
    TransverseMercator(TransverseMercator),
    Mercator(Mercator),
    Lambert(LambertConformalConic),
}

impl CoordinateConverter {
    /// Build a converter from projection parameters.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::UnsupportedProjection`] for the unknown family, a
    /// non-WGS84 datum, an out-of-range UTM zone, or a missing required
    /// parameter of the other families.
    pub fn new(params: &ProjectionParameters) -> Result<Self, GeoError> {
        check_datum(params.datum.as_deref())?;

        match params.family {
            ProjectionFamily::Geographic => Ok(Self::Geographic),
            ProjectionFamily::Utm => {
                let hemisphere = params.hemisphere.unwrap_or_default();
                let Some(raw) = params.utm_zone else {
                    return Ok(Self::UtmPerPoint { hemisphere });
                };
                let zone = match u8::try_from(raw) {
                    Ok(zone) if (1..=UTM_MAX_ZONE).contains(&zone) => zone,
                    _ => return Err(GeoError::UnsupportedProjection(format!("UTM zone {raw} is outside 1..=60"))),
                };
                Ok(Self::Utm { zone, hemisphere, projection: utm_projection(zone, hemisphere) })
            }
            ProjectionFamily::TransverseMercator => {
                let central_meridian = required(params.central_meridian, "central_meridian", "transverse mercator")?;
                Ok(Self::TransverseMercator(TransverseMercator::new(
                    WGS84,
                    central_meridian,
                    params.latitude_of_origin.unwrap_or(0.0),
                    positive_scale(params.scale_factor)?,
                    params.false_easting.unwrap_or(0.0),
                    params.false_northing.unwrap_or(0.0),
                )))
            }
            ProjectionFamily::Mercator => {
                let central_meridian = required(params.central_meridian, "central_meridian", "mercator")?;
                Ok(Self::Mercator(Mercator::new(
                    WGS84,
                    central_meridian,
                    positive_scale(params.scale_factor)?,
                    params.false_easting.unwrap_or(0.0),
                    params.false_northing.unwrap_or(0.0),
                )))
            }
            ProjectionFamily::LambertConformalConic => {
                let central_meridian = required(params.central_meridian, "central_meridian", "lambert")?;
                let false_easting = params.false_easting.unwrap_or(0.0);
                let false_northing = params.false_northing.unwrap_or(0.0);
                let lcc = match params.standard_parallels {
                    Some((sp1, sp2)) => LambertConformalConic::two_parallel(
                        WGS84,
                        central_meridian,
                        params.latitude_of_origin.unwrap_or(0.0),
                        sp1,
                        sp2,
                        false_easting,
                        false_northing,
                    )?,
                    None => {
                        let origin = required(params.latitude_of_origin, "latitude_of_origin", "lambert")?;
                        LambertConformalConic::one_parallel(
                            WGS84,
                            central_meridian,
                            origin,
                            positive_scale(params.scale_factor)?,
                            false_easting,
                            false_northing,
                        )?
                    }
                };
                Ok(Self::Lambert(lcc))
            }
            ProjectionFamily::Unknown => {
                Err(GeoError::UnsupportedProjection("projection family is not recognized".into()))
            }
        }
    }

    /// Geodetic degrees to projected coordinates.
    #[must_use]
    pub fn to_projected(&self, p: GeodeticPoint) -> ProjectedPoint {
        match self {
            Self::Geographic => ProjectedPoint::new(p.lng, p.lat),
            Self::Utm { projection, .. } | Self::TransverseMercator(projection) => projection.forward(p),
            Self::UtmPerPoint { hemisphere } => utm_projection(utm_zone_for(p.lng), *hemisphere).forward(p),
            Self::Mercator(projection) => projection.forward(p),
            Self::Lambert(projection) => projection.forward(p),
        }
    }

    /// Projected coordinates back to geodetic degrees.
    ///
    /// A per-point UTM converter inverts in [`UTM_REFERENCE_ZONE`].
    #[must_use]
    pub fn to_geodetic(&self, p: ProjectedPoint) -> GeodeticPoint {
        match self {
            Self::Geographic => GeodeticPoint::new(p.y, p.x),
            Self::Utm { projection, .. } | Self::TransverseMercator(projection) => projection.inverse(p),
            Self::UtmPerPoint { hemisphere } => utm_projection(UTM_REFERENCE_ZONE, *hemisphere).inverse(p),
            Self::Mercator(projection) => projection.inverse(p),
            Self::Lambert(projection) => projection.inverse(p),
        }
    }

    /// Family this converter implements.
    #[must_use]
    pub fn family(&self) -> ProjectionFamily {
        match self {
            Self::Geographic => ProjectionFamily::Geographic,
            Self::Utm { .. } | Self::UtmPerPoint { .. } => ProjectionFamily::Utm,
            Self::TransverseMercator(_) => ProjectionFamily::TransverseMercator,
            Self::Mercator(_) => ProjectionFamily::Mercator,
            Self::Lambert(_) => ProjectionFamily::LambertConformalConic,
        }
    }
}

fn check_datum(datum: Option<&str>) -> Result<(), GeoError> {
    let Some(raw) = datum else {
        return Ok(());
    };
    let normalized: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();
    match normalized.as_str() {
        "" | "WGS84" | "WGS1984" => Ok(()),
        _ => Err(GeoError::UnsupportedProjection(format!("datum '{raw}' is not WGS84"))),
    }
}

fn required(value: Option<f64>, name: &str, family: &str) -> Result<f64, GeoError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(GeoError::UnsupportedProjection(format!("{family} {name} is not finite: {v}"))),
        None => Err(GeoError::UnsupportedProjection(format!("{family} requires {name}"))),
    }
}

fn positive_scale(scale: Option<f64>) -> Result<f64, GeoError> {
    let k = scale.unwrap_or(1.0);
    if k.is_finite() && k > 0.0 {
        Ok(k)
    } else {
        Err(GeoError::UnsupportedProjection(format!("scale factor must be positive, got {k}")))
    }
}

/// `((1 - e sin φ) / (1 + e sin φ))^(e/2)`, shared by the conformal projections.
pub(crate) fn conformal_factor(e: f64, phi: f64) -> f64 {
    let es = e * phi.sin();
    ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

/// Invert the isometric-latitude relation `t = tan(π/4 - φ/2) / conformal_factor(φ)` for φ.
pub(crate) fn latitude_from_t(e: f64, t: f64) -> f64 {
    use crate::consts::{LATITUDE_EPSILON, MAX_LATITUDE_ITERATIONS};
    use std::f64::consts::FRAC_PI_2;

    let mut phi = FRAC_PI_2 - 2.0 * t.atan();
    for _ in 0..MAX_LATITUDE_ITERATIONS {
        let next = FRAC_PI_2 - 2.0 * (t * conformal_factor(e, phi)).atan();
        let done = (next - phi).abs() < LATITUDE_EPSILON;
        phi = next;
        if done {
            break;
        }
    }
    phi
}
