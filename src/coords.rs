//! Point types for each coordinate space.
//!
//! Every space gets its own type so a projected easting can never be passed
//! where a document coordinate is expected:
//!
//! - [`GeodeticPoint`]: WGS84 degrees.
//! - [`ProjectedPoint`]: meters in a projected CRS.
//! - [`DocumentPoint`]: page space, origin bottom-left, Y up.
//! - [`PixelPoint`]: rendered bitmap pixels, origin top-left, Y down.
//! - [`ScreenPoint`]: device pixels after pan/zoom.

#[cfg(test)]
#[path = "coords_test.rs"]
mod coords_test;

use serde::{Deserialize, Serialize};

/// WGS84 latitude/longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeodeticPoint {
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Easting/northing in meters (or degrees for the geographic family).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}

impl ProjectedPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other` in CRS units.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Position on the document page (bottom-left origin, Y up).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentPoint {
    pub x: f64,
    pub y: f64,
}

impl DocumentPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Position in the rendered bitmap (top-left origin, Y down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Device pixel after pan and zoom have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Real-world side of a control point: either a GPS fix or an already projected coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorldPoint {
    Geodetic(GeodeticPoint),
    Projected(ProjectedPoint),
}

impl WorldPoint {
    /// Whether every coordinate is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Geodetic(p) => p.lat.is_finite() && p.lng.is_finite(),
            Self::Projected(p) => p.x.is_finite() && p.y.is_finite(),
        }
    }
}

/// A matched (real-world, document) pair used to calibrate the affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPointPair {
    pub world: WorldPoint,
    pub document: DocumentPoint,
}

impl ControlPointPair {
    #[must_use]
    pub fn new(world: WorldPoint, document: DocumentPoint) -> Self {
        Self { world, document }
    }

    /// Pair a GPS fix with a document position.
    #[must_use]
    pub fn geodetic(lat: f64, lng: f64, doc_x: f64, doc_y: f64) -> Self {
        Self::new(WorldPoint::Geodetic(GeodeticPoint::new(lat, lng)), DocumentPoint::new(doc_x, doc_y))
    }

    /// Pair a projected coordinate with a document position.
    #[must_use]
    pub fn projected(x: f64, y: f64, doc_x: f64, doc_y: f64) -> Self {
        Self::new(WorldPoint::Projected(ProjectedPoint::new(x, y)), DocumentPoint::new(doc_x, doc_y))
    }
}
