//! Georeference record handed over by the document metadata reader.
//!
//! The record is plain data: control points, projection parameters and page
//! size in document points. [`GeoreferenceRecord::validate`] checks what can be
//! checked without building a converter; the pipeline does the rest.

#[cfg(test)]
#[path = "georef_test.rs"]
mod georef_test;

use serde::{Deserialize, Serialize};

use crate::consts::MIN_CONTROL_POINTS;
use crate::coords::{ControlPointPair, GeodeticPoint, WorldPoint};
use crate::crs::ProjectionParameters;
use crate::error::GeoError;

/// Everything needed to calibrate one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoreferenceRecord {
    pub control_points: Vec<ControlPointPair>,
    pub projection: ProjectionParameters,
    /// Page width in document points.
    pub page_width: f64,
    /// Page height in document points.
    pub page_height: f64,
}

impl GeoreferenceRecord {
    #[must_use]
    pub fn new(
        control_points: Vec<ControlPointPair>,
        projection: ProjectionParameters,
        page_width: f64,
        page_height: f64,
    ) -> Self {
        Self { control_points, projection, page_width, page_height }
    }

    /// Decode a record from the metadata reader's JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] carrying the decoder message.
    pub fn from_json(text: &str) -> Result<Self, GeoError> {
        serde_json::from_str(text).map_err(|e| GeoError::InvalidInput(format!("georeference record: {e}")))
    }

    /// Check control-point count, coordinate finiteness, and page size.
    ///
    /// # Errors
    ///
    /// - [`GeoError::InsufficientControlPoints`] for fewer than 3 pairs.
    /// - [`GeoError::InvalidInput`] for a non-finite coordinate or a non-positive page dimension.
    pub fn validate(&self) -> Result<(), GeoError> {
        let found = self.control_points.len();
        if found < MIN_CONTROL_POINTS {
            return Err(GeoError::InsufficientControlPoints { found });
        }
        if let Some(i) = self
            .control_points
            .iter()
            .position(|p| !p.world.is_finite() || !p.document.x.is_finite() || !p.document.y.is_finite())
        {
            return Err(GeoError::InvalidInput(format!("control point {i} has a non-finite coordinate")));
        }
        for (name, value) in [("page_width", self.page_width), ("page_height", self.page_height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GeoError::InvalidInput(format!("{name} must be positive, got {value}")));
            }
        }
        Ok(())
    }

    /// Mean of the geodetic control points, if any are geodetic.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn geodetic_centroid(&self) -> Option<GeodeticPoint> {
        let fixes: Vec<GeodeticPoint> = self
            .control_points
            .iter()
            .filter_map(|p| match p.world {
                WorldPoint::Geodetic(g) => Some(g),
                WorldPoint::Projected(_) => None,
            })
            .collect();
        if fixes.is_empty() {
            return None;
        }
        let n = fixes.len() as f64;
        Some(GeodeticPoint::new(
            fixes.iter().map(|g| g.lat).sum::<f64>() / n,
            fixes.iter().map(|g| g.lng).sum::<f64>() / n,
        ))
    }

    /// Projection parameters with a missing UTM zone or hemisphere filled in
    /// from the geodetic control points.
    #[must_use]
    pub fn resolved_projection(&self) -> ProjectionParameters {
        match self.geodetic_centroid() {
            Some(reference) => self.projection.clone().with_utm_zone_for(reference),
            None => self.projection.clone(),
        }
    }
}
