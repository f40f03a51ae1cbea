//! Engine defaults parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use crate::consts::{DEFAULT_CLOSE_THRESHOLD, DEFAULT_RENDER_DPI, DEFAULT_SNAP_CELL_SIZE, DEFAULT_SNAP_RADIUS};
use crate::error::GeoError;

pub const RENDER_DPI_VAR: &str = "SURVEYMAP_RENDER_DPI";
pub const SNAP_RADIUS_VAR: &str = "SURVEYMAP_SNAP_RADIUS";
pub const SNAP_CELL_SIZE_VAR: &str = "SURVEYMAP_SNAP_CELL_SIZE";
pub const CLOSE_THRESHOLD_VAR: &str = "SURVEYMAP_CLOSE_THRESHOLD";

/// Tunables shared by the pipeline, snap index, and interaction state machine.
///
/// Consumed by [`GeoTransformPipeline::from_config`](crate::pipeline::GeoTransformPipeline::from_config),
/// [`spawn_geometry_load`](crate::worker::spawn_geometry_load) and
/// [`MapInteraction::from_config`](crate::interaction::MapInteraction::from_config).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Output DPI used to derive the pixel render scale.
    pub render_dpi: f64,
    /// Default snap radius in document units.
    pub snap_radius: f64,
    /// Grid cell size for the snap index.
    pub snap_cell_size: f64,
    /// First-to-last distance under which a shape counts as closed.
    pub close_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            render_dpi: DEFAULT_RENDER_DPI,
            snap_radius: DEFAULT_SNAP_RADIUS,
            snap_cell_size: DEFAULT_SNAP_CELL_SIZE,
            close_threshold: DEFAULT_CLOSE_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `SURVEYMAP_RENDER_DPI`: default 144
    /// - `SURVEYMAP_SNAP_RADIUS`: default 12
    /// - `SURVEYMAP_SNAP_CELL_SIZE`: default 12
    /// - `SURVEYMAP_CLOSE_THRESHOLD`: default 5
    ///
    /// Unparseable values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            render_dpi: env_parse(RENDER_DPI_VAR, DEFAULT_RENDER_DPI),
            snap_radius: env_parse(SNAP_RADIUS_VAR, DEFAULT_SNAP_RADIUS),
            snap_cell_size: env_parse(SNAP_CELL_SIZE_VAR, DEFAULT_SNAP_CELL_SIZE),
            close_threshold: env_parse(CLOSE_THRESHOLD_VAR, DEFAULT_CLOSE_THRESHOLD),
        }
    }

    /// Reject non-positive or non-finite values.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] naming the first bad field.
    pub fn validate(&self) -> Result<(), GeoError> {
        for (name, value) in [
            ("render_dpi", self.render_dpi),
            ("snap_radius", self.snap_radius),
            ("snap_cell_size", self.snap_cell_size),
            ("close_threshold", self.close_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GeoError::InvalidInput(format!("{name} must be positive, got {value}")));
            }
        }
        Ok(())
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
