//! Interaction mode state machine and live measurements.
//!
//! `MapInteraction` owns the points a user has tapped during one viewing
//! session. Plot and Measure collect an ordered list; View and Identify keep a
//! single marker. Every mode change starts from an empty point list so a shape
//! never mixes taps from two modes.
//!
//! Measurements are planar over `x`/`y` in whatever units the points are in;
//! `z` is carried through but not measured.

#[cfg(test)]
#[path = "interaction_test.rs"]
mod interaction_test;

use serde::Serialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::snap::{SnapIndexHandle, SnapOutcome};
use crate::vector::Position;

/// Top-level interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    /// Browse the map; a tap drops a single marker.
    #[default]
    View,
    /// Collect an ordered feature outline.
    Plot,
    /// Collect points for a distance or area measurement.
    Measure,
    /// Tap a feature to inspect it; a tap drops a single marker.
    Identify,
}

impl InteractionMode {
    /// Whether taps append to the ordered point list.
    #[must_use]
    pub fn collects_points(self) -> bool {
        matches!(self, Self::Plot | Self::Measure)
    }
}

/// What Measure mode is measuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureSubMode {
    #[default]
    Distance,
    Area,
}

/// Derived measurement, recomputed from the current points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LiveMeasurement {
    pub distance: f64,
    pub area: f64,
    pub perimeter: f64,
    pub point_count: usize,
}

/// Points and measurement handed back by [`MapInteraction::finish`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedShape {
    pub mode: InteractionMode,
    pub sub_mode: MeasureSubMode,
    pub points: Vec<Position>,
    pub measurement: LiveMeasurement,
    pub closed: bool,
}

/// Session-scoped interaction state.
#[derive(Debug, Clone)]
pub struct MapInteraction {
    mode: InteractionMode,
    sub_mode: MeasureSubMode,
    points: Vec<Position>,
    marker: Option<Position>,
    close_threshold: f64,
    snap_radius: f64,
}

impl Default for MapInteraction {
    fn default() -> Self {
        Self::new(crate::consts::DEFAULT_CLOSE_THRESHOLD)
    }
}

impl MapInteraction {
    /// Start in View mode; `close_threshold` is used by [`Self::finish`].
    #[must_use]
    pub fn new(close_threshold: f64) -> Self {
        Self {
            mode: InteractionMode::View,
            sub_mode: MeasureSubMode::Distance,
            points: Vec::new(),
            marker: None,
            close_threshold,
            snap_radius: crate::consts::DEFAULT_SNAP_RADIUS,
        }
    }

    /// Start in View mode with the close threshold and snap radius from `config`.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self { snap_radius: config.snap_radius, ..Self::new(config.close_threshold) }
    }

    /// Radius used by [`Self::add_snapped_tap`].
    #[must_use]
    pub fn snap_radius(&self) -> f64 {
        self.snap_radius
    }

    #[must_use]
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    #[must_use]
    pub fn sub_mode(&self) -> MeasureSubMode {
        self.sub_mode
    }

    /// Ordered points collected in Plot or Measure.
    #[must_use]
    pub fn points(&self) -> &[Position] {
        &self.points
    }

    /// Single marker dropped in View or Identify.
    #[must_use]
    pub fn marker(&self) -> Option<Position> {
        self.marker
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Switch mode. Always clears the points and the marker, even for the same mode.
    pub fn set_mode(&mut self, mode: InteractionMode) {
        debug!(from = ?self.mode, to = ?mode, dropped = self.points.len(), "interaction mode changed");
        self.mode = mode;
        self.points.clear();
        self.marker = None;
    }

    /// Switch measure sub-mode. Clears the points.
    pub fn set_sub_mode(&mut self, sub_mode: MeasureSubMode) {
        self.sub_mode = sub_mode;
        self.points.clear();
    }

    /// Record a tap.
    pub fn add_point(&mut self, x: f64, y: f64, z: f64) {
        let p = Position::new(x, y, z);
        if self.mode.collects_points() {
            self.points.push(p);
        } else {
            self.marker = Some(p);
        }
    }

    /// Record a tap, moved onto the nearest snap target within `radius` when there is one.
    ///
    /// The raw tap is used for [`SnapOutcome::NotReady`] and [`SnapOutcome::NoMatch`].
    pub fn add_snapped_point(&mut self, x: f64, y: f64, z: f64, snap: &SnapIndexHandle, radius: f64) -> SnapOutcome {
        let outcome = snap.query(x, y, radius);
        match outcome {
            SnapOutcome::Snapped(hit) => self.add_point(hit.x, hit.y, z),
            SnapOutcome::NotReady | SnapOutcome::NoMatch => self.add_point(x, y, z),
        }
        outcome
    }

    /// [`Self::add_snapped_point`] with this session's snap radius.
    pub fn add_snapped_tap(&mut self, x: f64, y: f64, z: f64, snap: &SnapIndexHandle) -> SnapOutcome {
        self.add_snapped_point(x, y, z, snap, self.snap_radius)
    }

    /// Remove the last collected point. No-op when empty.
    pub fn undo(&mut self) {
        self.points.pop();
    }

    /// Drop the points and marker, keeping the mode.
    pub fn clear(&mut self) {
        self.points.clear();
        self.marker = None;
    }

    /// Hand back the collected shape and start over in the same mode.
    ///
    /// Returns `None` when no points were collected.
    pub fn finish(&mut self) -> Option<CompletedShape> {
        if self.points.is_empty() {
            return None;
        }
        let shape = CompletedShape {
            mode: self.mode,
            sub_mode: self.sub_mode,
            measurement: self.live_measurement(),
            closed: self.is_closed(self.close_threshold),
            points: std::mem::take(&mut self.points),
        };
        debug!(mode = ?shape.mode, points = shape.points.len(), closed = shape.closed, "shape finished");
        Some(shape)
    }

    // =========================================================================
    // MEASUREMENT
    // =========================================================================

    /// Sum of consecutive segment lengths; 0 for fewer than 2 points.
    #[must_use]
    pub fn compute_distance(&self) -> f64 {
        self.points.windows(2).map(|w| planar_distance(w[0], w[1])).sum()
    }

    /// Shoelace area; 0 for fewer than 3 points.
    #[must_use]
    pub fn compute_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let p = self.points[i];
                let q = self.points[(i + 1) % n];
                p.x * q.y - q.x * p.y
            })
            .sum();
        twice.abs() / 2.0
    }

    /// Distance plus the closing segment once there are at least 3 points.
    #[must_use]
    pub fn compute_perimeter(&self) -> f64 {
        let distance = self.compute_distance();
        match self.points.as_slice() {
            [first, .., last] if self.points.len() >= 3 => distance + planar_distance(*first, *last),
            _ => distance,
        }
    }

    /// At least 3 points and the last within `threshold` of the first.
    #[must_use]
    pub fn is_closed(&self, threshold: f64) -> bool {
        match self.points.as_slice() {
            [first, .., last] if self.points.len() >= 3 => planar_distance(*first, *last) < threshold,
            _ => false,
        }
    }

    /// Measurement appropriate to the current mode.
    #[must_use]
    pub fn live_measurement(&self) -> LiveMeasurement {
        let point_count = self.points.len();
        match (self.mode, self.sub_mode) {
            (InteractionMode::Measure, MeasureSubMode::Distance) => {
                LiveMeasurement { distance: self.compute_distance(), point_count, ..LiveMeasurement::default() }
            }
            (InteractionMode::Measure, MeasureSubMode::Area) | (InteractionMode::Plot, _) => LiveMeasurement {
                distance: self.compute_distance(),
                area: self.compute_area(),
                perimeter: self.compute_perimeter(),
                point_count,
            },
            (InteractionMode::View | InteractionMode::Identify, _) => {
                LiveMeasurement { point_count, ..LiveMeasurement::default() }
            }
        }
    }
}

fn planar_distance(a: Position, b: Position) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}
