//! GPS <-> pixel <-> screen coordinate pipeline.
//!
//! DESIGN
//! ======
//! A successful [`GeoTransformPipeline::initialize`] builds one immutable
//! [`PipelineSnapshot`] (converter, fitted transform and its inverse, page
//! size, render scale) and swaps it in behind an `RwLock<Option<Arc<_>>>`.
//! The lock guards only the pointer: queries clone the `Arc` and run their
//! math outside the lock, so a reader sees the old snapshot or the new one,
//! never a mix. A failed initialize leaves the published snapshot untouched.
//!
//! Coordinate chain, forward:
//!
//! ```text
//! geodetic --crs--> projected --affine--> document (Y up)
//!          --flip+scale--> pixel (Y down) --pan/zoom--> screen
//! ```
//!
//! The Y flip happens exactly once, between document and pixel space:
//! `px = doc_x * s`, `py = (page_height - doc_y) * s`, with `s = dpi / 72`.

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::affine::{self, AffineTransform, Calibration};
use crate::consts::{DEFAULT_RENDER_DPI, POINTS_PER_INCH};
use crate::config::EngineConfig;
use crate::coords::{DocumentPoint, GeodeticPoint, PixelPoint, ProjectedPoint, ScreenPoint, WorldPoint};
use crate::crs::CoordinateConverter;
use crate::error::GeoError;
use crate::georef::GeoreferenceRecord;

// =============================================================================
// PAN / ZOOM
// =============================================================================

/// Viewport state supplied by the gesture layer: `screen = pixel * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PanZoom {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for PanZoom {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

impl PanZoom {
    #[must_use]
    pub fn new(pan_x: f64, pan_y: f64, zoom: f64) -> Self {
        Self { pan_x, pan_y, zoom }
    }

    fn check(&self) -> Result<(), GeoError> {
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(GeoError::InvalidInput(format!("zoom must be positive, got {}", self.zoom)));
        }
        if !self.pan_x.is_finite() || !self.pan_y.is_finite() {
            return Err(GeoError::InvalidInput("pan offset must be finite".into()));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for a non-positive zoom or non-finite pan.
    pub fn pixel_to_screen(&self, p: PixelPoint) -> Result<ScreenPoint, GeoError> {
        self.check()?;
        Ok(ScreenPoint::new(p.x * self.zoom + self.pan_x, p.y * self.zoom + self.pan_y))
    }

    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for a non-positive zoom or non-finite pan.
    pub fn screen_to_pixel(&self, s: ScreenPoint) -> Result<PixelPoint, GeoError> {
        self.check()?;
        Ok(PixelPoint::new((s.x - self.pan_x) / self.zoom, (s.y - self.pan_y) / self.zoom))
    }
}

/// Every intermediate value of one forward conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DebugTrace {
    pub input: GeodeticPoint,
    pub projected: ProjectedPoint,
    pub document: DocumentPoint,
    pub pixel: PixelPoint,
}

fn require_finite(what: &str, values: [f64; 2]) -> Result<(), GeoError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(GeoError::InvalidInput(format!("{what} must be finite, got {values:?}")))
    }
}

fn render_scale_for(dpi: f64) -> Result<f64, GeoError> {
    if !dpi.is_finite() || dpi <= 0.0 {
        return Err(GeoError::InvalidInput(format!("render dpi must be positive, got {dpi}")));
    }
    Ok(dpi / POINTS_PER_INCH)
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// One immutable, fully calibrated view of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSnapshot {
    converter: CoordinateConverter,
    forward: AffineTransform,
    inverse: AffineTransform,
    render_scale: f64,
    page_width: f64,
    page_height: f64,
    rms_error: f64,
    control_point_count: usize,
}

impl PipelineSnapshot {
    /// Validate `record`, build its converter, and fit projected -> document.
    ///
    /// # Errors
    ///
    /// - [`GeoError::InsufficientControlPoints`] for fewer than 3 control points.
    /// - [`GeoError::InvalidInput`] for bad page size, non-finite inputs, or a bad `render_dpi`.
    /// - [`GeoError::UnsupportedProjection`] when no converter can be built.
    /// - [`GeoError::SingularFit`] / [`GeoError::SingularTransform`] for degenerate control points.
    pub fn build(record: &GeoreferenceRecord, render_dpi: f64) -> Result<Self, GeoError> {
        let render_scale = render_scale_for(render_dpi)?;
        record.validate()?;
        let converter = CoordinateConverter::new(&record.resolved_projection())?;

        let world: Vec<[f64; 2]> = record
            .control_points
            .iter()
            .map(|pair| {
                let p = match pair.world {
                    WorldPoint::Geodetic(g) => converter.to_projected(g),
                    WorldPoint::Projected(p) => p,
                };
                [p.x, p.y]
            })
            .collect();
        let document: Vec<[f64; 2]> = record.control_points.iter().map(|pair| [pair.document.x, pair.document.y]).collect();

        let forward = affine::fit(&world, &document).map_err(|e| match e {
            GeoError::UnderdeterminedFit { src, .. } => GeoError::InsufficientControlPoints { found: src },
            other => other,
        })?;
        let inverse = forward.invert()?;

        Ok(Self {
            converter,
            forward,
            inverse,
            render_scale,
            page_width: record.page_width,
            page_height: record.page_height,
            rms_error: forward.rms_error(&world, &document),
            control_point_count: world.len(),
        })
    }

    /// Copy of this snapshot with a different output DPI.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for a non-positive or non-finite `dpi`.
    pub fn with_render_dpi(&self, dpi: f64) -> Result<Self, GeoError> {
        Ok(Self { render_scale: render_scale_for(dpi)?, ..self.clone() })
    }

    // ── Accessors ───────────────────────────────────────────────

    #[must_use]
    pub fn converter(&self) -> &CoordinateConverter {
        &self.converter
    }

    /// Fitted projected -> document transform.
    #[must_use]
    pub fn transform(&self) -> &AffineTransform {
        &self.forward
    }

    /// Pixels per document point (`dpi / 72`).
    #[must_use]
    pub fn render_scale(&self) -> f64 {
        self.render_scale
    }

    #[must_use]
    pub fn page_width(&self) -> f64 {
        self.page_width
    }

    #[must_use]
    pub fn page_height(&self) -> f64 {
        self.page_height
    }

    /// RMS residual of the fit over the control points, in document points.
    #[must_use]
    pub fn rms_error(&self) -> f64 {
        self.rms_error
    }

    #[must_use]
    pub fn control_point_count(&self) -> usize {
        self.control_point_count
    }

    // ── Document <-> pixel ──────────────────────────────────────

    #[must_use]
    pub fn document_to_pixel(&self, d: DocumentPoint) -> PixelPoint {
        PixelPoint::new(d.x * self.render_scale, (self.page_height - d.y) * self.render_scale)
    }

    #[must_use]
    pub fn pixel_to_document(&self, p: PixelPoint) -> DocumentPoint {
        DocumentPoint::new(p.x / self.render_scale, self.page_height - p.y / self.render_scale)
    }

    // ── Queries ─────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for a non-finite input.
    pub fn gps_to_pixel(&self, p: GeodeticPoint) -> Result<PixelPoint, GeoError> {
        Ok(self.debug_trace(p)?.pixel)
    }

    /// Undo scale and flip, then the affine fit. Stops short of the CRS inverse.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for a non-finite input.
    pub fn pixel_to_projected(&self, p: PixelPoint) -> Result<ProjectedPoint, GeoError> {
        require_finite("pixel", [p.x, p.y])?;
        let d = self.pixel_to_document(p);
        let (x, y) = self.inverse.apply(d.x, d.y);
        Ok(ProjectedPoint::new(x, y))
    }

    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for a non-finite input.
    pub fn pixel_to_gps(&self, p: PixelPoint) -> Result<GeodeticPoint, GeoError> {
        Ok(self.converter.to_geodetic(self.pixel_to_projected(p)?))
    }

    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for a non-finite input or a bad viewport.
    pub fn gps_to_screen(&self, p: GeodeticPoint, view: &PanZoom) -> Result<ScreenPoint, GeoError> {
        view.pixel_to_screen(self.gps_to_pixel(p)?)
    }

    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for a non-finite input or a bad viewport.
    pub fn screen_to_gps(&self, s: ScreenPoint, view: &PanZoom) -> Result<GeodeticPoint, GeoError> {
        self.pixel_to_gps(view.screen_to_pixel(s)?)
    }

    /// Forward conversion keeping every intermediate value.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for a non-finite input.
    pub fn debug_trace(&self, input: GeodeticPoint) -> Result<DebugTrace, GeoError> {
        require_finite("geodetic point", [input.lat, input.lng])?;
        let projected = self.converter.to_projected(input);
        let (dx, dy) = self.forward.apply(projected.x, projected.y);
        let document = DocumentPoint::new(dx, dy);
        Ok(DebugTrace { input, projected, document, pixel: self.document_to_pixel(document) })
    }

    /// Distance between two pixel positions measured in projected CRS units.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for a non-finite input.
    pub fn projected_distance(&self, a: PixelPoint, b: PixelPoint) -> Result<f64, GeoError> {
        Ok(self.pixel_to_projected(a)?.distance_to(self.pixel_to_projected(b)?))
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Shared, swappable pipeline. Clones share the same published snapshot.
#[derive(Debug, Clone)]
pub struct GeoTransformPipeline {
    slot: Arc<RwLock<Option<Arc<PipelineSnapshot>>>>,
    default_dpi: f64,
}

impl Default for GeoTransformPipeline {
    fn default() -> Self {
        Self { slot: Arc::new(RwLock::new(None)), default_dpi: DEFAULT_RENDER_DPI }
    }
}

impl GeoTransformPipeline {
    /// Uninitialized pipeline; `render_dpi` applies to the first snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for a non-positive or non-finite `render_dpi`.
    pub fn new(render_dpi: f64) -> Result<Self, GeoError> {
        render_scale_for(render_dpi)?;
        Ok(Self { default_dpi: render_dpi, ..Self::default() })
    }

    /// Uninitialized pipeline rendering at `config.render_dpi`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] when `config` fails [`EngineConfig::validate`].
    pub fn from_config(config: &EngineConfig) -> Result<Self, GeoError> {
        config.validate()?;
        Self::new(config.render_dpi)
    }

    /// Fit `record` and publish the result.
    ///
    /// A re-initialize keeps the render scale of the current snapshot. On any
    /// error the current snapshot stays published.
    ///
    /// # Errors
    ///
    /// See [`PipelineSnapshot::build`].
    pub fn initialize(&self, record: &GeoreferenceRecord) -> Result<(), GeoError> {
        match PipelineSnapshot::build(record, self.default_dpi) {
            Ok(mut snapshot) => {
                // Render scale is read under the publishing lock.
                let mut slot = self.slot.write();
                if let Some(current) = slot.as_ref() {
                    snapshot.render_scale = current.render_scale;
                }
                info!(
                    family = ?snapshot.converter().family(),
                    control_points = snapshot.control_point_count(),
                    rms_error = snapshot.rms_error(),
                    render_scale = snapshot.render_scale(),
                    "pipeline initialized"
                );
                *slot = Some(Arc::new(snapshot));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, control_points = record.control_points.len(), "georeference rejected; keeping current snapshot");
                Err(e)
            }
        }
    }

    /// Publish a copy of the current snapshot with a new output DPI.
    ///
    /// # Errors
    ///
    /// - [`GeoError::InvalidInput`] for a non-positive or non-finite `dpi`.
    /// - [`GeoError::NotInitialized`] before a successful initialize.
    pub fn set_render_scale(&self, dpi: f64) -> Result<(), GeoError> {
        render_scale_for(dpi)?;
        let mut slot = self.slot.write();
        let current = slot.as_ref().ok_or(GeoError::NotInitialized)?;
        let next = current.with_render_dpi(dpi)?;
        debug!(dpi, render_scale = next.render_scale(), "render scale updated");
        *slot = Some(Arc::new(next));
        Ok(())
    }

    /// Drop the published snapshot. Later queries fail with [`GeoError::NotInitialized`].
    pub fn reset(&self) {
        *self.slot.write() = None;
        info!("pipeline reset");
    }

    /// The current snapshot, for several queries against one consistent view.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<PipelineSnapshot>> {
        self.slot.read().clone()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.slot.read().is_some()
    }

    /// The fitted transform, or [`Calibration::Uncalibrated`] before initialize.
    #[must_use]
    pub fn calibration(&self) -> Calibration {
        match self.snapshot() {
            Some(s) => Calibration::Calibrated(*s.transform()),
            None => Calibration::Uncalibrated,
        }
    }

    fn current(&self) -> Result<Arc<PipelineSnapshot>, GeoError> {
        self.snapshot().ok_or(GeoError::NotInitialized)
    }

    // ── Queries ─────────────────────────────────────────────────

    /// # Errors
    ///
    /// [`GeoError::NotInitialized`] before initialize; otherwise see [`PipelineSnapshot::gps_to_pixel`].
    pub fn gps_to_pixel(&self, p: GeodeticPoint) -> Result<PixelPoint, GeoError> {
        self.current()?.gps_to_pixel(p)
    }

    /// # Errors
    ///
    /// [`GeoError::NotInitialized`] before initialize; otherwise see [`PipelineSnapshot::pixel_to_projected`].
    pub fn pixel_to_projected(&self, p: PixelPoint) -> Result<ProjectedPoint, GeoError> {
        self.current()?.pixel_to_projected(p)
    }

    /// # Errors
    ///
    /// [`GeoError::NotInitialized`] before initialize; otherwise see [`PipelineSnapshot::pixel_to_gps`].
    pub fn pixel_to_gps(&self, p: PixelPoint) -> Result<GeodeticPoint, GeoError> {
        self.current()?.pixel_to_gps(p)
    }

    /// # Errors
    ///
    /// [`GeoError::NotInitialized`] before initialize; otherwise see [`PipelineSnapshot::gps_to_screen`].
    pub fn gps_to_screen(&self, p: GeodeticPoint, view: &PanZoom) -> Result<ScreenPoint, GeoError> {
        self.current()?.gps_to_screen(p, view)
    }

    /// # Errors
    ///
    /// [`GeoError::NotInitialized`] before initialize; otherwise see [`PipelineSnapshot::screen_to_gps`].
    pub fn screen_to_gps(&self, s: ScreenPoint, view: &PanZoom) -> Result<GeodeticPoint, GeoError> {
        self.current()?.screen_to_gps(s, view)
    }

    /// # Errors
    ///
    /// [`GeoError::NotInitialized`] before initialize; otherwise see [`PipelineSnapshot::debug_trace`].
    pub fn debug_trace(&self, p: GeodeticPoint) -> Result<DebugTrace, GeoError> {
        self.current()?.debug_trace(p)
    }

    /// # Errors
    ///
    /// [`GeoError::NotInitialized`] before initialize; otherwise see [`PipelineSnapshot::projected_distance`].
    pub fn projected_distance(&self, a: PixelPoint, b: PixelPoint) -> Result<f64, GeoError> {
        self.current()?.projected_distance(a, b)
    }
}
