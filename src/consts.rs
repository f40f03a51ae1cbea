//! Shared numeric constants for the surveymap crate.

// ── Ellipsoid ───────────────────────────────────────────────────

/// WGS84 semi-major axis in meters.
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS84 inverse flattening.
pub const WGS84_INV_F: f64 = 298.257_223_563;

// ── UTM ─────────────────────────────────────────────────────────

/// UTM central scale factor.
pub const UTM_K0: f64 = 0.9996;

/// UTM false easting in meters.
pub const UTM_FALSE_EASTING: f64 = 500_000.0;

/// False northing added in the southern hemisphere, in meters.
pub const UTM_SOUTH_FALSE_NORTHING: f64 = 10_000_000.0;

/// Highest valid UTM zone number.
pub const UTM_MAX_ZONE: u8 = 60;

/// Zone used to invert a UTM converter that has no forced zone (central meridian 3°E).
pub const UTM_REFERENCE_ZONE: u8 = 31;

// ── Numerics ────────────────────────────────────────────────────

/// Pivot / determinant magnitude below which a matrix is treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-12;

/// Convergence tolerance (radians) for iterative latitude inversions.
pub const LATITUDE_EPSILON: f64 = 1e-12;

/// Iteration cap for iterative latitude inversions.
pub const MAX_LATITUDE_ITERATIONS: usize = 15;

/// Minimum number of control points for an affine fit.
pub const MIN_CONTROL_POINTS: usize = 3;

// ── Rendering ───────────────────────────────────────────────────

/// Points per inch in document space; `render_scale = dpi / POINTS_PER_INCH`.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Output DPI used when none is configured.
pub const DEFAULT_RENDER_DPI: f64 = 144.0;

// ── Interaction ─────────────────────────────────────────────────

/// Default first-to-last distance under which a shape counts as closed.
pub const DEFAULT_CLOSE_THRESHOLD: f64 = 5.0;

/// Default snap radius in document units.
pub const DEFAULT_SNAP_RADIUS: f64 = 12.0;

/// Default snap grid cell size in document units.
pub const DEFAULT_SNAP_CELL_SIZE: f64 = 12.0;
