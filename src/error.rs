//! Error taxonomy shared by every module.
//!
//! Construction-time failures (fits, projection resolution, control-point
//! validation) and runtime query failures both surface as [`GeoError`].
//! Lenient parse anomalies are not errors; they are counted in
//! [`crate::vector::ParseReport`].

/// Every failure the engine can report.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    /// A caller-supplied value is out of range (non-positive dimension, NaN, degenerate box).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Fewer than three point pairs, or source/destination lengths differ.
    #[error("underdetermined fit: {src} source points, {dst} destination points (need >= 3 of each, equal counts)")]
    UnderdeterminedFit { src: usize, dst: usize },
    /// The georeference record carries fewer than three control points.
    #[error("insufficient control points: found {found}, need at least 3")]
    InsufficientControlPoints { found: usize },
    /// The normal-equation system has a near-zero pivot (collinear or coincident points).
    #[error("singular fit: control points are collinear or coincident")]
    SingularFit,
    /// The affine matrix cannot be inverted.
    #[error("singular transform: determinant {determinant:e} is too close to zero")]
    SingularTransform { determinant: f64 },
    /// The projection family or its parameters cannot build a converter.
    #[error("unsupported projection: {0}")]
    UnsupportedProjection(String),
    /// A pipeline query was issued before a successful `initialize`.
    #[error("pipeline not initialized")]
    NotInitialized,
}
