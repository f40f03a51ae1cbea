//! Least-squares affine fitting and the invertible 2-D affine transform.
//!
//! DESIGN
//! ======
//! `fit` solves two independent 3-unknown normal-equation systems, one per
//! destination axis:
//!
//! ```text
//! dst_x = a * src_x + b * src_y + tx
//! dst_y = c * src_x + d * src_y + ty
//! ```
//!
//! Source points are centered on their mean and scaled to unit RMS radius
//! before the sums are accumulated. Control points are typically UTM
//! eastings/northings (1e5..1e7 m) spread over a few hundred meters, and the
//! raw normal matrix for such inputs loses most of its significant digits.
//! The normalization is undone on the solved coefficients, so the result is
//! the same least-squares solution.
//!
//! Each 3x3 system is solved by Gaussian elimination with partial pivoting;
//! a pivot below [`SINGULAR_EPSILON`] is a [`GeoError::SingularFit`].

#[cfg(test)]
#[path = "affine_test.rs"]
mod affine_test;

use serde::{Deserialize, Serialize};

use crate::consts::{MIN_CONTROL_POINTS, SINGULAR_EPSILON};
use crate::error::GeoError;

// =============================================================================
// TRANSFORM
// =============================================================================

/// Immutable 2x3 affine matrix `[a b tx; c d ty]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    a: f64,
    b: f64,
    tx: f64,
    c: f64,
    d: f64,
    ty: f64,
}

impl AffineTransform {
    #[must_use]
    pub fn new(a: f64, b: f64, tx: f64, c: f64, d: f64, ty: f64) -> Self {
        Self { a, b, tx, c, d, ty }
    }

    #[must_use]
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    /// Coefficients in `[a, b, tx, c, d, ty]` order.
    #[must_use]
    pub fn coefficients(&self) -> [f64; 6] {
        [self.a, self.b, self.tx, self.c, self.d, self.ty]
    }

    #[must_use]
    pub fn a(&self) -> f64 {
        self.a
    }

    #[must_use]
    pub fn b(&self) -> f64 {
        self.b
    }

    #[must_use]
    pub fn tx(&self) -> f64 {
        self.tx
    }

    #[must_use]
    pub fn c(&self) -> f64 {
        self.c
    }

    #[must_use]
    pub fn d(&self) -> f64 {
        self.d
    }

    #[must_use]
    pub fn ty(&self) -> f64 {
        self.ty
    }

    /// Determinant of the 2x2 linear block, `ad - bc`.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Map `(x, y)` to `(a x + b y + tx, c x + d y + ty)`.
    #[must_use]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.b * y + self.tx, self.c * x + self.d * y + self.ty)
    }

    /// Exact inverse from the 2x2 block determinant.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::SingularTransform`] when `|det| < 1e-12`.
    pub fn invert(&self) -> Result<Self, GeoError> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
            return Err(GeoError::SingularTransform { determinant: det });
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Ok(Self { a, b, tx: -(a * self.tx + b * self.ty), c, d, ty: -(c * self.tx + d * self.ty) })
    }

    /// The transform that applies `first`, then `self`.
    #[must_use]
    pub fn compose(&self, first: &Self) -> Self {
        Self {
            a: self.a * first.a + self.b * first.c,
            b: self.a * first.b + self.b * first.d,
            tx: self.a * first.tx + self.b * first.ty + self.tx,
            c: self.c * first.a + self.d * first.c,
            d: self.c * first.b + self.d * first.d,
            ty: self.c * first.tx + self.d * first.ty + self.ty,
        }
    }

    /// Euclidean distance between `apply(src[i])` and `dst[i]` for every pair.
    ///
    /// Extra points in the longer slice are ignored.
    #[must_use]
    pub fn residuals(&self, src: &[[f64; 2]], dst: &[[f64; 2]]) -> Vec<f64> {
        src.iter()
            .zip(dst)
            .map(|(s, t)| {
                let (x, y) = self.apply(s[0], s[1]);
                (x - t[0]).hypot(y - t[1])
            })
            .collect()
    }

    /// Root-mean-square of [`Self::residuals`]; 0 for empty input.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rms_error(&self, src: &[[f64; 2]], dst: &[[f64; 2]]) -> f64 {
        let residuals = self.residuals(src, dst);
        if residuals.is_empty() {
            return 0.0;
        }
        (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt()
    }
}

// =============================================================================
// CALIBRATION
// =============================================================================

/// Whether a document has a real fitted transform.
///
/// There is deliberately no identity fallback: un-calibrated coordinates are
/// never passed off as transformed ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Calibration {
    Calibrated(AffineTransform),
    Uncalibrated,
}

impl Calibration {
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        matches!(self, Self::Calibrated(_))
    }

    #[must_use]
    pub fn transform(&self) -> Option<&AffineTransform> {
        match self {
            Self::Calibrated(t) => Some(t),
            Self::Uncalibrated => None,
        }
    }
}

// =============================================================================
// FITTING
// =============================================================================

/// Least-squares affine fit mapping `src[i]` onto `dst[i]`.
///
/// # Errors
///
/// - [`GeoError::UnderdeterminedFit`] when fewer than 3 pairs or the lengths differ.
/// - [`GeoError::SingularFit`] when the source points are collinear or coincident.
#[allow(clippy::cast_precision_loss)]
pub fn fit(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<AffineTransform, GeoError> {
    if src.len() != dst.len() || src.len() < MIN_CONTROL_POINTS {
        return Err(GeoError::UnderdeterminedFit { src: src.len(), dst: dst.len() });
    }
    if src.iter().chain(dst).any(|p| !p[0].is_finite() || !p[1].is_finite()) {
        return Err(GeoError::InvalidInput("control point coordinates must be finite".into()));
    }

    let n = src.len() as f64;
    let mean_x = src.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_y = src.iter().map(|p| p[1]).sum::<f64>() / n;
    let scale = (src.iter().map(|p| (p[0] - mean_x).powi(2) + (p[1] - mean_y).powi(2)).sum::<f64>() / n).sqrt();
    if scale < SINGULAR_EPSILON {
        return Err(GeoError::SingularFit);
    }

    // Normal equations over normalized source coordinates (u, v, 1).
    let mut m = [[0.0; 3]; 3];
    let mut rhs_x = [0.0; 3];
    let mut rhs_y = [0.0; 3];
    for (s, t) in src.iter().zip(dst) {
        let row = [(s[0] - mean_x) / scale, (s[1] - mean_y) / scale, 1.0];
        for i in 0..3 {
            for j in 0..3 {
                m[i][j] += row[i] * row[j];
            }
            rhs_x[i] += row[i] * t[0];
            rhs_y[i] += row[i] * t[1];
        }
    }

    let [ua, ub, ut] = solve3(m, rhs_x)?;
    let [uc, ud, uu] = solve3(m, rhs_y)?;

    // Undo the normalization: u = (x - mean_x) / scale, v = (y - mean_y) / scale.
    let a = ua / scale;
    let b = ub / scale;
    let c = uc / scale;
    let d = ud / scale;
    Ok(AffineTransform { a, b, tx: ut - a * mean_x - b * mean_y, c, d, ty: uu - c * mean_x - d * mean_y })
}

/// Rotation + uniform scale + translation from exactly two pairs.
///
/// A third pair is synthesized by rotating each baseline a quarter turn about
/// its first point, which a similarity transform must preserve, and the three
/// pairs go through [`fit`]. Mirrored layouts are not representable.
///
/// # Errors
///
/// - [`GeoError::UnderdeterminedFit`] unless both slices have exactly 2 points.
/// - [`GeoError::SingularFit`] when the two source points coincide.
pub fn fit_two_point(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<AffineTransform, GeoError> {
    let ([s0, s1], [d0, d1]) = (src, dst) else {
        return Err(GeoError::UnderdeterminedFit { src: src.len(), dst: dst.len() });
    };
    let quarter_turn = |p: [f64; 2], q: [f64; 2]| [p[0] - (q[1] - p[1]), p[1] + (q[0] - p[0])];
    fit(&[*s0, *s1, quarter_turn(*s0, *s1)], &[*d0, *d1, quarter_turn(*d0, *d1)])
}

/// Solve `m * x = rhs` by Gaussian elimination with partial pivoting.
fn solve3(mut m: [[f64; 3]; 3], mut rhs: [f64; 3]) -> Result<[f64; 3], GeoError> {
    for col in 0..3 {
        let mut pivot = col;
        for row in col + 1..3 {
            if m[row][col].abs() > m[pivot][col].abs() {
                pivot = row;
            }
        }
        if m[pivot][col].abs() < SINGULAR_EPSILON {
            return Err(GeoError::SingularFit);
        }
        m.swap(col, pivot);
        rhs.swap(col, pivot);

        for row in col + 1..3 {
            let factor = m[row][col] / m[col][col];
            for k in col..3 {
                m[row][k] -= factor * m[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = [0.0; 3];
    for row in (0..3).rev() {
        let tail: f64 = (row + 1..3).map(|k| m[row][k] * x[k]).sum();
        x[row] = (rhs[row] - tail) / m[row][row];
    }
    Ok(x)
}
