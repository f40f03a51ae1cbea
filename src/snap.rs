//! Grid index over drawing vertices and edges for radius-bounded snapping.
//!
//! DESIGN
//! ======
//! Candidates live in one `Vec` in build order: every vertex first, then
//! every edge. A uniform grid maps `(col, row)` cells to candidate ids.
//! Vertices go in the cell containing them; edges go in every cell the edge
//! crosses (grid traversal), so a query only needs the cells around the
//! query point. Edges spanning more than `MAX_SEGMENT_CELLS` cells skip the
//! grid and are checked on every query.
//!
//! Ties compare `(distance, id)`: a strictly smaller distance wins, and equal
//! distances go to the lower id. Because vertices precede edges, a vertex
//! beats an edge whose nearest point is that same vertex.
//!
//! The index is immutable once built. [`SnapIndexHandle`] holds the current
//! index behind an `Arc` swap and reports "not built" separately from
//! "built but nothing in range".

#[cfg(test)]
#[path = "snap_test.rs"]
mod snap_test;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::error::GeoError;
use crate::vector::VectorEntity;

/// Grid cell coordinate.
type Cell = (i64, i64);

/// Edges crossing more cells than this are checked on every query instead of gridded.
const MAX_SEGMENT_CELLS: u64 = 1 << 16;

// =============================================================================
// RESULTS
// =============================================================================

/// What a snap landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapKind {
    /// Exactly on an indexed vertex.
    Vertex,
    /// The nearest point along an indexed edge.
    Segment,
}

/// A successful snap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// Snapped x position.
    pub x: f64,
    /// Snapped y position.
    pub y: f64,
    pub kind: SnapKind,
    /// Distance from the query point.
    pub distance: f64,
    /// Index of the source entity (or of the vertex for [`SnapIndex::build`]).
    pub source: usize,
}

/// Result of querying a [`SnapIndexHandle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnapOutcome {
    /// No index has been published yet.
    NotReady,
    /// The index is built but nothing is within the radius.
    NoMatch,
    Snapped(SnapResult),
}

impl SnapOutcome {
    /// The snap, if any.
    #[must_use]
    pub fn result(&self) -> Option<SnapResult> {
        match self {
            Self::Snapped(r) => Some(*r),
            Self::NotReady | Self::NoMatch => None,
        }
    }
}

// =============================================================================
// INDEX
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Candidate {
    Vertex { x: f64, y: f64, source: usize },
    Segment { ax: f64, ay: f64, bx: f64, by: f64, source: usize },
}

impl Candidate {
    /// Nearest point on this candidate to `(x, y)` and its distance.
    fn nearest(&self, x: f64, y: f64) -> (f64, f64, f64) {
        match *self {
            Self::Vertex { x: vx, y: vy, .. } => (vx, vy, (x - vx).hypot(y - vy)),
            Self::Segment { ax, ay, bx, by, .. } => {
                let dx = bx - ax;
                let dy = by - ay;
                let t = (((x - ax) * dx + (y - ay) * dy) / (dx * dx + dy * dy)).clamp(0.0, 1.0);
                let px = ax + t * dx;
                let py = ay + t * dy;
                (px, py, (x - px).hypot(y - py))
            }
        }
    }

    fn result(&self, x: f64, y: f64, distance: f64) -> SnapResult {
        match *self {
            Self::Vertex { source, .. } => SnapResult { x, y, kind: SnapKind::Vertex, distance, source },
            Self::Segment { source, .. } => SnapResult { x, y, kind: SnapKind::Segment, distance, source },
        }
    }
}

/// Immutable uniform-grid index.
#[derive(Debug, Clone)]
pub struct SnapIndex {
    cell_size: f64,
    candidates: Vec<Candidate>,
    cells: HashMap<Cell, Vec<usize>>,
    /// Edges too long to grid.
    oversized: Vec<usize>,
    vertex_count: usize,
}

impl SnapIndex {
    /// Index bare vertices. `source` in results is the vertex's position in `vertices`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] when `cell_size` is not positive and finite.
    pub fn build(vertices: &[(f64, f64)], cell_size: f64) -> Result<Self, GeoError> {
        let mut index = Self::empty(cell_size)?;
        for (source, &(x, y)) in vertices.iter().enumerate() {
            index.push_vertex(x, y, source);
        }
        Ok(index)
    }

    /// Index every vertex and edge of `entities`. `source` in results is the entity's position.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] when `cell_size` is not positive and finite.
    pub fn from_entities(entities: &[VectorEntity], cell_size: f64) -> Result<Self, GeoError> {
        let mut index = Self::empty(cell_size)?;
        for (source, entity) in entities.iter().enumerate() {
            for v in entity.vertices() {
                index.push_vertex(v.x, v.y, source);
            }
        }
        for (source, entity) in entities.iter().enumerate() {
            for (a, b) in entity.segments() {
                index.push_segment((a.x, a.y), (b.x, b.y), source);
            }
        }
        Ok(index)
    }

    fn empty(cell_size: f64) -> Result<Self, GeoError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(GeoError::InvalidInput(format!("snap cell size must be positive, got {cell_size}")));
        }
        Ok(Self { cell_size, candidates: Vec::new(), cells: HashMap::new(), oversized: Vec::new(), vertex_count: 0 })
    }

    fn push_vertex(&mut self, x: f64, y: f64, source: usize) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        let id = self.candidates.len();
        self.candidates.push(Candidate::Vertex { x, y, source });
        self.cells.entry(self.cell_of(x, y)).or_default().push(id);
        self.vertex_count += 1;
    }

    fn push_segment(&mut self, a: (f64, f64), b: (f64, f64), source: usize) {
        if [a.0, a.1, b.0, b.1].iter().any(|v| !v.is_finite()) || a == b {
            return;
        }
        let id = self.candidates.len();
        self.candidates.push(Candidate::Segment { ax: a.0, ay: a.1, bx: b.0, by: b.1, source });
        match self.cells_on_segment(a, b) {
            Some(cells) => {
                for cell in cells {
                    self.cells.entry(cell).or_default().push(id);
                }
            }
            None => self.oversized.push(id),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn cell_of(&self, x: f64, y: f64) -> Cell {
        ((x / self.cell_size).floor() as i64, (y / self.cell_size).floor() as i64)
    }

    /// Cells crossed by the segment `a -> b`, by stepping across cell boundaries.
    ///
    /// `None` when the segment crosses more than [`MAX_SEGMENT_CELLS`] cells.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn cells_on_segment(&self, a: (f64, f64), b: (f64, f64)) -> Option<Vec<Cell>> {
        let start = self.cell_of(a.0, a.1);
        let end = self.cell_of(b.0, b.1);
        let steps = end.0.abs_diff(start.0).saturating_add(end.1.abs_diff(start.1));
        if steps > MAX_SEGMENT_CELLS {
            return None;
        }
        let dx = b.0 - a.0;
        let dy = b.1 - a.1;

        let axis = |d: f64, origin: f64, cell: i64| -> (i64, f64, f64) {
            if d > 0.0 {
                let boundary = (cell as f64 + 1.0) * self.cell_size;
                (1, (boundary - origin) / d, self.cell_size / d)
            } else if d < 0.0 {
                let boundary = cell as f64 * self.cell_size;
                (-1, (boundary - origin) / d, self.cell_size / -d)
            } else {
                (0, f64::INFINITY, f64::INFINITY)
            }
        };
        let (step_x, mut t_max_x, t_delta_x) = axis(dx, a.0, start.0);
        let (step_y, mut t_max_y, t_delta_y) = axis(dy, a.1, start.1);

        let mut cells = Vec::with_capacity(steps as usize + 1);
        let mut current = start;
        cells.push(current);
        for _ in 0..steps {
            if current == end {
                break;
            }
            if t_max_x < t_max_y {
                current.0 += step_x;
                t_max_x += t_delta_x;
            } else {
                current.1 += step_y;
                t_max_y += t_delta_y;
            }
            cells.push(current);
        }
        if current != end {
            cells.push(end);
        }
        Some(cells)
    }

    /// Nearest vertex or edge point within `radius` of `(x, y)`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn query(&self, x: f64, y: f64, radius: f64) -> Option<SnapResult> {
        if !x.is_finite() || !y.is_finite() || radius.is_nan() || radius < 0.0 {
            return None;
        }
        let ring = (radius / self.cell_size).ceil().max(1.0);
        let window = (2.0 * ring + 1.0).powi(2);

        // A window wider than the occupied grid just scans every bucket.
        let mut buckets: Vec<&Vec<usize>> = if window > self.cells.len() as f64 {
            self.cells.values().collect()
        } else {
            let ring = ring as i64;
            let (cx, cy) = self.cell_of(x, y);
            (cx.saturating_sub(ring)..=cx.saturating_add(ring))
                .flat_map(|col| (cy.saturating_sub(ring)..=cy.saturating_add(ring)).map(move |row| (col, row)))
                .filter_map(|cell| self.cells.get(&cell))
                .collect()
        };
        buckets.push(&self.oversized);

        let mut seen = HashSet::new();
        let mut best: Option<(f64, usize, f64, f64)> = None;
        for &id in buckets.into_iter().flatten() {
            if !seen.insert(id) {
                continue;
            }
            let (px, py, distance) = self.candidates[id].nearest(x, y);
            if distance > radius {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_distance, best_id, _, _)) => (distance, id) < (best_distance, best_id),
            };
            if better {
                best = Some((distance, id, px, py));
            }
        }
        best.map(|(distance, id, px, py)| self.candidates[id].result(px, py, distance))
    }

    #[must_use]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of indexed vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Number of indexed edges.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.candidates.len() - self.vertex_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

// =============================================================================
// SHARED HANDLE
// =============================================================================

/// Shared slot for the current index, readable from any thread.
///
/// The lock only guards the pointer; queries run on a cloned `Arc` so a
/// concurrent [`SnapIndexHandle::publish`] never exposes a half-built index.
#[derive(Debug, Clone, Default)]
pub struct SnapIndexHandle {
    slot: Arc<RwLock<Option<Arc<SnapIndex>>>>,
}

impl SnapIndexHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current index.
    pub fn publish(&self, index: SnapIndex) {
        info!(
            vertices = index.vertex_count(),
            segments = index.segment_count(),
            cell_size = index.cell_size(),
            "snap index published"
        );
        *self.slot.write() = Some(Arc::new(index));
    }

    /// Drop the current index; queries report [`SnapOutcome::NotReady`] until the next publish.
    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.slot.read().is_some()
    }

    /// The current index, if one is published.
    #[must_use]
    pub fn current(&self) -> Option<Arc<SnapIndex>> {
        self.slot.read().clone()
    }

    /// Query the current index.
    #[must_use]
    pub fn query(&self, x: f64, y: f64, radius: f64) -> SnapOutcome {
        let Some(index) = self.current() else {
            return SnapOutcome::NotReady;
        };
        match index.query(x, y, radius) {
            Some(result) => SnapOutcome::Snapped(result),
            None => SnapOutcome::NoMatch,
        }
    }
}
