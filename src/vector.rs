//! Group-code vector stream parser.
//!
//! The input is a DXF-style text stream of `(group code, value)` line pairs.
//! A code `0` record starts an entity; the records after it, up to the next
//! code `0`, are that entity's attributes.
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Entity start (`POINT`, `LINE`, `LWPOLYLINE`, `POLYLINE`/`VERTEX`/`SEQEND`) |
//! | 2 | Section name (after `0 SECTION`) |
//! | 8 | Layer |
//! | 10/20/30 | Position X/Y/Z (per vertex in `LWPOLYLINE`) |
//! | 11/21/31 | Line end X/Y/Z |
//! | 38 | `LWPOLYLINE` elevation |
//! | 62 | Color index |
//! | 70 | Flags (bit 1 = closed polyline) |
//!
//! Parsing is lenient. Unknown entity kinds are skipped, malformed numbers
//! become 0, and both are counted in [`ParseReport`] and logged at `debug`.
//! Only the `ENTITIES` section is read when the stream has sections; a bare
//! stream of entities is read in full.

#[cfg(test)]
#[path = "vector_test.rs"]
mod vector_test;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GeoError;

const CODE_ENTITY: i32 = 0;
const CODE_NAME: i32 = 2;
const CODE_LAYER: i32 = 8;
const CODE_X: i32 = 10;
const CODE_Y: i32 = 20;
const CODE_Z: i32 = 30;
const CODE_END_X: i32 = 11;
const CODE_END_Y: i32 = 21;
const CODE_END_Z: i32 = 31;
const CODE_ELEVATION: i32 = 38;
const CODE_COLOR: i32 = 62;
const CODE_FLAGS: i32 = 70;

const FLAG_CLOSED: i32 = 1;

const DEFAULT_LAYER: &str = "0";

// =============================================================================
// ENTITIES
// =============================================================================

/// A 3-D drawing coordinate; z is 0 when the stream omits it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A parsed drawing entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VectorEntity {
    Point { position: Position, layer: String, color: Option<i32> },
    Line { start: Position, end: Position, layer: String, color: Option<i32> },
    Polyline { vertices: Vec<Position>, closed: bool, layer: String, color: Option<i32> },
}

impl VectorEntity {
    #[must_use]
    pub fn layer(&self) -> &str {
        match self {
            Self::Point { layer, .. } | Self::Line { layer, .. } | Self::Polyline { layer, .. } => layer,
        }
    }

    /// Every vertex, in drawing order.
    #[must_use]
    pub fn vertices(&self) -> Vec<Position> {
        match self {
            Self::Point { position, .. } => vec![*position],
            Self::Line { start, end, .. } => vec![*start, *end],
            Self::Polyline { vertices, .. } => vertices.clone(),
        }
    }

    /// Every edge as `(start, end)`, including the closing edge of a closed polyline.
    #[must_use]
    pub fn segments(&self) -> Vec<(Position, Position)> {
        match self {
            Self::Point { .. } => Vec::new(),
            Self::Line { start, end, .. } => vec![(*start, *end)],
            Self::Polyline { vertices, closed, .. } => {
                let mut segments: Vec<_> = vertices.windows(2).map(|w| (w[0], w[1])).collect();
                if *closed && vertices.len() > 2 {
                    if let (Some(first), Some(last)) = (vertices.first(), vertices.last()) {
                        segments.push((*last, *first));
                    }
                }
                segments
            }
        }
    }
}

// =============================================================================
// BOUNDS
// =============================================================================

/// Axis-aligned 3-D bounds of a set of entities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
}

impl Default for BoundingBox {
    /// The unit box `[0,1] x [0,1]` at z = 0.
    fn default() -> Self {
        Self { min_x: 0.0, min_y: 0.0, min_z: 0.0, max_x: 1.0, max_y: 1.0, max_z: 0.0 }
    }
}

impl BoundingBox {
    /// Min/max over every coordinate of every entity; the unit box when there are none.
    #[must_use]
    pub fn from_entities(entities: &[VectorEntity]) -> Self {
        let mut positions = entities.iter().flat_map(VectorEntity::vertices);
        let Some(first) = positions.next() else {
            return Self::default();
        };
        let seed = Self {
            min_x: first.x,
            min_y: first.y,
            min_z: first.z,
            max_x: first.x,
            max_y: first.y,
            max_z: first.z,
        };
        positions.fold(seed, |b, p| Self {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            min_z: b.min_z.min(p.z),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
            max_z: b.max_z.max(p.z),
        })
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    /// Reject boxes with non-finite bounds or a non-positive planar extent.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] describing the degenerate dimension.
    pub fn validate(&self) -> Result<(), GeoError> {
        let all = [self.min_x, self.min_y, self.min_z, self.max_x, self.max_y, self.max_z];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(GeoError::InvalidInput("bounding box has non-finite bounds".into()));
        }
        if self.width() <= 0.0 || self.height() <= 0.0 {
            return Err(GeoError::InvalidInput(format!(
                "degenerate bounding box: {} x {}",
                self.width(),
                self.height()
            )));
        }
        Ok(())
    }

    /// Uniform scale that fits the box inside a `viewport_width` x `viewport_height` viewport.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for a degenerate box or a non-positive viewport.
    pub fn fit_scale(&self, viewport_width: f64, viewport_height: f64) -> Result<f64, GeoError> {
        self.validate()?;
        if !(viewport_width > 0.0 && viewport_height > 0.0) {
            return Err(GeoError::InvalidInput(format!(
                "viewport must be positive, got {viewport_width} x {viewport_height}"
            )));
        }
        Ok((viewport_width / self.width()).min(viewport_height / self.height()))
    }
}

// =============================================================================
// PARSE
// =============================================================================

/// Counters for anomalies the parser recovered from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseReport {
    /// Numeric fields that failed to parse and were set to 0.
    pub defaulted_fields: usize,
    /// Entities of an unsupported kind that were skipped.
    pub skipped_entities: usize,
    /// Distinct unsupported kinds, in first-seen order.
    pub skipped_kinds: Vec<String>,
    /// Records whose group code was not an integer.
    pub malformed_records: usize,
}

impl ParseReport {
    /// Whether the stream parsed with no recovery at all.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.defaulted_fields == 0 && self.skipped_entities == 0 && self.malformed_records == 0
    }
}

/// Parser output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGeometry {
    pub entities: Vec<VectorEntity>,
    pub bounds: BoundingBox,
    pub report: ParseReport,
}

struct Record<'a> {
    /// 1-based line number of the group code.
    line: usize,
    code: i32,
    value: &'a str,
}

/// Parse a group-code stream into entities and their bounds.
///
/// Never fails: anomalies are recovered and counted in [`ParsedGeometry::report`].
#[must_use]
pub fn parse(text: &str) -> ParsedGeometry {
    let mut report = ParseReport::default();
    let records = read_records(text, &mut report);
    let mut parser = Parser { records: &records, pos: 0, report };
    let entities = parser.run();

    let bounds = BoundingBox::from_entities(&entities);
    debug!(entities = entities.len(), clean = parser.report.is_clean(), "parsed vector stream");
    ParsedGeometry { entities, bounds, report: parser.report }
}

fn read_records<'a>(text: &'a str, report: &mut ParseReport) -> Vec<Record<'a>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut records = Vec::with_capacity(lines.len() / 2);
    // A trailing code with no value ends the stream.
    for (idx, pair) in lines.chunks_exact(2).enumerate() {
        let line = idx * 2 + 1;
        if let Ok(code) = pair[0].trim().parse::<i32>() {
            records.push(Record { line, code, value: pair[1].trim() });
        } else {
            report.malformed_records += 1;
            debug!(line, code = pair[0].trim(), "skipping record with non-integer group code");
        }
    }
    records
}

struct Parser<'r, 'a> {
    records: &'r [Record<'a>],
    pos: usize,
    report: ParseReport,
}

/// Vertex under construction; z stays unset until the entity decides its default.
#[derive(Default)]
struct PendingVertex {
    x: f64,
    y: f64,
    z: Option<f64>,
}

impl PendingVertex {
    fn finish(&self, default_z: f64) -> Position {
        Position::new(self.x, self.y, self.z.unwrap_or(default_z))
    }
}

impl<'r, 'a> Parser<'r, 'a> {
    fn run(&mut self) -> Vec<VectorEntity> {
        let records = self.records;
        let mut entities = Vec::new();
        let mut section: Option<String> = None;

        while let Some(record) = records.get(self.pos) {
            if record.code != CODE_ENTITY {
                // Header variables and other loose attributes.
                self.pos += 1;
                continue;
            }
            let kind = record.value.to_ascii_uppercase();
            let start_line = record.line;
            self.pos += 1;

            match kind.as_str() {
                "SECTION" => {
                    let attrs = self.take_attributes();
                    section = attrs.iter().find(|r| r.code == CODE_NAME).map(|r| r.value.to_ascii_uppercase());
                }
                "ENDSEC" => {
                    self.take_attributes();
                    section = None;
                }
                "EOF" => break,
                _ if section.as_deref().is_some_and(|name| name != "ENTITIES") => {
                    self.take_attributes();
                }
                "POINT" => entities.push(self.parse_point()),
                "LINE" => entities.push(self.parse_line()),
                "LWPOLYLINE" => entities.push(self.parse_lwpolyline()),
                "POLYLINE" => entities.push(self.parse_polyline()),
                // Orphaned heavy-polyline records.
                "VERTEX" | "SEQEND" => {
                    self.take_attributes();
                }
                _ => {
                    let skipped = self.take_attributes().len();
                    self.report.skipped_entities += 1;
                    if !self.report.skipped_kinds.contains(&kind) {
                        self.report.skipped_kinds.push(kind.clone());
                    }
                    debug!(line = start_line, kind = %kind, attributes = skipped, "skipping unsupported entity");
                }
            }
        }
        entities
    }

    /// Consume records up to (not including) the next entity start.
    fn take_attributes(&mut self) -> &'r [Record<'a>] {
        let records = self.records;
        let start = self.pos;
        while records.get(self.pos).is_some_and(|r| r.code != CODE_ENTITY) {
            self.pos += 1;
        }
        &records[start..self.pos]
    }

    fn number(&mut self, record: &Record<'_>) -> f64 {
        match record.value.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                self.report.defaulted_fields += 1;
                debug!(line = record.line, code = record.code, value = record.value, "defaulting malformed number to 0");
                0.0
            }
        }
    }

    fn integer(&mut self, record: &Record<'_>) -> i32 {
        if let Ok(v) = record.value.parse::<i32>() {
            v
        } else {
            self.report.defaulted_fields += 1;
            debug!(line = record.line, code = record.code, value = record.value, "defaulting malformed integer to 0");
            0
        }
    }

    fn parse_point(&mut self) -> VectorEntity {
        let attrs = self.take_attributes();
        let mut position = Position::default();
        let mut layer = DEFAULT_LAYER.to_owned();
        let mut color = None;
        for record in attrs {
            match record.code {
                CODE_X => position.x = self.number(record),
                CODE_Y => position.y = self.number(record),
                CODE_Z => position.z = self.number(record),
                CODE_LAYER => layer = record.value.to_owned(),
                CODE_COLOR => color = Some(self.integer(record)),
                _ => {}
            }
        }
        VectorEntity::Point { position, layer, color }
    }

    fn parse_line(&mut self) -> VectorEntity {
        let attrs = self.take_attributes();
        let mut start = Position::default();
        let mut end = Position::default();
        let mut layer = DEFAULT_LAYER.to_owned();
        let mut color = None;
        for record in attrs {
            match record.code {
                CODE_X => start.x = self.number(record),
                CODE_Y => start.y = self.number(record),
                CODE_Z => start.z = self.number(record),
                CODE_END_X => end.x = self.number(record),
                CODE_END_Y => end.y = self.number(record),
                CODE_END_Z => end.z = self.number(record),
                CODE_LAYER => layer = record.value.to_owned(),
                CODE_COLOR => color = Some(self.integer(record)),
                _ => {}
            }
        }
        VectorEntity::Line { start, end, layer, color }
    }

    fn parse_lwpolyline(&mut self) -> VectorEntity {
        let attrs = self.take_attributes();
        let mut pending: Vec<PendingVertex> = Vec::new();
        let mut elevation = 0.0;
        let mut closed = false;
        let mut layer = DEFAULT_LAYER.to_owned();
        let mut color = None;
        for record in attrs {
            match record.code {
                // Each X starts a new vertex.
                CODE_X => {
                    let x = self.number(record);
                    pending.push(PendingVertex { x, ..PendingVertex::default() });
                }
                CODE_Y => {
                    let y = self.number(record);
                    current_vertex(&mut pending).y = y;
                }
                CODE_Z => {
                    let z = self.number(record);
                    current_vertex(&mut pending).z = Some(z);
                }
                CODE_ELEVATION => elevation = self.number(record),
                CODE_FLAGS => closed = self.integer(record) & FLAG_CLOSED != 0,
                CODE_LAYER => layer = record.value.to_owned(),
                CODE_COLOR => color = Some(self.integer(record)),
                _ => {}
            }
        }
        let vertices = pending.iter().map(|v| v.finish(elevation)).collect();
        VectorEntity::Polyline { vertices, closed, layer, color }
    }

    fn parse_polyline(&mut self) -> VectorEntity {
        let attrs = self.take_attributes();
        let mut elevation = 0.0;
        let mut closed = false;
        let mut layer = DEFAULT_LAYER.to_owned();
        let mut color = None;
        for record in attrs {
            match record.code {
                // The header's 30 carries the polyline elevation.
                CODE_Z => elevation = self.number(record),
                CODE_FLAGS => closed = self.integer(record) & FLAG_CLOSED != 0,
                CODE_LAYER => layer = record.value.to_owned(),
                CODE_COLOR => color = Some(self.integer(record)),
                _ => {}
            }
        }

        let records = self.records;
        let mut vertices = Vec::new();
        while let Some(record) = records.get(self.pos) {
            if !record.value.eq_ignore_ascii_case("VERTEX") {
                if record.value.eq_ignore_ascii_case("SEQEND") {
                    self.pos += 1;
                    self.take_attributes();
                }
                break;
            }
            self.pos += 1;
            let mut vertex = PendingVertex::default();
            for attr in self.take_attributes() {
                match attr.code {
                    CODE_X => vertex.x = self.number(attr),
                    CODE_Y => vertex.y = self.number(attr),
                    CODE_Z => vertex.z = Some(self.number(attr)),
                    _ => {}
                }
            }
            vertices.push(vertex.finish(elevation));
        }
        VectorEntity::Polyline { vertices, closed, layer, color }
    }
}

/// The vertex a Y/Z record applies to, starting one if the X was missing.
fn current_vertex(pending: &mut Vec<PendingVertex>) -> &mut PendingVertex {
    if pending.is_empty() {
        pending.push(PendingVertex::default());
    }
    let last = pending.len() - 1;
    &mut pending[last]
}
