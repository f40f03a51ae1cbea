#![allow(clippy::float_cmp)]

use super::*;

/// Join `(code, value)` pairs into a stream, one token per line.
fn stream(records: &[(&str, &str)]) -> String {
    records.iter().flat_map(|(c, v)| [*c, *v]).collect::<Vec<_>>().join("\n")
}

fn point_records(x: &str, y: &str) -> Vec<(&'static str, String)> {
    vec![("0", "POINT".into()), ("8", "SURVEY".into()), ("10", x.into()), ("20", y.into())]
}

fn owned_stream(records: &[(&str, String)]) -> String {
    records.iter().flat_map(|(c, v)| [(*c).to_owned(), v.clone()]).collect::<Vec<_>>().join("\n")
}

// =============================================================
// Entities
// =============================================================

#[test]
fn parses_point_with_layer_color_and_default_z() {
    let text = stream(&[("0", "POINT"), ("8", "STAKES"), ("62", "3"), ("10", "12.5"), ("20", "-4")]);
    let parsed = parse(&text);
    assert_eq!(
        parsed.entities,
        vec![VectorEntity::Point { position: Position::new(12.5, -4.0, 0.0), layer: "STAKES".into(), color: Some(3) }]
    );
    assert!(parsed.report.is_clean());
}

#[test]
fn parses_line_endpoints() {
    let text = stream(&[
        ("0", "LINE"),
        ("10", "0"),
        ("20", "0"),
        ("30", "1"),
        ("11", "3"),
        ("21", "4"),
        ("31", "2"),
    ]);
    let parsed = parse(&text);
    let VectorEntity::Line { start, end, layer, color } = &parsed.entities[0] else {
        panic!("expected line, got {:?}", parsed.entities[0]);
    };
    assert_eq!(*start, Position::new(0.0, 0.0, 1.0));
    assert_eq!(*end, Position::new(3.0, 4.0, 2.0));
    assert_eq!(layer, "0");
    assert_eq!(*color, None);
}

#[test]
fn parses_lwpolyline_vertices_and_closure() {
    let text = stream(&[
        ("0", "LWPOLYLINE"),
        ("8", "BOUNDARY"),
        ("90", "3"),
        ("70", "1"),
        ("38", "7.5"),
        ("10", "0"),
        ("20", "0"),
        ("10", "10"),
        ("20", "0"),
        ("30", "9"),
        ("10", "10"),
        ("20", "10"),
    ]);
    let parsed = parse(&text);
    let VectorEntity::Polyline { vertices, closed, layer, .. } = &parsed.entities[0] else {
        panic!("expected polyline");
    };
    assert!(*closed);
    assert_eq!(layer, "BOUNDARY");
    assert_eq!(
        vertices,
        &vec![Position::new(0.0, 0.0, 7.5), Position::new(10.0, 0.0, 9.0), Position::new(10.0, 10.0, 7.5)]
    );
}

#[test]
fn parses_heavy_polyline_with_vertices_and_seqend() {
    let text = stream(&[
        ("0", "POLYLINE"),
        ("8", "CONTOUR"),
        ("66", "1"),
        ("10", "0"),
        ("20", "0"),
        ("30", "100"),
        ("70", "0"),
        ("0", "VERTEX"),
        ("10", "1"),
        ("20", "2"),
        ("0", "VERTEX"),
        ("10", "3"),
        ("20", "4"),
        ("30", "101"),
        ("0", "SEQEND"),
        ("0", "POINT"),
        ("10", "9"),
        ("20", "9"),
    ]);
    let parsed = parse(&text);
    assert_eq!(parsed.entities.len(), 2);
    let VectorEntity::Polyline { vertices, closed, .. } = &parsed.entities[0] else {
        panic!("expected polyline");
    };
    assert!(!*closed);
    assert_eq!(vertices, &vec![Position::new(1.0, 2.0, 100.0), Position::new(3.0, 4.0, 101.0)]);
    assert!(matches!(parsed.entities[1], VectorEntity::Point { .. }));
}

#[test]
fn entity_kind_is_case_insensitive() {
    let text = stream(&[("0", "point"), ("10", "1"), ("20", "2")]);
    assert_eq!(parse(&text).entities.len(), 1);
}

// =============================================================
// Leniency
// =============================================================

#[test]
fn unsupported_entity_between_supported_ones_is_skipped_in_order() {
    let text = stream(&[
        ("0", "POINT"),
        ("10", "1"),
        ("20", "1"),
        ("0", "CIRCLE"),
        ("10", "5"),
        ("20", "5"),
        ("40", "2.5"),
        ("0", "LINE"),
        ("10", "0"),
        ("20", "0"),
        ("11", "2"),
        ("21", "2"),
    ]);
    let parsed = parse(&text);
    assert_eq!(parsed.entities.len(), 2);
    assert!(matches!(parsed.entities[0], VectorEntity::Point { .. }));
    assert!(matches!(parsed.entities[1], VectorEntity::Line { .. }));
    assert_eq!(parsed.report.skipped_entities, 1);
    assert_eq!(parsed.report.skipped_kinds, vec!["CIRCLE".to_owned()]);
}

#[test]
fn malformed_numbers_default_to_zero_and_are_counted() {
    let text = owned_stream(&point_records("abc", "7"));
    let parsed = parse(&text);
    let VectorEntity::Point { position, .. } = &parsed.entities[0] else {
        panic!("expected point");
    };
    assert_eq!(position.x, 0.0);
    assert_eq!(position.y, 7.0);
    assert_eq!(parsed.report.defaulted_fields, 1);
    assert!(!parsed.report.is_clean());
}

#[test]
fn malformed_color_defaults_to_zero() {
    let text = stream(&[("0", "POINT"), ("62", "red"), ("10", "1"), ("20", "1")]);
    let parsed = parse(&text);
    let VectorEntity::Point { color, .. } = &parsed.entities[0] else {
        panic!("expected point");
    };
    assert_eq!(*color, Some(0));
    assert_eq!(parsed.report.defaulted_fields, 1);
}

#[test]
fn non_integer_group_code_is_counted_and_skipped() {
    let text = stream(&[("0", "POINT"), ("x", "junk"), ("10", "4"), ("20", "5")]);
    let parsed = parse(&text);
    assert_eq!(parsed.report.malformed_records, 1);
    assert_eq!(parsed.entities.len(), 1);
}

#[test]
fn trailing_code_without_value_is_ignored() {
    let mut text = stream(&[("0", "POINT"), ("10", "4"), ("20", "5")]);
    text.push_str("\n0");
    let parsed = parse(&text);
    assert_eq!(parsed.entities.len(), 1);
}

#[test]
fn only_entities_section_is_read() {
    let text = stream(&[
        ("0", "SECTION"),
        ("2", "HEADER"),
        ("9", "$INSUNITS"),
        ("70", "6"),
        ("0", "ENDSEC"),
        ("0", "SECTION"),
        ("2", "BLOCKS"),
        ("0", "BLOCK"),
        ("0", "LINE"),
        ("10", "99"),
        ("20", "99"),
        ("11", "98"),
        ("21", "98"),
        ("0", "ENDBLK"),
        ("0", "ENDSEC"),
        ("0", "SECTION"),
        ("2", "ENTITIES"),
        ("0", "POINT"),
        ("10", "1"),
        ("20", "2"),
        ("0", "ENDSEC"),
        ("0", "EOF"),
    ]);
    let parsed = parse(&text);
    assert_eq!(parsed.entities.len(), 1);
    assert!(matches!(parsed.entities[0], VectorEntity::Point { .. }));
    assert_eq!(parsed.report.skipped_entities, 0);
}

#[test]
fn records_after_eof_are_ignored() {
    let text = stream(&[("0", "POINT"), ("10", "1"), ("20", "1"), ("0", "EOF"), ("0", "POINT"), ("10", "2"), ("20", "2")]);
    assert_eq!(parse(&text).entities.len(), 1);
}

#[test]
fn windows_line_endings_and_padding_are_trimmed() {
    let text = "  0\r\nPOINT\r\n 10\r\n 3.5 \r\n 20\r\n4\r\n";
    let parsed = parse(text);
    let VectorEntity::Point { position, .. } = &parsed.entities[0] else {
        panic!("expected point");
    };
    assert_eq!(*position, Position::new(3.5, 4.0, 0.0));
    assert!(parsed.report.is_clean());
}

// =============================================================
// Bounds
// =============================================================

#[test]
fn empty_input_yields_unit_box() {
    let parsed = parse("");
    assert!(parsed.entities.is_empty());
    assert_eq!(parsed.bounds, BoundingBox::default());
    assert_eq!(parsed.bounds.width(), 1.0);
    assert_eq!(parsed.bounds.height(), 1.0);
}

#[test]
fn bounds_cover_all_coordinates_including_z() {
    let text = stream(&[
        ("0", "POINT"),
        ("10", "-5"),
        ("20", "2"),
        ("30", "-1"),
        ("0", "LINE"),
        ("10", "0"),
        ("20", "0"),
        ("11", "8"),
        ("21", "9"),
        ("31", "4"),
    ]);
    let b = parse(&text).bounds;
    assert_eq!((b.min_x, b.min_y, b.min_z), (-5.0, 0.0, -1.0));
    assert_eq!((b.max_x, b.max_y, b.max_z), (8.0, 9.0, 4.0));
    assert_eq!(b.center(), (1.5, 4.5));
}

#[test]
fn degenerate_bounds_fail_validation() {
    let text = stream(&[("0", "POINT"), ("10", "3"), ("20", "3")]);
    let b = parse(&text).bounds;
    assert!(matches!(b.validate(), Err(GeoError::InvalidInput(_))));
    assert!(b.fit_scale(100.0, 100.0).is_err());
}

#[test]
fn fit_scale_uses_tighter_axis() {
    let b = BoundingBox { min_x: 0.0, min_y: 0.0, min_z: 0.0, max_x: 200.0, max_y: 50.0, max_z: 0.0 };
    assert_eq!(b.fit_scale(100.0, 100.0).unwrap(), 0.5);
    assert!(b.fit_scale(0.0, 100.0).is_err());
}

// =============================================================
// Entity helpers
// =============================================================

#[test]
fn closed_polyline_segments_include_closing_edge() {
    let square = VectorEntity::Polyline {
        vertices: vec![
            Position::new(0.0, 0.0, 0.0),
            Position::new(1.0, 0.0, 0.0),
            Position::new(1.0, 1.0, 0.0),
            Position::new(0.0, 1.0, 0.0),
        ],
        closed: true,
        layer: "0".into(),
        color: None,
    };
    let segments = square.segments();
    assert_eq!(segments.len(), 4);
    assert_eq!(segments[3], (Position::new(0.0, 1.0, 0.0), Position::new(0.0, 0.0, 0.0)));
    assert_eq!(square.vertices().len(), 4);
    assert_eq!(square.layer(), "0");
}

#[test]
fn point_has_no_segments() {
    let p = VectorEntity::Point { position: Position::default(), layer: "0".into(), color: None };
    assert!(p.segments().is_empty());
    assert_eq!(p.vertices(), vec![Position::default()]);
}
