#![allow(clippy::float_cmp)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;

const ROUND_TRIP_EPSILON: f64 = 1e-6;

fn assert_round_trip(conv: &CoordinateConverter, p: GeodeticPoint) {
    let back = conv.to_geodetic(conv.to_projected(p));
    assert!(
        (back.lat - p.lat).abs() < ROUND_TRIP_EPSILON && (back.lng - p.lng).abs() < ROUND_TRIP_EPSILON,
        "round trip drifted: {p:?} -> {back:?}"
    );
}

// =============================================================
// Zones
// =============================================================

#[test]
fn utm_zone_from_longitude() {
    assert_eq!(utm_zone_for(-180.0), 1);
    assert_eq!(utm_zone_for(0.0), 31);
    assert_eq!(utm_zone_for(3.0), 31);
    assert_eq!(utm_zone_for(6.0), 32);
    assert_eq!(utm_zone_for(-122.4), 10);
    assert_eq!(utm_zone_for(180.0), 60);
}

#[test]
fn utm_central_meridians() {
    assert_eq!(utm_central_meridian(31), 3.0);
    assert_eq!(utm_central_meridian(1), -177.0);
    assert_eq!(utm_central_meridian(60), 177.0);
}

#[test]
fn with_utm_zone_for_fills_only_missing_fields() {
    let params = ProjectionParameters::new(ProjectionFamily::Utm).with_utm_zone_for(GeodeticPoint::new(-33.9, 18.4));
    assert_eq!(params.utm_zone, Some(34));
    assert_eq!(params.hemisphere, Some(Hemisphere::South));

    let forced = ProjectionParameters::utm(33, Hemisphere::North).with_utm_zone_for(GeodeticPoint::new(-33.9, 18.4));
    assert_eq!(forced.utm_zone, Some(33));
    assert_eq!(forced.hemisphere, Some(Hemisphere::North));

    let geo = ProjectionParameters::geographic().with_utm_zone_for(GeodeticPoint::new(10.0, 10.0));
    assert_eq!(geo.utm_zone, None);
}

// =============================================================
// UTM
// =============================================================

#[test]
fn utm_equator_on_central_meridian() {
    let conv = CoordinateConverter::new(&ProjectionParameters::utm(31, Hemisphere::North)).unwrap();
    let p = conv.to_projected(GeodeticPoint::new(0.0, 3.0));
    assert!((p.x - 500_000.0).abs() < 1.0, "easting {}", p.x);
    assert!(p.y.abs() < 1.0, "northing {}", p.y);
}

#[test]
fn utm_south_adds_false_northing() {
    let conv = CoordinateConverter::new(&ProjectionParameters::utm(31, Hemisphere::South)).unwrap();
    let p = conv.to_projected(GeodeticPoint::new(0.0, 3.0));
    assert!((p.y - 10_000_000.0).abs() < 1.0);

    let below = conv.to_projected(GeodeticPoint::new(-10.0, 3.0));
    assert!(below.y < 10_000_000.0 && below.y > 8_000_000.0);
}

#[test]
fn utm_one_degree_of_latitude_is_about_110_km() {
    let conv = CoordinateConverter::new(&ProjectionParameters::utm(31, Hemisphere::North)).unwrap();
    let p = conv.to_projected(GeodeticPoint::new(1.0, 3.0));
    assert!((p.y - 0.9996 * 110_574.0).abs() < 50.0, "northing {}", p.y);
}

#[test]
fn utm_easting_increases_eastward() {
    let conv = CoordinateConverter::new(&ProjectionParameters::utm(10, Hemisphere::North)).unwrap();
    let west = conv.to_projected(GeodeticPoint::new(45.0, -124.0));
    let east = conv.to_projected(GeodeticPoint::new(45.0, -122.0));
    assert!(west.x < 500_000.0);
    assert!(east.x > 500_000.0);
}

#[test]
fn utm_round_trip_sampled_within_zone() {
    let mut rng = StdRng::seed_from_u64(31);
    for hemisphere in [Hemisphere::North, Hemisphere::South] {
        let conv = CoordinateConverter::new(&ProjectionParameters::utm(17, hemisphere)).unwrap();
        let cm = utm_central_meridian(17);
        for _ in 0..200 {
            let lat = match hemisphere {
                Hemisphere::North => rng.random_range(0.0..80.0),
                Hemisphere::South => rng.random_range(-80.0..0.0),
            };
            let lng = cm + rng.random_range(-3.0..3.0);
            assert_round_trip(&conv, GeodeticPoint::new(lat, lng));
        }
    }
}

#[test]
fn utm_rejects_bad_zone() {
    let err = CoordinateConverter::new(&ProjectionParameters::utm(0, Hemisphere::North)).unwrap_err();
    assert!(matches!(err, GeoError::UnsupportedProjection(_)));
    assert!(CoordinateConverter::new(&ProjectionParameters::utm(61, Hemisphere::North)).is_err());
}

#[test]
fn utm_without_zone_derives_it_per_point() {
    let conv = CoordinateConverter::new(&ProjectionParameters::new(ProjectionFamily::Utm)).unwrap();
    assert_eq!(conv.family(), ProjectionFamily::Utm);

    let p = conv.to_projected(GeodeticPoint::new(0.0, 3.0));
    assert!((p.x - 500_000.0).abs() < 1.0, "easting {}", p.x);
    assert!(p.y.abs() < 1.0, "northing {}", p.y);

    // Each point lands on its own zone's central meridian.
    for lng in [-177.0, -75.0, 9.0, 177.0] {
        let q = conv.to_projected(GeodeticPoint::new(40.0, lng));
        assert!((q.x - 500_000.0).abs() < 1.0, "lng {lng}: easting {}", q.x);
    }
}

#[test]
fn utm_without_zone_matches_forced_zone_forward() {
    let per_point = CoordinateConverter::new(&ProjectionParameters::new(ProjectionFamily::Utm)).unwrap();
    let forced = CoordinateConverter::new(&ProjectionParameters::utm(18, Hemisphere::North)).unwrap();
    let nyc = GeodeticPoint::new(40.75, -73.99);
    assert_eq!(per_point.to_projected(nyc), forced.to_projected(nyc));
}

#[test]
fn utm_without_zone_inverts_in_reference_zone() {
    let mut params = ProjectionParameters::new(ProjectionFamily::Utm);
    params.hemisphere = Some(Hemisphere::South);
    let conv = CoordinateConverter::new(&params).unwrap();
    let cm = utm_central_meridian(crate::consts::UTM_REFERENCE_ZONE);
    assert_round_trip(&conv, GeodeticPoint::new(-20.0, cm + 1.5));
    assert!((conv.to_projected(GeodeticPoint::new(0.0, cm)).y - 10_000_000.0).abs() < 1.0);
}

#[test]
fn utm_zone_out_of_range_in_metadata_is_unsupported() {
    for raw in [r#"{"family":"utm","utm_zone":-4}"#, r#"{"family":"utm","utm_zone":300}"#] {
        let params: ProjectionParameters = serde_json::from_str(raw).unwrap();
        let err = CoordinateConverter::new(&params).unwrap_err();
        assert!(matches!(err, GeoError::UnsupportedProjection(ref m) if m.contains("outside")), "{raw}: {err:?}");
    }
}

// =============================================================
// Geographic
// =============================================================

#[test]
fn geographic_is_identity_swap() {
    let conv = CoordinateConverter::new(&ProjectionParameters::geographic()).unwrap();
    let p = conv.to_projected(GeodeticPoint::new(12.5, -45.25));
    assert_eq!(p, ProjectedPoint::new(-45.25, 12.5));
    assert_eq!(conv.to_geodetic(p), GeodeticPoint::new(12.5, -45.25));
    assert_eq!(conv.family(), ProjectionFamily::Geographic);
}

// =============================================================
// Other families
// =============================================================

#[test]
fn transverse_mercator_honours_origin_and_offsets() {
    let params = ProjectionParameters {
        central_meridian: Some(-2.0),
        latitude_of_origin: Some(49.0),
        scale_factor: Some(0.999_601_271_7),
        false_easting: Some(400_000.0),
        false_northing: Some(-100_000.0),
        ..ProjectionParameters::new(ProjectionFamily::TransverseMercator)
    };
    let conv = CoordinateConverter::new(&params).unwrap();
    let origin = conv.to_projected(GeodeticPoint::new(49.0, -2.0));
    assert!((origin.x - 400_000.0).abs() < 1e-6);
    assert!((origin.y + 100_000.0).abs() < 1e-6);

    assert_round_trip(&conv, GeodeticPoint::new(51.5, -0.12));
    assert_round_trip(&conv, GeodeticPoint::new(55.95, -3.19));
}

#[test]
fn transverse_mercator_requires_central_meridian() {
    let err = CoordinateConverter::new(&ProjectionParameters::new(ProjectionFamily::TransverseMercator)).unwrap_err();
    assert!(matches!(err, GeoError::UnsupportedProjection(ref m) if m.contains("central_meridian")));
}

#[test]
fn mercator_round_trip_and_equator() {
    let params = ProjectionParameters {
        central_meridian: Some(0.0),
        ..ProjectionParameters::new(ProjectionFamily::Mercator)
    };
    let conv = CoordinateConverter::new(&params).unwrap();
    let on_equator = conv.to_projected(GeodeticPoint::new(0.0, 1.0));
    assert!(on_equator.y.abs() < 1e-6);
    assert!((on_equator.x - WGS84_A * 1.0_f64.to_radians()).abs() < 1e-6);

    let mut rng = StdRng::seed_from_u64(3857);
    for _ in 0..100 {
        let p = GeodeticPoint::new(rng.random_range(-80.0..80.0), rng.random_range(-179.0..179.0));
        assert_round_trip(&conv, p);
    }
}

#[test]
fn lambert_two_parallel_origin_maps_to_false_offsets() {
    // Lambert-93 style parameters.
    let params = ProjectionParameters {
        central_meridian: Some(3.0),
        latitude_of_origin: Some(46.5),
        standard_parallels: Some((44.0, 49.0)),
        false_easting: Some(700_000.0),
        false_northing: Some(6_600_000.0),
        ..ProjectionParameters::new(ProjectionFamily::LambertConformalConic)
    };
    let conv = CoordinateConverter::new(&params).unwrap();
    let origin = conv.to_projected(GeodeticPoint::new(46.5, 3.0));
    assert!((origin.x - 700_000.0).abs() < 1e-6);
    assert!((origin.y - 6_600_000.0).abs() < 1e-6);

    assert_round_trip(&conv, GeodeticPoint::new(48.8566, 2.3522));
    assert_round_trip(&conv, GeodeticPoint::new(43.2965, 5.3698));
}

#[test]
fn lambert_one_parallel_round_trip() {
    let params = ProjectionParameters {
        central_meridian: Some(-96.0),
        latitude_of_origin: Some(40.0),
        scale_factor: Some(1.0),
        ..ProjectionParameters::new(ProjectionFamily::LambertConformalConic)
    };
    let conv = CoordinateConverter::new(&params).unwrap();
    assert_round_trip(&conv, GeodeticPoint::new(35.0, -100.0));
    assert_round_trip(&conv, GeodeticPoint::new(47.0, -88.0));
}

#[test]
fn lambert_southern_cone_round_trip() {
    let params = ProjectionParameters {
        central_meridian: Some(135.0),
        latitude_of_origin: Some(0.0),
        standard_parallels: Some((-18.0, -36.0)),
        ..ProjectionParameters::new(ProjectionFamily::LambertConformalConic)
    };
    let conv = CoordinateConverter::new(&params).unwrap();
    assert_round_trip(&conv, GeodeticPoint::new(-25.0, 130.0));
}

#[test]
fn lambert_on_equator_is_unsupported() {
    let params = ProjectionParameters {
        central_meridian: Some(0.0),
        latitude_of_origin: Some(0.0),
        ..ProjectionParameters::new(ProjectionFamily::LambertConformalConic)
    };
    assert!(matches!(CoordinateConverter::new(&params), Err(GeoError::UnsupportedProjection(_))));
}

#[test]
fn lambert_one_parallel_requires_latitude_of_origin() {
    let params = ProjectionParameters {
        central_meridian: Some(0.0),
        ..ProjectionParameters::new(ProjectionFamily::LambertConformalConic)
    };
    assert!(matches!(CoordinateConverter::new(&params), Err(GeoError::UnsupportedProjection(_))));
}

// =============================================================
// Rejections
// =============================================================

#[test]
fn unknown_family_is_unsupported() {
    let err = CoordinateConverter::new(&ProjectionParameters::new(ProjectionFamily::Unknown)).unwrap_err();
    assert!(matches!(err, GeoError::UnsupportedProjection(_)));
}

#[test]
fn non_wgs84_datum_is_unsupported() {
    let mut params = ProjectionParameters::utm(31, Hemisphere::North);
    params.datum = Some("NAD27".into());
    assert!(CoordinateConverter::new(&params).is_err());

    params.datum = Some("WGS 84".into());
    assert!(CoordinateConverter::new(&params).is_ok());
    params.datum = Some("wgs_1984".into());
    assert!(CoordinateConverter::new(&params).is_ok());
}

#[test]
fn non_positive_scale_factor_is_unsupported() {
    let params = ProjectionParameters {
        central_meridian: Some(0.0),
        scale_factor: Some(0.0),
        ..ProjectionParameters::new(ProjectionFamily::Mercator)
    };
    assert!(CoordinateConverter::new(&params).is_err());
}

#[test]
fn parameters_deserialize_with_unknown_family() {
    let params: ProjectionParameters = serde_json::from_str(r#"{"family":"polyconic"}"#).unwrap();
    assert_eq!(params.family, ProjectionFamily::Unknown);

    let params: ProjectionParameters =
        serde_json::from_str(r#"{"family":"utm","utm_zone":31,"hemisphere":"south"}"#).unwrap();
    assert_eq!(params, ProjectionParameters::utm(31, Hemisphere::South));
}
