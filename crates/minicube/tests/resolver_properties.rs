//! Properties of cube bounding boxes.

use cubo_common::{BoundingBox, ProjectedPoint};
use minicube::{BoundingBoxResolver, CuboError, EdgeUnit, GeoPoint, UnitRegistry};
use test_utils::{assert_approx_eq, points};

fn point((lat, lon): (f64, f64)) -> GeoPoint {
    GeoPoint::new(lat, lon).unwrap()
}

fn px() -> EdgeUnit {
    EdgeUnit::Pixels
}

fn edges(bbox: &BoundingBox) -> [f64; 4] {
    [bbox.west, bbox.south, bbox.east, bbox.north]
}

#[test]
fn test_edge_length_matches_pixels() {
    let resolver = BoundingBoxResolver::new();
    let locations = [
        points::GERMANY,
        points::SYDNEY,
        points::NEW_YORK,
        points::NULL_ISLAND,
        (-45.123, -70.987),
        (71.5, 179.9),
    ];

    for loc in locations {
        for resolution in [0.5, 10.0, 20.0, 60.0, 250.0] {
            for edge in [2.0, 3.0, 64.0, 127.0, 128.0, 1000.0] {
                let bbox = resolver.resolve(point(loc), resolution, edge, &px()).unwrap();
                let mut pixels = edge.round();
                if pixels % 2.0 == 1.0 {
                    pixels += 1.0;
                }
                let expected = pixels * resolution;
                assert!(
                    ((bbox.width() - expected) / expected).abs() < 1e-9,
                    "width {} != {} at {:?}",
                    bbox.width(),
                    expected,
                    loc
                );
                assert!(
                    ((bbox.height() - expected) / expected).abs() < 1e-9,
                    "height {} != {} at {:?}",
                    bbox.height(),
                    expected,
                    loc
                );
            }
        }
    }
}

#[test]
fn test_idempotent() {
    let resolver = BoundingBoxResolver::new();
    let a = resolver.locate(point(points::SYDNEY), 10.0, 128.0, &px()).unwrap();
    let b = resolver.locate(point(points::SYDNEY), 10.0, 128.0, &px()).unwrap();
    assert_eq!(a, b);
    assert_eq!(edges(&a.bbox).map(f64::to_bits), edges(&b.bbox).map(f64::to_bits));
}

#[test]
fn test_unit_equivalence() {
    let resolver = BoundingBoxResolver::new();
    let p = point(points::GERMANY);
    let in_metres = resolver
        .resolve(p, 10.0, 640.0, &EdgeUnit::Length("m".into()))
        .unwrap();
    let in_km = resolver
        .resolve(p, 10.0, 0.64, &EdgeUnit::Length("km".into()))
        .unwrap();
    let in_pixels = resolver.resolve(p, 10.0, 64.0, &px()).unwrap();
    assert_eq!(in_metres, in_pixels);
    assert_eq!(in_km, in_pixels);
}

#[test]
fn test_odd_pixels_round_up() {
    let resolver = BoundingBoxResolver::new();
    let p = point(points::NEW_YORK);
    assert_eq!(
        resolver.resolve(p, 10.0, 63.0, &px()).unwrap(),
        resolver.resolve(p, 10.0, 64.0, &px()).unwrap()
    );
}

#[test]
fn test_invalid_latitude() {
    let resolver = BoundingBoxResolver::new();
    // Bypass GeoPoint::new so the resolver sees the raw value
    let p = GeoPoint { lat: 95.0, lon: 10.0 };
    let err = resolver.resolve(p, 10.0, 64.0, &px()).unwrap_err();
    assert!(matches!(err, CuboError::InvalidParameter { .. }), "got {:?}", err);
    assert!(err.is_user_error());

    assert!(matches!(
        GeoPoint::new(10.0, 181.0),
        Err(CuboError::InvalidParameter { .. })
    ));
}

#[test]
fn test_unknown_unit() {
    let resolver = BoundingBoxResolver::new();
    let err = resolver
        .resolve(
            point(points::GERMANY),
            10.0,
            64.0,
            &EdgeUnit::Length("furlong-typo".into()),
        )
        .unwrap_err();
    assert!(matches!(err, CuboError::UnknownUnit(ref u) if u == "furlong-typo"), "got {:?}", err);
}

#[test]
fn test_registered_unit() {
    let mut units = UnitRegistry::default();
    units.register("chain", 20.1168).unwrap();
    let resolver = BoundingBoxResolver::with_units(&units);
    // 32 chains = 643.7 m -> 64.37 px -> 64
    let bbox = resolver
        .resolve(point(points::GERMANY), 10.0, 32.0, &EdgeUnit::Length("chain".into()))
        .unwrap();
    assert_approx_eq!(bbox.width(), 640.0, 1e-9);
}

#[test]
fn test_grid_alignment() {
    let resolver = BoundingBoxResolver::new();
    let resolution = 10.0;
    let a = resolver.locate(point(points::GERMANY), resolution, 64.0, &px()).unwrap();

    // A point one resolution step east, expressed back in degrees
    let shifted = ProjectedPoint::new(a.projected.x + resolution, a.projected.y, a.epsg());
    let (lat, lon) = projection::to_geographic(&shifted).unwrap();
    let b = resolver.locate(GeoPoint::new(lat, lon).unwrap(), resolution, 64.0, &px()).unwrap();
    assert_eq!(a.epsg(), b.epsg());

    for (ea, eb) in edges(&a.bbox).iter().zip(edges(&b.bbox).iter()) {
        let steps = (eb - ea) / resolution;
        assert_approx_eq!(steps, steps.round(), 1e-9);
    }
    assert_approx_eq!(b.bbox.west - a.bbox.west, resolution, 1e-9);
}

#[test]
fn test_edges_on_resolution_grid() {
    let resolver = BoundingBoxResolver::new();
    for loc in [points::GERMANY, points::SYDNEY, points::NEW_YORK] {
        let bbox = resolver.resolve(point(loc), 20.0, 50.0, &px()).unwrap();
        for edge in edges(&bbox) {
            let steps = edge / 20.0;
            assert_approx_eq!(steps, steps.round(), 1e-9);
        }
    }
}

#[test]
fn test_footprint_contains_point() {
    let resolver = BoundingBoxResolver::new();
    let geometry = resolver.locate(point(points::GERMANY), 10.0, 128.0, &px()).unwrap();
    let ring = &geometry.footprint.ring;
    assert!(ring.iter().any(|p| p[0] < 10.0) && ring.iter().any(|p| p[0] > 10.0));
    assert!(ring.iter().any(|p| p[1] < 50.0) && ring.iter().any(|p| p[1] > 50.0));
    assert_eq!(ring.first(), ring.last());
}

#[test]
fn test_footprint_next_to_antimeridian() {
    let resolver = BoundingBoxResolver::new();
    let geometry = resolver.locate(point((10.0, 179.999)), 10.0, 128.0, &px()).unwrap();
    let footprint = &geometry.footprint;

    assert!(
        footprint.ring.iter().all(|p| (-180.0..=180.0).contains(&p[0])),
        "{:?}",
        footprint.ring
    );
    assert!(footprint.crosses_antimeridian());

    let geojson = footprint.to_geojson();
    assert_eq!(geojson["type"], "MultiPolygon");
    for polygon in geojson["coordinates"].as_array().unwrap() {
        for position in polygon[0].as_array().unwrap() {
            let lon = position[0].as_f64().unwrap();
            assert!((-180.0..=180.0).contains(&lon), "{}", lon);
        }
    }
}

#[test]
fn test_reference_projections() {
    let cases = [
        (points::GERMANY, test_utils::projected::GERMANY),
        (points::SYDNEY, test_utils::projected::SYDNEY),
        (points::NEW_YORK, test_utils::projected::NEW_YORK),
    ];
    for (loc, (epsg, x, y)) in cases {
        let geometry = BoundingBoxResolver::new()
            .locate(point(loc), 10.0, 64.0, &px())
            .unwrap();
        assert_eq!(geometry.epsg(), epsg);
        assert_approx_eq!(geometry.projected.x, x, 0.01);
        assert_approx_eq!(geometry.projected.y, y, 0.01);
        assert_approx_eq!(geometry.center.x, (x / 10.0).round() * 10.0, 1e-9);
    }
}
