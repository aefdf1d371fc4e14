//! Tests for BoundingBox and GeoPolygon operations.

use cubo_common::bbox::{BoundingBox, GeoPolygon};

// ============================================================================
// Constructor tests
// ============================================================================

#[test]
fn test_bbox_new() {
    let bbox = BoundingBox::new(499_360.0, 5_538_320.0, 500_640.0, 5_539_600.0, 32632);
    assert_eq!(bbox.west, 499_360.0);
    assert_eq!(bbox.south, 5_538_320.0);
    assert_eq!(bbox.east, 500_640.0);
    assert_eq!(bbox.north, 5_539_600.0);
    assert_eq!(bbox.epsg, 32632);
}

#[test]
fn test_bbox_copy() {
    let bbox1 = BoundingBox::new(0.0, 0.0, 10.0, 10.0, 32633);
    let bbox2 = bbox1;
    assert_eq!(bbox1, bbox2);
}

#[test]
fn test_bbox_different_epsg_not_equal() {
    let north = BoundingBox::new(0.0, 0.0, 10.0, 10.0, 32633);
    let south = BoundingBox::new(0.0, 0.0, 10.0, 10.0, 32733);
    assert_ne!(north, south);
}

// ============================================================================
// Dimension tests
// ============================================================================

#[test]
fn test_bbox_width_height() {
    let bbox = BoundingBox::new(10.0, 5.0, 30.0, 25.0, 32601);
    assert_eq!(bbox.width(), 20.0);
    assert_eq!(bbox.height(), 20.0);
}

#[test]
fn test_bbox_around_is_square() {
    let bbox = BoundingBox::around(612_345.0, 4_200_010.0, 640.0, 32617);
    assert_eq!(bbox.width(), 1280.0);
    assert_eq!(bbox.height(), 1280.0);
    assert_eq!(bbox.center(), (612_345.0, 4_200_010.0));
}

#[test]
fn test_bbox_zero_dimensions() {
    let bbox = BoundingBox::around(5.0, 5.0, 0.0, 32601);
    assert_eq!(bbox.width(), 0.0);
    assert_eq!(bbox.height(), 0.0);
}

// ============================================================================
// Corner tests
// ============================================================================

#[test]
fn test_bbox_corners_ring_order() {
    let bbox = BoundingBox::new(0.0, 0.0, 10.0, 20.0, 32601);
    assert_eq!(
        bbox.corners(),
        [(0.0, 0.0), (10.0, 0.0), (10.0, 20.0), (0.0, 20.0)]
    );
}

// ============================================================================
// Serialization
// ============================================================================

#[test]
fn test_bbox_json_field_names() {
    let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0, 32632);
    let json = serde_json::to_value(bbox).unwrap();
    assert_eq!(json["west"], 1.0);
    assert_eq!(json["south"], 2.0);
    assert_eq!(json["east"], 3.0);
    assert_eq!(json["north"], 4.0);
    assert_eq!(json["epsg"], 32632);
}

// ============================================================================
// Footprint polygons
// ============================================================================

#[test]
fn test_polygon_already_closed_ring_untouched() {
    let ring = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
    let poly = GeoPolygon::from_positions(ring.clone());
    assert_eq!(poly.ring, ring);
}

#[test]
fn test_polygon_empty() {
    let poly = GeoPolygon::from_positions(Vec::new());
    assert!(poly.ring.is_empty());
}

#[test]
fn test_polygon_geojson_polygon() {
    let poly = GeoPolygon::from_positions(vec![[9.9, 49.9], [10.1, 49.9], [10.1, 50.1], [9.9, 50.1]]);
    let geojson = poly.to_geojson();
    assert_eq!(geojson["type"], "Polygon");
    assert_eq!(geojson["coordinates"][0][4], serde_json::json!([9.9, 49.9]));
}
