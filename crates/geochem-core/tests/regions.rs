mod common;

use geo::{polygon, MultiPolygon};
use geochem_core::coordinates::GeographicPoint;
use geochem_core::regions::{
    load_region_grid, parse_region_grid, LinearScanIndex, RegionCell, RegionGridError,
    RegionIndex, RegionResolver,
};

use common::fixture_path;

fn square(tag: &str, west: f64, south: f64) -> RegionCell {
    let polygon = polygon![
        (x: west, y: south),
        (x: west + 1.0, y: south),
        (x: west + 1.0, y: south + 1.0),
        (x: west, y: south + 1.0),
        (x: west, y: south),
    ];
    RegionCell::new(tag, MultiPolygon::new(vec![polygon])).expect("non-empty cell")
}

#[test]
fn grid_fixture_resolves_tags() {
    let index = load_region_grid(fixture_path("grid.geojson"), "map_tile").expect("grid loads");
    assert_eq!(index.cell_count(), 3);

    let resolver = RegionResolver::new(Box::new(index), "");
    assert_eq!(resolver.resolve(GeographicPoint::new(-120.5, 52.5)), "093A");
    assert_eq!(resolver.resolve(GeographicPoint::new(-119.5, 52.5)), "082M");
    assert_eq!(resolver.resolve(GeographicPoint::new(-119.5, 53.5)), "093H");
}

#[test]
fn shared_edge_belongs_to_one_cell() {
    let index: LinearScanIndex = [square("west", -121.0, 52.0), square("east", -120.0, 52.0)]
        .into_iter()
        .collect();

    assert_eq!(index.locate(GeographicPoint::new(-120.0, 52.5)), Some("east"));
    assert_eq!(index.locate(GeographicPoint::new(-121.0, 52.0)), Some("west"));
    assert_eq!(index.locate(GeographicPoint::new(-119.0, 52.5)), None);
}

#[test]
fn overlapping_cells_resolve_in_grid_order() {
    let index = LinearScanIndex::new(vec![
        square("first", -121.0, 52.0),
        square("second", -121.0, 52.0),
    ]);
    assert_eq!(index.locate(GeographicPoint::new(-120.5, 52.5)), Some("first"));
}

#[test]
fn bbox_hit_outside_geometry_is_a_miss() {
    let triangle = polygon![
        (x: 0.0, y: 0.0),
        (x: 2.0, y: 0.0),
        (x: 0.0, y: 2.0),
        (x: 0.0, y: 0.0),
    ];
    let index = LinearScanIndex::new(vec![
        RegionCell::new("tri", MultiPolygon::new(vec![triangle])).expect("cell")
    ]);
    assert_eq!(index.locate(GeographicPoint::new(0.5, 0.5)), Some("tri"));
    assert_eq!(index.locate(GeographicPoint::new(1.8, 1.8)), None);
}

#[test]
fn points_off_the_grid_get_the_placeholder() {
    let resolver = RegionResolver::new(
        Box::new(LinearScanIndex::new(vec![square("093A", -121.0, 52.0)])),
        "n/a",
    );
    assert_eq!(resolver.resolve(GeographicPoint::new(10.0, 10.0)), "n/a");
    assert!(resolver.locate(GeographicPoint::new(10.0, 10.0)).is_none());

    let empty = RegionResolver::without_grid("");
    assert_eq!(empty.cell_count(), 0);
    assert_eq!(empty.resolve(GeographicPoint::new(-120.5, 52.5)), "");
}

#[test]
fn features_without_tags_or_area_are_skipped() {
    let content = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"other": "x"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type": "Feature", "properties": {"map_tile": "POINT"},
             "geometry": {"type": "Point", "coordinates": [0.5, 0.5]}},
            {"type": "Feature", "properties": {"map_tile": 92},
             "geometry": {"type": "MultiPolygon", "coordinates": [[[[0,0],[1,0],[1,1],[0,1],[0,0]]]]}}
        ]
    }"#;

    let index = parse_region_grid(content, "map_tile").expect("valid collection");

    assert_eq!(index.cells().len(), 1);
    assert_eq!(index.locate(GeographicPoint::new(0.5, 0.5)), Some("92"));
}

#[test]
fn rejects_non_collection_documents() {
    let content = r#"{"type": "Point", "coordinates": [0.5, 0.5]}"#;
    assert!(matches!(
        parse_region_grid(content, "map_tile"),
        Err(RegionGridError::NotFeatureCollection)
    ));
}

#[test]
fn missing_grid_file_reports_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.geojson");
    match load_region_grid(&path, "map_tile") {
        Err(RegionGridError::Io { path: reported, .. }) => {
            assert!(reported.ends_with("absent.geojson"))
        }
        Err(other) => panic!("expected io error, got {other}"),
        Ok(_) => panic!("expected io error"),
    }
}
