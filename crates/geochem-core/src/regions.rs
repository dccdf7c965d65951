use std::fs;
use std::path::Path;

use geo::{BoundingRect, Coord, Intersects, LineString, MultiPolygon, Point, Polygon, Rect};
use geojson::{GeoJson, Value as GeoJsonValue};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::coordinates::GeographicPoint;

#[derive(Debug, Error)]
pub enum RegionGridError {
    #[error("failed to read region grid {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("region grid is not valid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("region grid must be a GeoJSON FeatureCollection")]
    NotFeatureCollection,
}

/// One polygon of the grid with its precomputed envelope.
#[derive(Debug, Clone)]
pub struct RegionCell {
    pub bbox: Rect<f64>,
    pub geometry: MultiPolygon<f64>,
    pub tag: String,
}

impl RegionCell {
    /// `None` when the geometry has no extent.
    pub fn new(tag: impl Into<String>, geometry: MultiPolygon<f64>) -> Option<Self> {
        let bbox = geometry.bounding_rect()?;
        Some(Self {
            bbox,
            geometry,
            tag: tag.into(),
        })
    }

    /// Envelope test is half-open (`min <= p < max`) so that points on a
    /// shared grid edge belong to one cell only.
    pub fn contains(&self, point: GeographicPoint) -> bool {
        let min = self.bbox.min();
        let max = self.bbox.max();
        let in_bbox = point.longitude >= min.x
            && point.longitude < max.x
            && point.latitude >= min.y
            && point.latitude < max.y;
        in_bbox
            && self
                .geometry
                .intersects(&Point::new(point.longitude, point.latitude))
    }
}

/// Point-in-region lookup. Implementations return the tag of the first cell
/// in grid order that contains the point.
pub trait RegionIndex {
    fn locate(&self, point: GeographicPoint) -> Option<&str>;
    fn cell_count(&self) -> usize;
}

/// Scans every cell per lookup; O(cells) per point.
#[derive(Debug, Clone, Default)]
pub struct LinearScanIndex {
    cells: Vec<RegionCell>,
}

impl LinearScanIndex {
    pub fn new(cells: Vec<RegionCell>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[RegionCell] {
        &self.cells
    }
}

impl FromIterator<RegionCell> for LinearScanIndex {
    fn from_iter<I: IntoIterator<Item = RegionCell>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl RegionIndex for LinearScanIndex {
    fn locate(&self, point: GeographicPoint) -> Option<&str> {
        self.cells
            .iter()
            .find(|cell| cell.contains(point))
            .map(|cell| cell.tag.as_str())
    }

    fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Tags canonical points with the grid cell they fall in.
pub struct RegionResolver {
    index: Box<dyn RegionIndex>,
    placeholder: String,
}

impl RegionResolver {
    pub fn new(index: Box<dyn RegionIndex>, placeholder: impl Into<String>) -> Self {
        Self {
            index,
            placeholder: placeholder.into(),
        }
    }

    /// Resolver over an empty grid: every point gets the placeholder.
    pub fn without_grid(placeholder: impl Into<String>) -> Self {
        Self::new(Box::new(LinearScanIndex::default()), placeholder)
    }

    pub fn locate(&self, point: GeographicPoint) -> Option<&str> {
        self.index.locate(point)
    }

    /// Containing tag, or the placeholder when the point is outside the grid.
    pub fn resolve(&self, point: GeographicPoint) -> &str {
        self.locate(point).unwrap_or(self.placeholder.as_str())
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn cell_count(&self) -> usize {
        self.index.cell_count()
    }
}

pub fn load_region_grid(
    path: impl AsRef<Path>,
    tag_property: &str,
) -> Result<LinearScanIndex, RegionGridError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| RegionGridError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_region_grid(&content, tag_property)
}

/// Reads a FeatureCollection of Polygon/MultiPolygon features, keeping
/// feature order. Features without the tag property or with non-areal
/// geometry are skipped.
pub fn parse_region_grid(content: &str, tag_property: &str) -> Result<LinearScanIndex, RegionGridError> {
    let collection = match content.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection,
        _ => return Err(RegionGridError::NotFeatureCollection),
    };

    let mut cells = Vec::with_capacity(collection.features.len());
    for (position, feature) in collection.features.into_iter().enumerate() {
        let tag = feature
            .properties
            .as_ref()
            .and_then(|props| props.get(tag_property))
            .and_then(property_to_tag);
        let Some(tag) = tag else {
            warn!(position, tag_property, "Skipping grid feature without a tag");
            continue;
        };

        let Some(geometry) = feature.geometry.and_then(|g| to_multi_polygon(&g.value)) else {
            warn!(position, tag = %tag, "Skipping grid feature without polygon geometry");
            continue;
        };

        match RegionCell::new(tag, geometry) {
            Some(cell) => cells.push(cell),
            None => debug!(position, "Skipping empty grid feature"),
        }
    }

    Ok(LinearScanIndex::new(cells))
}

fn property_to_tag(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn to_multi_polygon(value: &GeoJsonValue) -> Option<MultiPolygon<f64>> {
    match value {
        GeoJsonValue::Polygon(rings) => to_polygon(rings).map(|p| MultiPolygon::new(vec![p])),
        GeoJsonValue::MultiPolygon(polygons) => {
            let polygons = polygons
                .iter()
                .map(|rings| to_polygon(rings))
                .collect::<Option<Vec<_>>>()?;
            Some(MultiPolygon::new(polygons))
        }
        _ => None,
    }
}

fn to_polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| to_line_string(ring));
    let exterior = rings.next()??;
    let interiors = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

fn to_line_string(ring: &[Vec<f64>]) -> Option<LineString<f64>> {
    ring.iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Some(Coord { x: *x, y: *y }),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}
