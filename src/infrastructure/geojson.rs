//! GeoJSON decoding into AOI and tree layers.
//!
//! Accepts a `FeatureCollection` or a bare `Feature`. Foreign members such as
//! `properties`, `bbox` or a legacy `crs` are ignored; the source CRS comes
//! from configuration.

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{AoiLayer, TreeLayer};

#[derive(Error, Debug)]
pub enum GeoJsonError {
    #[error("malformed GeoJSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("position needs at least 2 values, got {0}")]
    Position(usize),

    #[error("AOI feature {index} has unsupported geometry type {kind}")]
    UnsupportedAoi { index: usize, kind: &'static str },
}

type Position = Vec<f64>;

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Document {
    FeatureCollection { features: Vec<Feature> },
    Feature(Feature),
}

#[derive(Deserialize)]
struct Feature {
    geometry: Option<RawGeometry>,
}

#[derive(Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum RawGeometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl RawGeometry {
    fn kind(&self) -> &'static str {
        match self {
            RawGeometry::Point(_) => "Point",
            RawGeometry::MultiPoint(_) => "MultiPoint",
            RawGeometry::LineString(_) => "LineString",
            RawGeometry::MultiLineString(_) => "MultiLineString",
            RawGeometry::Polygon(_) => "Polygon",
            RawGeometry::MultiPolygon(_) => "MultiPolygon",
        }
    }
}

fn coord(position: &[f64]) -> Result<Coord<f64>, GeoJsonError> {
    match position {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(GeoJsonError::Position(position.len())),
    }
}

fn line(positions: &[Position]) -> Result<LineString<f64>, GeoJsonError> {
    positions
        .iter()
        .map(|p| coord(p))
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>, GeoJsonError> {
    let mut rings = rings.iter().map(|r| line(r));
    let exterior = rings.next().transpose()?.unwrap_or_else(|| LineString::new(vec![]));
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn multi_polygon(polygons: &[Vec<Vec<Position>>]) -> Result<MultiPolygon<f64>, GeoJsonError> {
    polygons
        .iter()
        .map(|p| polygon(p))
        .collect::<Result<Vec<_>, _>>()
        .map(MultiPolygon::new)
}

fn to_geometry(raw: &RawGeometry) -> Result<Geometry<f64>, GeoJsonError> {
    Ok(match raw {
        RawGeometry::Point(p) => Geometry::Point(Point::from(coord(p)?)),
        RawGeometry::MultiPoint(ps) => Geometry::MultiPoint(MultiPoint::new(
            ps.iter()
                .map(|p| coord(p).map(Point::from))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        RawGeometry::LineString(ps) => Geometry::LineString(line(ps)?),
        RawGeometry::MultiLineString(ls) => Geometry::MultiLineString(MultiLineString::new(
            ls.iter().map(|l| line(l)).collect::<Result<Vec<_>, _>>()?,
        )),
        RawGeometry::Polygon(rings) => Geometry::Polygon(polygon(rings)?),
        RawGeometry::MultiPolygon(ps) => Geometry::MultiPolygon(multi_polygon(ps)?),
    })
}

fn features(content: &str) -> Result<Vec<Feature>, GeoJsonError> {
    Ok(match serde_json::from_str(content)? {
        Document::FeatureCollection { features } => features,
        Document::Feature(feature) => vec![feature],
    })
}

/// Decode an AOI layer. Null geometries become empty features.
pub fn parse_aoi_layer(content: &str) -> Result<AoiLayer, GeoJsonError> {
    let layer = features(content)?
        .iter()
        .enumerate()
        .map(|(index, feature)| match &feature.geometry {
            None => Ok(MultiPolygon::new(vec![])),
            Some(RawGeometry::Polygon(rings)) => Ok(MultiPolygon::new(vec![polygon(rings)?])),
            Some(RawGeometry::MultiPolygon(ps)) => multi_polygon(ps),
            Some(other) => Err(GeoJsonError::UnsupportedAoi {
                index,
                kind: other.kind(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AoiLayer::new(layer))
}

/// Decode a detected-tree layer, keeping one entry per feature.
pub fn parse_tree_layer(content: &str) -> Result<TreeLayer, GeoJsonError> {
    let layer = features(content)?
        .iter()
        .map(|feature| feature.geometry.as_ref().map(to_geometry).transpose())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TreeLayer::new(layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PlotBoundary, TreeFeatures};

    const AOI: &str = r#"{
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:OGC:1.3:CRS84"}},
        "features": [{
            "type": "Feature",
            "properties": {"plot": 4},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0, 0], [100, 0], [100, 100], [0, 100], [0, 0]]]
            }
        }]
    }"#;

    #[test]
    fn given_polygon_collection_when_parsing_aoi_then_single_feature() {
        let layer = parse_aoi_layer(AOI).unwrap();
        assert_eq!(layer.feature_count(), 1);
        assert_eq!(layer.area(), 10_000.0);
    }

    #[test]
    fn given_bare_multipolygon_feature_when_parsing_aoi_then_accepted() {
        let doc = r#"{"type": "Feature", "properties": null, "geometry": {"type": "MultiPolygon",
            "coordinates": [[[[0,0],[10,0],[10,10],[0,10],[0,0]]], [[[20,0],[30,0],[30,10],[20,10],[20,0]]]]}}"#;
        let layer = parse_aoi_layer(doc).unwrap();
        assert_eq!(layer.feature_count(), 1);
        assert_eq!(layer.area(), 200.0);
    }

    #[test]
    fn given_point_geometry_when_parsing_aoi_then_unsupported() {
        let doc = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1, 2]}}]}"#;
        let err = parse_aoi_layer(doc).unwrap_err();
        assert!(matches!(err, GeoJsonError::UnsupportedAoi { index: 0, kind: "Point" }));
    }

    #[test]
    fn given_mixed_tree_features_when_parsing_then_counts_every_feature() {
        let doc = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [1, 2, 30.5]}},
            {"type": "Feature", "properties": {}, "geometry": {"type": "Polygon",
                "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
            {"type": "Feature", "properties": {}, "geometry": null}
        ]}"#;
        let layer = parse_tree_layer(doc).unwrap();
        assert_eq!(layer.feature_count(), 3);
        assert!(layer.features[2].is_none());
    }

    #[test]
    fn given_empty_collection_when_parsing_trees_then_zero() {
        let layer = parse_tree_layer(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
        assert_eq!(layer.feature_count(), 0);
    }

    #[test]
    fn given_short_position_when_parsing_then_fails() {
        let doc = r#"{"type": "Feature", "geometry": {"type": "Point", "coordinates": [1]}}"#;
        assert!(matches!(
            parse_tree_layer(doc).unwrap_err(),
            GeoJsonError::Position(1)
        ));
    }

    #[test]
    fn given_not_json_when_parsing_then_json_error() {
        assert!(matches!(
            parse_aoi_layer("not json").unwrap_err(),
            GeoJsonError::Json(_)
        ));
    }
}
