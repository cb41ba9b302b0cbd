//! Per-plot geometric measurement: AOI acreage and tree counts.

use geo::{Area, Geometry, MapCoords, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::error::GeometryError;
use crate::domain::projection::Projection;

/// Square meters in one acre.
pub const SQ_METERS_PER_ACRE: f64 = 4046.85642;

/// Capability required of an AOI geometry.
pub trait PlotBoundary {
    /// Number of features in the layer.
    fn feature_count(&self) -> usize;

    /// Layer holding only the first feature.
    fn first_feature(&self) -> Self
    where
        Self: Sized;

    /// Copy of the geometry with every coordinate transformed.
    fn reproject(&self, projection: &Projection) -> Result<Self, GeometryError>
    where
        Self: Sized;

    /// Planar area of the first feature in squared CRS units.
    fn area(&self) -> f64;
}

/// Capability required of a detected-tree layer.
pub trait TreeFeatures {
    fn feature_count(&self) -> usize;
}

/// What to do when an AOI layer carries more than one feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiFeaturePolicy {
    /// Measure the first feature, warn about the rest.
    #[default]
    First,
    /// Fail with `GeometryError::MultipleFeatures`.
    Reject,
}

/// AOI boundary layer, one multipolygon per feature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AoiLayer {
    pub features: Vec<MultiPolygon<f64>>,
}

impl AoiLayer {
    pub fn new(features: Vec<MultiPolygon<f64>>) -> Self {
        Self { features }
    }
}

impl From<Polygon<f64>> for AoiLayer {
    fn from(polygon: Polygon<f64>) -> Self {
        Self::new(vec![MultiPolygon::new(vec![polygon])])
    }
}

fn validate_polygon(polygon: &Polygon<f64>) -> Result<(), GeometryError> {
    let exterior = polygon.exterior().0.len();
    if exterior == 0 {
        return Err(GeometryError::Empty);
    }
    // closed ring: at least three distinct vertices plus the closing one
    if exterior < 4 {
        return Err(GeometryError::Invalid {
            reason: format!("exterior ring has {} coordinates, need at least 4", exterior),
        });
    }
    for ring in polygon.interiors() {
        if ring.0.len() < 4 {
            return Err(GeometryError::Invalid {
                reason: format!("interior ring has {} coordinates, need at least 4", ring.0.len()),
            });
        }
    }
    Ok(())
}

impl PlotBoundary for AoiLayer {
    fn feature_count(&self) -> usize {
        self.features.len()
    }

    fn first_feature(&self) -> Self {
        Self::new(self.features.iter().take(1).cloned().collect())
    }

    fn reproject(&self, projection: &Projection) -> Result<Self, GeometryError> {
        match self.features.first() {
            None => return Err(GeometryError::Empty),
            Some(first) if first.0.is_empty() => return Err(GeometryError::Empty),
            Some(_) => {}
        }
        for polygon in self.features.iter().flat_map(|mp| mp.0.iter()) {
            validate_polygon(polygon)?;
        }

        let features = self
            .features
            .iter()
            .map(|mp| mp.try_map_coords(|c| projection.transform(c)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { features })
    }

    fn area(&self) -> f64 {
        self.features
            .first()
            .map(|mp| mp.unsigned_area())
            .unwrap_or(0.0)
    }
}

/// Detected trees for one plot. Every feature counts as one tree, whatever its geometry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeLayer {
    pub features: Vec<Option<Geometry<f64>>>,
}

impl TreeLayer {
    pub fn new(features: Vec<Option<Geometry<f64>>>) -> Self {
        Self { features }
    }
}

impl From<Vec<Point<f64>>> for TreeLayer {
    fn from(points: Vec<Point<f64>>) -> Self {
        Self::new(points.into_iter().map(|p| Some(Geometry::Point(p))).collect())
    }
}

impl TreeFeatures for TreeLayer {
    fn feature_count(&self) -> usize {
        self.features.len()
    }
}

/// Measures acreage and tree counts of individual plots.
#[derive(Debug)]
pub struct GeometryMeasurer {
    projection: Projection,
    policy: MultiFeaturePolicy,
}

impl GeometryMeasurer {
    pub fn new(projection: Projection, policy: MultiFeaturePolicy) -> Self {
        Self { projection, policy }
    }

    /// Acreage of the AOI's first feature after reprojection.
    pub fn measure_acreage<B: PlotBoundary>(&self, aoi: &B) -> Result<f64, GeometryError> {
        let count = aoi.feature_count();
        if count == 0 {
            return Err(GeometryError::Empty);
        }
        if count > 1 {
            match self.policy {
                MultiFeaturePolicy::Reject => {
                    return Err(GeometryError::MultipleFeatures { count });
                }
                MultiFeaturePolicy::First => {
                    warn!("AOI has {} features, measuring the first only", count);
                }
            }
        }

        // only the first feature is reprojected and validated
        let projected = aoi.first_feature().reproject(&self.projection)?;
        let area_m2 = projected.area();
        if !area_m2.is_finite() {
            return Err(GeometryError::Unprojectable {
                reason: format!("area evaluated to {}", area_m2),
            });
        }
        let acres = area_m2 / SQ_METERS_PER_ACRE;
        debug!("measure_acreage: area_m2={:.3} acres={:.5}", area_m2, acres);
        Ok(acres)
    }

    /// Number of detected trees. An empty layer is zero trees.
    pub fn count_points<T: TreeFeatures>(&self, trees: &T) -> u64 {
        trees.feature_count() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::projection::{UTM_ZONE_10N, WGS84_LONLAT};
    use geo::{point, polygon};

    fn square(side: f64) -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: side, y: 0.0),
            (x: side, y: side),
            (x: 0.0, y: side),
        ]
    }

    fn metric_measurer(policy: MultiFeaturePolicy) -> GeometryMeasurer {
        GeometryMeasurer::new(Projection::identity(), policy)
    }

    #[test]
    fn given_hectare_square_when_measuring_then_converts_to_acres() {
        let measurer = metric_measurer(MultiFeaturePolicy::First);
        let acres = measurer.measure_acreage(&AoiLayer::from(square(100.0))).unwrap();
        assert!((acres - 10_000.0 / SQ_METERS_PER_ACRE).abs() < 1e-12);
        assert!((acres - 2.471_053_8).abs() < 1e-6);
    }

    #[test]
    fn given_polygon_with_hole_when_measuring_then_subtracts_interior() {
        let measurer = metric_measurer(MultiFeaturePolicy::First);
        let with_hole = Polygon::new(
            square(100.0).exterior().clone(),
            vec![polygon![
                (x: 10.0, y: 10.0),
                (x: 20.0, y: 10.0),
                (x: 20.0, y: 20.0),
                (x: 10.0, y: 20.0),
            ]
            .exterior()
            .clone()],
        );
        let acres = measurer.measure_acreage(&AoiLayer::from(with_hole)).unwrap();
        assert!((acres - 9_900.0 / SQ_METERS_PER_ACRE).abs() < 1e-12);
    }

    #[test]
    fn given_multiple_features_when_policy_first_then_measures_first() {
        let measurer = metric_measurer(MultiFeaturePolicy::First);
        let layer = AoiLayer::new(vec![
            MultiPolygon::new(vec![square(100.0)]),
            MultiPolygon::new(vec![square(500.0)]),
        ]);
        let acres = measurer.measure_acreage(&layer).unwrap();
        assert!((acres - 10_000.0 / SQ_METERS_PER_ACRE).abs() < 1e-12);
    }

    #[test]
    fn given_degenerate_second_feature_when_policy_first_then_measures_first() {
        let measurer = metric_measurer(MultiFeaturePolicy::First);
        let sliver = Polygon::new(
            geo::LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]),
            vec![],
        );
        let layer = AoiLayer::new(vec![
            MultiPolygon::new(vec![square(100.0)]),
            MultiPolygon::new(vec![sliver]),
        ]);

        let acres = measurer.measure_acreage(&layer).unwrap();

        assert!((acres - 2.471_053_8).abs() < 1e-6, "acres {}", acres);
    }

    #[test]
    fn given_multiple_features_when_policy_reject_then_fails() {
        let measurer = metric_measurer(MultiFeaturePolicy::Reject);
        let layer = AoiLayer::new(vec![
            MultiPolygon::new(vec![square(100.0)]),
            MultiPolygon::new(vec![square(500.0)]),
        ]);
        assert_eq!(
            measurer.measure_acreage(&layer).unwrap_err(),
            GeometryError::MultipleFeatures { count: 2 }
        );
    }

    #[test]
    fn given_empty_layer_when_measuring_then_empty_error() {
        let measurer = metric_measurer(MultiFeaturePolicy::First);
        assert_eq!(
            measurer.measure_acreage(&AoiLayer::default()).unwrap_err(),
            GeometryError::Empty
        );
        let null_first = AoiLayer::new(vec![MultiPolygon::new(vec![])]);
        assert_eq!(
            measurer.measure_acreage(&null_first).unwrap_err(),
            GeometryError::Empty
        );
    }

    #[test]
    fn given_degenerate_ring_when_measuring_then_invalid() {
        let measurer = metric_measurer(MultiFeaturePolicy::First);
        let line = Polygon::new(
            geo::LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]),
            vec![],
        );
        let err = measurer.measure_acreage(&AoiLayer::from(line)).unwrap_err();
        assert!(matches!(err, GeometryError::Invalid { .. }), "{:?}", err);
    }

    #[test]
    fn given_lonlat_plot_when_measuring_in_utm_then_area_is_plausible() {
        // ~0.001 deg square near Portland: ~111 m by ~78 m
        let measurer = GeometryMeasurer::new(
            Projection::new(WGS84_LONLAT, UTM_ZONE_10N).unwrap(),
            MultiFeaturePolicy::First,
        );
        let plot = polygon![
            (x: -122.501, y: 45.500),
            (x: -122.500, y: 45.500),
            (x: -122.500, y: 45.501),
            (x: -122.501, y: 45.501),
        ];
        let acres = measurer.measure_acreage(&AoiLayer::from(plot)).unwrap();
        assert!(acres > 2.0 && acres < 2.3, "acres {}", acres);
    }

    #[test]
    fn given_tree_layers_when_counting_then_counts_features() {
        let measurer = metric_measurer(MultiFeaturePolicy::First);
        assert_eq!(measurer.count_points(&TreeLayer::default()), 0);
        let trees = TreeLayer::from(vec![point!(x: 1.0, y: 1.0), point!(x: 2.0, y: 2.0)]);
        assert_eq!(measurer.count_points(&trees), 2);
        let with_null = TreeLayer::new(vec![None, Some(Geometry::Point(point!(x: 0.0, y: 0.0)))]);
        assert_eq!(measurer.count_points(&with_null), 2);
    }
}
