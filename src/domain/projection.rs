//! Coordinate reprojection into an area-preserving projected CRS.

use std::fmt;

use geo::Coord;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::domain::error::GeometryError;

/// WGS84 longitude/latitude, the CRS of RFC 7946 GeoJSON.
pub const WGS84_LONLAT: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// UTM zone 10N on WGS84 (EPSG:32610).
pub const UTM_ZONE_10N: &str = "+proj=utm +zone=10 +datum=WGS84 +units=m +no_defs";

/// Source/target CRS pair; `None` means coordinates are already projected.
pub struct Projection {
    pair: Option<ProjPair>,
}

struct ProjPair {
    source: Proj,
    target: Proj,
    source_def: String,
    target_def: String,
    source_is_geographic: bool,
    target_is_geographic: bool,
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pair {
            None => f.write_str("Projection(identity)"),
            Some(p) => f
                .debug_struct("Projection")
                .field("source", &p.source_def)
                .field("target", &p.target_def)
                .finish_non_exhaustive(),
        }
    }
}

fn is_geographic(def: &str) -> bool {
    ["+proj=longlat", "+proj=latlong", "+proj=lonlat", "+proj=latlon"]
        .iter()
        .any(|p| def.contains(p))
}

impl Projection {
    /// Build a projection between two proj strings.
    pub fn new(source: &str, target: &str) -> Result<Self, GeometryError> {
        if source.trim() == target.trim() {
            return Ok(Self::identity());
        }
        let source_proj = Proj::from_proj_string(source).map_err(|e| {
            GeometryError::Unprojectable {
                reason: format!("invalid source CRS '{}': {:?}", source, e),
            }
        })?;
        let target_proj = Proj::from_proj_string(target).map_err(|e| {
            GeometryError::Unprojectable {
                reason: format!("invalid target CRS '{}': {:?}", target, e),
            }
        })?;

        Ok(Self {
            pair: Some(ProjPair {
                source: source_proj,
                target: target_proj,
                source_def: source.to_string(),
                target_def: target.to_string(),
                source_is_geographic: is_geographic(source),
                target_is_geographic: is_geographic(target),
            }),
        })
    }

    /// Projection for input that is already in a metric CRS.
    pub fn identity() -> Self {
        Self { pair: None }
    }

    pub fn is_identity(&self) -> bool {
        self.pair.is_none()
    }

    /// Transform one coordinate. Fails on non-finite input or output.
    pub fn transform(&self, coord: Coord<f64>) -> Result<Coord<f64>, GeometryError> {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return Err(GeometryError::Invalid {
                reason: format!("non-finite coordinate ({}, {})", coord.x, coord.y),
            });
        }
        let Some(p) = &self.pair else {
            return Ok(coord);
        };

        let (in_x, in_y) = if p.source_is_geographic {
            (coord.x.to_radians(), coord.y.to_radians())
        } else {
            (coord.x, coord.y)
        };
        let mut point = (in_x, in_y, 0.0);

        transform(&p.source, &p.target, &mut point).map_err(|e| {
            GeometryError::Unprojectable {
                reason: format!("({}, {}): {:?}", coord.x, coord.y, e),
            }
        })?;

        let (x, y) = if p.target_is_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if !x.is_finite() || !y.is_finite() {
            return Err(GeometryError::Unprojectable {
                reason: format!("({}, {}) maps outside the target CRS", coord.x, coord.y),
            });
        }
        Ok(Coord { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_identity_when_transforming_then_returns_input() {
        let proj = Projection::identity();
        let c = proj.transform(Coord { x: 500.0, y: 42.0 }).unwrap();
        assert_eq!(c, Coord { x: 500.0, y: 42.0 });
    }

    #[test]
    fn given_non_finite_coord_when_transforming_then_invalid() {
        let proj = Projection::identity();
        let err = proj.transform(Coord { x: f64::NAN, y: 0.0 }).unwrap_err();
        assert!(matches!(err, GeometryError::Invalid { .. }));
    }

    #[test]
    fn given_central_meridian_when_projecting_to_utm_10n_then_easting_is_false_easting() {
        // Zone 10N central meridian is -123
        let proj = Projection::new(WGS84_LONLAT, UTM_ZONE_10N).unwrap();
        let c = proj.transform(Coord { x: -123.0, y: 45.0 }).unwrap();
        assert!((c.x - 500_000.0).abs() < 0.01, "easting {}", c.x);
        assert!((c.y - 4_982_950.0).abs() < 100.0, "northing {}", c.y);
    }

    #[test]
    fn given_garbage_proj_string_when_building_then_unprojectable() {
        let err = Projection::new("+proj=doesnotexist", UTM_ZONE_10N).unwrap_err();
        assert!(matches!(err, GeometryError::Unprojectable { .. }));
    }

    #[test]
    fn given_same_crs_twice_when_building_then_identity() {
        let proj = Projection::new(UTM_ZONE_10N, UTM_ZONE_10N).unwrap();
        assert!(proj.is_identity());
    }
}
