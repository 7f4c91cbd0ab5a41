//! Coordinate transformation between EPSG systems
//!
//! Web Mercator <-> WGS 84 uses the closed-form spherical formulas; every
//! other pair goes through `proj4rs`. Geographic coordinates are degrees
//! at this API, radians inside proj4rs.

use std::f64::consts::PI;

use log::trace;
use proj4rs::proj::Proj;

use super::bbox::BoundingBox;
use super::crs::CoordinateSystem;
use super::point::Point;
use crate::errors::{SceneError, SceneResult};

/// Earth radius in meters used by Web Mercator
pub const EARTH_RADIUS: f64 = 6378137.0;

/// Points per edge when densifying an envelope
pub const DENSIFY_POINTS: usize = 21;

/// Convert WGS 84 degrees to Web Mercator meters
pub fn wgs84_to_web_mercator(lon: f64, lat: f64) -> Point {
    let lat_rad = lat.to_radians();
    let x = lon.to_radians() * EARTH_RADIUS;
    let y = EARTH_RADIUS * f64::ln(f64::tan(PI / 4.0 + lat_rad / 2.0));
    Point::new(x, y)
}

/// Convert Web Mercator meters to WGS 84 degrees
pub fn web_mercator_to_wgs84(x: f64, y: f64) -> Point {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * f64::atan(f64::exp(y / EARTH_RADIUS)) - PI / 2.0).to_degrees();
    Point::new(lon, lat)
}

enum Route {
    Identity,
    MercatorToGeographic,
    GeographicToMercator,
    Proj { source: Proj, target: Proj, source_geographic: bool, target_geographic: bool },
}

/// Transformer from one coordinate system to another
pub struct CoordinateTransformer {
    source: CoordinateSystem,
    target: CoordinateSystem,
    route: Route,
}

impl CoordinateTransformer {
    /// Builds a transformer; fails if either EPSG code is unknown
    pub fn new(source: CoordinateSystem, target: CoordinateSystem) -> SceneResult<Self> {
        let route = match (source, target) {
            (s, t) if s == t => Route::Identity,
            (CoordinateSystem::WebMercator, CoordinateSystem::WGS84) => Route::MercatorToGeographic,
            (CoordinateSystem::WGS84, CoordinateSystem::WebMercator) => Route::GeographicToMercator,
            _ => Route::Proj {
                source: Self::build_proj(&source)?,
                target: Self::build_proj(&target)?,
                source_geographic: source.is_geographic(),
                target_geographic: target.is_geographic(),
            },
        };
        Ok(CoordinateTransformer { source, target, route })
    }

    fn build_proj(crs: &CoordinateSystem) -> SceneResult<Proj> {
        let definition = crs.proj_string().ok_or_else(|| {
            SceneError::Projection(format!("{} is not in the projection database", crs))
        })?;
        Proj::from_proj_string(definition)
            .map_err(|e| SceneError::Projection(format!("Invalid projection {}: {:?}", crs, e)))
    }

    pub fn source(&self) -> CoordinateSystem {
        self.source
    }

    pub fn target(&self) -> CoordinateSystem {
        self.target
    }

    /// Transforms one coordinate pair, `None` if it falls outside the projection domain
    pub fn try_transform(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let (out_x, out_y) = match &self.route {
            Route::Identity => (x, y),
            Route::MercatorToGeographic => {
                let p = web_mercator_to_wgs84(x, y);
                (p.x, p.y)
            }
            Route::GeographicToMercator => {
                if y.abs() >= 90.0 {
                    return None;
                }
                let p = wgs84_to_web_mercator(x, y);
                (p.x, p.y)
            }
            Route::Proj { source, target, source_geographic, target_geographic } => {
                let mut point = if *source_geographic {
                    (x.to_radians(), y.to_radians(), 0.0)
                } else {
                    (x, y, 0.0)
                };
                if let Err(e) = proj4rs::transform::transform(source, target, &mut point) {
                    trace!("Transform of ({}, {}) failed: {:?}", x, y, e);
                    return None;
                }
                if *target_geographic {
                    (point.0.to_degrees(), point.1.to_degrees())
                } else {
                    (point.0, point.1)
                }
            }
        };

        if out_x.is_finite() && out_y.is_finite() {
            Some((out_x, out_y))
        } else {
            None
        }
    }

    /// Transforms one coordinate pair, failing outside the projection domain
    pub fn transform(&self, x: f64, y: f64) -> SceneResult<(f64, f64)> {
        self.try_transform(x, y).ok_or_else(|| {
            SceneError::Projection(format!("Cannot transform ({}, {}) from {} to {}", x, y, self.source, self.target))
        })
    }

    pub fn transform_point(&self, point: &Point) -> SceneResult<Point> {
        self.transform(point.x, point.y).map(Point::from)
    }

    /// Envelope of `bbox` in the target system, densifying each edge
    ///
    /// Points that fail to transform are skipped; at least one must succeed.
    pub fn transform_bounds(&self, bbox: &BoundingBox, densify: usize) -> SceneResult<BoundingBox> {
        let mut result: Option<BoundingBox> = None;
        for p in bbox.edge_points(densify) {
            if let Some((x, y)) = self.try_transform(p.x, p.y) {
                match result.as_mut() {
                    Some(b) => b.expand_to(x, y),
                    None => result = Some(BoundingBox::new(x, y, x, y)),
                }
            }
        }
        result
            .map(|b| b.with_epsg(Some(self.target.epsg_code())))
            .ok_or_else(|| SceneError::Projection(format!(
                "No part of the envelope transforms from {} to {}", self.source, self.target)))
    }
}
