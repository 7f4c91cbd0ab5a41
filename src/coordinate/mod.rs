//! Coordinate systems, envelopes and transformations

mod bbox;
mod point;
mod transform;
mod crs;

pub use self::bbox::BoundingBox;
pub use self::point::Point;
pub use self::transform::{
    web_mercator_to_wgs84, wgs84_to_web_mercator, CoordinateTransformer, DENSIFY_POINTS, EARTH_RADIUS,
};
pub use self::crs::{CoordinateSystem, CoordinateSystemFactory};
