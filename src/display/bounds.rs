//! Geographic bounds of exported rasters for map overlays

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::debug;

use crate::coordinate::{BoundingBox, CoordinateSystem, CoordinateTransformer, DENSIFY_POINTS};
use crate::errors::{SceneError, SceneResult};
use crate::tiff::GeoTiff;

/// Metres per degree of latitude
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Metric shift applied to overlay bounds, east (`dx`) and north (`dy`)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlignOffset {
    pub dx: f64,
    pub dy: f64,
}

impl AlignOffset {
    pub fn new(dx: f64, dy: f64) -> Self {
        AlignOffset { dx, dy }
    }

    /// Shifts WGS84 `bounds` by the offset, converted to degrees at the
    /// bounds' centre latitude
    pub fn apply(&self, bounds: &BoundingBox) -> BoundingBox {
        let center_lat = (bounds.min_y + bounds.max_y) / 2.0;
        let lon_meters = METERS_PER_DEGREE * center_lat.to_radians().cos();
        let dlon = self.dx / lon_meters.max(1e-6);
        let dlat = self.dy / METERS_PER_DEGREE;
        BoundingBox::new(bounds.min_x + dlon, bounds.min_y + dlat, bounds.max_x + dlon, bounds.max_y + dlat)
            .with_epsg(bounds.epsg)
    }
}

/// WGS84 bounds of the GeoTIFF at `tif`, shifted by `offset`
pub fn wgs84_bounds(tif: &Path, offset: AlignOffset) -> SceneResult<BoundingBox> {
    let mut source = BufReader::new(File::open(tif)?);
    let profile = GeoTiff::open(&mut source)?.profile();
    let crs = profile
        .crs
        .ok_or_else(|| SceneError::InvalidData(format!("{} has no CRS", tif.display())))?;

    let bounds = profile.bounds();
    let bounds = if crs == CoordinateSystem::WGS84 {
        bounds
    } else {
        CoordinateTransformer::new(crs, CoordinateSystem::WGS84)?.transform_bounds(&bounds, DENSIFY_POINTS)?
    };
    debug!("WGS84 bounds of {}: {:?}", tif.display(), bounds.as_tuple());
    Ok(offset.apply(&bounds))
}
