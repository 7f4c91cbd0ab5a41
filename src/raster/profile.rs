//! Geometric and type description of a raster

use std::fmt;

use crate::coordinate::{BoundingBox, CoordinateSystem};
use crate::raster::dtype::DataType;
use crate::raster::transform::GeoTransform;

/// The seven fields that travel with every raster produced by the crate
#[derive(Debug, Clone, PartialEq)]
pub struct RasterProfile {
    /// Coordinate reference system, `None` when the source carried none
    pub crs: Option<CoordinateSystem>,
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
    pub dtype: DataType,
    /// Number of bands
    pub count: usize,
    pub nodata: Option<f64>,
}

impl RasterProfile {
    pub fn new(
        crs: Option<CoordinateSystem>,
        transform: GeoTransform,
        width: usize,
        height: usize,
        dtype: DataType,
    ) -> Self {
        RasterProfile {
            crs,
            transform,
            width,
            height,
            dtype,
            count: 1,
            nodata: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn with_dtype(mut self, dtype: DataType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Array shape `(height, width)` this profile describes
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Envelope in the profile's CRS
    pub fn bounds(&self) -> BoundingBox {
        self.transform
            .bounds(self.width, self.height)
            .with_epsg(self.crs.map(|c| c.epsg_code()))
    }

    /// Pixel size along x and y
    pub fn resolution(&self) -> (f64, f64) {
        self.transform.resolution()
    }

    /// True when both profiles put pixels at the same place
    pub fn same_grid(&self, other: &RasterProfile) -> bool {
        self.crs == other.crs
            && self.transform == other.transform
            && self.width == other.width
            && self.height == other.height
    }
}

impl fmt::Display for RasterProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let crs = self.crs.map(|c| c.to_string()).unwrap_or_else(|| "undefined".to_string());
        let nodata = self.nodata.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string());
        writeln!(f, "CRS: {}", crs)?;
        writeln!(f, "Size: {} x {} x {}", self.width, self.height, self.count)?;
        writeln!(f, "Data type: {}", self.dtype)?;
        writeln!(f, "Nodata: {}", nodata)?;
        write!(f, "Transform:\n{}", self.transform)
    }
}
