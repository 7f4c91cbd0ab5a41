//! Affine pixel-to-world transform
//!
//! Coefficients follow the GDAL geotransform layout:
//! `x = origin_x + col * pixel_width + row * row_rotation`,
//! `y = origin_y + col * col_rotation + row * pixel_height`.
//! Pixel (0, 0) maps to the outer top-left corner of the raster.

use std::fmt;

use crate::coordinate::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform; `pixel_height` is normally negative
    pub fn new(origin_x: f64, pixel_width: f64, origin_y: f64, pixel_height: f64) -> Self {
        GeoTransform {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height,
        }
    }

    pub fn from_gdal(gt: [f64; 6]) -> Self {
        GeoTransform {
            origin_x: gt[0],
            pixel_width: gt[1],
            row_rotation: gt[2],
            origin_y: gt[3],
            col_rotation: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [self.origin_x, self.pixel_width, self.row_rotation,
         self.origin_y, self.col_rotation, self.pixel_height]
    }

    /// World coordinates of fractional pixel position (col, row)
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// World coordinates of the centre of pixel (col, row)
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    pub fn is_north_up(&self) -> bool {
        self.row_rotation == 0.0 && self.col_rotation == 0.0
    }

    /// Inverse mapping, `None` for a singular matrix
    pub fn inverse(&self) -> Option<GeoTransform> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let a = self.pixel_height / det;
        let b = -self.row_rotation / det;
        let d = -self.col_rotation / det;
        let e = self.pixel_width / det;
        Some(GeoTransform {
            origin_x: -(a * self.origin_x + b * self.origin_y),
            pixel_width: a,
            row_rotation: b,
            origin_y: -(d * self.origin_x + e * self.origin_y),
            col_rotation: d,
            pixel_height: e,
        })
    }

    /// Fractional pixel position of world point (`x`, `y`)
    ///
    /// North-up transforms divide directly so exact multiples of the pixel
    /// size land on exact pixel positions.
    pub fn to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if self.is_north_up() && self.pixel_width != 0.0 && self.pixel_height != 0.0 {
            return Some(((x - self.origin_x) / self.pixel_width, (y - self.origin_y) / self.pixel_height));
        }
        self.inverse().map(|inv| inv.apply(x, y))
    }

    /// Pixel size along x and y, always positive
    pub fn resolution(&self) -> (f64, f64) {
        (
            self.pixel_width.hypot(self.col_rotation),
            self.row_rotation.hypot(self.pixel_height),
        )
    }

    /// Same origin, pixel size multiplied by (`sx`, `sy`)
    pub fn scale(&self, sx: f64, sy: f64) -> GeoTransform {
        GeoTransform {
            origin_x: self.origin_x,
            pixel_width: self.pixel_width * sx,
            row_rotation: self.row_rotation * sy,
            origin_y: self.origin_y,
            col_rotation: self.col_rotation * sx,
            pixel_height: self.pixel_height * sy,
        }
    }

    /// Transform of a sub-window whose top-left pixel is (`col_off`, `row_off`)
    pub fn window(&self, col_off: usize, row_off: usize) -> GeoTransform {
        let (x, y) = self.apply(col_off as f64, row_off as f64);
        GeoTransform {
            origin_x: x,
            origin_y: y,
            ..*self
        }
    }

    /// Envelope of a `width` x `height` raster on this transform
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(width as f64, 0.0),
            self.apply(0.0, height as f64),
            self.apply(width as f64, height as f64),
        ];
        let mut bbox = BoundingBox::new(corners[0].0, corners[0].1, corners[0].0, corners[0].1);
        for &(x, y) in &corners[1..] {
            bbox.expand_to(x, y);
        }
        bbox
    }
}

impl fmt::Display for GeoTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "| {:.6}, {:.6}, {:.6} |\n| {:.6}, {:.6}, {:.6} |",
               self.pixel_width, self.row_rotation, self.origin_x,
               self.col_rotation, self.pixel_height, self.origin_y)
    }
}
