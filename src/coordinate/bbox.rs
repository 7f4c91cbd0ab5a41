//! Bounding box structure

use super::point::Point;

/// Axis-aligned envelope (left, bottom, right, top) in some CRS
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    /// EPSG code of the coordinate system, if known
    pub epsg: Option<u32>,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox { min_x, min_y, max_x, max_y, epsg: None }
    }

    pub fn new_with_crs(min_x: f64, min_y: f64, max_x: f64, max_y: f64, epsg: u32) -> Self {
        BoundingBox { min_x, min_y, max_x, max_y, epsg: Some(epsg) }
    }

    pub fn with_epsg(mut self, epsg: Option<u32>) -> Self {
        self.epsg = epsg;
        self
    }

    /// Parse "minx,miny,maxx,maxy"
    pub fn from_string(bbox_str: &str) -> Result<Self, String> {
        let parts: Vec<f64> = bbox_str
            .split(',')
            .map(|p| p.trim().parse::<f64>().map_err(|_| format!("Invalid coordinate '{}'", p.trim())))
            .collect::<Result<_, _>>()?;
        match parts.as_slice() {
            [min_x, min_y, max_x, max_y] => Ok(BoundingBox::new(*min_x, *min_y, *max_x, *max_y)),
            _ => Err("Bounding box must have 4 comma-separated values".to_string()),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(self.min_x + self.width() / 2.0, self.min_y + self.height() / 2.0)
    }

    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.min_x && point.x <= self.max_x &&
            point.y >= self.min_y && point.y <= self.max_y
    }

    /// Grows the box to include (x, y)
    pub fn expand_to(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Points along the four edges, `per_edge` points each including corners
    pub fn edge_points(&self, per_edge: usize) -> Vec<Point> {
        let n = per_edge.max(2);
        let mut points = Vec::with_capacity(4 * n);
        for i in 0..n {
            let t = i as f64 / (n - 1) as f64;
            let x = self.min_x + t * self.width();
            let y = self.min_y + t * self.height();
            points.push(Point::new(x, self.min_y));
            points.push(Point::new(x, self.max_y));
            points.push(Point::new(self.min_x, y));
            points.push(Point::new(self.max_x, y));
        }
        points
    }

    /// (left, bottom, right, top)
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.min_x, self.min_y, self.max_x, self.max_y)
    }
}
