//! Resampling kernels and same-CRS grid resampling
//!
//! Source positions are fractional pixel coordinates where (0, 0) is the
//! outer top-left corner of the source raster and pixel (c, r) has its
//! centre at (c + 0.5, r + 0.5).

use std::fmt;
use std::str::FromStr;

use log::debug;
use ndarray::{Array2, ArrayView2};

use crate::errors::{SceneError, SceneResult};
use crate::raster::dtype::DataType;
use crate::raster::grid::AlignedGrid;
use crate::raster::transform::GeoTransform;

/// Resampling kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resampling {
    Nearest,
    Bilinear,
    Cubic,
    Average,
    Mode,
    Max,
    Min,
    Med,
    Q1,
    Q3,
}

impl Resampling {
    pub const ALL: [Resampling; 10] = [
        Resampling::Nearest,
        Resampling::Bilinear,
        Resampling::Cubic,
        Resampling::Average,
        Resampling::Mode,
        Resampling::Max,
        Resampling::Min,
        Resampling::Med,
        Resampling::Q1,
        Resampling::Q3,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Resampling::Nearest => "nearest",
            Resampling::Bilinear => "bilinear",
            Resampling::Cubic => "cubic",
            Resampling::Average => "average",
            Resampling::Mode => "mode",
            Resampling::Max => "max",
            Resampling::Min => "min",
            Resampling::Med => "med",
            Resampling::Q1 => "q1",
            Resampling::Q3 => "q3",
        }
    }

    /// Kernels evaluated at a single source position
    pub fn is_point(&self) -> bool {
        matches!(self, Resampling::Nearest | Resampling::Bilinear | Resampling::Cubic)
    }

    /// Comma separated list of every kernel name
    pub fn supported() -> String {
        Resampling::ALL.iter().map(|r| r.name()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for Resampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resampling {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        let name = if name == "median" { "med".to_string() } else { name };
        Resampling::ALL
            .iter()
            .copied()
            .find(|r| r.name() == name)
            .ok_or_else(|| SceneError::InvalidRequest(format!(
                "Unsupported resampling method '{}'; supported: {}", s, Resampling::supported())))
    }
}

/// Source pixels with their nodata value
pub struct SourceRaster<'a> {
    data: ArrayView2<'a, f64>,
    nodata: Option<f64>,
}

impl<'a> SourceRaster<'a> {
    pub fn new(data: ArrayView2<'a, f64>, nodata: Option<f64>) -> Self {
        SourceRaster { data, nodata }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Pixel value unless outside the raster, NaN or nodata
    fn valid(&self, col: isize, row: isize) -> Option<f64> {
        if col < 0 || row < 0 || col as usize >= self.width() || row as usize >= self.height() {
            return None;
        }
        let v = self.data[[row as usize, col as usize]];
        if v.is_nan() || self.nodata.map_or(false, |nd| v == nd) {
            None
        } else {
            Some(v)
        }
    }

    fn contains(&self, fx: f64, fy: f64) -> bool {
        fx >= 0.0 && fy >= 0.0 && fx < self.width() as f64 && fy < self.height() as f64
    }

    /// Point kernel evaluated at (`fx`, `fy`)
    ///
    /// Neighbours that are nodata or off the raster drop out and the
    /// remaining weights are renormalised.
    pub fn sample_point(&self, kernel: Resampling, fx: f64, fy: f64) -> Option<f64> {
        if !self.contains(fx, fy) {
            return None;
        }
        let nearest = self.valid(fx.floor() as isize, fy.floor() as isize);

        let (x, y) = (fx - 0.5, fy - 0.5);
        let (x0, y0) = (x.floor(), y.floor());
        let (dx, dy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as isize, y0 as isize);

        let (taps, weight): (std::ops::RangeInclusive<isize>, fn(f64) -> f64) = match kernel {
            Resampling::Bilinear => (0..=1, |t| (1.0 - t.abs()).max(0.0)),
            Resampling::Cubic => (-1..=2, catmull_rom),
            _ => return nearest,
        };

        let mut sum = 0.0;
        let mut weights = 0.0;
        for j in taps.clone() {
            let wy = weight(j as f64 - dy);
            for i in taps.clone() {
                let w = wy * weight(i as f64 - dx);
                if w == 0.0 {
                    continue;
                }
                if let Some(v) = self.valid(x0 + i, y0 + j) {
                    sum += w * v;
                    weights += w;
                }
            }
        }

        if weights.abs() < 1e-12 {
            nearest
        } else {
            Some(sum / weights)
        }
    }

    /// Aggregate kernel over the source rectangle `[x0, x1) x [y0, y1)`
    ///
    /// Pixels whose centres fall inside the rectangle contribute; when none
    /// do (upsampling) the pixel under the rectangle centre is used.
    pub fn sample_area(&self, kernel: Resampling, x0: f64, y0: f64, x1: f64, y1: f64) -> Option<f64> {
        let c_start = ((x0 - 0.5).ceil().max(0.0)) as usize;
        let c_end = ((x1 - 0.5).ceil().max(0.0) as usize).min(self.width());
        let r_start = ((y0 - 0.5).ceil().max(0.0)) as usize;
        let r_end = ((y1 - 0.5).ceil().max(0.0) as usize).min(self.height());

        let mut values = Vec::new();
        for r in r_start..r_end {
            for c in c_start..c_end {
                if let Some(v) = self.valid(c as isize, r as isize) {
                    values.push(v);
                }
            }
        }

        if values.is_empty() {
            return self.sample_point(Resampling::Nearest, (x0 + x1) / 2.0, (y0 + y1) / 2.0);
        }
        Some(aggregate(kernel, &mut values))
    }
}

/// Catmull-Rom cubic convolution weight
fn catmull_rom(t: f64) -> f64 {
    let a = -0.5;
    let t = t.abs();
    if t <= 1.0 {
        ((a + 2.0) * t - (a + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((a * t - 5.0 * a) * t + 8.0 * a) * t - 4.0 * a
    } else {
        0.0
    }
}

/// Element of sorted `values` at quantile `q`
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let idx = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Reduces a non-empty set of values with an aggregate kernel
fn aggregate(kernel: Resampling, values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    match kernel {
        Resampling::Average => values.iter().sum::<f64>() / values.len() as f64,
        Resampling::Max => values[values.len() - 1],
        Resampling::Min => values[0],
        Resampling::Med => quantile(values, 0.5),
        Resampling::Q1 => quantile(values, 0.25),
        Resampling::Q3 => quantile(values, 0.75),
        Resampling::Mode => {
            // Longest run in sorted order, smallest value on ties
            let (mut best, mut best_len) = (values[0], 0);
            let mut i = 0;
            while i < values.len() {
                let mut j = i;
                while j < values.len() && values[j] == values[i] {
                    j += 1;
                }
                if j - i > best_len {
                    best = values[i];
                    best_len = j - i;
                }
                i = j;
            }
            best
        }
        _ => quantile(values, 0.5),
    }
}

/// Resamples `src` onto `grid`, both in the same CRS
///
/// Destination pixels without a source value get `dst_nodata`, or NaN when
/// there is none; every value is cast to `dtype` afterwards.
pub fn resample(
    src: &Array2<f64>,
    src_transform: &GeoTransform,
    src_nodata: Option<f64>,
    grid: &AlignedGrid,
    kernel: Resampling,
    dtype: DataType,
    dst_nodata: Option<f64>,
) -> SceneResult<Array2<f64>> {
    if src_transform.inverse().is_none() {
        return Err(SceneError::InvalidData("Source transform is not invertible".to_string()));
    }
    debug!(
        "Resampling {}x{} -> {}x{} with {}",
        src.ncols(), src.nrows(), grid.width, grid.height, kernel
    );

    let source = SourceRaster::new(src.view(), src_nodata);
    let fill = dst_nodata.unwrap_or(f64::NAN);
    let to_source = |col: f64, row: f64| {
        let (x, y) = grid.transform.apply(col, row);
        src_transform.to_pixel(x, y).unwrap_or((f64::NAN, f64::NAN))
    };

    let out = Array2::from_shape_fn(grid.shape(), |(r, c)| {
        let value = if kernel.is_point() {
            let (fx, fy) = to_source(c as f64 + 0.5, r as f64 + 0.5);
            source.sample_point(kernel, fx, fy)
        } else {
            let (ax, ay) = to_source(c as f64, r as f64);
            let (bx, by) = to_source(c as f64 + 1.0, r as f64 + 1.0);
            source.sample_area(kernel, ax.min(bx), ay.min(by), ax.max(bx), ay.max(by))
        };
        dtype.cast(value.unwrap_or(fill))
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::CoordinateSystem;
    use crate::raster::profile::RasterProfile;

    fn grid_for(width: usize, height: usize, res: f64) -> AlignedGrid {
        AlignedGrid::of_profile(&RasterProfile::new(
            Some(CoordinateSystem::UTM(33, true)),
            GeoTransform::new(0.0, res, 0.0, -res),
            width,
            height,
            DataType::Float64,
        ))
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Bilinear".parse::<Resampling>().unwrap(), Resampling::Bilinear);
        assert_eq!("median".parse::<Resampling>().unwrap(), Resampling::Med);
        let err = "lanczos".parse::<Resampling>().unwrap_err();
        assert!(matches!(err, SceneError::InvalidRequest(_)));
        assert!(err.to_string().contains("q3"));
    }

    #[test]
    fn test_identity_grid_is_exact() {
        let src = Array2::from_shape_fn((4, 4), |(r, c)| (r * 4 + c) as f64);
        let transform = GeoTransform::new(0.0, 10.0, 0.0, -10.0);
        for kernel in Resampling::ALL {
            let out = resample(&src, &transform, None, &grid_for(4, 4, 10.0), kernel, DataType::Float64, None).unwrap();
            assert_eq!(out, src, "kernel {}", kernel);
        }
    }

    #[test]
    fn test_downsample_aggregates() {
        let src = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 2.0, 7.0]).unwrap();
        let transform = GeoTransform::new(0.0, 10.0, 0.0, -10.0);
        let grid = grid_for(1, 1, 20.0);
        let run = |k| resample(&src, &transform, None, &grid, k, DataType::Float64, None).unwrap()[[0, 0]];
        assert_eq!(run(Resampling::Average), 3.0);
        assert_eq!(run(Resampling::Mode), 2.0);
        assert_eq!(run(Resampling::Max), 7.0);
        assert_eq!(run(Resampling::Min), 1.0);
        assert_eq!(run(Resampling::Med), 2.0);
        assert_eq!(run(Resampling::Q1), 2.0);
        assert_eq!(run(Resampling::Q3), 2.0);
        assert_eq!(run(Resampling::Bilinear), 3.0);
    }

    #[test]
    fn test_nodata_excluded_and_cast() {
        let src = Array2::from_shape_vec((2, 2), vec![0.0, 3.0, 4.0, 0.0]).unwrap();
        let transform = GeoTransform::new(0.0, 10.0, 0.0, -10.0);
        let out = resample(&src, &transform, Some(0.0), &grid_for(1, 1, 20.0),
                           Resampling::Average, DataType::UInt8, Some(0.0)).unwrap();
        assert_eq!(out[[0, 0]], 4.0);
    }

    #[test]
    fn test_outside_footprint_gets_fill() {
        let src = Array2::from_elem((2, 2), 5.0);
        let transform = GeoTransform::new(0.0, 10.0, 0.0, -10.0);
        let grid = grid_for(4, 4, 10.0);
        let out = resample(&src, &transform, None, &grid, Resampling::Nearest, DataType::Float32, None).unwrap();
        assert_eq!(out[[1, 1]], 5.0);
        assert!(out[[3, 3]].is_nan());
    }
}
