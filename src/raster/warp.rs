//! Cross-CRS reprojection
//!
//! Each destination pixel centre is carried back into the source raster
//! and sampled with a point kernel. Rows are transformed with a linear
//! approximation that is refined by bisection until the error at the
//! midpoint of every segment is below `APPROX_TOLERANCE` source pixels.

use log::debug;
use ndarray::Array2;

use crate::coordinate::{CoordinateSystem, CoordinateTransformer};
use crate::errors::{SceneError, SceneResult};
use crate::raster::dtype::DataType;
use crate::raster::grid::AlignedGrid;
use crate::raster::profile::RasterProfile;
use crate::raster::resampling::{Resampling, SourceRaster};
use crate::raster::transform::GeoTransform;

/// Maximum error of the row approximation, in source pixels
pub const APPROX_TOLERANCE: f64 = 0.125;

/// Samples per side when estimating the destination envelope
const EXTENT_SAMPLES: usize = 21;

/// Destination grid for reprojecting a raster into `dst_crs`
///
/// The source extent is sampled on a regular grid and carried into the
/// destination CRS. The pixel size keeps the number of pixels along the
/// diagonal of the envelope equal to the source diagonal.
///
/// # Returns
/// The destination transform, width and height
pub fn calculate_default_transform(
    src_crs: CoordinateSystem,
    dst_crs: CoordinateSystem,
    width: usize,
    height: usize,
    transform: &GeoTransform,
) -> SceneResult<(GeoTransform, usize, usize)> {
    if width == 0 || height == 0 {
        return Err(SceneError::InvalidData(format!("Cannot reproject an empty {}x{} raster", width, height)));
    }
    let transformer = CoordinateTransformer::new(src_crs, dst_crs)?;

    let steps = (EXTENT_SAMPLES - 1) as f64;
    let mut extent: Option<(f64, f64, f64, f64)> = None;
    for j in 0..EXTENT_SAMPLES {
        for i in 0..EXTENT_SAMPLES {
            let col = i as f64 * width as f64 / steps;
            let row = j as f64 * height as f64 / steps;
            let (x, y) = transform.apply(col, row);
            let Some((dx, dy)) = transformer.try_transform(x, y) else {
                continue;
            };
            extent = Some(match extent {
                None => (dx, dy, dx, dy),
                Some((min_x, min_y, max_x, max_y)) => (min_x.min(dx), min_y.min(dy), max_x.max(dx), max_y.max(dy)),
            });
        }
    }

    let (min_x, min_y, max_x, max_y) = extent.ok_or_else(|| {
        SceneError::Projection(format!("Raster extent does not transform from {} to {}", src_crs, dst_crs))
    })?;

    let diagonal = (max_x - min_x).hypot(max_y - min_y);
    let pixel_diagonal = (width as f64).hypot(height as f64);
    let res = diagonal / pixel_diagonal;
    if !(res > 0.0 && res.is_finite()) {
        return Err(SceneError::Projection(format!("Degenerate destination extent in {}", dst_crs)));
    }

    let out_width = (((max_x - min_x) / res + 0.5) as usize).max(1);
    let out_height = (((max_y - min_y) / res + 0.5) as usize).max(1);
    debug!("Default grid in {}: {}x{} at {:.9}", dst_crs, out_width, out_height, res);

    Ok((GeoTransform::new(min_x, res, max_y, -res), out_width, out_height))
}

/// Destination-to-source pixel mapping with row-wise linear approximation
struct ApproxTransformer<'a> {
    transformer: CoordinateTransformer,
    dst_transform: &'a GeoTransform,
    src_transform: &'a GeoTransform,
}

impl<'a> ApproxTransformer<'a> {
    fn exact(&self, col: usize, row: f64) -> Option<(f64, f64)> {
        let (x, y) = self.dst_transform.apply(col as f64 + 0.5, row);
        let (sx, sy) = self.transformer.try_transform(x, y)?;
        self.src_transform.to_pixel(sx, sy)
    }

    /// Source positions for every pixel centre of destination `row`
    fn row(&self, row: usize, width: usize) -> Vec<Option<(f64, f64)>> {
        let mut out = vec![None; width];
        if width > 0 {
            self.fill(row as f64 + 0.5, 0, width - 1, &mut out);
        }
        out
    }

    fn fill(&self, y: f64, start: usize, end: usize, out: &mut [Option<(f64, f64)>]) {
        if end - start < 2 {
            for (col, slot) in out.iter_mut().enumerate().take(end + 1).skip(start) {
                *slot = self.exact(col, y);
            }
            return;
        }

        let mid = (start + end) / 2;
        if let (Some(a), Some(b), Some(m)) = (self.exact(start, y), self.exact(end, y), self.exact(mid, y)) {
            let span = (end - start) as f64;
            let t = (mid - start) as f64 / span;
            let err = (a.0 + (b.0 - a.0) * t - m.0).abs().max((a.1 + (b.1 - a.1) * t - m.1).abs());
            if err <= APPROX_TOLERANCE {
                for (col, slot) in out.iter_mut().enumerate().take(end + 1).skip(start) {
                    let t = (col - start) as f64 / span;
                    *slot = Some((a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t));
                }
                return;
            }
        }

        self.fill(y, start, mid, out);
        self.fill(y, mid, end, out);
    }
}

/// Reprojects `src` described by `src_profile` onto `grid`
///
/// Only point kernels are accepted. Destination pixels outside the source
/// footprint, or whose source sample is nodata, get `dst_nodata` or NaN.
pub fn reproject(
    src: &Array2<f64>,
    src_profile: &RasterProfile,
    grid: &AlignedGrid,
    kernel: Resampling,
    dtype: DataType,
    dst_nodata: Option<f64>,
) -> SceneResult<Array2<f64>> {
    if !kernel.is_point() {
        return Err(SceneError::InvalidRequest(format!(
            "Resampling '{}' is not supported across coordinate systems; use nearest, bilinear or cubic", kernel)));
    }
    let src_crs = src_profile
        .crs
        .ok_or_else(|| SceneError::InvalidData("Source CRS is undefined".to_string()))?;
    let dst_crs = grid
        .crs
        .ok_or_else(|| SceneError::InvalidData("Destination CRS is undefined".to_string()))?;
    if src_profile.transform.inverse().is_none() {
        return Err(SceneError::InvalidData("Source transform is not invertible".to_string()));
    }

    debug!(
        "Reprojecting {}x{} {} -> {}x{} {} with {}",
        src_profile.width, src_profile.height, src_crs, grid.width, grid.height, dst_crs, kernel
    );

    let approx = ApproxTransformer {
        transformer: CoordinateTransformer::new(dst_crs, src_crs)?,
        dst_transform: &grid.transform,
        src_transform: &src_profile.transform,
    };
    let source = SourceRaster::new(src.view(), src_profile.nodata);
    let fill = dst_nodata.unwrap_or(f64::NAN);

    let mut out = Array2::from_elem(grid.shape(), dtype.cast(fill));
    for (r, mut row) in out.rows_mut().into_iter().enumerate() {
        for (slot, pos) in row.iter_mut().zip(approx.row(r, grid.width)) {
            if let Some((fx, fy)) = pos {
                if let Some(v) = source.sample_point(kernel, fx, fy) {
                    *slot = dtype.cast(v);
                }
            }
        }
    }
    Ok(out)
}

/// Reprojects onto the default grid of `dst_crs`
pub fn reproject_default(
    src: &Array2<f64>,
    src_profile: &RasterProfile,
    dst_crs: CoordinateSystem,
    kernel: Resampling,
) -> SceneResult<(Array2<f64>, RasterProfile)> {
    let src_crs = src_profile
        .crs
        .ok_or_else(|| SceneError::InvalidData("Source CRS is undefined".to_string()))?;
    let (transform, width, height) =
        calculate_default_transform(src_crs, dst_crs, src_profile.width, src_profile.height, &src_profile.transform)?;
    let profile = RasterProfile::new(Some(dst_crs), transform, width, height, DataType::Float64)
        .with_nodata(None);
    let grid = AlignedGrid::of_profile(&profile);
    let data = reproject(src, src_profile, &grid, kernel, DataType::Float64, None)?;
    Ok((data, profile))
}
