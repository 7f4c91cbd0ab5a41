//! Basemap-aligned exports
//!
//! Every export goes native CRS -> Web Mercator -> WGS84 with nearest
//! neighbour sampling in both stages. Composites get a per-channel
//! percentile stretch to 8 bits and, optionally, an alpha band marking the
//! reprojected footprint.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use ndarray::{Array2, Array3, Axis};

use crate::coordinate::{BoundingBox, CoordinateSystem};
use crate::errors::{SceneError, SceneResult};
use crate::product::reader::{BandRead, OpenedBand, ProductReader};
use crate::product::stack::predictor_for;
use crate::raster::resampling::resample;
use crate::raster::stretch::percentile_stretch;
use crate::raster::warp::{calculate_default_transform, reproject};
use crate::raster::window::split_grid;
use crate::raster::{AlignedGrid, DataType, RasterProfile, Resampling, Window};
use crate::tiff::{write_geotiff_file, WriteOptions};
use crate::utils::progress::ProgressTracker;

/// CRS of the first reprojection stage
pub const INTERMEDIATE_CRS: CoordinateSystem = CoordinateSystem::WebMercator;

/// CRS every export is written in
pub const OUTPUT_CRS: CoordinateSystem = CoordinateSystem::WGS84;

/// Bands composed into red, green and blue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbBands {
    pub red: String,
    pub green: String,
    pub blue: String,
}

impl Default for RgbBands {
    fn default() -> Self {
        RgbBands { red: "B04".to_string(), green: "B03".to_string(), blue: "B02".to_string() }
    }
}

impl RgbBands {
    fn as_array(&self) -> [&str; 3] {
        [&self.red, &self.green, &self.blue]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Native resolution to read bands at; `None` picks each band's finest
    pub resolution: Option<u32>,
    pub bands: RgbBands,
    pub low_percentile: f64,
    pub high_percentile: f64,
    /// Row bands of the tiled export
    pub grid_rows: usize,
    /// Column bands of the tiled export
    pub grid_cols: usize,
    pub show_progress: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            resolution: None,
            bands: RgbBands::default(),
            low_percentile: 2.0,
            high_percentile: 98.0,
            grid_rows: 3,
            grid_cols: 3,
            show_progress: false,
        }
    }
}

/// Output of one composite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composite {
    Rgb,
    Rgba,
}

impl Composite {
    pub fn has_alpha(&self) -> bool {
        matches!(self, Composite::Rgba)
    }

    pub fn band_count(&self) -> usize {
        if self.has_alpha() { 4 } else { 3 }
    }
}

/// Exporter bound to one product
pub struct ReprojectionExporter<'a> {
    reader: &'a ProductReader,
    options: ExportOptions,
}

impl<'a> ReprojectionExporter<'a> {
    pub fn new(reader: &'a ProductReader, options: ExportOptions) -> Self {
        ReprojectionExporter { reader, options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Exports one band with its own data type and nodata
    ///
    /// A source without nodata gives an output without nodata.
    ///
    /// Fails with `InvalidData` before anything is written when the band
    /// has no CRS.
    pub fn export_single(&self, band: &str, out_path: &Path) -> SceneResult<RasterProfile> {
        let read = self.reader.read_band(band, self.options.resolution)?;
        require_crs(&read.band, &read.profile)?;

        let dtype = read.profile.dtype;
        let nodata = read.profile.nodata;
        let (mut channels, profile) =
            reproject_two_stage(&[(&read.data, &read.profile)], &read.profile, dtype, nodata)?;

        let profile = profile.with_dtype(dtype).with_nodata(nodata);
        let data = channels.remove(0).insert_axis(Axis(0));
        let options = WriteOptions::default().with_predictor(predictor_for(&profile));
        write_geotiff_file(out_path, &data, &profile, &options)?;
        info!("Exported {} to {} ({}x{})", band, out_path.display(), profile.width, profile.height);
        Ok(profile)
    }

    /// Exports an 8-bit RGB or RGBA composite
    pub fn export_composite(&self, kind: Composite, out_path: &Path) -> SceneResult<RasterProfile> {
        let [red, green, blue] = self.read_rgb()?;
        let inputs = [(&red.data, &red.profile), (&green.data, &green.profile), (&blue.data, &blue.profile)];
        let (channels, profile) = reproject_two_stage(&inputs, &red.profile, DataType::Float64, None)?;

        let (data, profile) = self.compose(&channels, &profile, kind);
        write_composite(out_path, &data, &profile, kind)?;
        info!("Exported {:?} composite to {} ({}x{})", kind, out_path.display(), profile.width, profile.height);
        Ok(profile)
    }

    /// Splits the RGB bands into a grid and exports every patch as RGBA
    ///
    /// Patches are named `<tile>_<n>.tif` with `n` counted row-major from
    /// 1. Each patch is reprojected from its own window, so neighbouring
    /// patches may differ along their shared edge. Empty or unprojectable
    /// patches are skipped with a warning.
    ///
    /// Bands are decoded one patch window at a time, never whole.
    pub fn export_grid(&self, out_dir: &Path) -> SceneResult<Vec<PathBuf>> {
        let rows = self.options.grid_rows;
        let cols = self.options.grid_cols;
        if rows == 0 || cols == 0 {
            return Err(SceneError::InvalidRequest(format!("Cannot split into a {}x{} grid", rows, cols)));
        }

        let bands = self.open_rgb()?;
        let tile_id = self.reader.tile_identifier();
        fs::create_dir_all(out_dir)?;

        let reference = bands[0].profile();
        let windows = split_grid(reference.width, reference.height, rows, cols);
        let progress = if self.options.show_progress {
            ProgressTracker::new(windows.len() as u64, "Exporting patches")
        } else {
            ProgressTracker::hidden(windows.len() as u64)
        };

        let mut written = Vec::with_capacity(windows.len());
        for (i, window) in windows.iter().enumerate() {
            let path = out_dir.join(format!("{}_{}.tif", tile_id, i + 1));
            progress.set_message(&format!("patch {}", i + 1));

            match self.export_patch(window, &bands, &path) {
                Ok(()) => written.push(path),
                Err(e @ (SceneError::InvalidData(_) | SceneError::Projection(_))) => {
                    warn!("Skipping patch {} ({:?}): {}", i + 1, window, e);
                }
                Err(e) => return Err(e),
            }
            progress.increment(1);
        }
        progress.finish();

        info!("Exported {} of {} patches to {}", written.len(), windows.len(), out_dir.display());
        Ok(written)
    }

    fn export_patch(&self, window: &Window, bands: &[OpenedBand; 3], path: &Path) -> SceneResult<()> {
        if window.is_empty() {
            return Err(SceneError::InvalidData(format!("Empty window {:?}", window)));
        }

        let reference = bands[0].profile();
        let patch_profile = RasterProfile::new(
            reference.crs,
            reference.transform.window(window.col_off, window.row_off),
            window.width,
            window.height,
            reference.dtype,
        )
        .with_nodata(reference.nodata);
        let crops = bands
            .iter()
            .map(|band| read_patch(band, window, &patch_profile))
            .collect::<SceneResult<Vec<_>>>()?;
        let inputs: Vec<(&Array2<f64>, &RasterProfile)> = crops.iter().map(|c| (c, &patch_profile)).collect();

        let (channels, profile) = reproject_two_stage(&inputs, &patch_profile, DataType::Float64, None)?;
        let (data, profile) = self.compose(&channels, &profile, Composite::Rgba);
        write_composite(path, &data, &profile, Composite::Rgba)
    }

    /// Opens red, green and blue, which must share one CRS
    fn open_rgb(&self) -> SceneResult<[OpenedBand; 3]> {
        let [r, g, b] = self.options.bands.as_array();
        let red = self.reader.open_band(r, self.options.resolution)?;
        let red_crs = require_crs(&red.band, red.profile())?;

        let green = self.reader.open_band(g, self.options.resolution)?;
        let blue = self.reader.open_band(b, self.options.resolution)?;
        for other in [&green, &blue] {
            if other.profile().crs != Some(red_crs) {
                return Err(SceneError::InvalidData(format!(
                    "CRS mismatch between bands ({} vs {})", other.band, red.band)));
            }
        }
        Ok([red, green, blue])
    }

    fn read_rgb(&self) -> SceneResult<[BandRead; 3]> {
        let [red, green, blue] = self.open_rgb()?;
        Ok([red.read()?, green.read()?, blue.read()?])
    }

    fn compose(&self, channels: &[Array2<f64>], profile: &RasterProfile, kind: Composite) -> (Array3<f64>, RasterProfile) {
        let data = compose_channels(channels, self.options.low_percentile, self.options.high_percentile, kind.has_alpha());
        let nodata = if kind.has_alpha() { None } else { Some(0.0) };
        let profile = profile
            .clone()
            .with_dtype(DataType::UInt8)
            .with_count(kind.band_count())
            .with_nodata(nodata);
        (data, profile)
    }
}

fn require_crs(band: &str, profile: &RasterProfile) -> SceneResult<CoordinateSystem> {
    profile
        .crs
        .ok_or_else(|| SceneError::InvalidData(format!("Source CRS is missing on {}", band)))
}

/// Pixels of `band` on the grid of one patch
///
/// A band on the patch's parent grid is read through the same window.
/// Any other band is read over the window covering the patch and
/// resampled onto it with nearest neighbour.
fn read_patch(band: &OpenedBand, window: &Window, patch: &RasterProfile) -> SceneResult<Array2<f64>> {
    let profile = band.profile();
    if profile.transform.window(window.col_off, window.row_off) == patch.transform
        && profile.crs == patch.crs
        && window.end_col() <= profile.width
        && window.end_row() <= profile.height
    {
        return band.source.read_window(window);
    }

    let covering = covering_window(profile, &patch.bounds());
    if covering.is_empty() {
        return Err(SceneError::InvalidData(format!("{} does not cover patch {:?}", band.band, window)));
    }
    debug!("Resampling {} window {:?} onto patch {:?}", band.band, covering, window);
    let data = band.source.read_window(&covering)?;
    resample(
        &data,
        &profile.transform.window(covering.col_off, covering.row_off),
        profile.nodata,
        &AlignedGrid::of_profile(patch),
        Resampling::Nearest,
        profile.dtype,
        profile.nodata,
    )
}

/// Smallest pixel window of `profile` containing `bounds`, clipped to the raster
pub fn covering_window(profile: &RasterProfile, bounds: &BoundingBox) -> Window {
    let corners = [
        (bounds.min_x, bounds.min_y),
        (bounds.min_x, bounds.max_y),
        (bounds.max_x, bounds.min_y),
        (bounds.max_x, bounds.max_y),
    ];
    let pixels: Vec<(f64, f64)> = corners
        .iter()
        .filter_map(|&(x, y)| profile.transform.to_pixel(x, y))
        .collect();
    if pixels.is_empty() {
        return Window::new(0, 0, 0, 0);
    }

    let clip = |v: f64, hi: usize| v.max(0.0).min(hi as f64) as usize;
    let col0 = clip(pixels.iter().map(|p| p.0).fold(f64::INFINITY, f64::min).floor(), profile.width);
    let col1 = clip(pixels.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max).ceil(), profile.width);
    let row0 = clip(pixels.iter().map(|p| p.1).fold(f64::INFINITY, f64::min).floor(), profile.height);
    let row1 = clip(pixels.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max).ceil(), profile.height);
    Window::new(col0, row0, col1 - col0, row1 - row0)
}

/// Reprojects channels onto one shared grid in `OUTPUT_CRS`
///
/// Both destination grids are derived from `reference` only, so all
/// channels land on identical pixels. Pixels outside a channel's
/// footprint get `nodata`, or NaN without one.
pub fn reproject_two_stage(
    channels: &[(&Array2<f64>, &RasterProfile)],
    reference: &RasterProfile,
    dtype: DataType,
    nodata: Option<f64>,
) -> SceneResult<(Vec<Array2<f64>>, RasterProfile)> {
    let src_crs = reference
        .crs
        .ok_or_else(|| SceneError::InvalidData("Source CRS is undefined".to_string()))?;

    let (transform, width, height) =
        calculate_default_transform(src_crs, INTERMEDIATE_CRS, reference.width, reference.height, &reference.transform)?;
    let mid_profile = RasterProfile::new(Some(INTERMEDIATE_CRS), transform, width, height, dtype).with_nodata(nodata);
    let mid_grid = AlignedGrid::of_profile(&mid_profile);

    let (transform, width, height) = calculate_default_transform(INTERMEDIATE_CRS, OUTPUT_CRS, width, height, &transform)?;
    let out_profile = RasterProfile::new(Some(OUTPUT_CRS), transform, width, height, dtype).with_nodata(nodata);
    let out_grid = AlignedGrid::of_profile(&out_profile);
    debug!(
        "Two-stage grids: {}x{} in {}, {}x{} in {}",
        mid_grid.width, mid_grid.height, INTERMEDIATE_CRS, out_grid.width, out_grid.height, OUTPUT_CRS
    );

    let mut out = Vec::with_capacity(channels.len());
    for (data, profile) in channels {
        let mid = reproject(data, profile, &mid_grid, Resampling::Nearest, dtype, nodata)?;
        out.push(reproject(&mid, &mid_profile, &out_grid, Resampling::Nearest, dtype, nodata)?);
    }
    Ok((out, out_profile.with_count(channels.len())))
}

/// Stretches channels to 8 bits and masks everything outside the footprint
///
/// A pixel is inside the footprint when no channel is NaN there. Outside
/// it every channel is 0; with `alpha` a fourth band is 255 inside and 0
/// outside.
pub fn compose_channels(channels: &[Array2<f64>], low: f64, high: f64, alpha: bool) -> Array3<f64> {
    let Some(first) = channels.first() else {
        return Array3::zeros((0, 0, 0));
    };
    let (height, width) = first.dim();
    let valid = Array2::from_shape_fn((height, width), |idx| channels.iter().all(|c| !c[idx].is_nan()));

    let bands = channels.len() + usize::from(alpha);
    let mut out = Array3::zeros((bands, height, width));
    for (i, channel) in channels.iter().enumerate() {
        let mut stretched = percentile_stretch(channel, low, high);
        stretched.zip_mut_with(&valid, |v, ok| {
            if !*ok {
                *v = 0.0;
            }
        });
        out.index_axis_mut(Axis(0), i).assign(&stretched);
    }
    if alpha {
        out.index_axis_mut(Axis(0), channels.len())
            .assign(&valid.mapv(|ok| if ok { 255.0 } else { 0.0 }));
    }
    out
}

fn write_composite(path: &Path, data: &Array3<f64>, profile: &RasterProfile, kind: Composite) -> SceneResult<()> {
    let options = WriteOptions::default().with_predictor(1).with_alpha(kind.has_alpha());
    write_geotiff_file(path, data, profile, &options)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;

    #[test]
    fn test_alpha_follows_footprint() {
        let mut red = Array2::from_shape_fn((4, 4), |(r, c)| (r * 4 + c) as f64);
        let green = red.clone();
        let mut blue = red.clone();
        red[[0, 0]] = f64::NAN;
        blue[[3, 2]] = f64::NAN;

        let out = compose_channels(&[red.clone(), green.clone(), blue.clone()], 2.0, 98.0, true);
        assert_eq!(out.dim(), (4, 4, 4));
        for r in 0..4 {
            for c in 0..4 {
                let defined = !red[[r, c]].is_nan() && !green[[r, c]].is_nan() && !blue[[r, c]].is_nan();
                assert_eq!(out[[3, r, c]], if defined { 255.0 } else { 0.0 });
                if !defined {
                    assert!((0..3).all(|b| out[[b, r, c]] == 0.0));
                }
            }
        }
    }

    #[test]
    fn test_rgb_has_three_bands() {
        let band = Array2::from_elem((2, 2), 7.0);
        let out = compose_channels(&[band.clone(), band.clone(), band], 2.0, 98.0, false);
        assert_eq!(out.dim(), (3, 2, 2));
        // constant bands stretch to zero
        assert!(out.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_two_stage_shares_grid() {
        let profile = RasterProfile::new(
            Some(CoordinateSystem::UTM(33, true)),
            GeoTransform::new(300000.0, 10.0, 5000000.0, -10.0),
            30,
            20,
            DataType::UInt16,
        );
        let a = Array2::from_elem((20, 30), 1.0);
        let b = Array2::from_elem((20, 30), 2.0);
        let (out, out_profile) =
            reproject_two_stage(&[(&a, &profile), (&b, &profile)], &profile, DataType::Float64, None).unwrap();
        assert_eq!(out_profile.crs, Some(OUTPUT_CRS));
        assert_eq!(out_profile.count, 2);
        assert_eq!(out[0].dim(), out_profile.shape());
        assert_eq!(out[1].dim(), out_profile.shape());
        // same footprint in both channels
        assert!(out[0].iter().zip(out[1].iter()).all(|(x, y)| x.is_nan() == y.is_nan()));
        assert!(out[0].iter().any(|v| *v == 1.0));
    }

    #[test]
    fn test_missing_crs_rejected() {
        let profile = RasterProfile::new(None, GeoTransform::new(0.0, 1.0, 0.0, -1.0), 2, 2, DataType::UInt8);
        let a = Array2::zeros((2, 2));
        let err = reproject_two_stage(&[(&a, &profile)], &profile, DataType::UInt8, Some(0.0)).unwrap_err();
        assert!(matches!(err, SceneError::InvalidData(_)));
    }

    #[test]
    fn test_covering_window_of_finer_patch() {
        // 20 m band under a 10 m patch spanning pixels 3..7 x 2..5
        let coarse = RasterProfile::new(
            Some(CoordinateSystem::UTM(33, true)),
            GeoTransform::new(300000.0, 20.0, 5000000.0, -20.0),
            30,
            30,
            DataType::UInt16,
        );
        let fine = GeoTransform::new(300000.0, 10.0, 5000000.0, -10.0);
        let patch = fine.window(3, 2).bounds(4, 3);
        assert_eq!(covering_window(&coarse, &patch), Window::new(1, 1, 3, 2));

        // clipped at the raster edge
        let outside = GeoTransform::new(300580.0, 10.0, 5000000.0, -10.0).bounds(8, 2);
        assert_eq!(covering_window(&coarse, &outside), Window::new(29, 0, 1, 1));
    }
}
