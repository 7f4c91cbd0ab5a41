//! Stacking bands of mixed native resolution onto one grid

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::{debug, info};
use ndarray::Array3;

use crate::archive::{is_native_resolution, NATIVE_RESOLUTIONS};
use crate::errors::{SceneError, SceneResult};
use crate::product::reader::{BandRead, ProductReader};
use crate::raster::resampling::resample;
use crate::raster::warp::reproject;
use crate::raster::{AlignedGrid, RasterProfile, Resampling};
use crate::tiff::{write_geotiff_file, WriteOptions};

/// Resolution of the common grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignTo {
    /// Finest resolution among the requested bands
    #[default]
    Min,
    /// Coarsest resolution among the requested bands
    Max,
    /// A fixed resolution of 10, 20 or 60 metres
    Resolution(u32),
}

impl AlignTo {
    /// Explicit resolution, rejected unless Sentinel-2 stores bands at it
    pub fn resolution(resolution: u32) -> SceneResult<Self> {
        if is_native_resolution(resolution) {
            Ok(AlignTo::Resolution(resolution))
        } else {
            Err(SceneError::InvalidRequest(format!(
                "align_to must be 'min', 'max', or one of {:?}, got {}", NATIVE_RESOLUTIONS, resolution)))
        }
    }

    /// Target resolution for bands opened at `natives`
    pub fn target(&self, natives: &[u32]) -> Option<u32> {
        match self {
            AlignTo::Min => natives.iter().copied().min(),
            AlignTo::Max => natives.iter().copied().max(),
            AlignTo::Resolution(r) => Some(*r),
        }
    }
}

impl fmt::Display for AlignTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignTo::Min => write!(f, "min"),
            AlignTo::Max => write!(f, "max"),
            AlignTo::Resolution(r) => write!(f, "{}", r),
        }
    }
}

impl FromStr for AlignTo {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "min" => Ok(AlignTo::Min),
            "max" => Ok(AlignTo::Max),
            other => {
                let res = other.trim_end_matches('m').parse::<u32>().map_err(|_| {
                    SceneError::InvalidRequest(format!(
                        "align_to must be 'min', 'max', or one of {:?}, got '{}'", NATIVE_RESOLUTIONS, s))
                })?;
                AlignTo::resolution(res)
            }
        }
    }
}

/// Parameters of a stacking call besides the band list
#[derive(Debug, Clone, PartialEq)]
pub struct StackOptions {
    /// Native resolution to open each band at; bands not listed use their finest
    pub native_resolutions: BTreeMap<String, u32>,
    pub align_to: AlignTo,
    pub resampling: Resampling,
    /// Regrid a lone band too instead of returning it as stored
    pub force_resample_single: bool,
}

impl Default for StackOptions {
    fn default() -> Self {
        StackOptions {
            native_resolutions: BTreeMap::new(),
            align_to: AlignTo::Min,
            resampling: Resampling::Bilinear,
            force_resample_single: false,
        }
    }
}

/// Bands on a common grid, in request order
#[derive(Debug, Clone)]
pub struct BandStack {
    pub bands: Vec<String>,
    pub data: Array3<f64>,
    pub profile: RasterProfile,
}

impl ProductReader {
    /// Reads `bands` and places them on one grid
    ///
    /// The grid comes from the first band already at the target
    /// resolution, or from the first band rescaled to it. Bands sitting on
    /// that grid are copied; the rest are resampled, and reprojected when
    /// their CRS differs.
    pub fn stack_bands<S: AsRef<str>>(&self, bands: &[S], options: &StackOptions) -> SceneResult<BandStack> {
        if bands.is_empty() {
            return Err(SceneError::InvalidRequest("No bands requested for stacking".to_string()));
        }

        let opened: Vec<BandRead> = bands
            .iter()
            .map(|b| {
                let band = b.as_ref();
                self.read_band(band, options.native_resolutions.get(band).copied())
            })
            .collect::<SceneResult<_>>()?;
        let names: Vec<String> = opened.iter().map(|b| b.band.clone()).collect();

        let natives: Vec<u32> = opened.iter().map(|b| b.resolution).collect();
        let target = options
            .align_to
            .target(&natives)
            .ok_or_else(|| SceneError::InvalidRequest("No bands requested for stacking".to_string()))?;

        if opened.len() == 1 && !options.force_resample_single {
            debug!("Single band {} returned on its native grid", names[0]);
            let band = &opened[0];
            let data = band.data.clone().insert_axis(ndarray::Axis(0));
            return Ok(BandStack { bands: names, data, profile: band.profile.clone().with_count(1) });
        }

        let reference = opened.iter().find(|b| b.resolution == target).unwrap_or(&opened[0]);
        let grid = if reference.resolution == target {
            AlignedGrid::of_profile(&reference.profile)
        } else {
            AlignedGrid::rescaled(&reference.profile, reference.resolution as f64, target as f64)
        };
        let dtype = reference.profile.dtype;
        let nodata = reference.profile.nodata;
        info!(
            "Stacking {:?} at {}m on {}x{} grid (reference {})",
            names, target, grid.width, grid.height, reference.band
        );

        let mut data = Array3::zeros((opened.len(), grid.height, grid.width));
        for (i, band) in opened.iter().enumerate() {
            let placed = if band.resolution == target && grid.matches(&band.profile) {
                debug!("{}: same grid, copied", band.band);
                band.data.mapv(|v| dtype.cast(v))
            } else if band.profile.crs == grid.crs {
                debug!("{}: resampled {}m -> {}m", band.band, band.resolution, target);
                resample(
                    &band.data,
                    &band.profile.transform,
                    band.profile.nodata,
                    &grid,
                    options.resampling,
                    dtype,
                    nodata,
                )?
            } else {
                debug!("{}: reprojected onto reference CRS", band.band);
                reproject(&band.data, &band.profile, &grid, options.resampling, dtype, nodata)?
            };
            data.index_axis_mut(ndarray::Axis(0), i).assign(&placed);
        }

        let profile = grid.profile(dtype, opened.len(), nodata);
        Ok(BandStack { bands: names, data, profile })
    }
}

/// Writes a stack as a multi-band GeoTIFF
///
/// Floating-point stacks use the horizontal predictor.
pub fn write_stack(path: &Path, stack: &BandStack) -> SceneResult<()> {
    let options = WriteOptions::default().with_predictor(predictor_for(&stack.profile));
    write_geotiff_file(path, &stack.data, &stack.profile, &options)?;
    Ok(())
}

/// Predictor 2 for floating-point rasters, 1 otherwise
pub(crate) fn predictor_for(profile: &RasterProfile) -> u16 {
    if profile.dtype.is_float() { 2 } else { 1 }
}
