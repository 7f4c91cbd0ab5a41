//! Valid/invalid pixel masks from the scene classification layer

use std::path::Path;

use log::{debug, info};
use ndarray::{Array2, Array3, Axis};

use crate::errors::SceneResult;
use crate::product::reader::ProductReader;
use crate::raster::resampling::resample;
use crate::raster::{AlignedGrid, DataType, RasterProfile, Resampling};
use crate::tiff::{write_geotiff_file, WriteOptions};

/// How a mask is derived from the classification raster
#[derive(Debug, Clone, PartialEq)]
pub struct MaskOptions {
    /// Output pixel size in metres; `None` keeps the native grid
    pub target_resolution: Option<u32>,
    /// Kernel applied to the classification codes when regridding
    pub resampling: Resampling,
    /// `true`: mask is true where valid. `false`: true where invalid
    pub invert: bool,
}

impl Default for MaskOptions {
    fn default() -> Self {
        MaskOptions { target_resolution: None, resampling: Resampling::Nearest, invert: true }
    }
}

/// Boolean mask and the grid it lives on (profile dtype is UInt8)
#[derive(Debug, Clone)]
pub struct ValidityMask {
    pub mask: Array2<bool>,
    pub profile: RasterProfile,
}

impl ValidityMask {
    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|v| **v).count()
    }

    /// Mask as 0/1 values, one band
    pub fn to_array(&self) -> Array3<f64> {
        self.mask.mapv(|v| if v { 1.0 } else { 0.0 }).insert_axis(Axis(0))
    }
}

fn classify(codes: &Array2<f64>, invalid_codes: &[u8], invert: bool) -> Array2<bool> {
    codes.mapv(|v| {
        let invalid = invalid_codes.iter().any(|c| *c as f64 == v);
        invalid != invert
    })
}

impl ProductReader {
    /// Builds a validity mask from the classification raster
    ///
    /// When a target resolution other than the native one is requested the
    /// classification codes are regridded first and the mask is computed
    /// from the regridded codes, so no kernel ever blends mask values.
    ///
    /// # Errors
    /// `MissingData` when the product has no classification raster.
    pub fn build_valid_mask(&self, invalid_codes: &[u8], options: &MaskOptions) -> SceneResult<ValidityMask> {
        let (codes, profile, native) = self.read_classification()?;

        let (codes, grid) = match options.target_resolution {
            Some(target) if target != native => {
                let grid = AlignedGrid::rescaled(&profile, native as f64, target as f64);
                debug!(
                    "Regridding classification {}m -> {}m ({}x{}) with {}",
                    native, target, grid.width, grid.height, options.resampling
                );
                let regridded = resample(
                    &codes,
                    &profile.transform,
                    profile.nodata,
                    &grid,
                    options.resampling,
                    profile.dtype,
                    profile.nodata,
                )?;
                (regridded, grid)
            }
            _ => (codes, AlignedGrid::of_profile(&profile)),
        };

        let mask = classify(&codes, invalid_codes, options.invert);
        let profile = grid.profile(DataType::UInt8, 1, None);
        let result = ValidityMask { mask, profile };
        info!(
            "Validity mask {}x{}: {} of {} pixels set",
            result.profile.width,
            result.profile.height,
            result.valid_count(),
            result.mask.len()
        );
        Ok(result)
    }
}

/// Writes a mask as a single-band UInt8 GeoTIFF of 0/1 values
pub fn write_mask(path: &Path, mask: &ValidityMask) -> SceneResult<()> {
    write_geotiff_file(path, &mask.to_array(), &mask.profile, &WriteOptions::default())?;
    Ok(())
}
