//! Target pixel grids for resampling

use crate::coordinate::CoordinateSystem;
use crate::raster::dtype::DataType;
use crate::raster::profile::RasterProfile;
use crate::raster::transform::GeoTransform;

/// Grid every band is resampled onto before being combined
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedGrid {
    /// Pixel size in CRS units
    pub resolution: f64,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: Option<CoordinateSystem>,
}

impl AlignedGrid {
    /// Grid of an existing raster
    pub fn of_profile(profile: &RasterProfile) -> Self {
        AlignedGrid {
            resolution: profile.resolution().0,
            width: profile.width,
            height: profile.height,
            transform: profile.transform,
            crs: profile.crs,
        }
    }

    /// The raster's grid rescaled from `native` to `target` resolution
    ///
    /// Dimensions are `round(dim * native / target)` with ties to even and
    /// never below one pixel; pixel size scales by `dim / new_dim` so the
    /// extent is preserved up to rounding.
    pub fn rescaled(profile: &RasterProfile, native: f64, target: f64) -> Self {
        let factor = native / target;
        let width = scaled_dimension(profile.width, factor);
        let height = scaled_dimension(profile.height, factor);
        let transform = profile.transform.scale(
            profile.width as f64 / width as f64,
            profile.height as f64 / height as f64,
        );

        AlignedGrid {
            resolution: transform.resolution().0,
            width,
            height,
            transform,
            crs: profile.crs,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Profile of a raster laid out on this grid
    pub fn profile(&self, dtype: DataType, count: usize, nodata: Option<f64>) -> RasterProfile {
        RasterProfile::new(self.crs, self.transform, self.width, self.height, dtype)
            .with_count(count)
            .with_nodata(nodata)
    }

    /// True when `profile` already sits exactly on this grid
    pub fn matches(&self, profile: &RasterProfile) -> bool {
        self.crs == profile.crs
            && self.transform == profile.transform
            && self.width == profile.width
            && self.height == profile.height
    }
}

fn scaled_dimension(dim: usize, factor: f64) -> usize {
    ((dim as f64 * factor).round_ties_even() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_10m() -> RasterProfile {
        RasterProfile::new(
            Some(CoordinateSystem::UTM(33, true)),
            GeoTransform::new(300000.0, 10.0, 5000000.0, -10.0),
            60,
            60,
            DataType::UInt16,
        )
    }

    #[test]
    fn test_rescale_to_coarser() {
        let grid = AlignedGrid::rescaled(&profile_10m(), 10.0, 60.0);
        assert_eq!(grid.shape(), (10, 10));
        assert_eq!(grid.resolution, 60.0);
        assert_eq!(grid.transform.origin_x, 300000.0);
        assert_eq!(grid.transform.pixel_height, -60.0);
    }

    #[test]
    fn test_rescale_rounds_half_to_even() {
        let mut profile = profile_10m();
        profile.width = 5;
        profile.height = 7;
        let grid = AlignedGrid::rescaled(&profile, 10.0, 20.0);
        // 2.5 -> 2 and 3.5 -> 4
        assert_eq!(grid.width, 2);
        assert_eq!(grid.height, 4);
    }

    #[test]
    fn test_matches_own_profile() {
        let profile = profile_10m();
        assert!(AlignedGrid::of_profile(&profile).matches(&profile));
        assert!(!AlignedGrid::rescaled(&profile, 10.0, 20.0).matches(&profile));
    }
}
