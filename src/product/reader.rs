//! Band access on a Sentinel-2 product archive

use std::path::Path;

use log::{debug, info};
use ndarray::Array2;

use crate::archive::{native_resolution_of_path, ArchiveIndex, BandReference, SceneArchive};
use crate::coordinate::{BoundingBox, CoordinateSystem};
use crate::errors::{SceneError, SceneResult};
use crate::product::source::{open_source, RasterSource};
use crate::raster::RasterProfile;

/// One band read from the archive
#[derive(Debug, Clone)]
pub struct BandRead {
    pub band: String,
    /// Native resolution of the entry that was read, in metres
    pub resolution: u32,
    pub data: Array2<f64>,
    pub profile: RasterProfile,
    pub crs: Option<CoordinateSystem>,
    pub bounds: BoundingBox,
}

/// A band entry opened for windowed reads
pub struct OpenedBand {
    pub band: String,
    pub resolution: u32,
    pub source: Box<dyn RasterSource>,
}

impl OpenedBand {
    pub fn profile(&self) -> &RasterProfile {
        self.source.profile()
    }

    /// Decodes the whole band
    pub fn read(self) -> SceneResult<BandRead> {
        let data = self.source.read()?;
        let profile = self.source.profile().clone();
        info!("Read {} at {}m: {}", self.band, self.resolution, profile);
        Ok(BandRead {
            band: self.band,
            resolution: self.resolution,
            crs: profile.crs,
            bounds: profile.bounds(),
            data,
            profile,
        })
    }
}

/// Reader over one zipped Sentinel-2 product
///
/// The entry index is built in `open` and read-only afterwards, so one
/// reader can serve any number of calls.
#[derive(Debug, Clone)]
pub struct ProductReader {
    archive: SceneArchive,
}

impl ProductReader {
    /// Opens and indexes the product at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> SceneResult<Self> {
        Ok(ProductReader { archive: SceneArchive::open(path)? })
    }

    pub fn path(&self) -> &Path {
        self.archive.path()
    }

    pub fn index(&self) -> &ArchiveIndex {
        self.archive.index()
    }

    pub fn available_bands(&self) -> Vec<String> {
        self.index().bands()
    }

    pub fn resolutions_of(&self, band: &str) -> Vec<u32> {
        self.index().resolutions_of(band)
    }

    pub fn tile_identifier(&self) -> String {
        self.index().tile_identifier()
    }

    pub fn classification_path(&self) -> Option<&str> {
        self.index().classification_path()
    }

    /// Opens `band` at `resolution` without decoding any pixels
    ///
    /// # Errors
    /// `InvalidRequest` when the band, or the band at that resolution, is
    /// not in the archive. The message lists the resolutions on offer.
    /// `UnsupportedFormat` when the entry is neither GeoTIFF nor JPEG 2000.
    pub fn open_band(&self, band: &str, resolution: Option<u32>) -> SceneResult<OpenedBand> {
        let BandReference { band, resolution, path } = self.index().select(band, resolution)?.clone();
        let source = self.open_entry(&path)?;
        Ok(OpenedBand { band, resolution, source })
    }

    /// Reads `band` at `resolution`, or at the finest one stored
    ///
    /// Fails like [`ProductReader::open_band`].
    pub fn read_band(&self, band: &str, resolution: Option<u32>) -> SceneResult<BandRead> {
        self.open_band(band, resolution)?.read()
    }

    /// Reads the classification raster with its native resolution
    pub fn read_classification(&self) -> SceneResult<(Array2<f64>, RasterProfile, u32)> {
        let path = self
            .classification_path()
            .ok_or_else(|| SceneError::MissingData("SCL raster not found in the product".to_string()))?
            .to_string();
        let resolution = native_resolution_of_path(&path)?;
        let source = self.open_entry(&path)?;
        Ok((source.read()?, source.profile().clone(), resolution))
    }

    fn open_entry(&self, path: &str) -> SceneResult<Box<dyn RasterSource>> {
        let source = open_source(path, self.archive.open_entry(path)?)?;
        let profile = source.profile();
        debug!("Opened {} ({}x{} {})", path, profile.width, profile.height, profile.dtype);
        Ok(source)
    }
}
