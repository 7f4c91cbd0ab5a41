//! Windowed pixel access to one raster entry
//!
//! GeoTIFF entries are decoded by the crate's own TIFF reader. JPEG 2000
//! entries, which is how L1C and L2A products ship their bands, go through
//! GDAL: the inflated entry is registered as an in-memory file and opened
//! as a dataset, so nothing is written to disk.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use gdal::raster::GdalDataType;
use gdal::Dataset;
use log::{debug, warn};
use ndarray::Array2;

use crate::archive::EntryFormat;
use crate::coordinate::CoordinateSystemFactory;
use crate::errors::{SceneError, SceneResult};
use crate::raster::{DataType, GeoTransform, RasterProfile, Window};
use crate::tiff::GeoTiff;

/// First band of a raster entry, readable window by window
pub trait RasterSource {
    /// Grid, data type and nodata of the band
    fn profile(&self) -> &RasterProfile;

    /// Decodes the pixels inside `window`
    ///
    /// The window must lie inside the raster.
    fn read_window(&self, window: &Window) -> SceneResult<Array2<f64>>;

    fn read(&self) -> SceneResult<Array2<f64>> {
        let profile = self.profile();
        self.read_window(&Window::new(0, 0, profile.width, profile.height))
    }
}

/// Picks the decoder for an entry from its extension
pub fn open_source(name: &str, entry: Cursor<Vec<u8>>) -> SceneResult<Box<dyn RasterSource>> {
    match EntryFormat::of_entry(name) {
        EntryFormat::GeoTiff => Ok(Box::new(TiffSource::new(entry.into_inner())?)),
        EntryFormat::Jpeg2000 => Ok(Box::new(Jp2Source::new(name, entry.into_inner())?)),
        EntryFormat::Other => Err(SceneError::UnsupportedFormat(format!("{}: not a raster entry", name))),
    }
}

fn check_window(profile: &RasterProfile, window: &Window) -> SceneResult<()> {
    if window.end_col() > profile.width || window.end_row() > profile.height {
        return Err(SceneError::InvalidRequest(format!(
            "Window {:?} exceeds raster of {}x{}", window, profile.width, profile.height)));
    }
    Ok(())
}

/// GeoTIFF entry held as inflated bytes
pub struct TiffSource {
    bytes: Vec<u8>,
    geotiff: GeoTiff,
    profile: RasterProfile,
}

impl TiffSource {
    pub fn new(bytes: Vec<u8>) -> SceneResult<Self> {
        let geotiff = GeoTiff::open(&mut Cursor::new(bytes.as_slice()))?;
        let profile = geotiff.profile().with_count(1);
        Ok(TiffSource { bytes, geotiff, profile })
    }
}

impl RasterSource for TiffSource {
    fn profile(&self) -> &RasterProfile {
        &self.profile
    }

    fn read_window(&self, window: &Window) -> SceneResult<Array2<f64>> {
        check_window(&self.profile, window)?;
        let mut cursor = Cursor::new(self.bytes.as_slice());
        Ok(self.geotiff.read_window(&mut cursor, 1, window)?)
    }
}

static MEM_FILE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// GDAL in-memory file, unlinked on drop
struct MemFile {
    path: String,
}

impl MemFile {
    fn create(name: &str, bytes: Vec<u8>) -> SceneResult<Self> {
        let basename = name.rsplit('/').next().unwrap_or(name);
        let id = MEM_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = format!("/vsimem/sentinelkit/{}_{}", id, basename);
        gdal::vsi::create_mem_file(&path, bytes)?;
        Ok(MemFile { path })
    }
}

impl Drop for MemFile {
    fn drop(&mut self) {
        if let Err(e) = gdal::vsi::unlink_mem_file(&self.path) {
            warn!("Could not release {}: {}", self.path, e);
        }
    }
}

/// JPEG 2000 entry decoded through GDAL
pub struct Jp2Source {
    // dropped before the memory file backing it
    dataset: Dataset,
    _file: MemFile,
    profile: RasterProfile,
}

impl Jp2Source {
    pub fn new(name: &str, bytes: Vec<u8>) -> SceneResult<Self> {
        let file = MemFile::create(name, bytes)?;
        let dataset = Dataset::open(&file.path)?;
        let profile = gdal_profile(&dataset)?;
        debug!("Opened {} through GDAL: {}", name, profile);
        Ok(Jp2Source { dataset, _file: file, profile })
    }
}

impl RasterSource for Jp2Source {
    fn profile(&self) -> &RasterProfile {
        &self.profile
    }

    fn read_window(&self, window: &Window) -> SceneResult<Array2<f64>> {
        check_window(&self.profile, window)?;
        if window.is_empty() {
            return Ok(Array2::zeros((window.height, window.width)));
        }
        let band = self.dataset.rasterband(1)?;
        let size = (window.width, window.height);
        let buffer = band.read_as::<f64>((window.col_off as isize, window.row_off as isize), size, size, None)?;
        Array2::from_shape_vec((window.height, window.width), buffer.data().to_vec())
            .map_err(|e| SceneError::InvalidData(format!("GDAL buffer does not fit the window: {}", e)))
    }
}

fn gdal_profile(dataset: &Dataset) -> SceneResult<RasterProfile> {
    let (width, height) = dataset.raster_size();
    let band = dataset.rasterband(1)?;
    let dtype = match band.band_type() {
        GdalDataType::UInt8 => DataType::UInt8,
        GdalDataType::UInt16 => DataType::UInt16,
        GdalDataType::Int16 => DataType::Int16,
        GdalDataType::UInt32 => DataType::UInt32,
        GdalDataType::Int32 => DataType::Int32,
        GdalDataType::Float32 => DataType::Float32,
        GdalDataType::Float64 => DataType::Float64,
        other => {
            return Err(SceneError::UnsupportedFormat(format!("GDAL band type {:?}", other)));
        }
    };
    let transform = dataset
        .geo_transform()
        .map(GeoTransform::from_gdal)
        .unwrap_or_else(|_| GeoTransform::new(0.0, 1.0, 0.0, 1.0));

    let crs = dataset.spatial_ref().ok().and_then(|mut srs| {
        if srs.auth_code().is_err() {
            let _ = srs.auto_identify_epsg();
        }
        srs.auth_code().ok()
    });
    let crs = crs.and_then(|code| u32::try_from(code).ok()).map(CoordinateSystemFactory::from_epsg);

    Ok(RasterProfile::new(crs, transform, width, height, dtype).with_nodata(band.no_data_value()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::CoordinateSystem;
    use crate::tiff::{write_geotiff, WriteOptions};
    use ndarray::Array3;

    fn tiff_bytes() -> Vec<u8> {
        let profile = RasterProfile::new(
            Some(CoordinateSystem::UTM(33, true)),
            GeoTransform::new(300000.0, 20.0, 5000000.0, -20.0),
            9,
            7,
            DataType::UInt16,
        )
        .with_nodata(Some(0.0));
        let data = Array3::from_shape_fn((1, 7, 9), |(_, r, c)| (r * 9 + c + 1) as f64);
        let mut cursor = Cursor::new(Vec::new());
        write_geotiff(&mut cursor, &data, &profile, &WriteOptions::default()).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_tiff_source_reads_windows() {
        let source = open_source("T33TWM_B8A_20m.tif", Cursor::new(tiff_bytes())).unwrap();
        assert_eq!(source.profile().shape(), (7, 9));
        assert_eq!(source.profile().nodata, Some(0.0));

        let full = source.read().unwrap();
        let window = Window::new(2, 3, 4, 2);
        assert_eq!(source.read_window(&window).unwrap(), window.view(&full));
        assert!(matches!(
            source.read_window(&Window::new(6, 0, 4, 1)),
            Err(SceneError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_non_raster_entry_is_unsupported() {
        let result = open_source("MTD_TL.xml", Cursor::new(b"<xml/>".to_vec()));
        assert!(matches!(result, Err(SceneError::UnsupportedFormat(_))));
    }
}
