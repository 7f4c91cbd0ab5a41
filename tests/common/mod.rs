//! Synthetic Sentinel-2 products for the integration tests
//!
//! Bands are real GeoTIFFs written by the crate itself and packed into a
//! zip with the L2A naming scheme.

#![allow(dead_code)]

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use gdal::raster::RasterCreationOptions;
use gdal::{Dataset, DriverManager};
use ndarray::Array3;
use sentinelkit::coordinate::{CoordinateSystem, CoordinateSystemFactory};
use sentinelkit::raster::{DataType, GeoTransform, RasterProfile};
use sentinelkit::tiff::{write_geotiff, WriteOptions};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::ZipWriter;

pub const ORIGIN_X: f64 = 300_000.0;
pub const ORIGIN_Y: f64 = 5_000_000.0;
/// Side of the tile in metres, shared by all resolutions
pub const EXTENT: f64 = 600.0;

pub const PRODUCT_NAME: &str = "S2A_MSIL2A_20240221T083121_N0510_R021_T33TWM_20240221T111234";
const GRANULE: &str = "GRANULE/L2A_T33TWM_A045123_20240221T083121/IMG_DATA";

pub fn utm33() -> CoordinateSystem {
    CoordinateSystemFactory::from_epsg(32633)
}

/// One raster to pack into the product
pub struct Entry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Encodes a single-band GeoTIFF covering the fixture extent at `resolution`
pub fn band_tiff(resolution: u32, dtype: DataType, crs: Option<CoordinateSystem>, value: impl Fn(usize, usize) -> f64) -> Vec<u8> {
    let side = (EXTENT / resolution as f64) as usize;
    sized_band_tiff(side, resolution, dtype, crs, value)
}

/// Encodes a `side` x `side` single-band GeoTIFF at the fixture origin
pub fn sized_band_tiff(
    side: usize,
    resolution: u32,
    dtype: DataType,
    crs: Option<CoordinateSystem>,
    value: impl Fn(usize, usize) -> f64,
) -> Vec<u8> {
    let transform = GeoTransform::new(ORIGIN_X, resolution as f64, ORIGIN_Y, -(resolution as f64));
    let nodata = if dtype == DataType::UInt16 { Some(0.0) } else { None };
    let profile = RasterProfile::new(crs, transform, side, side, dtype).with_nodata(nodata);
    let data = Array3::from_shape_fn((1, side, side), |(_, r, c)| value(r, c));

    let mut cursor = Cursor::new(Vec::new());
    write_geotiff(&mut cursor, &data, &profile, &WriteOptions::default()).unwrap();
    cursor.into_inner()
}

pub fn band_entry(band: &str, resolution: u32, bytes: Vec<u8>) -> Entry {
    Entry {
        name: format!("{}.SAFE/{}/R{}m/T33TWM_20240221T083121_{}_{}m.tif", PRODUCT_NAME, GRANULE, resolution, band, resolution),
        bytes,
    }
}

pub fn jp2_band_entry(band: &str, resolution: u32, bytes: Vec<u8>) -> Entry {
    Entry {
        name: format!("{}.SAFE/{}/R{}m/T33TWM_20240221T083121_{}_{}m.jp2", PRODUCT_NAME, GRANULE, resolution, band, resolution),
        bytes,
    }
}

/// Re-encodes a GeoTIFF as lossless JPEG 2000 through GDAL's OpenJPEG driver
pub fn tiff_to_jp2(tiff: &[u8]) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let tif_path = dir.path().join("band.tif");
    let jp2_path = dir.path().join("band.jp2");
    std::fs::write(&tif_path, tiff).unwrap();

    let source = Dataset::open(&tif_path).unwrap();
    let driver = DriverManager::get_driver_by_name("JP2OpenJPEG").unwrap();
    let mut options = RasterCreationOptions::new();
    options.set_name_value("REVERSIBLE", "YES").unwrap();
    options.set_name_value("QUALITY", "100").unwrap();
    source.create_copy(&driver, &jp2_path, &options).unwrap();
    std::fs::read(&jp2_path).unwrap()
}

/// Reflectance-like values, distinct per band and never 0
pub fn reflectance(seed: usize) -> impl Fn(usize, usize) -> f64 {
    move |r, c| (100 + seed * 1000 + r * 37 + c * 11) as f64
}

/// SCL codes cycling through 0..=11 so every class occurs
pub fn scl_code(r: usize, c: usize) -> f64 {
    ((r * 7 + c) % 12) as f64
}

pub fn scl_entry(crs: Option<CoordinateSystem>) -> Entry {
    Entry {
        name: format!("{}.SAFE/{}/R20m/T33TWM_20240221T083121_SCL_20m.tif", PRODUCT_NAME, GRANULE),
        bytes: band_tiff(20, DataType::UInt8, crs, scl_code),
    }
}

/// B02, B03, B04 at 10 m, B01 at 60 m, B8A at 20 m and SCL at 20 m
pub fn standard_entries(crs: Option<CoordinateSystem>) -> Vec<Entry> {
    vec![
        band_entry("B02", 10, band_tiff(10, DataType::UInt16, crs, reflectance(2))),
        band_entry("B03", 10, band_tiff(10, DataType::UInt16, crs, reflectance(3))),
        band_entry("B04", 10, band_tiff(10, DataType::UInt16, crs, reflectance(4))),
        band_entry("B01", 60, band_tiff(60, DataType::UInt16, crs, reflectance(1))),
        band_entry("B8A", 20, band_tiff(20, DataType::UInt16, crs, reflectance(8))),
        scl_entry(crs),
    ]
}

pub fn write_zip(path: &Path, entries: &[Entry]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    zip.add_directory(format!("{}.SAFE/", PRODUCT_NAME), options).unwrap();
    for entry in entries {
        zip.start_file(entry.name.as_str(), options).unwrap();
        zip.write_all(&entry.bytes).unwrap();
    }
    zip.finish().unwrap();
}

/// A product in its own temporary folder
pub struct Fixture {
    pub dir: TempDir,
    pub product: PathBuf,
}

impl Fixture {
    pub fn with_entries(entries: Vec<Entry>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let product = dir.path().join(format!("{}.zip", PRODUCT_NAME));
        write_zip(&product, &entries);
        Fixture { dir, product }
    }

    pub fn standard() -> Self {
        Self::with_entries(standard_entries(Some(utm33())))
    }

    /// Same layout with no CRS on any raster
    pub fn without_crs() -> Self {
        Self::with_entries(standard_entries(None))
    }

    pub fn out(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
