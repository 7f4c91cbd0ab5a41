//! GeoTIFF reading and writing on top of the container layer

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::{debug, info};
use ndarray::{Array2, Array3};

use crate::compression::CompressionFactory;
use crate::coordinate::CoordinateSystemFactory;
use crate::io::byte_order::ByteOrder;
use crate::io::seekable::{SeekableReader, SeekableWriter};
use crate::raster::{GeoTransform, RasterProfile, Window};
use crate::tiff::builder::TiffBuilder;
use crate::tiff::builders::basic_tags::ImageSpec;
use crate::tiff::constants::{compression, predictor};
use crate::tiff::decoder::RasterDecoder;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::georef::GeoReference;
use crate::tiff::reader::TiffReader;
use crate::tiff::types::TIFF;

/// First image of a GeoTIFF, ready for band reads
pub struct GeoTiff {
    tiff: TIFF,
    decoder: RasterDecoder,
    georef: GeoReference,
}

impl GeoTiff {
    /// Parses the container and the georeferencing of its first image
    pub fn open(source: &mut dyn SeekableReader) -> TiffResult<Self> {
        let mut reader = TiffReader::new();
        let tiff = reader.read(source)?;
        let ifd = tiff
            .main_ifd()
            .ok_or_else(|| TiffError::GenericError("No image in TIFF data".to_string()))?;
        let decoder = RasterDecoder::new(&reader, source, ifd)?;
        let georef = GeoReference::read(&reader, source, ifd)?;
        Ok(GeoTiff { tiff, decoder, georef })
    }

    pub fn tiff(&self) -> &TIFF {
        &self.tiff
    }

    pub fn georeference(&self) -> &GeoReference {
        &self.georef
    }

    /// Profile of the image; a missing transform is the identity
    pub fn profile(&self) -> RasterProfile {
        let layout = self.decoder.layout();
        let transform = self.georef.transform.unwrap_or(GeoTransform::new(0.0, 1.0, 0.0, 1.0));
        RasterProfile::new(
            self.georef.epsg.map(CoordinateSystemFactory::from_epsg),
            transform,
            layout.width,
            layout.height,
            layout.dtype,
        )
        .with_count(layout.samples_per_pixel)
        .with_nodata(self.georef.nodata)
    }

    /// Reads band `band` (1-based, as GDAL counts)
    pub fn read_band(&self, source: &mut dyn SeekableReader, band: usize) -> TiffResult<Array2<f64>> {
        if band == 0 {
            return Err(TiffError::GenericError("Band numbers start at 1".to_string()));
        }
        self.decoder.read_band(source, band - 1)
    }

    /// Reads the pixels of band `band` (1-based) inside `window`
    pub fn read_window(&self, source: &mut dyn SeekableReader, band: usize, window: &Window) -> TiffResult<Array2<f64>> {
        if band == 0 {
            return Err(TiffError::GenericError("Band numbers start at 1".to_string()));
        }
        self.decoder.read_band_window(source, band - 1, window)
    }

    pub fn read_all(&self, source: &mut dyn SeekableReader) -> TiffResult<Array3<f64>> {
        self.decoder.read_all(source)
    }
}

/// Reads every band and the profile of a GeoTIFF file
pub fn read_geotiff_file(path: &Path) -> TiffResult<(Array3<f64>, RasterProfile)> {
    debug!("Reading GeoTIFF {}", path.display());
    let mut source = BufReader::new(File::open(path)?);
    let geotiff = GeoTiff::open(&mut source)?;
    let data = geotiff.read_all(&mut source)?;
    Ok((data, geotiff.profile()))
}

/// Encoding choices for a written GeoTIFF
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    pub compression: u16,
    pub predictor: u16,
    /// Mark the last band as unassociated alpha
    pub alpha: bool,
    pub big_tiff: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            compression: compression::DEFLATE,
            predictor: predictor::NONE,
            alpha: false,
            big_tiff: false,
        }
    }
}

impl WriteOptions {
    pub fn with_predictor(mut self, predictor: u16) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_alpha(mut self, alpha: bool) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Writes `data` (bands, rows, cols) described by `profile`
///
/// Samples are interleaved by pixel and cast to the profile's data type.
pub fn write_geotiff<W: SeekableWriter>(
    writer: &mut W,
    data: &Array3<f64>,
    profile: &RasterProfile,
    options: &WriteOptions,
) -> TiffResult<()> {
    let (bands, height, width) = data.dim();
    if (bands, height, width) != (profile.count, profile.height, profile.width) {
        return Err(TiffError::GenericError(format!(
            "Array shape {}x{}x{} does not match profile {}x{}x{}",
            bands, height, width, profile.count, profile.height, profile.width)));
    }
    if bands == 0 || bands > u16::MAX as usize {
        return Err(TiffError::GenericError(format!("Cannot write {} bands", bands)));
    }

    let spec = ImageSpec {
        width: width as u32,
        height: height as u32,
        dtype: profile.dtype,
        samples: bands as u16,
        alpha: options.alpha,
        compression: options.compression,
        predictor: options.predictor,
    };

    let mut pixels = Vec::with_capacity(spec.row_bytes() * height);
    for r in 0..height {
        for c in 0..width {
            for b in 0..bands {
                profile.dtype.encode_le(data[[b, r, c]], &mut pixels);
            }
        }
    }
    if options.predictor == predictor::HORIZONTAL_DIFFERENCING {
        crate::tiff::predictor::apply_horizontal(
            &mut pixels, width * bands, bands, profile.dtype.bytes(), ByteOrder::LittleEndian)?;
    }

    let handler = CompressionFactory::create_handler(options.compression as u64)?;
    let strip = handler.compress(&pixels)?;
    debug!("{} strip: {} -> {} bytes", handler.name(), pixels.len(), strip.len());

    let mut builder = TiffBuilder::new(options.big_tiff);
    let ifd = builder.add_ifd();
    builder.add_image_tags(ifd, &spec)?;
    builder.setup_single_strip(ifd, strip)?;
    builder.add_georeferencing(
        ifd,
        &profile.transform,
        profile.crs.map(|c| c.epsg_code()),
        profile.crs.map_or(false, |c| c.is_geographic()),
    )?;
    if let Some(nodata) = profile.nodata {
        builder.add_nodata_tag(ifd, nodata)?;
    }
    builder.add_software_tag(ifd, concat!("sentinelkit ", env!("CARGO_PKG_VERSION")))?;
    builder.write(writer)
}

/// Writes a GeoTIFF file, creating or truncating `path`
pub fn write_geotiff_file(
    path: &Path,
    data: &Array3<f64>,
    profile: &RasterProfile,
    options: &WriteOptions,
) -> TiffResult<()> {
    info!("Writing {} band GeoTIFF {}", data.dim().0, path.display());
    let mut writer = BufWriter::new(File::create(path)?);
    write_geotiff(&mut writer, data, profile, options)
}
