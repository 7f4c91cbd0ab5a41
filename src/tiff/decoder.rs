//! Pixel data decoding for strip and tile organised images
//!
//! Blocks (strips or tiles) are read one at a time, decompressed through
//! `CompressionFactory`, un-predicted and scattered into `f64` arrays.

use std::io::SeekFrom;

use log::{debug, trace};
use ndarray::{Array2, Array3};

use crate::compression::CompressionFactory;
use crate::io::byte_order::ByteOrder;
use crate::io::seekable::SeekableReader;
use crate::raster::{DataType, Window};
use crate::tiff::constants::{compression, planar_config, predictor, sample_format, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::predictor as horizontal;
use crate::tiff::reader::TiffReader;
use crate::tiff::validation;

/// How an image's samples are laid out in its blocks
#[derive(Debug, Clone)]
pub struct ImageLayout {
    pub width: usize,
    pub height: usize,
    pub samples_per_pixel: usize,
    pub dtype: DataType,
    pub planar_config: u16,
    pub compression: u64,
    pub predictor: u16,
    pub block_width: usize,
    pub block_height: usize,
    pub tiled: bool,
    block_offsets: Vec<u64>,
    block_byte_counts: Vec<u64>,
}

impl ImageLayout {
    /// Reads the layout tags of `ifd`
    pub fn from_ifd(reader: &TiffReader, source: &mut dyn SeekableReader, ifd: &IFD) -> TiffResult<Self> {
        let (width, height) = ifd.get_dimensions().ok_or(TiffError::MissingDimensions)?;
        validation::validate_dimensions(width, height)?;
        let (width, height) = (width as usize, height as usize);

        let samples_per_pixel = ifd.get_samples_per_pixel().max(1) as usize;
        let bits = if ifd.has_tag(tags::BITS_PER_SAMPLE) {
            first_value(reader.read_tag_values(source, ifd, tags::BITS_PER_SAMPLE)?, tags::BITS_PER_SAMPLE)? as u16
        } else {
            1
        };
        let format = if ifd.has_tag(tags::SAMPLE_FORMAT) {
            first_value(reader.read_tag_values(source, ifd, tags::SAMPLE_FORMAT)?, tags::SAMPLE_FORMAT)? as u16
        } else {
            sample_format::UNSIGNED
        };
        let dtype = DataType::from_tiff(bits, format)
            .ok_or(TiffError::UnsupportedSampleLayout { bits, format })?;

        let compression = ifd.get_tag_value(tags::COMPRESSION).unwrap_or(compression::NONE as u64);
        let predictor_code = ifd.get_tag_value(tags::PREDICTOR).unwrap_or(predictor::NONE as u64);
        if predictor_code != predictor::NONE as u64 && predictor_code != predictor::HORIZONTAL_DIFFERENCING as u64 {
            return Err(TiffError::UnsupportedPredictor(predictor_code));
        }
        let planar_config = ifd.get_tag_value(tags::PLANAR_CONFIGURATION)
            .unwrap_or(planar_config::CHUNKY as u64) as u16;

        let tiled = ifd.is_tiled();
        let (block_width, block_height, offsets_tag, counts_tag) = if tiled {
            let tw = ifd.get_tag_value(tags::TILE_WIDTH).ok_or(TiffError::TagNotFound(tags::TILE_WIDTH))?;
            let th = ifd.get_tag_value(tags::TILE_LENGTH).ok_or(TiffError::TagNotFound(tags::TILE_LENGTH))?;
            (tw as usize, th as usize, tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
        } else {
            let rows = ifd.get_tag_value(tags::ROWS_PER_STRIP).unwrap_or(height as u64).min(height as u64);
            (width, rows as usize, tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        };
        if block_width == 0 || block_height == 0 {
            return Err(TiffError::InvalidTagData(offsets_tag, "zero block size".to_string()));
        }

        let block_offsets = reader.read_tag_values(source, ifd, offsets_tag)?;
        let block_byte_counts = reader.read_tag_values(source, ifd, counts_tag)?;

        let layout = ImageLayout {
            width,
            height,
            samples_per_pixel,
            dtype,
            planar_config,
            compression,
            predictor: predictor_code as u16,
            block_width,
            block_height,
            tiled,
            block_offsets,
            block_byte_counts,
        };

        let expected = layout.blocks_per_plane() * layout.planes();
        if layout.block_offsets.len() < expected || layout.block_byte_counts.len() < expected {
            return Err(TiffError::InvalidTagData(
                offsets_tag,
                format!("expected {} blocks, found {}", expected, layout.block_offsets.len()),
            ));
        }

        debug!(
            "Image layout: {}x{}x{} {} {} blocks {}x{}, compression {}, predictor {}",
            width, height, samples_per_pixel, dtype,
            if tiled { "tiled" } else { "striped" },
            block_width, block_height, compression, predictor_code
        );
        Ok(layout)
    }

    fn blocks_across(&self) -> usize {
        self.width.div_ceil(self.block_width)
    }

    fn blocks_down(&self) -> usize {
        self.height.div_ceil(self.block_height)
    }

    fn blocks_per_plane(&self) -> usize {
        self.blocks_across() * self.blocks_down()
    }

    fn planes(&self) -> usize {
        if self.planar_config == planar_config::PLANAR { self.samples_per_pixel } else { 1 }
    }

    /// Samples per pixel stored inside one block
    fn block_stride(&self) -> usize {
        if self.planar_config == planar_config::PLANAR { 1 } else { self.samples_per_pixel }
    }

    /// Rows actually stored in block row `block_row`
    ///
    /// Tiles are always full; the last strip may be short.
    fn rows_in_block(&self, block_row: usize) -> usize {
        if self.tiled {
            self.block_height
        } else {
            self.block_height.min(self.height - block_row * self.block_height)
        }
    }
}

fn first_value(values: Vec<u64>, tag: u16) -> TiffResult<u64> {
    values.first().copied().ok_or_else(|| TiffError::InvalidTagData(tag, "empty value list".to_string()))
}

/// Decodes the bands of one image
pub struct RasterDecoder {
    layout: ImageLayout,
    byte_order: ByteOrder,
}

impl RasterDecoder {
    pub fn new(reader: &TiffReader, source: &mut dyn SeekableReader, ifd: &IFD) -> TiffResult<Self> {
        let layout = ImageLayout::from_ifd(reader, source, ifd)?;
        Ok(RasterDecoder {
            layout,
            byte_order: reader.byte_order()?,
        })
    }

    pub fn layout(&self) -> &ImageLayout {
        &self.layout
    }

    /// Reads, decompresses and un-predicts one block
    fn read_block(&self, source: &mut dyn SeekableReader, index: usize, rows: usize) -> TiffResult<Vec<u8>> {
        let layout = &self.layout;
        let offset = layout.block_offsets[index];
        let byte_count = layout.block_byte_counts[index];
        let file_size = validation::get_file_size(source)?;
        validation::validate_block(offset, byte_count, file_size, "Image block")?;

        source.seek(SeekFrom::Start(offset))?;
        let mut raw = vec![0u8; byte_count as usize];
        source.read_exact(&mut raw)?;

        let bytes_per_sample = layout.dtype.bytes();
        let row_samples = layout.block_width * layout.block_stride();
        let expected = rows * row_samples * bytes_per_sample;

        let handler = CompressionFactory::create_handler(layout.compression)?;
        let mut data = handler.decompress(&raw, expected)?;
        trace!("Block {}: {} -> {} bytes ({})", index, raw.len(), data.len(), handler.name());
        if data.len() < expected {
            return Err(TiffError::GenericError(format!(
                "Block {} decoded to {} bytes, expected {}", index, data.len(), expected)));
        }
        data.truncate(expected);

        if layout.predictor == predictor::HORIZONTAL_DIFFERENCING {
            horizontal::undo_horizontal(&mut data, row_samples, layout.block_stride(), bytes_per_sample, self.byte_order)?;
        }
        Ok(data)
    }

    /// Reads sample `band` (0-based) of every pixel
    pub fn read_band(&self, source: &mut dyn SeekableReader, band: usize) -> TiffResult<Array2<f64>> {
        let full = Window::new(0, 0, self.layout.width, self.layout.height);
        self.read_band_window(source, band, &full)
    }

    /// Reads sample `band` (0-based) inside `window`
    ///
    /// Only the blocks intersecting the window are read and decompressed.
    pub fn read_band_window(&self, source: &mut dyn SeekableReader, band: usize, window: &Window) -> TiffResult<Array2<f64>> {
        let layout = &self.layout;
        if band >= layout.samples_per_pixel {
            return Err(TiffError::GenericError(format!(
                "Band {} requested from an image with {} samples per pixel", band + 1, layout.samples_per_pixel)));
        }
        if window.end_col() > layout.width || window.end_row() > layout.height {
            return Err(TiffError::GenericError(format!(
                "Window {:?} exceeds image of {}x{}", window, layout.width, layout.height)));
        }

        let mut out = Array2::zeros((window.height, window.width));
        if window.is_empty() {
            return Ok(out);
        }
        let (plane, sample) = if layout.planar_config == planar_config::PLANAR { (band, 0) } else { (0, band) };
        let stride = layout.block_stride();
        let bytes_per_sample = layout.dtype.bytes();

        let first_block_row = window.row_off / layout.block_height;
        let last_block_row = (window.end_row() - 1) / layout.block_height;
        let first_block_col = window.col_off / layout.block_width;
        let last_block_col = (window.end_col() - 1) / layout.block_width;
        trace!(
            "Window {:?}: block rows {}..={}, block cols {}..={}",
            window, first_block_row, last_block_row, first_block_col, last_block_col
        );

        for block_row in first_block_row..=last_block_row {
            let rows = layout.rows_in_block(block_row);
            for block_col in first_block_col..=last_block_col {
                let index = plane * layout.blocks_per_plane() + block_row * layout.blocks_across() + block_col;
                let data = self.read_block(source, index, rows)?;

                let row0 = block_row * layout.block_height;
                let col0 = block_col * layout.block_width;
                let row_range = row0.max(window.row_off)..(row0 + rows).min(window.end_row());
                let col_range = col0.max(window.col_off)..(col0 + layout.block_width).min(window.end_col());

                for r in row_range {
                    for c in col_range.clone() {
                        let pos = (((r - row0) * layout.block_width + (c - col0)) * stride + sample) * bytes_per_sample;
                        out[[r - window.row_off, c - window.col_off]] =
                            layout.dtype.decode(&data[pos..pos + bytes_per_sample], self.byte_order);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Reads every band into a `(bands, height, width)` array
    pub fn read_all(&self, source: &mut dyn SeekableReader) -> TiffResult<Array3<f64>> {
        let layout = &self.layout;
        let mut out = Array3::zeros((layout.samples_per_pixel, layout.height, layout.width));
        for band in 0..layout.samples_per_pixel {
            out.index_axis_mut(ndarray::Axis(0), band).assign(&self.read_band(source, band)?);
        }
        Ok(out)
    }
}
