//! TIFF file construction
//!
//! `TiffBuilder` collects IFDs, tag payloads and image data and hands
//! them to `WriterBuilder` for layout.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use log::info;

use crate::io::seekable::SeekableWriter;
use crate::raster::GeoTransform;
use crate::tiff::builders::basic_tags::{BasicTagsBuilder, ImageSpec};
use crate::tiff::builders::geo_tags::GeoTagsBuilder;
use crate::tiff::builders::metadata_tags::MetadataBuilder;
use crate::tiff::builders::writer::WriterBuilder;
use crate::tiff::builders::ExternalData;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;

/// Builder for creating TIFF files
pub struct TiffBuilder {
    is_big_tiff: bool,
    pub ifds: Vec<IFD>,
    image_data: BTreeMap<usize, Vec<u8>>,
    external_data: ExternalData,
}

impl TiffBuilder {
    pub fn new(is_big_tiff: bool) -> Self {
        TiffBuilder {
            is_big_tiff,
            ifds: Vec::new(),
            image_data: BTreeMap::new(),
            external_data: BTreeMap::new(),
        }
    }

    /// Adds an empty IFD and returns its index
    pub fn add_ifd(&mut self) -> usize {
        let ifd_index = self.ifds.len();
        self.ifds.push(IFD::new(ifd_index, 0));
        ifd_index
    }

    fn check_index(&self, ifd_index: usize) -> TiffResult<()> {
        if ifd_index >= self.ifds.len() {
            return Err(TiffError::GenericError(format!(
                "Invalid IFD index {}, only have {} IFDs", ifd_index, self.ifds.len())));
        }
        Ok(())
    }

    /// Adds the pixel layout tags of `spec`
    pub fn add_image_tags(&mut self, ifd_index: usize, spec: &ImageSpec) -> TiffResult<()> {
        self.check_index(ifd_index)?;
        BasicTagsBuilder::add_image_tags(
            &mut self.ifds[ifd_index],
            &mut self.external_data,
            ifd_index,
            self.is_big_tiff,
            spec,
        );
        Ok(())
    }

    /// Stores already compressed pixel data as a single strip
    pub fn setup_single_strip(&mut self, ifd_index: usize, strip_data: Vec<u8>) -> TiffResult<()> {
        self.check_index(ifd_index)?;
        BasicTagsBuilder::setup_single_strip(&mut self.ifds[ifd_index], &mut self.image_data, ifd_index, strip_data);
        Ok(())
    }

    /// Adds placement and CRS tags
    pub fn add_georeferencing(
        &mut self,
        ifd_index: usize,
        transform: &GeoTransform,
        epsg: Option<u32>,
        geographic: bool,
    ) -> TiffResult<()> {
        self.check_index(ifd_index)?;
        let ifd = &mut self.ifds[ifd_index];
        GeoTagsBuilder::add_transform(ifd, &mut self.external_data, ifd_index, self.is_big_tiff, transform);
        GeoTagsBuilder::add_geo_keys(ifd, &mut self.external_data, ifd_index, self.is_big_tiff, epsg, geographic);
        Ok(())
    }

    pub fn add_nodata_tag(&mut self, ifd_index: usize, nodata: f64) -> TiffResult<()> {
        self.check_index(ifd_index)?;
        MetadataBuilder::add_nodata_tag(&mut self.ifds[ifd_index], &mut self.external_data, ifd_index, self.is_big_tiff, nodata);
        Ok(())
    }

    pub fn add_software_tag(&mut self, ifd_index: usize, software: &str) -> TiffResult<()> {
        self.check_index(ifd_index)?;
        MetadataBuilder::add_software_tag(&mut self.ifds[ifd_index], &mut self.external_data, ifd_index, self.is_big_tiff, software);
        Ok(())
    }

    /// Writes the container to any seekable writer
    pub fn write<W: SeekableWriter>(&self, writer: &mut W) -> TiffResult<()> {
        WriterBuilder::write(writer, self.is_big_tiff, &self.ifds, &self.image_data, &self.external_data)
    }

    /// Writes the container to a file
    pub fn write_file(&self, output_path: &Path) -> TiffResult<()> {
        info!("Writing TIFF to {}", output_path.display());
        let file = File::create(output_path)?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);
        self.write(&mut writer)
    }
}
