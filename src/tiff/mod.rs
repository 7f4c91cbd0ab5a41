//! TIFF and GeoTIFF support
//!
//! Reads classic and BigTIFF containers in either byte order and writes
//! little-endian GeoTIFFs with one deflate strip per image.

pub mod errors;
pub mod ifd;
pub(crate) mod types;
pub mod reader;
pub mod decoder;
pub mod georef;
pub mod geotiff;
pub mod builder;
pub(crate) mod builders;
pub(crate) mod constants;
pub(crate) mod predictor;
pub(crate) mod validation;
#[cfg(test)]
mod tests;

pub use errors::{TiffError, TiffResult};
pub use ifd::{IFD, IFDEntry};
pub use reader::TiffReader;
pub use types::TIFF;
pub use builder::TiffBuilder;
pub use builders::basic_tags::ImageSpec;
pub use geotiff::{read_geotiff_file, write_geotiff, write_geotiff_file, GeoTiff, WriteOptions};
pub use georef::GeoReference;
