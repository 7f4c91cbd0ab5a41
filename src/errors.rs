//! Crate-level error type
//!
//! Every fallible operation on a scene surfaces one of these kinds. The
//! variants mirror how a caller is expected to react: `NotFound` and
//! `InvalidRequest` are caller mistakes, `MissingData` and `InvalidData`
//! describe the product itself, the rest wrap lower layers.

use std::io;
use thiserror::Error;

use crate::tiff::errors::TiffError;

#[derive(Debug, Error)]
pub enum SceneError {
    /// A path handed to the reader does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The request cannot be served with what the archive holds
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Required product data (e.g. the classification raster) is absent
    #[error("missing data: {0}")]
    MissingData(String),

    /// Raster content is unusable for the operation (no CRS, CRS mismatch, empty window)
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// An archive entry is in a raster format this crate cannot decode
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("projection error: {0}")]
    Projection(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Tiff(#[from] TiffError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

pub type SceneResult<T> = Result<T, SceneError>;
