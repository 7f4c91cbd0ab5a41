pub mod api;
pub mod archive;
pub mod commands;
pub mod compression;
pub mod config;
pub mod coordinate;
pub mod display;
pub mod errors;
pub mod io;
pub mod product;
pub mod raster;
pub mod scenes;
pub mod tiff;
pub mod utils;

pub use crate::api::{ExportMode, SentinelKit};
pub use crate::config::Settings;
pub use crate::errors::{SceneError, SceneResult};

pub use archive::{ArchiveIndex, BandReference, SceneArchive};
pub use coordinate::{BoundingBox, CoordinateSystem, CoordinateTransformer, Point};
pub use product::{
    AlignTo, BandStack, Composite, ExportOptions, MaskOptions, ProductReader, ReprojectionExporter, StackOptions,
    ValidityMask,
};
pub use raster::{RasterProfile, Resampling};
