//! Sentinel-2 product operations: band reads, validity masks, stacking
//! and basemap-aligned export

pub mod export;
pub mod mask;
pub mod reader;
pub mod scl;
pub mod source;
pub mod stack;

pub use export::{Composite, ExportOptions, ReprojectionExporter, RgbBands};
pub use mask::{write_mask, MaskOptions, ValidityMask};
pub use reader::{BandRead, OpenedBand, ProductReader};
pub use scl::{scl_meaning, DEFAULT_INVALID_CODES, SCL_CODE_MEANINGS};
pub use source::{open_source, RasterSource};
pub use stack::{write_stack, AlignTo, BandStack, StackOptions};
