//! Map-overlay helpers: PNG quicklooks, slicing and WGS84 bounds

pub mod bounds;
pub mod quicklook;

pub use bounds::{wgs84_bounds, AlignOffset};
pub use quicklook::{render_quicklook, slice_png, SliceGrid, SliceTile};
