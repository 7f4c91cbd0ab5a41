//! I/O traits shared by the archive and raster layers

pub mod seekable;
pub mod byte_order;
