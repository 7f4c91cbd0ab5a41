//! Scene archives: entry index and entry access

pub mod handle;
pub mod index;

pub use handle::{EntryFormat, SceneArchive};
pub use index::{
    is_native_resolution, native_resolution_of_path, resolution_suffix, ArchiveIndex, BandReference,
    DEFAULT_TILE_ID, NATIVE_RESOLUTIONS,
};
