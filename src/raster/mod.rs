//! In-memory raster model: pixel types, grids, resampling and stretching

pub mod dtype;
pub mod grid;
pub mod profile;
pub mod resampling;
pub mod stretch;
pub mod transform;
pub mod warp;
pub mod window;

pub use self::dtype::DataType;
pub use self::grid::AlignedGrid;
pub use self::profile::RasterProfile;
pub use self::resampling::Resampling;
pub use self::transform::GeoTransform;
pub use self::window::Window;
