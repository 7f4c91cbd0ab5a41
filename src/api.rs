use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::info;

use crate::config::Settings;
use crate::coordinate::BoundingBox;
use crate::display::{render_quicklook, slice_png, wgs84_bounds, SliceGrid};
use crate::errors::SceneResult;
use crate::product::{
    scl_meaning, write_mask, write_stack, BandStack, Composite, ProductReader, ReprojectionExporter, StackOptions,
    ValidityMask,
};
use crate::scenes::{list_scenes, SceneItem};
use crate::tiff::constants::tags;
use crate::tiff::GeoTiff;
use crate::utils::tag_utils::get_compression_name;

/// What an export call produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportMode {
    /// One band, original data type
    Single(String),
    Rgb,
    Rgba,
    /// RGBA patches over an N x N grid
    Grid,
}

/// Main interface to the SentinelKit library
///
/// Bundles the settings with the product operations the CLI exposes.
pub struct SentinelKit {
    settings: Settings,
}

impl SentinelKit {
    pub fn new(settings: Settings) -> Self {
        SentinelKit { settings }
    }

    /// Create a SentinelKit instance from an optional TOML settings file
    pub fn from_config(path: Option<&Path>) -> SceneResult<Self> {
        Ok(SentinelKit::new(Settings::load(path)?))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn open(&self, product: &Path) -> SceneResult<ProductReader> {
        ProductReader::open(product)
    }

    /// Human-readable summary of what a product archive holds
    pub fn describe(&self, product: &Path) -> SceneResult<String> {
        let reader = self.open(product)?;
        let mut out = format!("Product: {}\n", reader.path().display());
        out.push_str(&format!("  Tile: {}\n", reader.tile_identifier()));
        out.push_str("  Bands:\n");
        for band in reader.available_bands() {
            let resolutions: Vec<String> = reader.resolutions_of(&band).iter().map(|r| format!("{}m", r)).collect();
            out.push_str(&format!("    {:<4} {}\n", band, resolutions.join(", ")));
        }
        out.push_str(&format!("  Classification: {}\n", reader.classification_path().unwrap_or("none")));
        out.push_str("  Invalid codes:\n");
        for code in &self.settings.invalid_codes {
            out.push_str(&format!("    {:>2} {}\n", code, scl_meaning(*code).unwrap_or("unknown")));
        }
        Ok(out)
    }

    /// Container structure and raster profile of a GeoTIFF
    pub fn describe_geotiff(&self, tif: &Path) -> SceneResult<String> {
        let mut source = BufReader::new(File::open(tif)?);
        let geotiff = GeoTiff::open(&mut source)?;
        let mut out = format!("{}", geotiff.tiff());
        if let Some(code) = geotiff.tiff().main_ifd().and_then(|ifd| ifd.get_tag_value(tags::COMPRESSION)) {
            out.push_str(&format!("  Compression: {} ({})\n", code, get_compression_name(code)));
        }
        out.push_str(&format!("  Profile: {}\n", geotiff.profile()));
        Ok(out)
    }

    /// Builds the validity mask with the configured invalid codes
    pub fn mask(&self, product: &Path, target_resolution: Option<u32>, output: Option<&Path>) -> SceneResult<ValidityMask> {
        let reader = self.open(product)?;
        let mask = reader.build_valid_mask(&self.settings.invalid_codes, &self.settings.mask_options(target_resolution))?;
        if let Some(path) = output {
            write_mask(path, &mask)?;
            info!("Mask written to {}", path.display());
        }
        Ok(mask)
    }

    /// Stacks `bands` with the configured alignment and kernel
    pub fn stack(
        &self,
        product: &Path,
        bands: &[String],
        options: Option<StackOptions>,
        output: Option<&Path>,
    ) -> SceneResult<BandStack> {
        let reader = self.open(product)?;
        let options = options.unwrap_or_else(|| self.settings.stack_options());
        let stack = reader.stack_bands(bands, &options)?;
        if let Some(path) = output {
            write_stack(path, &stack)?;
            info!("Stack written to {}", path.display());
        }
        Ok(stack)
    }

    /// Runs one export; `output` is a file, or a directory for `Grid`
    pub fn export(&self, product: &Path, mode: &ExportMode, output: &Path, show_progress: bool) -> SceneResult<Vec<PathBuf>> {
        let reader = self.open(product)?;
        let mut options = self.settings.export_options();
        options.show_progress = show_progress;
        let exporter = ReprojectionExporter::new(&reader, options);

        match mode {
            ExportMode::Single(band) => {
                exporter.export_single(band, output)?;
                Ok(vec![output.to_path_buf()])
            }
            ExportMode::Rgb => {
                exporter.export_composite(Composite::Rgb, output)?;
                Ok(vec![output.to_path_buf()])
            }
            ExportMode::Rgba => {
                exporter.export_composite(Composite::Rgba, output)?;
                Ok(vec![output.to_path_buf()])
            }
            ExportMode::Grid => exporter.export_grid(output),
        }
    }

    /// Products in `dir`, or in the configured scenes folder
    pub fn scenes(&self, dir: Option<&Path>) -> SceneResult<Vec<SceneItem>> {
        list_scenes(dir.unwrap_or(self.settings.scenes_dir.as_path()))
    }

    /// Renders a PNG quicklook and optionally slices it into the configured grid
    pub fn quicklook(&self, tif: &Path, png: &Path, slice_dir: Option<&Path>) -> SceneResult<Option<SliceGrid>> {
        render_quicklook(tif, png)?;
        match slice_dir {
            Some(dir) => {
                let n = self.settings.grid_size as u32;
                Ok(Some(slice_png(png, dir, n, n)?))
            }
            None => Ok(None),
        }
    }

    /// WGS84 bounds of an exported GeoTIFF shifted by the configured offset
    pub fn bounds(&self, tif: &Path) -> SceneResult<BoundingBox> {
        wgs84_bounds(tif, self.settings.align_offset)
    }
}
