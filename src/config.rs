//! Settings loaded from an optional TOML file
//!
//! Every key has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! [paths]
//! scenes_dir = "data/scenes"
//! output_dir = "output"
//!
//! [bands]
//! red = "B04"
//! green = "B03"
//! blue = "B02"
//! nir = "B08"
//!
//! [mask]
//! invalid_codes = [0, 1, 3, 8, 9, 10]
//! resampling = "nearest"
//!
//! [stack]
//! align_to = "min"
//! resampling = "bilinear"
//!
//! [export]
//! grid_size = 3
//! resolution = 10
//! low_percentile = 2.0
//! high_percentile = 98.0
//!
//! [overlay]
//! dx_m = 0.0
//! dy_m = 0.0
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::archive::is_native_resolution;
use crate::display::AlignOffset;
use crate::errors::{SceneError, SceneResult};
use crate::product::{AlignTo, ExportOptions, MaskOptions, RgbBands, StackOptions, DEFAULT_INVALID_CODES};
use crate::raster::Resampling;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub scenes_dir: PathBuf,
    pub output_dir: PathBuf,
    pub rgb: RgbBands,
    pub nir: String,
    pub invalid_codes: Vec<u8>,
    pub mask_resampling: Resampling,
    pub align_to: AlignTo,
    pub stack_resampling: Resampling,
    pub grid_size: usize,
    /// Native resolution exports read bands at; `None` uses the finest
    pub export_resolution: Option<u32>,
    pub low_percentile: f64,
    pub high_percentile: f64,
    pub align_offset: AlignOffset,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            scenes_dir: PathBuf::from("data/scenes"),
            output_dir: PathBuf::from("output"),
            rgb: RgbBands::default(),
            nir: "B08".to_string(),
            invalid_codes: DEFAULT_INVALID_CODES.to_vec(),
            mask_resampling: Resampling::Nearest,
            align_to: AlignTo::Min,
            stack_resampling: Resampling::Bilinear,
            grid_size: 3,
            export_resolution: Some(10),
            low_percentile: 2.0,
            high_percentile: 98.0,
            align_offset: AlignOffset::default(),
        }
    }
}

fn config_error(key: &str, expected: &str) -> SceneError {
    SceneError::Config(format!("'{}' must be {}", key, expected))
}

fn get<'a>(root: &'a toml::Value, section: &str, key: &str) -> Option<&'a toml::Value> {
    root.get(section).and_then(|s| s.get(key))
}

fn get_str<'a>(root: &'a toml::Value, section: &str, key: &str) -> SceneResult<Option<&'a str>> {
    match get(root, section, key) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(Some)
            .ok_or_else(|| config_error(&format!("{}.{}", section, key), "a string")),
    }
}

fn get_float(root: &toml::Value, section: &str, key: &str) -> SceneResult<Option<f64>> {
    match get(root, section, key) {
        None => Ok(None),
        Some(toml::Value::Float(f)) => Ok(Some(*f)),
        Some(toml::Value::Integer(i)) => Ok(Some(*i as f64)),
        Some(_) => Err(config_error(&format!("{}.{}", section, key), "a number")),
    }
}

fn get_unsigned(root: &toml::Value, section: &str, key: &str) -> SceneResult<Option<u64>> {
    match get(root, section, key) {
        None => Ok(None),
        Some(v) => v
            .as_integer()
            .and_then(|i| u64::try_from(i).ok())
            .map(Some)
            .ok_or_else(|| config_error(&format!("{}.{}", section, key), "a non-negative integer")),
    }
}

fn parse_kernel(name: &str, key: &str) -> SceneResult<Resampling> {
    name.parse::<Resampling>()
        .map_err(|e| SceneError::Config(format!("{}: {}", key, e)))
}

impl Settings {
    /// Parses settings from TOML text, filling in defaults
    pub fn from_toml_str(content: &str) -> SceneResult<Self> {
        let root: toml::Value = content
            .parse()
            .map_err(|e| SceneError::Config(format!("Failed to parse TOML: {}", e)))?;
        let mut settings = Settings::default();

        if let Some(dir) = get_str(&root, "paths", "scenes_dir")? {
            settings.scenes_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get_str(&root, "paths", "output_dir")? {
            settings.output_dir = PathBuf::from(dir);
        }

        for (key, slot) in [
            ("red", &mut settings.rgb.red),
            ("green", &mut settings.rgb.green),
            ("blue", &mut settings.rgb.blue),
            ("nir", &mut settings.nir),
        ] {
            if let Some(band) = get_str(&root, "bands", key)? {
                *slot = band.to_string();
            }
        }

        if let Some(codes) = get(&root, "mask", "invalid_codes") {
            let array = codes
                .as_array()
                .ok_or_else(|| config_error("mask.invalid_codes", "an array of integers"))?;
            settings.invalid_codes = array
                .iter()
                .map(|v| {
                    v.as_integer()
                        .and_then(|i| u8::try_from(i).ok())
                        .ok_or_else(|| config_error("mask.invalid_codes", "an array of integers in 0..=255"))
                })
                .collect::<SceneResult<_>>()?;
        }
        if let Some(name) = get_str(&root, "mask", "resampling")? {
            settings.mask_resampling = parse_kernel(name, "mask.resampling")?;
        }

        match get(&root, "stack", "align_to") {
            None => {}
            Some(toml::Value::String(s)) => {
                settings.align_to = s.parse().map_err(|e| SceneError::Config(format!("stack.align_to: {}", e)))?;
            }
            Some(toml::Value::Integer(i)) => {
                let res = u32::try_from(*i).map_err(|_| config_error("stack.align_to", "'min', 'max', 10, 20 or 60"))?;
                settings.align_to =
                    AlignTo::resolution(res).map_err(|e| SceneError::Config(format!("stack.align_to: {}", e)))?;
            }
            Some(_) => return Err(config_error("stack.align_to", "'min', 'max', 10, 20 or 60")),
        }
        if let Some(name) = get_str(&root, "stack", "resampling")? {
            settings.stack_resampling = parse_kernel(name, "stack.resampling")?;
        }

        if let Some(n) = get_unsigned(&root, "export", "grid_size")? {
            settings.grid_size = n as usize;
        }
        if let Some(res) = get_unsigned(&root, "export", "resolution")? {
            settings.export_resolution = Some(res as u32);
        }
        if let Some(p) = get_float(&root, "export", "low_percentile")? {
            settings.low_percentile = p;
        }
        if let Some(p) = get_float(&root, "export", "high_percentile")? {
            settings.high_percentile = p;
        }

        if let Some(dx) = get_float(&root, "overlay", "dx_m")? {
            settings.align_offset.dx = dx;
        }
        if let Some(dy) = get_float(&root, "overlay", "dy_m")? {
            settings.align_offset.dy = dy;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> SceneResult<Self> {
        debug!("Loading settings from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Settings from `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> SceneResult<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Settings::default()),
        }
    }

    pub fn validate(&self) -> SceneResult<()> {
        if self.grid_size == 0 {
            return Err(config_error("export.grid_size", "at least 1"));
        }
        if let Some(res) = self.export_resolution {
            if !is_native_resolution(res) {
                return Err(config_error("export.resolution", "10, 20 or 60"));
            }
        }
        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if !in_range(self.low_percentile) || !in_range(self.high_percentile) {
            return Err(config_error("export percentiles", "within 0..=100"));
        }
        if self.low_percentile >= self.high_percentile {
            return Err(SceneError::Config(format!(
                "export.low_percentile ({}) must be below export.high_percentile ({})",
                self.low_percentile, self.high_percentile
            )));
        }
        Ok(())
    }

    pub fn mask_options(&self, target_resolution: Option<u32>) -> MaskOptions {
        MaskOptions { target_resolution, resampling: self.mask_resampling, invert: true }
    }

    pub fn stack_options(&self) -> StackOptions {
        StackOptions { align_to: self.align_to, resampling: self.stack_resampling, ..StackOptions::default() }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            resolution: self.export_resolution,
            bands: self.rgb.clone(),
            low_percentile: self.low_percentile,
            high_percentile: self.high_percentile,
            grid_rows: self.grid_size,
            grid_cols: self.grid_size,
            show_progress: false,
        }
    }
}
