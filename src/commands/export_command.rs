//! Reprojected WGS84 export command

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::api::{ExportMode, SentinelKit};
use crate::commands::command_traits::Command;
use crate::commands::{optional_resolution, parse_arg, required_path};
use crate::config::Settings;
use crate::errors::{SceneError, SceneResult};

/// Exports one band, an RGB(A) composite or a grid of RGBA patches
pub struct ExportCommand {
    product: PathBuf,
    output: PathBuf,
    mode: ExportMode,
    show_progress: bool,
    kit: SentinelKit,
}

impl ExportCommand {
    pub fn new(args: &ArgMatches, settings: &Settings) -> SceneResult<Self> {
        let mode_name = args.get_one::<String>("mode").map(String::as_str).unwrap_or("rgb");
        let mode = match mode_name {
            "single" => {
                let band = args
                    .get_one::<String>("band")
                    .ok_or_else(|| SceneError::InvalidRequest("--band is required for single exports".to_string()))?;
                ExportMode::Single(band.clone())
            }
            "rgb" => ExportMode::Rgb,
            "rgba" => ExportMode::Rgba,
            "grid" => ExportMode::Grid,
            other => {
                return Err(SceneError::InvalidRequest(format!(
                    "Unknown export mode '{}'; expected single, rgb, rgba or grid",
                    other
                )))
            }
        };

        let mut settings = settings.clone();
        if let Some(res) = optional_resolution(args, "resolution")? {
            settings.export_resolution = Some(res);
        }
        if let Some(n) = parse_arg::<usize>(args, "grid-size")? {
            settings.grid_size = n;
        }
        settings.validate()?;

        let output = match args.get_one::<String>("output") {
            Some(path) => PathBuf::from(path),
            None if mode == ExportMode::Grid => settings.output_dir.clone(),
            None => return Err(SceneError::InvalidRequest("--output is required".to_string())),
        };

        Ok(ExportCommand {
            product: required_path(args, "product")?,
            output,
            mode,
            show_progress: args.get_flag("progress"),
            kit: SentinelKit::new(settings),
        })
    }
}

impl Command for ExportCommand {
    fn execute(&self) -> SceneResult<()> {
        let written = self.kit.export(&self.product, &self.mode, &self.output, self.show_progress)?;
        info!("Export produced {} file(s)", written.len());
        for path in written {
            println!("{}", path.display());
        }
        Ok(())
    }
}
