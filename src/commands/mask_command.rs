//! Validity mask command

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::api::SentinelKit;
use crate::commands::command_traits::Command;
use crate::commands::{optional_resolution, parse_arg, required_path};
use crate::config::Settings;
use crate::errors::{SceneError, SceneResult};
use crate::raster::Resampling;

/// Builds the SCL validity mask and writes it as a UInt8 GeoTIFF
pub struct MaskCommand {
    product: PathBuf,
    output: PathBuf,
    resolution: Option<u32>,
    kit: SentinelKit,
}

impl MaskCommand {
    pub fn new(args: &ArgMatches, settings: &Settings) -> SceneResult<Self> {
        let mut settings = settings.clone();
        if let Some(codes) = args.get_one::<String>("invalid-codes") {
            settings.invalid_codes = codes
                .split(',')
                .map(|c| {
                    c.trim()
                        .parse::<u8>()
                        .map_err(|_| SceneError::InvalidRequest(format!("Invalid SCL code '{}'", c.trim())))
                })
                .collect::<SceneResult<_>>()?;
        }
        if let Some(kernel) = parse_arg::<Resampling>(args, "resampling")? {
            settings.mask_resampling = kernel;
        }

        Ok(MaskCommand {
            product: required_path(args, "product")?,
            output: required_path(args, "output")?,
            resolution: optional_resolution(args, "resolution")?,
            kit: SentinelKit::new(settings),
        })
    }
}

impl Command for MaskCommand {
    fn execute(&self) -> SceneResult<()> {
        let mask = self.kit.mask(&self.product, self.resolution, Some(&self.output))?;
        let (rows, cols) = mask.mask.dim();
        info!(
            "{} of {} pixels valid ({}x{} at {}m)",
            mask.valid_count(),
            rows * cols,
            cols,
            rows,
            mask.profile.resolution().0
        );
        println!("{}", self.output.display());
        Ok(())
    }
}
