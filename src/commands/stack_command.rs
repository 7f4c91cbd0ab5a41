//! Multi-band stacking command

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::api::SentinelKit;
use crate::commands::command_traits::Command;
use crate::commands::{parse_arg, parse_resolution, required_path};
use crate::config::Settings;
use crate::errors::{SceneError, SceneResult};
use crate::product::{AlignTo, StackOptions};
use crate::raster::Resampling;

pub struct StackCommand {
    product: PathBuf,
    output: PathBuf,
    bands: Vec<String>,
    options: StackOptions,
    kit: SentinelKit,
}

impl StackCommand {
    pub fn new(args: &ArgMatches, settings: &Settings) -> SceneResult<Self> {
        let bands: Vec<String> = args
            .get_one::<String>("bands")
            .map(|list| list.split(',').map(|b| b.trim().to_string()).filter(|b| !b.is_empty()).collect())
            .unwrap_or_default();

        let mut options = settings.stack_options();
        if let Some(align_to) = parse_arg::<AlignTo>(args, "align-to")? {
            options.align_to = align_to;
        }
        if let Some(kernel) = parse_arg::<Resampling>(args, "resampling")? {
            options.resampling = kernel;
        }
        options.force_resample_single = args.get_flag("force-single");
        if let Some(pairs) = args.get_many::<String>("band-res") {
            for pair in pairs {
                let (band, res) = pair
                    .split_once('=')
                    .ok_or_else(|| SceneError::InvalidRequest(format!("--band-res expects BAND=RES, got '{}'", pair)))?;
                options.native_resolutions.insert(band.trim().to_string(), parse_resolution(res)?);
            }
        }

        Ok(StackCommand {
            product: required_path(args, "product")?,
            output: required_path(args, "output")?,
            bands,
            options,
            kit: SentinelKit::new(settings.clone()),
        })
    }
}

impl Command for StackCommand {
    fn execute(&self) -> SceneResult<()> {
        let stack = self.kit.stack(&self.product, &self.bands, Some(self.options.clone()), Some(&self.output))?;
        info!("Stacked {} aligned to {}: {}", stack.bands.join(","), self.options.align_to, stack.profile);
        println!("{}", self.output.display());
        Ok(())
    }
}
