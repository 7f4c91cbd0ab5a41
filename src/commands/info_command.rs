//! Product and GeoTIFF inspection command

use std::path::PathBuf;

use clap::ArgMatches;
use log::debug;

use crate::api::SentinelKit;
use crate::commands::command_traits::Command;
use crate::commands::required_path;
use crate::config::Settings;
use crate::errors::SceneResult;

/// Prints the band inventory of a product, or the structure of a GeoTIFF
pub struct InfoCommand {
    input: PathBuf,
    kit: SentinelKit,
}

impl InfoCommand {
    pub fn new(args: &ArgMatches, settings: &Settings) -> SceneResult<Self> {
        Ok(InfoCommand { input: required_path(args, "input")?, kit: SentinelKit::new(settings.clone()) })
    }

    fn is_geotiff(&self) -> bool {
        self.input
            .extension()
            .map_or(false, |e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
    }
}

impl Command for InfoCommand {
    fn execute(&self) -> SceneResult<()> {
        let report = if self.is_geotiff() {
            debug!("Describing GeoTIFF {}", self.input.display());
            self.kit.describe_geotiff(&self.input)?
        } else {
            debug!("Describing product {}", self.input.display());
            self.kit.describe(&self.input)?
        };
        print!("{}", report);
        Ok(())
    }
}
