//! WGS84 bounds command

use std::path::PathBuf;

use clap::ArgMatches;

use crate::api::SentinelKit;
use crate::commands::command_traits::Command;
use crate::commands::{parse_arg, required_path};
use crate::config::Settings;
use crate::errors::SceneResult;

/// Prints `west,south,east,north` of a GeoTIFF, shifted by the overlay offset
pub struct BoundsCommand {
    input: PathBuf,
    kit: SentinelKit,
}

impl BoundsCommand {
    pub fn new(args: &ArgMatches, settings: &Settings) -> SceneResult<Self> {
        let mut settings = settings.clone();
        if let Some(dx) = parse_arg::<f64>(args, "dx")? {
            settings.align_offset.dx = dx;
        }
        if let Some(dy) = parse_arg::<f64>(args, "dy")? {
            settings.align_offset.dy = dy;
        }
        Ok(BoundsCommand { input: required_path(args, "input")?, kit: SentinelKit::new(settings) })
    }
}

impl Command for BoundsCommand {
    fn execute(&self) -> SceneResult<()> {
        let b = self.kit.bounds(&self.input)?;
        println!("{:.8},{:.8},{:.8},{:.8}", b.min_x, b.min_y, b.max_x, b.max_y);
        Ok(())
    }
}
