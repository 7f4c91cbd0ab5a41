//! PNG quicklook command

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::api::SentinelKit;
use crate::commands::command_traits::Command;
use crate::commands::{optional_path, parse_arg, required_path};
use crate::config::Settings;
use crate::errors::SceneResult;

/// Renders a stretched PNG from an exported GeoTIFF, optionally sliced into tiles
pub struct QuicklookCommand {
    input: PathBuf,
    output: PathBuf,
    slice_dir: Option<PathBuf>,
    kit: SentinelKit,
}

impl QuicklookCommand {
    pub fn new(args: &ArgMatches, settings: &Settings) -> SceneResult<Self> {
        let mut settings = settings.clone();
        if let Some(n) = parse_arg::<usize>(args, "grid-size")? {
            settings.grid_size = n;
        }
        settings.validate()?;

        Ok(QuicklookCommand {
            input: required_path(args, "input")?,
            output: required_path(args, "output")?,
            slice_dir: optional_path(args, "slice-dir"),
            kit: SentinelKit::new(settings),
        })
    }
}

impl Command for QuicklookCommand {
    fn execute(&self) -> SceneResult<()> {
        let grid = self.kit.quicklook(&self.input, &self.output, self.slice_dir.as_deref())?;
        println!("{}", self.output.display());
        if let Some(grid) = grid {
            info!("Sliced {}x{} image into {}x{} tiles", grid.width, grid.height, grid.rows, grid.cols);
            for tile in grid.tiles {
                println!("{}", tile.path.display());
            }
        }
        Ok(())
    }
}
