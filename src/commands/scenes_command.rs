//! Scene folder listing command

use std::path::PathBuf;

use clap::ArgMatches;

use crate::api::SentinelKit;
use crate::commands::command_traits::Command;
use crate::commands::optional_path;
use crate::config::Settings;
use crate::errors::SceneResult;

pub struct ScenesCommand {
    dir: Option<PathBuf>,
    kit: SentinelKit,
}

impl ScenesCommand {
    pub fn new(args: &ArgMatches, settings: &Settings) -> SceneResult<Self> {
        Ok(ScenesCommand { dir: optional_path(args, "dir"), kit: SentinelKit::new(settings.clone()) })
    }
}

impl Command for ScenesCommand {
    fn execute(&self) -> SceneResult<()> {
        let scenes = self.kit.scenes(self.dir.as_deref())?;
        if scenes.is_empty() {
            println!("No scenes found");
        }
        for scene in scenes {
            println!(
                "{:<5} {:<8} {:<10} {:>9.1} MB  {}",
                scene.kind,
                scene.tile.as_deref().unwrap_or("-"),
                scene.date.as_deref().unwrap_or("-"),
                scene.size_mb,
                scene.name
            );
        }
        Ok(())
    }
}
