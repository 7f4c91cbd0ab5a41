//! CLI command implementations
//!
//! One module per subcommand, all built through `SentinelkitCommandFactory`.

pub mod command_traits;
pub mod info_command;
pub mod mask_command;
pub mod stack_command;
pub mod export_command;
pub mod scenes_command;
pub mod quicklook_command;
pub mod bounds_command;

pub use command_traits::{Command, CommandFactory};
pub use info_command::InfoCommand;
pub use mask_command::MaskCommand;
pub use stack_command::StackCommand;
pub use export_command::ExportCommand;
pub use scenes_command::ScenesCommand;
pub use quicklook_command::QuicklookCommand;
pub use bounds_command::BoundsCommand;

use std::path::PathBuf;
use std::str::FromStr;

use clap::ArgMatches;

use crate::config::Settings;
use crate::errors::{SceneError, SceneResult};

/// Factory for creating command instances based on CLI arguments
pub struct SentinelkitCommandFactory;

impl SentinelkitCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        SentinelkitCommandFactory
    }
}

impl Default for SentinelkitCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory for SentinelkitCommandFactory {
    fn create_command(&self, args: &ArgMatches, settings: &Settings) -> SceneResult<Box<dyn Command>> {
        match args.subcommand() {
            Some(("info", sub)) => Ok(Box::new(InfoCommand::new(sub, settings)?)),
            Some(("mask", sub)) => Ok(Box::new(MaskCommand::new(sub, settings)?)),
            Some(("stack", sub)) => Ok(Box::new(StackCommand::new(sub, settings)?)),
            Some(("export", sub)) => Ok(Box::new(ExportCommand::new(sub, settings)?)),
            Some(("scenes", sub)) => Ok(Box::new(ScenesCommand::new(sub, settings)?)),
            Some(("quicklook", sub)) => Ok(Box::new(QuicklookCommand::new(sub, settings)?)),
            Some(("bounds", sub)) => Ok(Box::new(BoundsCommand::new(sub, settings)?)),
            Some((name, _)) => Err(SceneError::InvalidRequest(format!("Unknown command '{}'", name))),
            None => Err(SceneError::InvalidRequest("No command given; see --help".to_string())),
        }
    }
}

/// Path argument that clap marks as required
pub(crate) fn required_path(args: &ArgMatches, name: &str) -> SceneResult<PathBuf> {
    optional_path(args, name).ok_or_else(|| SceneError::InvalidRequest(format!("Missing argument '{}'", name)))
}

pub(crate) fn optional_path(args: &ArgMatches, name: &str) -> Option<PathBuf> {
    args.get_one::<String>(name).map(PathBuf::from)
}

/// Parses an optional argument with `FromStr`, reporting bad values as invalid requests
pub(crate) fn parse_arg<T>(args: &ArgMatches, name: &str) -> SceneResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match args.get_one::<String>(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| SceneError::InvalidRequest(format!("--{} '{}': {}", name, raw, e))),
    }
}

/// Accepts `20` as well as `20m`
pub(crate) fn parse_resolution(raw: &str) -> SceneResult<u32> {
    raw.trim()
        .trim_end_matches('m')
        .parse::<u32>()
        .map_err(|_| SceneError::InvalidRequest(format!("Invalid resolution '{}'", raw)))
}

pub(crate) fn optional_resolution(args: &ArgMatches, name: &str) -> SceneResult<Option<u32>> {
    args.get_one::<String>(name).map(|raw| parse_resolution(raw)).transpose()
}
