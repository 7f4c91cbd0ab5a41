//! Command pattern interfaces
//!
//! Each CLI subcommand becomes one `Command`; the factory maps parsed
//! arguments plus the loaded settings onto the right one.

use crate::config::Settings;
use crate::errors::SceneResult;

/// Represents an executable command in the application
pub trait Command {
    /// Execute the command
    fn execute(&self) -> SceneResult<()>;
}

/// Factory for creating commands from CLI arguments
pub trait CommandFactory {
    /// Create a new Command instance based on CLI arguments
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `settings` - Settings loaded from `--config`, before CLI overrides
    fn create_command(&self, args: &clap::ArgMatches, settings: &Settings) -> SceneResult<Box<dyn Command>>;
}
