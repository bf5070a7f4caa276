//! CLI command implementations

pub mod error;
pub mod export;
pub mod status;

pub use error::CliError;
pub use export::{Cli, Commands, ExportArgs};
pub use status::{ErrorsCommand, StatusCommand};
