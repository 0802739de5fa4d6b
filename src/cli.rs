//! CLI domain: parse, route, output, and presentation only.
//! No pipeline orchestration; single route table dispatches to the generator.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::{error_format, map_error};
pub use parse::{Cli, Commands, ConfigCommands, OutputFormat};
pub use presentation::EstimateReport;
pub use route::RunContext;
