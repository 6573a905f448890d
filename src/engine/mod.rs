//! CLI engine: argument parsing, command handlers, progress and output.

pub mod arg_parser;
pub mod cli;
pub mod output;
pub mod progress;
pub mod tools;

pub use arg_parser::{Cli, Commands, CommonArgs, ParseArgs, RankArgs, SearchArgs};
pub use cli::handle_run;
pub use tools::collect_sources;
