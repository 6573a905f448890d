//! Flair CLI: search a corpus or parse files, then rank the documents.

use anyhow::Result;
use clap::Parser;
use flair::engine::arg_parser::Cli;
use flair::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
