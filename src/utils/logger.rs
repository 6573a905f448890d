use colored::Colorize;
use env_logger::Builder;
use env_logger::fmt::Formatter;
use log::{Level, LevelFilter, Record};
use std::io::{self, Write};

/// Install the colored logger: dependencies at `Warn`, this crate at `Info` (`Debug` when
/// verbose). `RUST_LOG` still applies on top. Safe to call more than once.
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(format_record)
        .try_init();
}

fn format_record(buf: &mut Formatter, record: &Record) -> io::Result<()> {
    let name = env!("CARGO_PKG_NAME");
    let line = match record.level() {
        Level::Error => format!(
            "[{} {} {}] {}",
            name.cyan(),
            "ERROR".red(),
            record.target().white(),
            record.args()
        ),
        Level::Warn => format!(
            "[{} {} {}] {}",
            name.cyan(),
            "WARN".yellow(),
            record.target().white(),
            record.args()
        ),
        // Worker thread names (flair-crawl-3) say which pool logged.
        Level::Debug | Level::Trace => {
            let thread = std::thread::current();
            let thread = thread.name().unwrap_or("main").to_string();
            format!(
                "[{} {}] {}",
                name.cyan(),
                thread.dimmed(),
                record.args().to_string().dimmed()
            )
        }
        Level::Info => format!("[{}] {}", name.cyan(), record.args()),
    };
    writeln!(buf, "{}", line)
}
