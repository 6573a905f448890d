pub mod config;
pub mod flair_toml;
pub mod logger;
pub mod tools;

pub use config::*;
pub use flair_toml::{
    FlairToml, apply_file_to_config, apply_file_to_ranker, load_flair_toml, load_flair_toml_file,
};
pub use logger::setup_logging;
