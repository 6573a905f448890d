use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::Language;
use crate::document::ReadabilityLevel;
use crate::utils::config::SearchConsts;

/// Search, crawl and parse documents, then rank them by linguistic features.
#[derive(Clone, Parser)]
#[command(name = "flair")]
#[command(about = "Find documents for language learners and rank them by grammar and readability.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Config file. Default: `.flair.toml` in the current directory.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Search a local corpus, crawl and parse the hits, and rank them.
    Search(SearchArgs),
    /// Parse the given files (directories are walked) and rank them.
    Parse(ParseArgs),
}

#[derive(Clone, Args)]
pub struct SearchArgs {
    /// Search query.
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Directory of text/HTML files to search.
    #[arg(long, value_name = "DIR")]
    pub corpus: PathBuf,

    /// Number of results to crawl.
    #[arg(long, short = 'n', default_value_t = SearchConsts::DEFAULT_NUM_RESULTS)]
    pub results: usize,

    /// Only return results from the restricted subdirectories.
    #[arg(long)]
    pub restricted: bool,

    /// Corpus subdirectories that count as restricted domains.
    #[arg(long, value_name = "DIR", num_args = 1..)]
    pub restricted_dir: Vec<PathBuf>,

    /// After the first batch, load this many more results from the same query.
    #[arg(long, value_name = "N")]
    pub more: Option<usize>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Clone, Args)]
pub struct ParseArgs {
    /// Files or directories to parse.
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Clone, Args)]
pub struct CommonArgs {
    /// Document language.
    #[arg(long, short = 'L', value_enum, default_value_t = Language::English)]
    pub lang: Language,

    /// Keywords to look for. Multi-word keywords match consecutive words.
    #[arg(long, short = 'k', num_args = 1..)]
    pub keywords: Vec<String>,

    #[command(flatten)]
    pub rank: RankArgs,

    /// Print the ranking as JSON.
    #[arg(long)]
    pub json: bool,

    /// Print at most this many documents.
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Hide the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Clone, Args)]
pub struct RankArgs {
    /// Construction weight, e.g. `passive_voice=2`. Repeatable.
    #[arg(long, value_name = "CONSTRUCTION=W", value_parser = parse_weight)]
    pub weight: Vec<(String, f64)>,

    /// Drop documents containing this construction. Repeatable.
    #[arg(long, value_name = "CONSTRUCTION")]
    pub disable: Vec<String>,

    /// Drop documents at this readability level. Repeatable.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub disable_level: Vec<ReadabilityLevel>,

    /// Weight of keyword hits.
    #[arg(long, value_name = "W")]
    pub keyword_weight: Option<f64>,

    /// Length normalization, 0 to 10. Alone, sorts shortest first.
    #[arg(long, value_name = "W")]
    pub length_weight: Option<f64>,

    /// Drop documents shorter than this many words.
    #[arg(long, value_name = "N")]
    pub min_words: Option<usize>,
}

/// `name=weight` for `--weight`.
pub fn parse_weight(s: &str) -> Result<(String, f64), String> {
    let (name, weight) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CONSTRUCTION=W, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing construction name in '{s}'"));
    }
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|e| format!("bad weight in '{s}': {e}"))?;
    Ok((name.to_string(), weight))
}
