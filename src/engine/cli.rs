//! CLI command handlers: build the pipeline, run one operation through a session, rank, print.

use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use crate::KeywordSet;
use crate::engine::arg_parser::{Cli, Commands, CommonArgs, ParseArgs, SearchArgs};
use crate::engine::output::print_ranking;
use crate::engine::progress::{
    ProgressBar, add_to_bar_total, create_counter, finish_bar, set_bar_total,
    update_progress_bar,
};
use crate::engine::tools::collect_sources;
use crate::pipeline::{JobOutcome, MasterJobPipeline};
use crate::rank::RankerConfig;
use crate::services::{LocalCorpusSearch, Services, SearchProvider};
use crate::session::{SessionMessage, SessionState};
use crate::utils::config::{MESSAGE_POLL_INTERVAL, PipelineConfig};
use crate::utils::flair_toml::{
    FlairToml, apply_file_to_config, apply_file_to_ranker, load_flair_toml, load_flair_toml_file,
};
use crate::utils::setup_logging;

fn load_file_config(cli: &Cli) -> Option<FlairToml> {
    match &cli.config {
        Some(path) => load_flair_toml_file(path),
        None => load_flair_toml(Path::new(".")),
    }
}

/// File values first, then flags.
fn ranker_config(common: &CommonArgs, file: Option<&FlairToml>) -> RankerConfig {
    let mut config = RankerConfig::default();
    if let Some(file) = file {
        apply_file_to_ranker(file, &mut config);
    }
    let args = &common.rank;
    for (name, weight) in &args.weight {
        config = config.with_construction_weight(name.as_str(), *weight);
    }
    for name in &args.disable {
        config = config.with_disabled_construction(name.as_str());
    }
    for level in &args.disable_level {
        config = config.with_level(*level, false);
    }
    if let Some(w) = args.keyword_weight {
        config = config.with_keyword_weight(w);
    }
    if let Some(w) = args.length_weight {
        config = config.with_length_weight(w);
    }
    if let Some(min) = args.min_words {
        config = config.with_filter(move |d| d.length() >= min);
    }
    config
}

fn start_pipeline(
    config: &PipelineConfig,
    search: Arc<dyn SearchProvider>,
) -> Result<Arc<SessionState>> {
    let pipeline =
        MasterJobPipeline::new(config, Services::local(search)).context("start pipeline")?;
    let session = Arc::new(SessionState::new(Arc::new(pipeline)));

    let on_interrupt = Arc::clone(&session);
    ctrlc::set_handler(move || {
        if handle_interrupt(&on_interrupt) == Interrupt::Exit {
            std::process::exit(INTERRUPT_EXIT_CODE);
        }
    })
    .context("install Ctrl+C handler")?;
    Ok(session)
}

/// Conventional exit status for SIGINT (128 + 2).
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// What Ctrl+C does at a given moment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    /// A running operation was cancelled; the command winds down on its own.
    Cancelled,
    /// Nothing to cancel (ranking, printing, idle): leave the process.
    Exit,
}

pub fn handle_interrupt(session: &SessionState) -> Interrupt {
    if session.cancel_operation() {
        warn!("Interrupted; cancelling operation");
        Interrupt::Cancelled
    } else {
        Interrupt::Exit
    }
}

/// Poll the session queue until the operation's terminal message, then collect its outcome.
fn follow_operation(session: &SessionState, show_progress: bool) -> Result<JobOutcome> {
    let bar: Option<ProgressBar> = show_progress.then(|| create_counter("Parsing", " docs"));
    let mut done = false;
    while !done {
        for message in session.fetch_messages() {
            done |= report(&message, bar.as_ref());
        }
        if !done {
            thread::sleep(MESSAGE_POLL_INTERVAL);
        }
    }
    if let Some(bar) = &bar {
        finish_bar(bar);
    }
    Ok(session.wait_for_operation()?)
}

/// Returns true for the terminal message.
fn report(message: &SessionMessage, bar: Option<&ProgressBar>) -> bool {
    match message {
        SessionMessage::JobBegin { sources, .. } => {
            if let Some(bar) = bar {
                set_bar_total(bar, sources.len());
            }
            false
        }
        SessionMessage::CrawlComplete {
            result, extracted, ..
        } => {
            match (*extracted, bar) {
                (true, Some(bar)) => add_to_bar_total(bar, 1),
                (true, None) => {}
                (false, _) => debug!("no text from {}", result.display_url),
            }
            false
        }
        SessionMessage::ParseComplete { rank, title, .. } => {
            match bar {
                Some(bar) => update_progress_bar(bar, 1),
                None => debug!("parsed #{rank} {title}"),
            }
            false
        }
        SessionMessage::JobComplete {
            documents, failed, ..
        } => {
            info!("{documents} documents ready ({failed} failed)");
            true
        }
        SessionMessage::Error { message, .. } => {
            warn!("{message}");
            true
        }
        SessionMessage::Cancelled { .. } => true,
    }
}

/// Cancelled is not an error; failed is.
fn check_outcome(outcome: &JobOutcome) -> Result<bool> {
    match outcome {
        JobOutcome::Completed { .. } => Ok(true),
        JobOutcome::Cancelled => {
            warn!("Operation cancelled");
            Ok(false)
        }
        JobOutcome::Failed(e) => Err(anyhow!("{e}")),
    }
}

fn rank_and_print(
    session: &SessionState,
    common: &CommonArgs,
    file: Option<&FlairToml>,
) -> Result<()> {
    let config = ranker_config(common, file);
    debug!("{config:?}");
    let ranking = session.rerank(&config)?;
    print_ranking(&ranking, common.json, common.top)
}

fn handle_search(
    args: &SearchArgs,
    config: &PipelineConfig,
    file: Option<&FlairToml>,
) -> Result<()> {
    let provider = LocalCorpusSearch::open(&args.corpus)
        .with_context(|| format!("open corpus {}", args.corpus.display()))?
        .with_restricted(&args.restricted_dir);
    if provider.is_empty() {
        warn!("Corpus {} has no text files", args.corpus.display());
    }
    let session = start_pipeline(config, Arc::new(provider))?;
    let common = &args.common;
    let show_progress = !common.no_progress && !common.json;

    session.search_crawl_parse(
        common.lang,
        &args.query,
        args.restricted,
        args.results,
        KeywordSet::new(&common.keywords),
    )?;
    let mut completed = check_outcome(&follow_operation(&session, show_progress)?)?;

    if let Some(more) = args.more.filter(|_| completed) {
        if session.can_load_more() {
            session.load_more_results(more)?;
            completed = check_outcome(&follow_operation(&session, show_progress)?)?;
        } else {
            info!("No more results for '{}'", args.query);
        }
    }
    if completed {
        rank_and_print(&session, common, file)?;
    }
    session.release();
    session.pipeline().shutdown();
    Ok(())
}

fn handle_parse(
    args: &ParseArgs,
    config: &PipelineConfig,
    file: Option<&FlairToml>,
) -> Result<()> {
    let sources = collect_sources(&args.paths)?;
    // Uploads never search; the provider only satisfies the service bundle.
    let search: Arc<dyn SearchProvider> = Arc::new(LocalCorpusSearch::empty());
    let session = start_pipeline(config, search)?;
    let common = &args.common;
    let show_progress = !common.no_progress && !common.json;

    session.parse_documents(common.lang, sources, KeywordSet::new(&common.keywords))?;
    if check_outcome(&follow_operation(&session, show_progress)?)? {
        rank_and_print(&session, common, file)?;
    }
    session.release();
    session.pipeline().shutdown();
    Ok(())
}

/// Run the selected subcommand.
pub fn handle_run(cli: &Cli) -> Result<()> {
    setup_logging(cli.verbose);
    let file = load_file_config(cli);
    let mut config = PipelineConfig::default();
    if let Some(file) = &file {
        apply_file_to_config(file, &mut config);
    }
    debug!("{config:?}");
    match &cli.command {
        Commands::Search(args) => handle_search(args, &config, file.as_ref()),
        Commands::Parse(args) => handle_parse(args, &config, file.as_ref()),
    }
}
