use clap::Parser;
use flair::document::ReadabilityLevel;
use flair::engine::arg_parser::{Cli, Commands, parse_weight};
use flair::engine::collect_sources;
use flair::rank::RankerConfig;
use flair::utils::config::{PackagePaths, PipelineConfig, PoolSizes, SearchConsts, StageTimeouts};
use flair::utils::{
    FlairToml, apply_file_to_config, apply_file_to_ranker, load_flair_toml, load_flair_toml_file,
};
use flair::{Construction, Language};
use std::fs;
use std::time::Duration;

// --- .flair.toml ---

#[test]
fn test_config_filename_follows_package_name() {
    assert_eq!(PackagePaths::get().pkg_name(), "flair");
    assert_eq!(PackagePaths::get().config_filename(), ".flair.toml");
}

#[test]
fn test_file_overrides_pipeline_config() {
    let file = FlairToml::parse(
        r#"
        [pipeline]
        search_threads = 1
        crawl_threads = 16
        search_timeout_secs = 5
        crawl_timeout_secs = 0
        blacklist = ["*.spam.test", "ads.example"]
        "#,
    )
    .unwrap();
    let mut config = PipelineConfig::default();
    let parse_before = config.pool_sizes.parse;
    apply_file_to_config(&file, &mut config);

    assert_eq!(config.pool_sizes.search, 1);
    assert_eq!(config.pool_sizes.crawl, 16);
    assert_eq!(config.pool_sizes.parse, parse_before);
    assert_eq!(config.timeouts.search, Some(Duration::from_secs(5)));
    assert_eq!(config.timeouts.crawl, None);
    assert_eq!(config.timeouts.parse, Some(StageTimeouts::PARSE));
    assert_eq!(config.blacklist, vec!["*.spam.test", "ads.example"]);
}

#[test]
fn test_file_overrides_ranker_config() {
    let file = FlairToml::parse(
        r#"
        [ranking]
        length_weight = 25.0
        keyword_weight = 2.0
        disabled_levels = ["C"]
        "#,
    )
    .unwrap();
    let mut config = RankerConfig::default().with_construction_weight("negation", 1.0);
    apply_file_to_ranker(&file, &mut config);

    assert_eq!(config.length_weight, 10.0);
    assert_eq!(config.keyword_weight, 2.0);
    assert!(!config.enabled_levels.contains(&ReadabilityLevel::C));
    assert!(config.enabled_levels.contains(&ReadabilityLevel::A));
    assert_eq!(
        config
            .construction_weights
            .get(&Construction::from("negation")),
        Some(&1.0)
    );
}

#[test]
fn test_empty_file_changes_nothing() {
    let file = FlairToml::parse("").unwrap();
    let mut config = PipelineConfig::default();
    apply_file_to_config(&file, &mut config);
    assert_eq!(config.pool_sizes, PoolSizes::default());
    assert_eq!(config.timeouts, StageTimeouts::default());
    assert!(config.blacklist.is_empty());
}

#[test]
fn test_unknown_keys_are_rejected() {
    assert!(FlairToml::parse("[pipeline]\nworkers = 3\n").is_err());
    assert!(FlairToml::parse("[output]\njson = true\n").is_err());
}

#[test]
fn test_load_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_flair_toml(dir.path()).is_none());

    fs::write(
        dir.path().join(".flair.toml"),
        "[pipeline]\nparse_threads = 3\n",
    )
    .unwrap();
    let file = load_flair_toml(dir.path()).unwrap();
    let mut config = PipelineConfig::default();
    apply_file_to_config(&file, &mut config);
    assert_eq!(config.pool_sizes.parse, 3);
}

#[test]
fn test_invalid_file_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "[pipeline\nsearch_threads = ").unwrap();
    assert!(load_flair_toml_file(&path).is_none());
}

// --- CLI arguments ---

#[test]
fn test_parse_weight() {
    assert_eq!(
        parse_weight("passive_voice=2.5"),
        Ok(("passive_voice".to_string(), 2.5))
    );
    assert_eq!(parse_weight(" negation = -1 "), Ok(("negation".to_string(), -1.0)));
    assert!(parse_weight("negation").is_err());
    assert!(parse_weight("=1").is_err());
    assert!(parse_weight("negation=lots").is_err());
}

#[test]
fn test_search_command_arguments() {
    let cli = Cli::try_parse_from([
        "flair",
        "search",
        "river bank",
        "--corpus",
        "corpus",
        "-n",
        "5",
        "-L",
        "de",
        "--weight",
        "negation=2",
        "--weight",
        "modal_verb=1",
        "--disable-level",
        "c",
        "--more",
        "3",
    ])
    .unwrap();
    let Commands::Search(args) = cli.command else {
        panic!("expected search command");
    };
    assert_eq!(args.query, "river bank");
    assert_eq!(args.results, 5);
    assert_eq!(args.more, Some(3));
    assert_eq!(args.common.lang, Language::German);
    assert_eq!(
        args.common.rank.weight,
        vec![("negation".to_string(), 2.0), ("modal_verb".to_string(), 1.0)]
    );
    assert_eq!(args.common.rank.disable_level, vec![ReadabilityLevel::C]);
    assert!(!cli.verbose);
}

#[test]
fn test_search_defaults() {
    let cli = Cli::try_parse_from(["flair", "-v", "search", "q", "--corpus", "c"]).unwrap();
    assert!(cli.verbose);
    let Commands::Search(args) = cli.command else {
        panic!("expected search command");
    };
    assert_eq!(args.results, SearchConsts::DEFAULT_NUM_RESULTS);
    assert_eq!(args.common.lang, Language::English);
    assert!(!args.restricted);
    assert!(args.common.keywords.is_empty());
}

#[test]
fn test_parse_command_requires_paths() {
    assert!(Cli::try_parse_from(["flair", "parse"]).is_err());
    let cli = Cli::try_parse_from(["flair", "parse", "a.txt", "docs", "--json", "--top", "3"])
        .unwrap();
    let Commands::Parse(args) = cli.command else {
        panic!("expected parse command");
    };
    assert_eq!(args.paths.len(), 2);
    assert!(args.common.json);
    assert_eq!(args.common.top, Some(3));
}

// --- source collection ---

#[test]
fn test_collect_sources_walks_directories() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b.txt"), "Second file.").unwrap();
    fs::write(
        dir.path().join("a.html"),
        "<html><body><p>First &amp; only</p></body></html>",
    )
    .unwrap();
    fs::write(dir.path().join("skip.bin"), "binary").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub").join("c.md"), "# Third").unwrap();

    let sources = collect_sources(&[dir.path().to_path_buf()]).unwrap();
    let titles: Vec<&str> = sources.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "b", "c"]);
    assert_eq!(sources[0].text, "First & only");
    let ranks: Vec<usize> = sources.iter().map(|s| s.rank).collect();
    assert_eq!(ranks, vec![0, 1, 2]);
    assert!(sources[1].url.as_deref().unwrap().starts_with("file://"));
}

#[test]
fn test_collect_sources_fails_when_nothing_found() {
    let dir = tempfile::tempdir().unwrap();
    assert!(collect_sources(&[dir.path().to_path_buf()]).is_err());
    assert!(collect_sources(&[dir.path().join("missing.txt")]).is_err());
}
