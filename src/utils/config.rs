//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Per-directory config file, e.g. `.flair.toml`.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Worker pools ----

/// Thread counts per stage pool.
/// Search is small (APIs rate-limit), crawl is larger (network-bound), parse follows CPU count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolSizes {
    pub search: usize,
    pub crawl: usize,
    pub parse: usize,
}

impl PoolSizes {
    pub const SEARCH_THREADS: usize = 2;
    pub const CRAWL_THREADS: usize = 8;

    /// Defaults with `parse` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            search: Self::SEARCH_THREADS,
            crawl: Self::CRAWL_THREADS,
            parse: rayon::current_num_threads(),
        }
    }
}

impl Default for PoolSizes {
    fn default() -> Self {
        Self::current()
    }
}

/// Per-task time limits per stage. `None` disables the limit for that stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageTimeouts {
    pub search: Option<Duration>,
    pub crawl: Option<Duration>,
    pub parse: Option<Duration>,
}

impl StageTimeouts {
    pub const SEARCH: Duration = Duration::from_secs(30);
    pub const CRAWL: Duration = Duration::from_secs(20);
    pub const PARSE: Duration = Duration::from_secs(120);

    pub fn none() -> Self {
        Self {
            search: None,
            crawl: None,
            parse: None,
        }
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            search: Some(Self::SEARCH),
            crawl: Some(Self::CRAWL),
            parse: Some(Self::PARSE),
        }
    }
}

// ---- Search ----

/// Search paging limits.
pub struct SearchConsts;

impl SearchConsts {
    /// Results requested from a provider per page.
    pub const RESULTS_PER_PAGE: usize = 10;
    /// Pages fetched per search task before giving up on reaching the target count.
    pub const MAX_PAGES_PER_FETCH: usize = 10;
    /// Result count when the caller does not ask for one.
    pub const DEFAULT_NUM_RESULTS: usize = 20;
}

/// Hosts whose pages rarely yield readable prose (video, social, shopping).
/// Matched against the host and each of its parent domains.
pub const DEFAULT_URL_BLACKLIST: &[&str] = &[
    "youtube.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "tiktok.com",
    "pinterest.*",
    "amazon.*",
    "ebay.*",
];

// ---- Ranking ----

/// BM25 constants.
pub struct RankingConsts;

impl RankingConsts {
    /// Term-frequency saturation.
    pub const K1: f64 = 1.7;
    /// `b = length_weight / LENGTH_WEIGHT_SCALE`.
    pub const LENGTH_WEIGHT_SCALE: f64 = 10.0;
    /// Upper bound of the length-weight slider.
    pub const MAX_LENGTH_WEIGHT: f64 = 10.0;
}

// ---- Session / CLI ----

/// How often the CLI polls the session message queue.
pub const MESSAGE_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---- Pipeline ----

/// Everything [`MasterJobPipeline`](crate::pipeline::MasterJobPipeline) needs at construction.
#[derive(Clone, Debug, Default)]
pub struct PipelineConfig {
    pub pool_sizes: PoolSizes,
    pub timeouts: StageTimeouts,
    /// Extra host patterns appended to [`DEFAULT_URL_BLACKLIST`].
    pub blacklist: Vec<String>,
}
