//! Load `.flair.toml` (CLI only). The library takes a [`PipelineConfig`] and a [`RankerConfig`]
//! built by the caller; this file only fills them in.

use log::warn;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::document::ReadabilityLevel;
use crate::rank::RankerConfig;
use crate::utils::config::{PackagePaths, PipelineConfig};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlairToml {
    #[serde(default)]
    pipeline: PipelineSection,
    #[serde(default)]
    ranking: RankingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelineSection {
    search_threads: Option<usize>,
    crawl_threads: Option<usize>,
    parse_threads: Option<usize>,
    /// Seconds; 0 disables the limit.
    search_timeout_secs: Option<u64>,
    crawl_timeout_secs: Option<u64>,
    parse_timeout_secs: Option<u64>,
    blacklist: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RankingSection {
    length_weight: Option<f64>,
    keyword_weight: Option<f64>,
    disabled_levels: Option<Vec<ReadabilityLevel>>,
}

impl FlairToml {
    pub fn parse(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

/// Load `.flair.toml` from `dir` if present. None when missing or invalid (invalid is logged).
pub fn load_flair_toml(dir: &Path) -> Option<FlairToml> {
    load_flair_toml_file(&dir.join(PackagePaths::get().config_filename()))
}

/// Like [`load_flair_toml`] for an explicit file path.
pub fn load_flair_toml_file(path: &Path) -> Option<FlairToml> {
    let s = std::fs::read_to_string(path).ok()?;
    FlairToml::parse(&s)
        .map_err(|e| warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite a config field from the file when present.
macro_rules! apply_file_opt {
    ($section:expr, $target:expr, $field:ident => $($target_field:ident).+) => {
        if let Some(v) = $section.$field {
            $target.$($target_field).+ = v;
        }
    };
}

fn timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Apply `[pipeline]` to `config`. Call before applying CLI flags.
pub fn apply_file_to_config(file: &FlairToml, config: &mut PipelineConfig) {
    let p = &file.pipeline;
    apply_file_opt!(p, config, search_threads => pool_sizes.search);
    apply_file_opt!(p, config, crawl_threads => pool_sizes.crawl);
    apply_file_opt!(p, config, parse_threads => pool_sizes.parse);
    if let Some(secs) = p.search_timeout_secs {
        config.timeouts.search = timeout(secs);
    }
    if let Some(secs) = p.crawl_timeout_secs {
        config.timeouts.crawl = timeout(secs);
    }
    if let Some(secs) = p.parse_timeout_secs {
        config.timeouts.parse = timeout(secs);
    }
    if let Some(ref patterns) = p.blacklist {
        config.blacklist.extend(patterns.iter().cloned());
    }
}

/// Apply `[ranking]` to `config`. Call before applying CLI flags.
pub fn apply_file_to_ranker(file: &FlairToml, config: &mut RankerConfig) {
    let r = &file.ranking;
    if let Some(w) = r.length_weight {
        *config = std::mem::take(config).with_length_weight(w);
    }
    apply_file_opt!(r, config, keyword_weight => keyword_weight);
    if let Some(ref levels) = r.disabled_levels {
        for level in levels {
            config.enabled_levels.remove(level);
        }
    }
}
