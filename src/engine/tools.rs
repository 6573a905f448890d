//! Source collection for `flair parse`.

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::ParseSource;
use crate::services::strip_html;

const SOURCE_EXTENSIONS: &[&str] = &["txt", "md", "html", "htm"];

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SOURCE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// Files named directly are always taken; directories contribute their text/HTML files.
fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        let meta = std::fs::metadata(path).with_context(|| format!("read {}", path.display()))?;
        if meta.is_file() {
            files.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| match e {
                Ok(e) => Some(e),
                Err(err) => {
                    warn!("skipping unreadable entry: {err}");
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && has_source_extension(e.path()))
            .map(|e| e.into_path())
            .collect();
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

/// Read every file under `paths` into a [`ParseSource`], ranked in walk order.
pub fn collect_sources(paths: &[PathBuf]) -> Result<Vec<ParseSource>> {
    let mut sources = Vec::new();
    for path in expand_paths(paths)? {
        let raw = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
                continue;
            }
        };
        let text = if is_html(&path) { strip_html(&raw) } else { raw };
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let source = ParseSource::new(sources.len(), title, text)
            .with_url(format!("file://{}", path.display()));
        sources.push(source);
    }
    if sources.is_empty() {
        bail!("no readable documents found");
    }
    debug!("collected {} sources", sources.len());
    Ok(sources)
}
