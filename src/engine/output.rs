//! Ranking output: a colored table for terminals, JSON for scripts.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::document::ReadabilityLevel;
use crate::rank::{Ranking, SortMode};

#[derive(Serialize)]
struct DocumentView<'a> {
    rank: usize,
    title: &'a str,
    url: Option<&'a str>,
    score: f64,
    level: ReadabilityLevel,
    readability: f64,
    words: usize,
    keyword_hits: usize,
    constructions: BTreeMap<&'a str, usize>,
}

#[derive(Serialize)]
struct WeightView {
    dimension: String,
    weight: f64,
    df: usize,
    idf: f64,
}

#[derive(Serialize)]
struct RankingView<'a> {
    sort_mode: SortMode,
    num_filtered: usize,
    avg_length: f64,
    documents: Vec<DocumentView<'a>>,
    weights: Vec<WeightView>,
}

fn view(ranking: &Ranking, top: Option<usize>) -> RankingView<'_> {
    let limit = top.unwrap_or(usize::MAX);
    let documents = ranking
        .documents
        .iter()
        .take(limit)
        .map(|r| {
            let d = &r.document;
            DocumentView {
                rank: d.rank(),
                title: d.title(),
                url: d.url(),
                score: r.score,
                level: d.readability_level(),
                readability: d.readability().score(),
                words: d.length(),
                keyword_hits: d.keyword_count(),
                constructions: d.constructions().map(|(c, s)| (c.as_str(), s.len())).collect(),
            }
        })
        .collect();
    let weights = ranking
        .weights
        .dimensions
        .iter()
        .filter(|(_, s)| s.weight != 0.0)
        .map(|(dim, s)| WeightView {
            dimension: dim.to_string(),
            weight: s.weight,
            df: s.df,
            idf: s.idf,
        })
        .collect();
    RankingView {
        sort_mode: ranking.sort_mode,
        num_filtered: ranking.num_filtered,
        avg_length: ranking.weights.avg_length,
        documents,
        weights,
    }
}

fn colored_level(level: ReadabilityLevel) -> colored::ColoredString {
    let s = level.to_string();
    match level {
        ReadabilityLevel::A => s.green(),
        ReadabilityLevel::B => s.yellow(),
        ReadabilityLevel::C => s.red(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Print `ranking` to stdout, at most `top` documents.
pub fn print_ranking(ranking: &Ranking, json: bool, top: Option<usize>) -> Result<()> {
    let v = view(ranking, top);
    if json {
        let s = serde_json::to_string_pretty(&v).context("serialize ranking")?;
        println!("{s}");
        return Ok(());
    }

    println!(
        "{} {} documents ({} filtered), sorted by {:?}",
        "Ranking:".bold(),
        ranking.documents.len(),
        ranking.num_filtered,
        ranking.sort_mode
    );
    println!(
        "{:>4}  {:>8}  {:>5}  {:>6}  {}",
        "#".dimmed(),
        "score".dimmed(),
        "level".dimmed(),
        "words".dimmed(),
        "title".dimmed()
    );
    for d in &v.documents {
        println!(
            "{:>4}  {:>8.4}  {:>5}  {:>6}  {}",
            d.rank,
            d.score,
            colored_level(d.level),
            d.words,
            truncate(d.title, 60)
        );
    }
    if !v.weights.is_empty() {
        println!("{}", "Weights:".bold());
        for w in &v.weights {
            println!(
                "  {:<20} weight {:.3}  df {:>3}  idf {:.3}",
                w.dimension, w.weight, w.df, w.idf
            );
        }
    }
    Ok(())
}
