use std::collections::HashMap;

use crate::error::PipelineError;
use crate::models::{is_placeholder, CanonicalEpisode, CanonicalMovieItem, CatalogItem};

/// Per-record completeness score in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ItemScore {
    pub id: String,
    pub title: String,
    pub score: f64,
}

/// Catalog-wide completeness summary. Low scores are warnings only;
/// records below the minimum stay in the catalog.
#[derive(Debug)]
pub struct QualityReport {
    pub scores: Vec<ItemScore>,
    pub average: f64,
    pub items_below_threshold: Vec<ItemScore>,
    pub meeting_target: usize,
    pub total: usize,
}

fn populated(arr: &Option<Vec<String>>) -> bool {
    arr.as_ref().is_some_and(|v| !v.is_empty())
}

/// Synopsis weighs double; it is the field viewers actually miss.
fn score_episode(ep: &CanonicalEpisode) -> f64 {
    let mut earned = 0.0;
    if !is_placeholder(&ep.synopsis) {
        earned += 2.0;
    }
    if !is_placeholder(&ep.stardate) {
        earned += 1.0;
    }
    if populated(&ep.guest_stars) {
        earned += 1.0;
    }
    if populated(&ep.plot_points) {
        earned += 1.0;
    }
    if populated(&ep.connections) {
        earned += 1.0;
    }
    earned / 6.0
}

fn score_movie(movie: &CanonicalMovieItem) -> f64 {
    let mut earned = 0.0;
    if populated(&movie.director) {
        earned += 1.0;
    }
    if populated(&movie.writer) {
        earned += 1.0;
    }
    if populated(&movie.cast) {
        earned += 1.0;
    }
    if !is_placeholder(&movie.notes) {
        earned += 1.0;
    }
    if !is_placeholder(&movie.stardate) {
        earned += 1.0;
    }
    earned / 5.0
}

fn score_item(item: &CatalogItem) -> f64 {
    match item {
        CatalogItem::Movie(m) => score_movie(m),
        CatalogItem::Season(s) => {
            if s.episodes.is_empty() {
                return 0.0;
            }
            s.episodes.iter().map(score_episode).sum::<f64>() / s.episodes.len() as f64
        }
    }
}

/// Score every canonical item against the configured thresholds.
pub fn score_items(items: &[CatalogItem], minimum: f64, target: f64) -> QualityReport {
    let scores: Vec<ItemScore> = items
        .iter()
        .map(|item| ItemScore {
            id: item.id().to_string(),
            title: item.title().to_string(),
            score: score_item(item),
        })
        .collect();

    let total = scores.len();
    let average = if total == 0 {
        0.0
    } else {
        scores.iter().map(|s| s.score).sum::<f64>() / total as f64
    };
    let items_below_threshold: Vec<ItemScore> = scores
        .iter()
        .filter(|s| s.score < minimum)
        .cloned()
        .collect();
    let meeting_target = scores.iter().filter(|s| s.score >= target).count();

    QualityReport {
        scores,
        average,
        items_below_threshold,
        meeting_target,
        total,
    }
}

/// Duplicate canonical ids are the one data-integrity condition that
/// aborts the run, always before anything is written.
pub fn check_duplicate_ids(items: &[CatalogItem]) -> Result<(), PipelineError> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for item in items {
        *seen.entry(item.id()).or_default() += 1;
        if let CatalogItem::Season(season) = item {
            for ep in &season.episodes {
                *seen.entry(&ep.id).or_default() += 1;
            }
        }
    }

    let mut duplicates: Vec<String> = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| id.to_string())
        .collect();
    if duplicates.is_empty() {
        return Ok(());
    }
    duplicates.sort();
    Err(PipelineError::DuplicateIds { ids: duplicates })
}
