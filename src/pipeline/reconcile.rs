use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::models::{
    is_placeholder, CanonicalEpisode, CanonicalMovieItem, CanonicalSeasonItem, CatalogItem, Era,
};

/// A genuine in-universe year: four digits in the 2000s or 3000s.
/// Air-date years (19xx) and placeholders fail this.
static RE_IN_UNIVERSE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[23]\d{3}").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiffCounts {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl DiffCounts {
    fn is_clean(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.modified == 0
    }
}

/// Per-era change classification, for observability.
#[derive(Debug, Default)]
pub struct EraDiff {
    pub era: String,
    pub added_items: Vec<String>,
    pub removed_items: Vec<String>,
    pub modified_items: Vec<String>,
    pub added_episodes: Vec<String>,
    pub removed_episodes: Vec<String>,
    pub modified_episodes: Vec<String>,
}

/// Change counts between two catalog snapshots. Always computed against
/// the pre-merge pair (existing vs. new), never against the merged
/// result.
#[derive(Debug, Default)]
pub struct DiffReport {
    pub eras: DiffCounts,
    pub items: DiffCounts,
    pub episodes: DiffCounts,
    pub per_era: Vec<EraDiff>,
}

impl DiffReport {
    pub fn log_summary(&self) {
        if self.eras.is_clean() && self.items.is_clean() && self.episodes.is_clean() {
            tracing::info!("no changes vs existing catalog");
            return;
        }
        tracing::info!(
            "diff vs existing catalog: eras +{}/-{}/~{}, items +{}/-{}/~{}, episodes +{}/-{}/~{}",
            self.eras.added,
            self.eras.removed,
            self.eras.modified,
            self.items.added,
            self.items.removed,
            self.items.modified,
            self.episodes.added,
            self.episodes.removed,
            self.episodes.modified,
        );
        for era in &self.per_era {
            tracing::debug!(
                "  {}: items +{:?} -{:?} ~{:?}; episodes +{} -{} ~{}",
                era.era,
                era.added_items,
                era.removed_items,
                era.modified_items,
                era.added_episodes.len(),
                era.removed_episodes.len(),
                era.modified_episodes.len(),
            );
        }
    }
}

fn episodes_of(item: &CatalogItem) -> &[CanonicalEpisode] {
    match item {
        CatalogItem::Season(s) => &s.episodes,
        CatalogItem::Movie(_) => &[],
    }
}

fn diff_items(existing: &Era, fresh: &Era, report: &mut DiffReport, era_diff: &mut EraDiff) {
    for item in &existing.items {
        match fresh.items.iter().find(|f| f.id() == item.id()) {
            None => {
                report.items.removed += 1;
                era_diff.removed_items.push(item.id().to_string());
            }
            Some(fresh_item) => {
                if fresh_item != item {
                    report.items.modified += 1;
                    era_diff.modified_items.push(item.id().to_string());
                }
                for ep in episodes_of(item) {
                    match episodes_of(fresh_item).iter().find(|f| f.id == ep.id) {
                        None => {
                            report.episodes.removed += 1;
                            era_diff.removed_episodes.push(ep.id.clone());
                        }
                        Some(fresh_ep) => {
                            if fresh_ep != ep {
                                report.episodes.modified += 1;
                                era_diff.modified_episodes.push(ep.id.clone());
                            }
                        }
                    }
                }
                for ep in episodes_of(fresh_item) {
                    if !episodes_of(item).iter().any(|e| e.id == ep.id) {
                        report.episodes.added += 1;
                        era_diff.added_episodes.push(ep.id.clone());
                    }
                }
            }
        }
    }
    for item in &fresh.items {
        if !existing.items.iter().any(|e| e.id() == item.id()) {
            report.items.added += 1;
            era_diff.added_items.push(item.id().to_string());
            for ep in episodes_of(item) {
                report.episodes.added += 1;
                era_diff.added_episodes.push(ep.id.clone());
            }
        }
    }
}

/// Classify changes between the existing and freshly generated catalogs.
pub fn diff_catalogs(existing: &[Era], fresh: &[Era]) -> DiffReport {
    let mut report = DiffReport::default();

    for era in existing {
        let mut era_diff = EraDiff {
            era: era.id.to_string(),
            ..EraDiff::default()
        };
        match fresh.iter().find(|f| f.id == era.id) {
            None => report.eras.removed += 1,
            Some(fresh_era) => {
                diff_items(era, fresh_era, &mut report, &mut era_diff);
                if !era_diff.added_items.is_empty()
                    || !era_diff.removed_items.is_empty()
                    || !era_diff.modified_items.is_empty()
                {
                    report.eras.modified += 1;
                }
            }
        }
        report.per_era.push(era_diff);
    }
    for era in fresh {
        if !existing.iter().any(|e| e.id == era.id) {
            report.eras.added += 1;
            let mut era_diff = EraDiff {
                era: era.id.to_string(),
                ..EraDiff::default()
            };
            for item in &era.items {
                report.items.added += 1;
                era_diff.added_items.push(item.id().to_string());
                for ep in episodes_of(item) {
                    report.episodes.added += 1;
                    era_diff.added_episodes.push(ep.id.clone());
                }
            }
            report.per_era.push(era_diff);
        }
    }

    report
}

/// `notes`-style text: the existing value wins only when the new value
/// carries nothing.
fn merge_text(existing: &str, new: &str) -> String {
    if is_placeholder(new) {
        existing.to_string()
    } else {
        new.to_string()
    }
}

/// `year`: an existing genuine in-universe year survives unless the new
/// value is itself in-universe (and thus adds information).
fn merge_year(existing: &str, new: &str) -> String {
    if RE_IN_UNIVERSE_YEAR.is_match(existing) && !RE_IN_UNIVERSE_YEAR.is_match(new) {
        existing.to_string()
    } else {
        new.to_string()
    }
}

/// `stardate`: an existing real stardate beats a new placeholder;
/// otherwise the new value wins.
fn merge_stardate(existing: &str, new: &str) -> String {
    if !is_placeholder(existing) && is_placeholder(new) {
        existing.to_string()
    } else {
        new.to_string()
    }
}

fn array_is_empty(arr: &Option<Vec<String>>) -> bool {
    arr.as_ref().map_or(true, |v| v.is_empty())
}

/// Array fields: an empty new value never wipes a populated existing
/// one; otherwise the new array wins.
fn merge_array(existing: &Option<Vec<String>>, new: &Option<Vec<String>>) -> Option<Vec<String>> {
    if array_is_empty(new) && !array_is_empty(existing) {
        existing.clone()
    } else {
        new.clone()
    }
}

/// Unknown fields pass through verbatim: existing entries win over
/// whatever the fresh run produced.
fn merge_extra(existing: &Map<String, Value>, new: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = new.clone();
    for (key, value) in existing {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

fn reconcile_episode(existing: &CanonicalEpisode, new: &CanonicalEpisode) -> CanonicalEpisode {
    CanonicalEpisode {
        id: new.id.clone(),
        title: merge_text(&existing.title, &new.title),
        season: new.season,
        episode: new.episode,
        air_date: merge_text(&existing.air_date, &new.air_date),
        stardate: merge_stardate(&existing.stardate, &new.stardate),
        synopsis: merge_text(&existing.synopsis, &new.synopsis),
        plot_points: merge_array(&existing.plot_points, &new.plot_points),
        guest_stars: merge_array(&existing.guest_stars, &new.guest_stars),
        connections: merge_array(&existing.connections, &new.connections),
        extra: merge_extra(&existing.extra, &new.extra),
    }
}

fn reconcile_episodes(
    existing: &[CanonicalEpisode],
    new: &[CanonicalEpisode],
) -> Vec<CanonicalEpisode> {
    let mut merged: Vec<CanonicalEpisode> = existing
        .iter()
        .map(|ep| match new.iter().find(|n| n.id == ep.id) {
            // Present only in the existing catalog: preserved verbatim.
            None => ep.clone(),
            Some(n) => reconcile_episode(ep, n),
        })
        .collect();
    for n in new {
        if !existing.iter().any(|e| e.id == n.id) {
            merged.push(n.clone());
        }
    }
    merged
}

fn reconcile_season(
    existing: &CanonicalSeasonItem,
    new: &CanonicalSeasonItem,
) -> CanonicalSeasonItem {
    let episodes = reconcile_episodes(&existing.episodes, &new.episodes);
    CanonicalSeasonItem {
        id: new.id.clone(),
        title: merge_text(&existing.title, &new.title),
        series_code: new.series_code.clone(),
        season: new.season,
        year: merge_year(&existing.year, &new.year),
        stardate: merge_stardate(&existing.stardate, &new.stardate),
        episode_count: episodes.len(),
        episodes,
        extra: merge_extra(&existing.extra, &new.extra),
    }
}

fn reconcile_movie(existing: &CanonicalMovieItem, new: &CanonicalMovieItem) -> CanonicalMovieItem {
    CanonicalMovieItem {
        id: new.id.clone(),
        title: merge_text(&existing.title, &new.title),
        year: merge_year(&existing.year, &new.year),
        stardate: merge_stardate(&existing.stardate, &new.stardate),
        director: merge_array(&existing.director, &new.director),
        writer: merge_array(&existing.writer, &new.writer),
        cast: merge_array(&existing.cast, &new.cast),
        notes: merge_text(&existing.notes, &new.notes),
        extra: merge_extra(&existing.extra, &new.extra),
    }
}

fn reconcile_item(existing: &CatalogItem, new: &CatalogItem) -> CatalogItem {
    match (existing, new) {
        (CatalogItem::Season(e), CatalogItem::Season(n)) => {
            CatalogItem::Season(reconcile_season(e, n))
        }
        (CatalogItem::Movie(e), CatalogItem::Movie(n)) => CatalogItem::Movie(reconcile_movie(e, n)),
        // Same id, different shape: the fresh run defines the shape.
        _ => {
            tracing::warn!(
                "item '{}' changed shape between runs; taking the new record",
                new.id()
            );
            new.clone()
        }
    }
}

fn reconcile_era(existing: &Era, new: &Era) -> Era {
    let mut items: Vec<CatalogItem> = existing
        .items
        .iter()
        .map(|item| match new.items.iter().find(|n| n.id() == item.id()) {
            // Present only in the existing catalog: preserved verbatim.
            None => item.clone(),
            Some(n) => reconcile_item(item, n),
        })
        .collect();
    for n in &new.items {
        if !existing.items.iter().any(|e| e.id() == n.id()) {
            items.push(n.clone());
        }
    }

    // Era metadata belongs to the static taxonomy; the fresh run wins,
    // while unknown fields on the existing era still pass through.
    Era {
        id: new.id.clone(),
        title: new.title.clone(),
        years: new.years.clone(),
        stardates: new.stardates.clone(),
        description: new.description.clone(),
        items,
        extra: merge_extra(&existing.extra, &new.extra),
    }
}

/// Reconcile a freshly generated catalog against the previously
/// persisted one. The existing catalog is a read-only input; the result
/// is a new catalog that preserves manually curated and richer existing
/// data. Safe to run repeatedly: reconciling the output again with the
/// same fresh input is a no-op.
pub fn reconcile(existing: &[Era], fresh: &[Era]) -> Vec<Era> {
    let mut merged: Vec<Era> = existing
        .iter()
        .map(|era| match fresh.iter().find(|f| f.id == era.id) {
            None => era.clone(),
            Some(f) => reconcile_era(era, f),
        })
        .collect();
    for f in fresh {
        if !existing.iter().any(|e| e.id == f.id) {
            merged.push(f.clone());
        }
    }

    // Canonical era order, not insertion order; unknown ids last.
    merged.sort_by_key(|era| era.id.sort_rank());
    merged
}
