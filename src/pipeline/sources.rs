use std::collections::HashMap;

use crate::models::{
    is_placeholder, CanonicalEpisode, CanonicalMovieItem, CanonicalSeasonItem, CatalogItem, Era,
};

/// Known metadata sources. Only TMDB is wired into discovery today, but
/// the merger is a generic N-source reducer and the priority table
/// already ranks the sources a future run may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    Manual,
    MemoryAlpha,
    Tmdb,
    Unknown,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Manual => "manual",
            SourceId::MemoryAlpha => "memory-alpha",
            SourceId::Tmdb => "tmdb",
            SourceId::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> SourceId {
        match value {
            "manual" => SourceId::Manual,
            "memory-alpha" => SourceId::MemoryAlpha,
            "tmdb" => SourceId::Tmdb,
            _ => SourceId::Unknown,
        }
    }

    /// Static priority ranking; unrecognized sources rank lowest.
    pub fn priority(&self) -> u8 {
        match self {
            SourceId::Manual => 3,
            SourceId::MemoryAlpha => 2,
            SourceId::Tmdb => 1,
            SourceId::Unknown => 0,
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A partial record paired with the source that produced it.
#[derive(Debug, Clone)]
pub struct SourcedRecord<T> {
    pub source: SourceId,
    pub record: T,
}

/// Fill-gap conflict resolution: copy a field from a lower-priority
/// record only when it is currently unpopulated here. A populated field
/// is never overwritten, regardless of what other sources claim.
pub trait FillGaps {
    fn fill_gaps_from(&mut self, other: &Self);
}

fn fill_text(base: &mut String, other: &str) {
    if is_placeholder(base) && !is_placeholder(other) {
        *base = other.to_string();
    }
}

fn fill_array(base: &mut Option<Vec<String>>, other: &Option<Vec<String>>) {
    if base.is_none() {
        base.clone_from(other);
    }
}

impl FillGaps for CanonicalEpisode {
    fn fill_gaps_from(&mut self, other: &Self) {
        fill_text(&mut self.title, &other.title);
        fill_text(&mut self.air_date, &other.air_date);
        fill_text(&mut self.stardate, &other.stardate);
        fill_text(&mut self.synopsis, &other.synopsis);
        fill_array(&mut self.plot_points, &other.plot_points);
        fill_array(&mut self.guest_stars, &other.guest_stars);
        fill_array(&mut self.connections, &other.connections);
    }
}

impl FillGaps for CanonicalMovieItem {
    fn fill_gaps_from(&mut self, other: &Self) {
        fill_text(&mut self.title, &other.title);
        fill_text(&mut self.year, &other.year);
        fill_text(&mut self.stardate, &other.stardate);
        fill_text(&mut self.notes, &other.notes);
        fill_array(&mut self.director, &other.director);
        fill_array(&mut self.writer, &other.writer);
        fill_array(&mut self.cast, &other.cast);
    }
}

impl FillGaps for CanonicalSeasonItem {
    fn fill_gaps_from(&mut self, other: &Self) {
        fill_text(&mut self.title, &other.title);
        fill_text(&mut self.year, &other.year);
        fill_text(&mut self.stardate, &other.stardate);
        // Episodes are matched by id; an episode only one source knows
        // about is itself a gap and gets appended.
        for episode in &mut self.episodes {
            if let Some(theirs) = other.episodes.iter().find(|e| e.id == episode.id) {
                episode.fill_gaps_from(theirs);
            }
        }
        for theirs in &other.episodes {
            if !self.episodes.iter().any(|e| e.id == theirs.id) {
                self.episodes.push(theirs.clone());
            }
        }
        self.episode_count = self.episodes.len();
    }
}

impl FillGaps for CatalogItem {
    fn fill_gaps_from(&mut self, other: &Self) {
        match (self, other) {
            (CatalogItem::Season(a), CatalogItem::Season(b)) => a.fill_gaps_from(b),
            (CatalogItem::Movie(a), CatalogItem::Movie(b)) => a.fill_gaps_from(b),
            // A shape mismatch between sources is not mergeable; the
            // higher-priority record stands as-is.
            _ => {}
        }
    }
}

/// Reduce a set of per-source records for the same entity. The
/// highest-priority record is the base; every remaining record, in
/// descending priority order, only fills gaps.
pub fn merge_sources<T: FillGaps + Clone>(records: &[SourcedRecord<T>]) -> Option<T> {
    if records.is_empty() {
        return None;
    }
    let mut ordered: Vec<&SourcedRecord<T>> = records.iter().collect();
    ordered.sort_by(|a, b| b.source.priority().cmp(&a.source.priority()));

    let mut base = ordered[0].record.clone();
    for sourced in &ordered[1..] {
        base.fill_gaps_from(&sourced.record);
    }
    Some(base)
}

/// Collapse same-id contributions across sources inside each era. Only
/// engaged when more than one source actually contributed; with a
/// single live source this is a pass-through.
pub fn merge_era_items(
    eras: &mut [Era],
    contributions: &HashMap<String, Vec<SourcedRecord<CatalogItem>>>,
) {
    for era in eras.iter_mut() {
        for item in &mut era.items {
            if let Some(records) = contributions.get(item.id()) {
                if records.len() > 1 {
                    if let Some(merged) = merge_sources(records) {
                        *item = merged;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{STARDATE_TBD, TEXT_NONE};
    use serde_json::Map;

    #[derive(Debug, Clone, PartialEq)]
    struct Probe {
        x: Option<i32>,
    }

    impl FillGaps for Probe {
        fn fill_gaps_from(&mut self, other: &Self) {
            if self.x.is_none() {
                self.x = other.x;
            }
        }
    }

    fn sourced(source: SourceId, x: Option<i32>) -> SourcedRecord<Probe> {
        SourcedRecord {
            source,
            record: Probe { x },
        }
    }

    #[test]
    fn test_populated_base_field_never_overwritten() {
        let merged = merge_sources(&[
            sourced(SourceId::Manual, Some(1)),
            sourced(SourceId::MemoryAlpha, Some(2)),
        ])
        .unwrap();
        assert_eq!(merged.x, Some(1));
    }

    #[test]
    fn test_gap_filled_from_lower_priority() {
        let merged = merge_sources(&[
            sourced(SourceId::Manual, None),
            sourced(SourceId::MemoryAlpha, Some(2)),
        ])
        .unwrap();
        assert_eq!(merged.x, Some(2));
    }

    #[test]
    fn test_base_selection_ignores_input_order() {
        let merged = merge_sources(&[
            sourced(SourceId::Tmdb, Some(9)),
            sourced(SourceId::Manual, Some(1)),
        ])
        .unwrap();
        assert_eq!(merged.x, Some(1));
    }

    #[test]
    fn test_unknown_source_ranks_lowest() {
        let merged = merge_sources(&[
            sourced(SourceId::Unknown, Some(7)),
            sourced(SourceId::Tmdb, Some(3)),
        ])
        .unwrap();
        assert_eq!(merged.x, Some(3));
        assert_eq!(SourceId::parse("fan-wiki"), SourceId::Unknown);
        assert_eq!(SourceId::Unknown.priority(), 0);
    }

    #[test]
    fn test_empty_input_merges_to_none() {
        assert!(merge_sources::<Probe>(&[]).is_none());
    }

    #[test]
    fn test_movie_fill_gap_respects_placeholders() {
        let base = CanonicalMovieItem {
            id: "twok".to_string(),
            title: "Star Trek II: The Wrath of Khan".to_string(),
            year: "2285".to_string(),
            stardate: STARDATE_TBD.to_string(),
            director: None,
            writer: None,
            cast: None,
            notes: TEXT_NONE.to_string(),
            extra: Map::new(),
        };
        let mut lower = base.clone();
        lower.year = "1982".to_string();
        lower.stardate = "Stardate 8130.3".to_string();
        lower.notes = "Ceti Alpha V.".to_string();
        lower.director = Some(vec!["Nicholas Meyer".to_string()]);

        let merged = merge_sources(&[
            SourcedRecord {
                source: SourceId::Manual,
                record: CatalogItem::Movie(base),
            },
            SourcedRecord {
                source: SourceId::Tmdb,
                record: CatalogItem::Movie(lower),
            },
        ])
        .unwrap();

        let CatalogItem::Movie(m) = merged else {
            panic!("expected movie");
        };
        // Populated survives; placeholders and gaps get filled.
        assert_eq!(m.year, "2285");
        assert_eq!(m.stardate, "Stardate 8130.3");
        assert_eq!(m.notes, "Ceti Alpha V.");
        assert_eq!(m.director.as_deref(), Some(&["Nicholas Meyer".to_string()][..]));
    }
}
