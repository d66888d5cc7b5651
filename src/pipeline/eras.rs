use std::collections::HashMap;

use serde_json::Map;

use crate::models::{CatalogItem, Era, EraId};
use crate::pipeline::sources::SourceId;
use crate::report::{ErrorCategory, RunReport};

/// A hand-curated taxonomy entry. The table is fixed: eras are never
/// discovered, and emission order follows `sort_order`, not discovery
/// order.
pub struct EraSpec {
    pub id: EraId,
    pub title: &'static str,
    pub years: &'static str,
    pub stardates: &'static str,
    pub description: &'static str,
    pub sort_order: u32,
}

pub const ERA_TABLE: &[EraSpec] = &[
    EraSpec {
        id: EraId::Enterprise,
        title: "The Beginning",
        years: "2151-2161",
        stardates: "None",
        description: "Earth's first warp-five starship and the road to the Federation.",
        sort_order: 1,
    },
    EraSpec {
        id: EraId::DiscoveryTos,
        title: "The 23rd Century",
        years: "2256-2293",
        stardates: "1207.3-9529.1",
        description: "The Klingon war, the five-year mission, and the original crew's films.",
        sort_order: 2,
    },
    EraSpec {
        id: EraId::Kelvin,
        title: "The Kelvin Timeline",
        years: "2233-2263 (alternate)",
        stardates: "2233.04-2263.2",
        description: "The alternate reality created by Nero's incursion.",
        sort_order: 3,
    },
    EraSpec {
        id: EraId::Tng,
        title: "The 24th Century",
        years: "2364-2379",
        stardates: "41153.7-56844.9",
        description: "The Enterprise-D, Deep Space 9, and the Delta Quadrant.",
        sort_order: 4,
    },
    EraSpec {
        id: EraId::Picard,
        title: "The 25th Century",
        years: "2399-2402",
        stardates: "None",
        description: "The twilight years of Jean-Luc Picard.",
        sort_order: 5,
    },
    EraSpec {
        id: EraId::FarFuture,
        title: "The Far Future",
        years: "3188-3191",
        stardates: "865211.3-865961.4",
        description: "A galaxy rebuilding after the Burn.",
        sort_order: 6,
    },
];

/// Era assignment for a series season. Discovery straddles the
/// taxonomy: seasons 1-2 sit in the 23rd century, the season 3 jump
/// lands everything after in the far future. That split is hard-coded
/// for exactly this one series.
fn era_for_series(series_code: &str, season: u32) -> Option<EraId> {
    match series_code {
        "ent" => Some(EraId::Enterprise),
        "dsc" if season <= 2 => Some(EraId::DiscoveryTos),
        "dsc" => Some(EraId::FarFuture),
        "snw" | "tos" | "tas" => Some(EraId::DiscoveryTos),
        "tng" | "ds9" | "voy" | "low" | "pro" => Some(EraId::Tng),
        "pic" => Some(EraId::Picard),
        _ => None,
    }
}

fn era_for_movie(movie_id: &str) -> Option<EraId> {
    match movie_id {
        "tmp" | "twok" | "tsfs" | "tvh" | "tff" | "tuc" => Some(EraId::DiscoveryTos),
        "gen" | "fc" | "ins" | "nem" => Some(EraId::Tng),
        "st09" | "stid" | "stb" => Some(EraId::Kelvin),
        _ => None,
    }
}

fn era_for_item(item: &CatalogItem) -> Option<EraId> {
    match item {
        CatalogItem::Season(s) => era_for_series(&s.series_code, s.season),
        CatalogItem::Movie(m) => era_for_movie(&m.id),
    }
}

/// Bucket canonical items into the fixed era taxonomy. An item whose
/// code is not in the table is logged, recorded as a skip, and excluded
/// from the catalog. Only non-empty eras are emitted.
pub fn classify(items: Vec<CatalogItem>, report: &mut RunReport) -> Vec<Era> {
    let mut buckets: HashMap<EraId, Vec<CatalogItem>> = HashMap::new();

    for item in items {
        match era_for_item(&item) {
            Some(era_id) => buckets.entry(era_id).or_default().push(item),
            None => {
                tracing::warn!(
                    "no era mapping for '{}' ({}), excluding from catalog",
                    item.title(),
                    item.id()
                );
                report.record_skip(
                    ErrorCategory::Unclassified,
                    SourceId::Tmdb,
                    item.id(),
                    "no era mapping; item excluded",
                );
            }
        }
    }

    let mut specs: Vec<&EraSpec> = ERA_TABLE.iter().collect();
    specs.sort_by_key(|spec| spec.sort_order);

    specs
        .into_iter()
        .filter_map(|spec| {
            buckets.remove(&spec.id).map(|items| Era {
                id: spec.id.clone(),
                title: spec.title.to_string(),
                years: spec.years.to_string(),
                stardates: spec.stardates.to_string(),
                description: spec.description.to_string(),
                items,
                extra: Map::new(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{season_id, CanonicalMovieItem, CanonicalSeasonItem, STARDATE_TBD};

    fn season_item(code: &str, season: u32) -> CatalogItem {
        CatalogItem::Season(CanonicalSeasonItem {
            id: season_id(code, season),
            title: format!("{code} Season {season}"),
            series_code: code.to_string(),
            season,
            year: "TBD".to_string(),
            stardate: STARDATE_TBD.to_string(),
            episode_count: 0,
            episodes: Vec::new(),
            extra: Map::new(),
        })
    }

    fn movie_item(id: &str) -> CatalogItem {
        CatalogItem::Movie(CanonicalMovieItem {
            id: id.to_string(),
            title: id.to_string(),
            year: "TBD".to_string(),
            stardate: STARDATE_TBD.to_string(),
            director: None,
            writer: None,
            cast: None,
            notes: "None".to_string(),
            extra: Map::new(),
        })
    }

    #[test]
    fn test_discovery_season_split() {
        let mut report = RunReport::default();
        let eras = classify(
            vec![season_item("dsc", 2), season_item("dsc", 3)],
            &mut report,
        );
        assert_eq!(eras.len(), 2);
        assert_eq!(eras[0].id, EraId::DiscoveryTos);
        assert_eq!(eras[0].items[0].id(), "dsc_s2");
        assert_eq!(eras[1].id, EraId::FarFuture);
        assert_eq!(eras[1].items[0].id(), "dsc_s3");
    }

    #[test]
    fn test_unmapped_item_excluded_with_skip() {
        let mut report = RunReport::default();
        let eras = classify(vec![season_item("academ", 1)], &mut report);
        assert!(eras.is_empty());
        assert_eq!(report.skips.len(), 1);
        assert_eq!(report.skips[0].entity, "academ_s1");
    }

    #[test]
    fn test_empty_eras_not_emitted() {
        let mut report = RunReport::default();
        let eras = classify(vec![season_item("pic", 1)], &mut report);
        assert_eq!(eras.len(), 1);
        assert_eq!(eras[0].id, EraId::Picard);
    }

    #[test]
    fn test_eras_ordered_by_sort_order_not_discovery() {
        let mut report = RunReport::default();
        // Discovery order deliberately scrambled.
        let eras = classify(
            vec![
                movie_item("st09"),
                season_item("pic", 2),
                season_item("ent", 1),
                movie_item("twok"),
                season_item("voy", 4),
            ],
            &mut report,
        );
        let ids: Vec<&EraId> = eras.iter().map(|e| &e.id).collect();
        assert_eq!(
            ids,
            vec![
                &EraId::Enterprise,
                &EraId::DiscoveryTos,
                &EraId::Kelvin,
                &EraId::Tng,
                &EraId::Picard,
            ]
        );
    }

    #[test]
    fn test_movie_classification() {
        let mut report = RunReport::default();
        let eras = classify(
            vec![movie_item("tuc"), movie_item("nem"), movie_item("stb")],
            &mut report,
        );
        assert_eq!(eras[0].id, EraId::DiscoveryTos);
        assert_eq!(eras[1].id, EraId::Kelvin);
        assert_eq!(eras[2].id, EraId::Tng);
    }
}
