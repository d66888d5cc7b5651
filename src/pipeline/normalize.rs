use serde_json::Map;

use crate::models::{
    parse_air_date, season_id, CanonicalEpisode, CanonicalMovieItem, CanonicalSeasonItem,
    STARDATE_TBD, TEXT_NONE, YEAR_TBD,
};
use crate::pipeline::enumerate::{RawEpisodeRecord, RawMovieRecord, RawSeasonRecord};

/// Pure mapping functions, one per raw shape. Empty array fields are
/// omitted (`None`) rather than emitted as `[]`, so the incremental
/// merge can tell "no data yet" from "explicitly emptied".

fn text_or_none(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => TEXT_NONE.to_string(),
    }
}

fn array_or_omitted(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

/// Synthesize the season stardate range from the *actual* enumerated
/// episode count (the provider's advertised count may diverge when
/// records were filtered out at the gate).
pub fn season_stardate_range(season: u32, actual_episode_count: usize) -> String {
    if actual_episode_count == 0 {
        return STARDATE_TBD.to_string();
    }
    format!("~{season}.1-{season}.{actual_episode_count}")
}

pub fn normalize_episode(raw: &RawEpisodeRecord) -> CanonicalEpisode {
    CanonicalEpisode {
        id: raw.canonical_id.clone(),
        title: raw.title.clone(),
        season: raw.season,
        episode: raw.episode,
        air_date: raw.air_date.clone(),
        stardate: STARDATE_TBD.to_string(),
        synopsis: text_or_none(raw.synopsis.as_deref()),
        plot_points: None,
        guest_stars: array_or_omitted(&raw.guest_stars),
        connections: None,
        extra: Map::new(),
    }
}

pub fn normalize_season(
    series_title: &str,
    series_code: &str,
    raw: &RawSeasonRecord,
) -> CanonicalSeasonItem {
    let episodes: Vec<CanonicalEpisode> = raw.episodes.iter().map(normalize_episode).collect();
    let year = episodes
        .iter()
        .find_map(|e| parse_air_date(&e.air_date))
        .map(|d| d.format("%Y").to_string())
        .unwrap_or_else(|| YEAR_TBD.to_string());

    CanonicalSeasonItem {
        id: season_id(series_code, raw.season),
        title: format!("{} - Season {}", series_title, raw.season),
        series_code: series_code.to_string(),
        season: raw.season,
        year,
        stardate: season_stardate_range(raw.season, episodes.len()),
        episode_count: episodes.len(),
        episodes,
        extra: Map::new(),
    }
}

pub fn normalize_movie(raw: &RawMovieRecord) -> CanonicalMovieItem {
    let year = raw
        .release_date
        .as_deref()
        .and_then(parse_air_date)
        .map(|d| d.format("%Y").to_string())
        .unwrap_or_else(|| YEAR_TBD.to_string());

    CanonicalMovieItem {
        id: raw.canonical_id.clone(),
        title: raw.title.clone(),
        year,
        stardate: STARDATE_TBD.to_string(),
        director: array_or_omitted(&raw.directors),
        writer: array_or_omitted(&raw.writers),
        cast: array_or_omitted(&raw.cast),
        notes: text_or_none(raw.synopsis.as_deref()),
        extra: Map::new(),
    }
}
