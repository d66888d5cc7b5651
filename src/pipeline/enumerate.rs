use anyhow::{Context, Result};

use crate::executor::run_bounded;
use crate::models::{episode_id, parse_air_date};
use crate::pipeline::resolve::{ResolvedMovie, ResolvedSeries};
use crate::pipeline::sources::SourceId;
use crate::report::{ErrorCategory, RunReport};
use crate::services::tmdb::{cast_names, crew_names, TmdbClient};

/// Provider-native record shapes. Ephemeral: created per run, consumed
/// by the normalizer, then discarded.
#[derive(Debug, Clone)]
pub struct RawEpisodeRecord {
    pub provider_id: i64,
    pub canonical_id: String,
    pub season: u32,
    pub episode: u32,
    pub title: String,
    pub air_date: String,
    pub synopsis: Option<String>,
    pub guest_stars: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RawSeasonRecord {
    pub provider_id: i64,
    pub season: u32,
    /// Episode count the provider advertises; may exceed the accepted
    /// count when records fail the basic-data gate.
    pub advertised_episode_count: usize,
    pub episodes: Vec<RawEpisodeRecord>,
}

#[derive(Debug, Clone)]
pub struct RawSeriesRecord {
    pub provider_id: i64,
    pub series_code: String,
    pub title: String,
    pub seasons: Vec<RawSeasonRecord>,
}

#[derive(Debug, Clone)]
pub struct RawMovieRecord {
    pub provider_id: i64,
    pub canonical_id: String,
    pub title: String,
    pub release_date: Option<String>,
    pub synopsis: Option<String>,
    pub directors: Vec<String>,
    pub writers: Vec<String>,
    pub cast: Vec<String>,
}

/// Basic-data completeness gate: a record needs a non-empty title and a
/// parseable air date to enter the catalog.
pub fn passes_basic_gate(title: &str, air_date: Option<&str>) -> bool {
    !title.trim().is_empty() && air_date.is_some_and(|d| parse_air_date(d).is_some())
}

/// Walk one resolved series: seasons 1..=N (or a single filtered
/// season), then every episode within each season, all through the
/// bounded executor. Per-record failures are isolated skips.
pub async fn enumerate_series(
    client: &TmdbClient,
    resolved: &ResolvedSeries,
    season_filter: Option<u32>,
    concurrency: usize,
    report: &mut RunReport,
) -> Result<RawSeriesRecord> {
    let season_numbers: Vec<u32> = match season_filter {
        Some(n) => vec![n],
        None => (1..=resolved.season_count).collect(),
    };

    tracing::info!(
        "enumerating '{}' ({} season(s))",
        resolved.title,
        season_numbers.len()
    );

    let season_outcome = run_bounded(
        season_numbers.clone(),
        concurrency,
        |season| client.get_season_details(resolved.provider_id, season),
        |done, total| tracing::debug!("seasons fetched: {done}/{total}"),
    )
    .await;
    for err in &season_outcome.errors {
        report.record_skip(
            ErrorCategory::Network,
            SourceId::Tmdb,
            format!("{}_s{}", resolved.series_code, season_numbers[err.index]),
            err.message.as_str(),
        );
    }

    let mut seasons = Vec::new();
    for details in season_outcome.results.into_iter().flatten() {
        let season_number = details.season_number;
        let advertised = details.episodes.len();

        // Gate on the summary before paying for per-episode detail calls.
        let mut accepted = Vec::new();
        for summary in &details.episodes {
            if passes_basic_gate(&summary.name, summary.air_date.as_deref()) {
                accepted.push(summary.episode_number);
            } else {
                report.record_skip(
                    ErrorCategory::NoMatch,
                    SourceId::Tmdb,
                    episode_id(&resolved.series_code, season_number, summary.episode_number),
                    "failed basic-data gate (missing title or air date)",
                );
            }
        }

        let episode_outcome = run_bounded(
            accepted.clone(),
            concurrency,
            |episode| client.get_episode_details(resolved.provider_id, season_number, episode),
            |done, total| {
                tracing::debug!("s{season_number} episodes fetched: {done}/{total}")
            },
        )
        .await;
        for err in &episode_outcome.errors {
            report.record_skip(
                ErrorCategory::Network,
                SourceId::Tmdb,
                episode_id(&resolved.series_code, season_number, accepted[err.index]),
                err.message.as_str(),
            );
        }

        let mut episodes = Vec::new();
        for ep in episode_outcome.results.into_iter().flatten() {
            // Detail responses can still come back thinner than the
            // summary; re-check the gate on what we actually keep.
            if !passes_basic_gate(&ep.name, ep.air_date.as_deref()) {
                report.record_skip(
                    ErrorCategory::NoMatch,
                    SourceId::Tmdb,
                    episode_id(&resolved.series_code, season_number, ep.episode_number),
                    "detail record failed basic-data gate",
                );
                continue;
            }
            let mut guest_stars: Vec<String> =
                ep.guest_stars.iter().map(|g| g.name.clone()).collect();
            if guest_stars.is_empty() {
                if let Some(credits) = &ep.credits {
                    guest_stars = credits.guest_stars.iter().map(|g| g.name.clone()).collect();
                }
            }
            let record = RawEpisodeRecord {
                provider_id: ep.id,
                canonical_id: episode_id(
                    &resolved.series_code,
                    season_number,
                    ep.episode_number,
                ),
                season: season_number,
                episode: ep.episode_number,
                title: ep.name,
                air_date: ep.air_date.unwrap_or_default(),
                synopsis: ep.overview.filter(|o| !o.trim().is_empty()),
                guest_stars,
            };
            tracing::trace!(
                "accepted {} (provider episode {})",
                record.canonical_id,
                record.provider_id
            );
            episodes.push(record);
        }

        if episodes.len() != advertised {
            tracing::debug!(
                "s{}: kept {}/{} advertised episodes",
                season_number,
                episodes.len(),
                advertised
            );
        }
        report.episodes_fetched += episodes.len();
        seasons.push(RawSeasonRecord {
            provider_id: details.id,
            season: season_number,
            advertised_episode_count: advertised,
            episodes,
        });
    }

    report.seasons_fetched += seasons.len();
    Ok(RawSeriesRecord {
        provider_id: resolved.provider_id,
        series_code: resolved.series_code.clone(),
        title: resolved.title.clone(),
        seasons,
    })
}

/// Fetch full detail and credits for one resolved movie.
pub async fn enumerate_movie(client: &TmdbClient, resolved: &ResolvedMovie) -> Result<RawMovieRecord> {
    let details = client
        .get_movie_details(resolved.provider_id)
        .await
        .with_context(|| format!("fetching movie '{}'", resolved.title))?;

    Ok(RawMovieRecord {
        provider_id: details.id,
        canonical_id: resolved.movie_id.clone(),
        title: details.title,
        release_date: details.release_date.filter(|d| !d.trim().is_empty()),
        synopsis: details.overview.filter(|o| !o.trim().is_empty()),
        directors: crew_names(&details.credits, &["Director"]),
        writers: crew_names(&details.credits, &["Writer", "Screenplay", "Story"]),
        cast: cast_names(&details.credits, 10),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_gate_requires_title_and_air_date() {
        assert!(passes_basic_gate("The Inner Light", Some("1992-06-01")));
        assert!(!passes_basic_gate("", Some("1992-06-01")));
        assert!(!passes_basic_gate("   ", Some("1992-06-01")));
        assert!(!passes_basic_gate("The Inner Light", None));
        assert!(!passes_basic_gate("The Inner Light", Some("TBA")));
        assert!(!passes_basic_gate("The Inner Light", Some("")));
    }
}
