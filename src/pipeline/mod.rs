pub mod enumerate;
pub mod eras;
pub mod normalize;
pub mod quality;
pub mod reconcile;
pub mod resolve;
pub mod sort;
pub mod sources;

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use crate::catalog::{load_catalog, store_catalog};
use crate::cli::{CliArgs, ModeArg};
use crate::config::AppConfig;
use crate::models::CatalogItem;
use crate::report::{ErrorCategory, RunReport};
use crate::services::tmdb::TmdbClient;

use enumerate::{enumerate_movie, enumerate_series, RawMovieRecord, RawSeriesRecord};
use eras::classify;
use normalize::{normalize_movie, normalize_season};
use quality::{check_duplicate_ids, score_items};
use reconcile::{diff_catalogs, reconcile};
use resolve::{
    movie_id_for_title, resolve_movie, resolve_series, series_code_for_title, ResolvedMovie,
    ResolvedSeries, MOVIE_TARGETS, SERIES_TARGETS,
};
use sort::chronological_sort;
use sources::{merge_era_items, SourceId, SourcedRecord};

/// One pipeline run walks these states in order. `Ready` is the only
/// terminal success state; a fatal condition drops to `Failed` from
/// anywhere, before the catalog store is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Resolving,
    Enumerating,
    Normalizing,
    Scoring,
    Classifying,
    Sorting,
    Merging,
    ReconcilingIncremental,
    Ready,
    Failed,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunPhase::Idle => "idle",
            RunPhase::Resolving => "resolving",
            RunPhase::Enumerating => "enumerating",
            RunPhase::Normalizing => "normalizing",
            RunPhase::Scoring => "scoring",
            RunPhase::Classifying => "classifying",
            RunPhase::Sorting => "sorting",
            RunPhase::Merging => "merging",
            RunPhase::ReconcilingIncremental => "reconciling-incremental",
            RunPhase::Ready => "ready",
            RunPhase::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: ModeArg,
    pub series_filter: Option<String>,
    pub season_filter: Option<u32>,
    pub dry_run: bool,
    pub validate: bool,
}

impl RunOptions {
    pub fn from_cli(args: &CliArgs) -> Self {
        Self {
            mode: args.mode,
            series_filter: args.series.clone(),
            season_filter: args.season,
            dry_run: args.dry_run,
            validate: args.validate,
        }
    }
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub eras: usize,
    pub items: usize,
    pub episodes: usize,
    pub quality_average: f64,
    pub skips: usize,
    pub wrote_catalog: bool,
}

/// Run-mode resolution: `auto` goes incremental exactly when a catalog
/// file already exists.
pub fn is_incremental(mode: ModeArg, catalog_path: &Path) -> bool {
    match mode {
        ModeArg::Full => false,
        ModeArg::Incremental => true,
        ModeArg::Auto => catalog_path.exists(),
    }
}

pub struct Pipeline {
    config: AppConfig,
    client: Option<TmdbClient>,
    phase: RunPhase,
    phase_started: Instant,
    pub report: RunReport,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        let client = config.api_token.clone().map(TmdbClient::new);
        Self {
            config,
            client,
            phase: RunPhase::Idle,
            phase_started: Instant::now(),
            report: RunReport::default(),
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn enter_phase(&mut self, next: RunPhase) {
        let now = Instant::now();
        if self.phase != RunPhase::Idle {
            self.report
                .record_phase(self.phase.to_string(), now.duration_since(self.phase_started));
        }
        tracing::info!("phase: {next}");
        self.phase = next;
        self.phase_started = now;
    }

    pub async fn run(&mut self, opts: &RunOptions) -> Result<RunSummary> {
        match self.execute(opts).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                tracing::error!("pipeline failed during {}: {e:#}", self.phase);
                self.phase = RunPhase::Failed;
                Err(e)
            }
        }
    }

    async fn execute(&mut self, opts: &RunOptions) -> Result<RunSummary> {
        self.enter_phase(RunPhase::Resolving);
        let (resolved_series, resolved_movies) = self.resolve_targets(opts).await;
        self.report.resolved_series = resolved_series.len();
        self.report.resolved_movies = resolved_movies.len();

        self.enter_phase(RunPhase::Enumerating);
        let (raw_series, raw_movies) = self
            .enumerate_all(&resolved_series, &resolved_movies, opts)
            .await;

        self.enter_phase(RunPhase::Normalizing);
        let (items, contributions) = normalize_all(&raw_series, &raw_movies);

        self.enter_phase(RunPhase::Scoring);
        check_duplicate_ids(&items)?;
        let quality = score_items(&items, self.config.min_quality, self.config.target_quality);
        tracing::info!(
            "quality: average {:.2} over {} item(s), {} meeting target {:.2}",
            quality.average,
            quality.total,
            quality.meeting_target,
            self.config.target_quality
        );
        if !quality.items_below_threshold.is_empty() {
            tracing::warn!(
                "{} item(s) below minimum quality {:.2}: {}",
                quality.items_below_threshold.len(),
                self.config.min_quality,
                quality
                    .items_below_threshold
                    .iter()
                    .map(|s| s.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        if opts.validate {
            for score in &quality.scores {
                tracing::info!("  {:>5.2}  {} ({})", score.score, score.title, score.id);
            }
        }

        self.enter_phase(RunPhase::Classifying);
        let eras = classify(items, &mut self.report);

        self.enter_phase(RunPhase::Sorting);
        let mut eras = chronological_sort(&eras);

        let distinct_sources = contributions
            .values()
            .flat_map(|records| records.iter().map(|r| r.source))
            .collect::<std::collections::HashSet<_>>()
            .len();
        if distinct_sources > 1 {
            self.enter_phase(RunPhase::Merging);
            merge_era_items(&mut eras, &contributions);
        }

        if is_incremental(opts.mode, &self.config.catalog_path) {
            if self.config.catalog_path.exists() {
                self.enter_phase(RunPhase::ReconcilingIncremental);
                let existing = load_catalog(&self.config.catalog_path)?;
                let diff = diff_catalogs(&existing, &eras);
                diff.log_summary();
                eras = reconcile(&existing, &eras);
            } else {
                tracing::warn!(
                    "incremental run requested but {} does not exist; writing a fresh catalog",
                    self.config.catalog_path.display()
                );
            }
        }

        let wrote_catalog = if opts.dry_run {
            tracing::info!("dry run: catalog not written");
            false
        } else {
            store_catalog(&self.config.catalog_path, &eras)?;
            true
        };

        self.enter_phase(RunPhase::Ready);
        self.report.log_summary();

        Ok(RunSummary {
            eras: eras.len(),
            items: eras.iter().map(|e| e.items.len()).sum(),
            episodes: eras
                .iter()
                .flat_map(|e| e.items.iter())
                .map(|item| match item {
                    CatalogItem::Season(s) => s.episodes.len(),
                    CatalogItem::Movie(_) => 0,
                })
                .sum(),
            quality_average: quality.average,
            skips: self.report.skips.len(),
            wrote_catalog,
        })
    }

    /// Resolve every configured target through the provider's search
    /// endpoint. Without a credential, discovery degrades to empty
    /// results instead of erroring.
    async fn resolve_targets(
        &mut self,
        opts: &RunOptions,
    ) -> (Vec<ResolvedSeries>, Vec<ResolvedMovie>) {
        let Some(client) = &self.client else {
            tracing::warn!("no provider credential; discovery returns empty results");
            return (Vec::new(), Vec::new());
        };

        let series_targets: Vec<&str> = SERIES_TARGETS
            .iter()
            .copied()
            .filter(|target| match opts.series_filter.as_deref() {
                Some(code) => series_code_for_title(target) == code,
                None => true,
            })
            .collect();

        let outcome = crate::executor::run_bounded(
            series_targets.clone(),
            self.config.concurrency,
            |target| resolve_series(client, target),
            |done, total| tracing::debug!("resolved {done}/{total} series"),
        )
        .await;
        let mut resolved_series = Vec::new();
        for (index, slot) in outcome.results.into_iter().enumerate() {
            match slot {
                Some(Some(resolved)) => resolved_series.push(resolved),
                Some(None) => self.report.record_skip(
                    ErrorCategory::NoMatch,
                    SourceId::Tmdb,
                    series_code_for_title(series_targets[index]),
                    "no provider match",
                ),
                None => {}
            }
        }
        for err in &outcome.errors {
            self.report.record_skip(
                ErrorCategory::Network,
                SourceId::Tmdb,
                series_code_for_title(series_targets[err.index]),
                err.message.as_str(),
            );
        }

        // A single-series run skips the film catalog entirely.
        let mut resolved_movies = Vec::new();
        if opts.series_filter.is_none() {
            let outcome = crate::executor::run_bounded(
                MOVIE_TARGETS.to_vec(),
                self.config.concurrency,
                |target| resolve_movie(client, target),
                |done, total| tracing::debug!("resolved {done}/{total} movies"),
            )
            .await;
            for (index, slot) in outcome.results.into_iter().enumerate() {
                match slot {
                    Some(Some(resolved)) => resolved_movies.push(resolved),
                    Some(None) => self.report.record_skip(
                        ErrorCategory::NoMatch,
                        SourceId::Tmdb,
                        movie_id_for_title(MOVIE_TARGETS[index]),
                        "no provider match",
                    ),
                    None => {}
                }
            }
            for err in &outcome.errors {
                self.report.record_skip(
                    ErrorCategory::Network,
                    SourceId::Tmdb,
                    movie_id_for_title(MOVIE_TARGETS[err.index]),
                    err.message.as_str(),
                );
            }
        }

        (resolved_series, resolved_movies)
    }

    async fn enumerate_all(
        &mut self,
        resolved_series: &[ResolvedSeries],
        resolved_movies: &[ResolvedMovie],
        opts: &RunOptions,
    ) -> (Vec<RawSeriesRecord>, Vec<RawMovieRecord>) {
        let Some(client) = &self.client else {
            return (Vec::new(), Vec::new());
        };

        let mut raw_series = Vec::new();
        for resolved in resolved_series {
            match enumerate_series(
                client,
                resolved,
                opts.season_filter,
                self.config.concurrency,
                &mut self.report,
            )
            .await
            {
                Ok(raw) => raw_series.push(raw),
                Err(e) => self.report.record_skip(
                    ErrorCategory::Network,
                    SourceId::Tmdb,
                    resolved.series_code.clone(),
                    format!("{e:#}"),
                ),
            }
        }

        let outcome = crate::executor::run_bounded(
            resolved_movies.to_vec(),
            self.config.concurrency,
            |movie| async move { enumerate_movie(client, &movie).await },
            |done, total| tracing::debug!("movies fetched: {done}/{total}"),
        )
        .await;
        for err in &outcome.errors {
            self.report.record_skip(
                ErrorCategory::Network,
                SourceId::Tmdb,
                resolved_movies[err.index].movie_id.clone(),
                err.message.as_str(),
            );
        }
        let raw_movies: Vec<RawMovieRecord> = outcome.results.into_iter().flatten().collect();

        (raw_series, raw_movies)
    }
}

/// Map raw provider records into canonical items and remember which
/// source contributed each record, for the N-source merge step.
fn normalize_all(
    raw_series: &[RawSeriesRecord],
    raw_movies: &[RawMovieRecord],
) -> (
    Vec<CatalogItem>,
    HashMap<String, Vec<SourcedRecord<CatalogItem>>>,
) {
    let mut items = Vec::new();
    for series in raw_series {
        tracing::trace!(
            "normalizing '{}' (provider series {})",
            series.title,
            series.provider_id
        );
        for season in &series.seasons {
            tracing::trace!(
                "  season {} (provider {}, {} episode(s))",
                season.season,
                season.provider_id,
                season.episodes.len()
            );
            if season.episodes.is_empty() {
                tracing::debug!(
                    "season {} of '{}' has no accepted episodes, dropping",
                    season.season,
                    series.title
                );
                continue;
            }
            items.push(CatalogItem::Season(normalize_season(
                &series.title,
                &series.series_code,
                season,
            )));
        }
    }
    for movie in raw_movies {
        tracing::trace!(
            "normalizing movie '{}' (provider {})",
            movie.title,
            movie.provider_id
        );
        items.push(CatalogItem::Movie(normalize_movie(movie)));
    }

    let mut contributions: HashMap<String, Vec<SourcedRecord<CatalogItem>>> = HashMap::new();
    for item in &items {
        contributions
            .entry(item.id().to_string())
            .or_default()
            .push(SourcedRecord {
                source: SourceId::Tmdb,
                record: item.clone(),
            });
    }

    (items, contributions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn offline_config(catalog_path: PathBuf) -> AppConfig {
        AppConfig {
            api_token: None,
            min_quality: 0.6,
            target_quality: 0.75,
            concurrency: 5,
            catalog_path,
        }
    }

    #[test]
    fn test_mode_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let present = dir.path().join("present.json");
        std::fs::write(&present, b"[]").unwrap();

        assert!(!is_incremental(ModeArg::Full, &present));
        assert!(is_incremental(ModeArg::Incremental, &missing));
        assert!(is_incremental(ModeArg::Auto, &present));
        assert!(!is_incremental(ModeArg::Auto, &missing));
    }

    #[tokio::test]
    async fn test_offline_run_degrades_gracefully() {
        // No credential: discovery yields nothing, the run still walks
        // through to Ready without touching the catalog file.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let mut pipeline = Pipeline::new(offline_config(path.clone()));
        let opts = RunOptions {
            mode: ModeArg::Full,
            series_filter: None,
            season_filter: None,
            dry_run: true,
            validate: false,
        };

        let summary = pipeline.run(&opts).await.unwrap();
        assert_eq!(pipeline.phase(), RunPhase::Ready);
        assert_eq!(summary.eras, 0);
        assert_eq!(summary.items, 0);
        assert!(!summary.wrote_catalog);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_offline_run_writes_empty_catalog_when_not_dry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let mut pipeline = Pipeline::new(offline_config(path.clone()));
        let opts = RunOptions {
            mode: ModeArg::Full,
            series_filter: None,
            season_filter: None,
            dry_run: false,
            validate: false,
        };

        let summary = pipeline.run(&opts).await.unwrap();
        assert!(summary.wrote_catalog);
        let stored = crate::catalog::load_catalog(&path).unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_incremental_offline_run_preserves_existing_catalog() {
        // An offline incremental run produces an empty fresh catalog;
        // reconciliation must carry the existing one through verbatim.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let existing = serde_json::json!([{
            "id": "tng-era",
            "title": "The 24th Century",
            "years": "2364-2379",
            "stardates": "None",
            "description": "",
            "items": [{
                "type": "movie",
                "id": "fc",
                "title": "Star Trek: First Contact",
                "year": "2373",
                "stardate": "Stardate 50893.5",
                "notes": "Borg time travel."
            }]
        }]);
        std::fs::write(&path, serde_json::to_vec_pretty(&existing).unwrap()).unwrap();

        let mut pipeline = Pipeline::new(offline_config(path.clone()));
        let opts = RunOptions {
            mode: ModeArg::Auto,
            series_filter: None,
            season_filter: None,
            dry_run: false,
            validate: false,
        };

        let summary = pipeline.run(&opts).await.unwrap();
        assert_eq!(summary.eras, 1);
        assert_eq!(summary.items, 1);
        let stored = crate::catalog::load_catalog(&path).unwrap();
        assert_eq!(stored[0].items[0].id(), "fc");
        assert_eq!(stored[0].items[0].year(), "2373");
    }
}
