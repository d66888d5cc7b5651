use std::collections::BTreeMap;
use std::time::Duration;

use crate::pipeline::sources::SourceId;

/// Non-fatal per-item error taxonomy. Transient network failures and
/// no-match conditions are isolated skips; only data-integrity
/// violations abort a run (see `PipelineError`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorCategory {
    /// Transport-level failure that survived the client's retries.
    Network,
    /// Resolver found no candidate, or a record failed the basic-data gate.
    NoMatch,
    /// No era mapping; the item was excluded from the catalog.
    Unclassified,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorCategory::Network => "network",
            ErrorCategory::NoMatch => "no-match",
            ErrorCategory::Unclassified => "unclassified",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct SkipRecord {
    pub category: ErrorCategory,
    pub source: SourceId,
    pub entity: String,
    pub detail: String,
}

/// Accumulates everything a run wants to say at the end: isolated
/// skips, fetch counters, and phase timings. Surfaced once as an
/// aggregate summary instead of interleaving with progress output.
#[derive(Debug, Default)]
pub struct RunReport {
    pub skips: Vec<SkipRecord>,
    pub resolved_series: usize,
    pub resolved_movies: usize,
    pub seasons_fetched: usize,
    pub episodes_fetched: usize,
    pub phase_timings: Vec<(String, Duration)>,
}

impl RunReport {
    pub fn record_skip(
        &mut self,
        category: ErrorCategory,
        source: SourceId,
        entity: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.skips.push(SkipRecord {
            category,
            source,
            entity: entity.into(),
            detail: detail.into(),
        });
    }

    pub fn record_phase(&mut self, phase: impl Into<String>, elapsed: Duration) {
        self.phase_timings.push((phase.into(), elapsed));
    }

    pub fn counts_by_category(&self) -> BTreeMap<ErrorCategory, usize> {
        let mut counts = BTreeMap::new();
        for skip in &self.skips {
            *counts.entry(skip.category).or_default() += 1;
        }
        counts
    }

    fn counts_by_source(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for skip in &self.skips {
            *counts.entry(skip.source.as_str()).or_default() += 1;
        }
        counts
    }

    /// End-of-run aggregate. Skips never affect the exit status.
    pub fn log_summary(&self) {
        tracing::info!(
            "fetched {} series, {} movies, {} seasons, {} episodes",
            self.resolved_series,
            self.resolved_movies,
            self.seasons_fetched,
            self.episodes_fetched,
        );
        for (phase, elapsed) in &self.phase_timings {
            tracing::debug!("phase {phase} took {elapsed:.2?}");
        }

        if self.skips.is_empty() {
            tracing::info!("no records skipped");
            return;
        }

        for (category, count) in self.counts_by_category() {
            tracing::warn!("skipped {count} record(s): {category}");
        }
        for (source, count) in self.counts_by_source() {
            tracing::debug!("  {count} from source {source}");
        }
        let affected: Vec<&str> = self.skips.iter().map(|s| s.entity.as_str()).collect();
        tracing::warn!("affected ids: {}", affected.join(", "));
        for skip in &self.skips {
            tracing::debug!("  {} [{}/{}]: {}", skip.entity, skip.category, skip.source, skip.detail);
        }
    }
}
