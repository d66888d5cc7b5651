use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Regenerate the catalog from scratch.
    Full,
    /// Reconcile against the existing catalog.
    Incremental,
    /// Incremental when a catalog file already exists, full otherwise.
    Auto,
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Builds a chronological viewing catalog from remote metadata"
)]
pub struct CliArgs {
    /// Run mode
    #[arg(long, value_enum, default_value = "auto")]
    pub mode: ModeArg,

    /// Only fetch the series with this short code (e.g. "tng")
    #[arg(long, value_name = "CODE")]
    pub series: Option<String>,

    /// Only fetch this season number (requires --series)
    #[arg(long, value_name = "N", requires = "series")]
    pub season: Option<u32>,

    /// Maximum number of concurrent provider requests
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Run the whole pipeline but skip writing the catalog
    #[arg(long)]
    pub dry_run: bool,

    /// Print the full per-item quality report
    #[arg(long)]
    pub validate: bool,

    /// Catalog file path (overrides config)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file directory
    #[arg(short, long, value_name = "DIR")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, value_name = "LEVEL", default_value = "info")]
    pub log_level: String,
}

impl CliArgs {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log level '{}'. Valid levels are: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }

        if let Some(0) = self.concurrency {
            return Err("concurrency must be greater than 0".to_string());
        }

        if let Some(0) = self.season {
            return Err("season numbers start at 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::parse_from(["stardex"]);
        assert_eq!(args.mode, ModeArg::Auto);
        assert!(!args.dry_run);
        assert!(!args.validate);
        assert!(args.series.is_none());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_flag_parsing() {
        let args = CliArgs::parse_from([
            "stardex",
            "--mode",
            "incremental",
            "--series",
            "dsc",
            "--season",
            "3",
            "--dry-run",
        ]);
        assert_eq!(args.mode, ModeArg::Incremental);
        assert_eq!(args.series.as_deref(), Some("dsc"));
        assert_eq!(args.season, Some(3));
        assert!(args.dry_run);
    }

    #[test]
    fn test_season_requires_series() {
        assert!(CliArgs::try_parse_from(["stardex", "--season", "3"]).is_err());
    }

    #[test]
    fn test_validation_rejects_zero_concurrency() {
        let args = CliArgs::parse_from(["stardex", "--concurrency", "0"]);
        assert!(args.validate().is_err());
    }
}
