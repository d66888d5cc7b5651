// Configuration module for stardex
// TOML config file with environment and CLI overrides

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::CliArgs;
use crate::error::PipelineError;

const APP_NAME: &str = "stardex";
const CONFIG_FILENAME: &str = "config.toml";
const DEFAULT_CATALOG_FILENAME: &str = "catalog.json";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Metadata provider configuration
    pub provider: ProviderConfig,

    /// Quality thresholds
    pub quality: QualityConfig,

    /// Pipeline tuning
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// TMDB read access token (optional; discovery degrades to empty
    /// results without it)
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Items scoring below this are flagged in the run summary
    pub minimum: f64,

    /// Aspirational completeness level reported against
    pub target: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            minimum: 0.6,
            target: 0.75,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum concurrent provider requests
    pub concurrency: usize,

    /// Catalog file path
    pub catalog_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            catalog_path: None,
        }
    }
}

/// Final application configuration - TOML file with environment and CLI
/// overrides applied (CLI > env > file > default).
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TMDB read access token
    pub api_token: Option<String>,

    /// Minimum quality threshold (warnings below this)
    pub min_quality: f64,

    /// Target quality threshold
    pub target_quality: f64,

    /// Maximum concurrent provider requests
    pub concurrency: usize,

    /// Catalog file path
    pub catalog_path: PathBuf,
}

impl AppConfig {
    pub fn load(cli: &CliArgs) -> Result<Self> {
        let config_dir = match &cli.config {
            Some(dir) => dir.clone(),
            None => Self::find_config_dir(),
        };
        let config_file = Self::load_config_file(&config_dir);
        let config = Self::build(config_file, cli);
        config.check()?;
        Ok(config)
    }

    /// Find the config directory (for locating config.toml)
    fn find_config_dir() -> PathBuf {
        if let Ok(path) = std::env::var("STARDEX_CONFIG_DIR") {
            return PathBuf::from(path);
        }

        if let Some(dir) = dirs::config_dir() {
            return dir.join(APP_NAME);
        }

        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    /// Load and parse the TOML config file
    fn load_config_file(config_dir: &Path) -> ConfigFile {
        let config_path = config_dir.join(CONFIG_FILENAME);

        if !config_path.exists() {
            tracing::debug!(
                "No config file found at {}, using defaults",
                config_path.display()
            );
            return ConfigFile::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse config file {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    );
                    ConfigFile::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}. Using defaults.",
                    config_path.display(),
                    e
                );
                ConfigFile::default()
            }
        }
    }

    fn build(config_file: ConfigFile, cli: &CliArgs) -> Self {
        // Token: env > config
        let api_token = std::env::var("TMDB_API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or(config_file.provider.api_token);

        // Concurrency: cli > env > config
        let concurrency = cli
            .concurrency
            .or_else(Self::env_concurrency)
            .unwrap_or(config_file.pipeline.concurrency);

        // Catalog path: cli > env > config > default
        let catalog_path = cli
            .output
            .clone()
            .or_else(|| std::env::var("STARDEX_CATALOG").ok().map(PathBuf::from))
            .or(config_file.pipeline.catalog_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_FILENAME));

        Self {
            api_token,
            min_quality: config_file.quality.minimum,
            target_quality: config_file.quality.target,
            concurrency,
            catalog_path,
        }
    }

    fn env_concurrency() -> Option<usize> {
        std::env::var("STARDEX_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
    }

    fn check(&self) -> Result<(), PipelineError> {
        if self.concurrency == 0 {
            return Err(PipelineError::Config(
                "concurrency must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_quality) || !(0.0..=1.0).contains(&self.target_quality) {
            return Err(PipelineError::Config(
                "quality thresholds must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    /// Log configuration status
    pub fn log_config(&self) {
        tracing::info!("Catalog path: {}", self.catalog_path.display());
        tracing::info!(
            "Quality thresholds: minimum {:.2}, target {:.2}",
            self.min_quality,
            self.target_quality
        );
        tracing::debug!("Provider concurrency: {}", self.concurrency);

        if self.api_token.is_some() {
            tracing::info!("Metadata provider: TMDB");
        } else {
            tracing::warn!("No TMDB token configured; discovery will return nothing");
            tracing::info!("Hint: add api_token to config.toml or set TMDB_API_TOKEN");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn bare_cli() -> CliArgs {
        CliArgs::parse_from(["stardex"])
    }

    #[test]
    fn test_default_config_file() {
        let config = ConfigFile::default();
        assert!(config.provider.api_token.is_none());
        assert!((config.quality.minimum - 0.6).abs() < f64::EPSILON);
        assert!((config.quality.target - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.pipeline.concurrency, 5);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[provider]
api_token = "test_token"

[quality]
minimum = 0.5
target = 0.8

[pipeline]
concurrency = 3
catalog_path = "/data/catalog.json"
"#;
        let config: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider.api_token, Some("test_token".to_string()));
        assert!((config.quality.minimum - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.pipeline.concurrency, 3);
        assert_eq!(
            config.pipeline.catalog_path,
            Some(PathBuf::from("/data/catalog.json"))
        );
    }

    #[test]
    fn test_partial_config_toml() {
        // Only specify what you need; the rest stays default.
        let toml_str = r#"
[quality]
minimum = 0.4
"#;
        let config: ConfigFile = toml::from_str(toml_str).unwrap();
        assert!((config.quality.minimum - 0.4).abs() < f64::EPSILON);
        assert!((config.quality.target - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.pipeline.concurrency, 5);
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = CliArgs::parse_from(["stardex", "--concurrency", "9", "--output", "/tmp/c.json"]);
        let config = AppConfig::build(ConfigFile::default(), &cli);
        assert_eq!(config.concurrency, 9);
        assert_eq!(config.catalog_path, PathBuf::from("/tmp/c.json"));
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let mut file = ConfigFile::default();
        file.quality.minimum = 1.5;
        let config = AppConfig::build(file, &bare_cli());
        assert!(config.check().is_err());
    }
}
