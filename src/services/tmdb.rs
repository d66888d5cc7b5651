// TMDB metadata provider client
// API Documentation: https://developer.themoviedb.org/reference/intro/getting-started

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";
const MAX_RETRIES: u32 = 2;

/// TMDB API client. Authenticates with a v4 read access token via the
/// `Authorization: Bearer` header. Transient failures (429, 5xx) are
/// retried with a short backoff; everything past that is the caller's
/// problem and surfaces as an isolated per-item error.
pub struct TmdbClient {
    client: Client,
    token: String,
}

/// Search results for TV shows
#[derive(Debug, Deserialize)]
pub struct TvSearchResults {
    pub results: Vec<TvSearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvSearchResult {
    pub id: i64,
    pub name: String,
    pub first_air_date: Option<String>,
}

/// Search results for movies
#[derive(Debug, Deserialize)]
pub struct MovieSearchResults {
    pub results: Vec<MovieSearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieSearchResult {
    pub id: i64,
    pub title: String,
    pub release_date: Option<String>,
}

/// Detailed TV show info
#[derive(Debug, Deserialize)]
pub struct TvDetails {
    pub id: i64,
    pub name: String,
    pub first_air_date: Option<String>,
    pub number_of_seasons: Option<u32>,
    pub number_of_episodes: Option<u32>,
}

/// Season details including the episode list
#[derive(Debug, Deserialize)]
pub struct SeasonDetails {
    pub id: i64,
    pub season_number: u32,
    pub air_date: Option<String>,
    #[serde(default)]
    pub episodes: Vec<EpisodeSummary>,
}

/// Episode entry from season details (no credits)
#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeSummary {
    pub id: i64,
    pub name: String,
    pub episode_number: u32,
    pub season_number: u32,
    pub air_date: Option<String>,
    pub overview: Option<String>,
}

/// Full episode details with credits appended
#[derive(Debug, Deserialize)]
pub struct EpisodeDetails {
    pub id: i64,
    pub name: String,
    pub episode_number: u32,
    pub season_number: u32,
    pub air_date: Option<String>,
    pub overview: Option<String>,
    pub runtime: Option<u32>,
    #[serde(default)]
    pub guest_stars: Vec<CastMember>,
    pub credits: Option<Credits>,
}

/// Detailed movie info with credits appended
#[derive(Debug, Deserialize)]
pub struct MovieDetails {
    pub id: i64,
    pub title: String,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub runtime: Option<u32>,
    pub credits: Option<Credits>,
}

#[derive(Debug, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
    /// Present on episode credits only.
    #[serde(default)]
    pub guest_stars: Vec<CastMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    pub character: Option<String>,
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    pub job: Option<String>,
}

impl TmdbClient {
    pub fn new(token: String) -> Self {
        Self {
            client: Client::new(),
            token,
        }
    }

    /// GET a JSON endpoint with bounded retry on transient failures.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .get(url)
                .bearer_auth(&self.token)
                .send()
                .await
                .with_context(|| format!("request to {url} failed"))?;

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                if attempt < MAX_RETRIES {
                    let backoff = Duration::from_millis(500 * 2u64.pow(attempt));
                    tracing::debug!("TMDB returned {}, retrying in {:?}", status, backoff);
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                    continue;
                }
                anyhow::bail!("TMDB request failed with status {status} after retries: {url}");
            }
            if !status.is_success() {
                anyhow::bail!("TMDB request failed with status {status}: {url}");
            }

            return response
                .json()
                .await
                .with_context(|| format!("failed to parse TMDB response from {url}"));
        }
    }

    /// Search for TV shows by name
    pub async fn search_tv(&self, query: &str) -> Result<Vec<TvSearchResult>> {
        let url = format!(
            "{}/search/tv?query={}&include_adult=false",
            TMDB_API_BASE,
            urlencoding::encode(query)
        );
        let response: TvSearchResults = self
            .get_json(&url)
            .await
            .context("Failed to search TMDB for TV shows")?;
        Ok(response.results)
    }

    /// Search for movies by name
    pub async fn search_movie(&self, query: &str) -> Result<Vec<MovieSearchResult>> {
        let url = format!(
            "{}/search/movie?query={}&include_adult=false",
            TMDB_API_BASE,
            urlencoding::encode(query)
        );
        let response: MovieSearchResults = self
            .get_json(&url)
            .await
            .context("Failed to search TMDB for movies")?;
        Ok(response.results)
    }

    /// Get detailed TV show info (season/episode counts)
    pub async fn get_tv_details(&self, tv_id: i64) -> Result<TvDetails> {
        let url = format!("{}/tv/{}", TMDB_API_BASE, tv_id);
        self.get_json(&url)
            .await
            .context("Failed to get TMDB TV details")
    }

    /// Get season details including the episode list
    pub async fn get_season_details(&self, tv_id: i64, season_number: u32) -> Result<SeasonDetails> {
        let url = format!("{}/tv/{}/season/{}", TMDB_API_BASE, tv_id, season_number);
        self.get_json(&url)
            .await
            .context("Failed to get TMDB season details")
    }

    /// Get full episode details with credits (guest stars, writers)
    pub async fn get_episode_details(
        &self,
        tv_id: i64,
        season_number: u32,
        episode_number: u32,
    ) -> Result<EpisodeDetails> {
        let url = format!(
            "{}/tv/{}/season/{}/episode/{}?append_to_response=credits",
            TMDB_API_BASE, tv_id, season_number, episode_number
        );
        self.get_json(&url)
            .await
            .context("Failed to get TMDB episode details")
    }

    /// Get detailed movie info with credits
    pub async fn get_movie_details(&self, movie_id: i64) -> Result<MovieDetails> {
        let url = format!(
            "{}/movie/{}?append_to_response=credits",
            TMDB_API_BASE, movie_id
        );
        self.get_json(&url)
            .await
            .context("Failed to get TMDB movie details")
    }
}

/// Pull crew names for a given set of jobs, in credit order.
pub fn crew_names(credits: &Option<Credits>, jobs: &[&str]) -> Vec<String> {
    let Some(credits) = credits else {
        return Vec::new();
    };
    credits
        .crew
        .iter()
        .filter(|c| c.job.as_deref().is_some_and(|j| jobs.contains(&j)))
        .map(|c| c.name.clone())
        .collect()
}

/// Pull the top-billed cast names, in billing order.
pub fn cast_names(credits: &Option<Credits>, limit: usize) -> Vec<String> {
    let Some(credits) = credits else {
        return Vec::new();
    };
    let mut cast: Vec<&CastMember> = credits.cast.iter().collect();
    cast.sort_by_key(|c| c.order.unwrap_or(i32::MAX));
    cast.into_iter().take(limit).map(|c| c.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credits_fixture() -> Option<Credits> {
        Some(Credits {
            cast: vec![
                CastMember {
                    id: 2,
                    name: "Leonard Nimoy".to_string(),
                    character: Some("Spock".to_string()),
                    order: Some(1),
                },
                CastMember {
                    id: 1,
                    name: "William Shatner".to_string(),
                    character: Some("Kirk".to_string()),
                    order: Some(0),
                },
            ],
            crew: vec![
                CrewMember {
                    id: 3,
                    name: "Nicholas Meyer".to_string(),
                    job: Some("Director".to_string()),
                },
                CrewMember {
                    id: 4,
                    name: "Jack B. Sowards".to_string(),
                    job: Some("Screenplay".to_string()),
                },
            ],
            guest_stars: Vec::new(),
        })
    }

    #[test]
    fn test_crew_names_filters_by_job() {
        let credits = credits_fixture();
        assert_eq!(
            crew_names(&credits, &["Director"]),
            vec!["Nicholas Meyer".to_string()]
        );
        assert_eq!(
            crew_names(&credits, &["Screenplay", "Writer"]),
            vec!["Jack B. Sowards".to_string()]
        );
        assert!(crew_names(&None, &["Director"]).is_empty());
    }

    #[test]
    fn test_cast_names_respects_billing_order() {
        let credits = credits_fixture();
        assert_eq!(
            cast_names(&credits, 2),
            vec!["William Shatner".to_string(), "Leonard Nimoy".to_string()]
        );
        assert_eq!(cast_names(&credits, 1).len(), 1);
    }
}
