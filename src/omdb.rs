use crate::config::Config;
use crate::models::{MovieDetail, SearchResultItem};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const NOT_FOUND_MESSAGE: &str = "Movie not found";
const STATUS_MESSAGE: &str = "Something went wrong with fetching movies.";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// OMDb answered `Response: "False"`; `reason` is its `Error` text.
    #[error("Movie not found")]
    NotFound { reason: Option<String> },
    #[error("Something went wrong with fetching movies.")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
    #[error("request cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub items: Vec<SearchResultItem>,
    pub total_results: u64,
}

#[async_trait]
pub trait OmdbApi: Send + Sync {
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, FetchError>;
    async fn fetch_detail(&self, id: &str) -> Result<MovieDetail, FetchError>;
}

#[derive(Debug, Clone)]
pub struct OmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OmdbClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let user_agent = format!("popcorn/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build OMDb HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            &config.omdb_base_url,
            &config.omdb_api_key,
            config.http_timeout,
        )
    }

    fn search_url(&self, query: &str, page: u32) -> String {
        format!(
            "{}?apikey={}&s={}&page={page}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(query)
        )
    }

    fn detail_url(&self, id: &str) -> String {
        format!(
            "{}?apikey={}&i={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(id)
        )
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, FetchError> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("request failed: {e}")))?;
        let status = res.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "OMDb returned non-success status");
            return Err(FetchError::Status(status.as_u16()));
        }
        let text = res
            .text()
            .await
            .map_err(|e| FetchError::Transport(format!("reading body failed: {e}")))?;
        serde_json::from_str(&text)
            .map_err(|e| FetchError::Transport(format!("JSON parse failed: {e}")))
    }
}

#[async_trait]
impl OmdbApi for OmdbClient {
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, FetchError> {
        tracing::debug!(query = %query, page, "OMDb search");
        let data: SearchResponse = self.get_json(&self.search_url(query, page)).await?;
        map_search(data)
    }

    async fn fetch_detail(&self, id: &str) -> Result<MovieDetail, FetchError> {
        tracing::debug!(id = %id, "OMDb detail");
        let data: DetailResponse = self.get_json(&self.detail_url(id)).await?;
        map_detail(id, data)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Search", default)]
    search: Vec<SearchHit>,
    #[serde(rename = "totalResults")]
    total_results: Option<String>,
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year", default)]
    year: String,
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Poster")]
    poster: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DetailResponse {
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    title: Option<String>,
    year: Option<String>,
    poster: Option<String>,
    runtime: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    plot: Option<String>,
    released: Option<String>,
    actors: Option<String>,
    director: Option<String>,
    genre: Option<String>,
    response: Option<String>,
    error: Option<String>,
}

fn map_search(data: SearchResponse) -> Result<SearchPage, FetchError> {
    if data.response != "True" {
        tracing::debug!(reason = ?data.error, "OMDb search reported no match");
        return Err(FetchError::NotFound { reason: data.error });
    }
    let total_results = data
        .total_results
        .as_deref()
        .and_then(parse_total_results)
        .unwrap_or(0);
    let items = data
        .search
        .into_iter()
        .map(|hit| SearchResultItem {
            id: hit.imdb_id,
            title: hit.title,
            year: hit.year,
            poster_url: hit.poster.and_then(known),
        })
        .collect();
    Ok(SearchPage {
        items,
        total_results,
    })
}

fn map_detail(requested_id: &str, data: DetailResponse) -> Result<MovieDetail, FetchError> {
    if data.response.as_deref() != Some("True") {
        return Err(FetchError::NotFound { reason: data.error });
    }
    let runtime = data.runtime.unwrap_or_else(|| "N/A".to_string());
    Ok(MovieDetail {
        id: data.imdb_id.unwrap_or_else(|| requested_id.to_string()),
        title: data.title.unwrap_or_default(),
        year: data.year.unwrap_or_default(),
        poster_url: data.poster.and_then(known),
        runtime_minutes: parse_runtime_minutes(&runtime),
        runtime,
        external_rating: data.imdb_rating.as_deref().and_then(parse_rating),
        plot: data.plot.and_then(known),
        release_date: data.released.and_then(known),
        actors: data.actors.and_then(known),
        director: data.director.and_then(known),
        genre: data.genre.and_then(known),
    })
}

/// OMDb spells missing values as `"N/A"`.
fn known(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("N/A") {
        None
    } else {
        Some(value)
    }
}

pub fn parse_runtime_minutes(input: &str) -> Option<f32> {
    input
        .split_whitespace()
        .next()
        .and_then(|n| n.parse::<f32>().ok())
}

pub fn parse_rating(input: &str) -> Option<f32> {
    input.trim().parse::<f32>().ok()
}

pub fn parse_total_results(input: &str) -> Option<u64> {
    input.trim().parse().ok()
}

/// User-facing text for a failed search; `None` means nothing is shown.
pub fn search_error_message(err: &FetchError) -> Option<String> {
    match err {
        FetchError::Cancelled => None,
        FetchError::NotFound { .. } => Some(NOT_FOUND_MESSAGE.to_string()),
        FetchError::Status(_) => Some(STATUS_MESSAGE.to_string()),
        FetchError::Transport(msg) => Some(msg.clone()),
    }
}
