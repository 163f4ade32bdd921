use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One row of an OMDb search page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub id: String,
    pub title: String,
    pub year: String,
    pub poster_url: Option<String>,
}

/// Full record for the movie currently shown in the detail pane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: String,
    pub title: String,
    pub year: String,
    pub poster_url: Option<String>,
    /// Raw OMDb runtime text such as `"148 min"`.
    pub runtime: String,
    pub runtime_minutes: Option<f32>,
    pub external_rating: Option<f32>,
    pub plot: Option<String>,
    pub release_date: Option<String>,
    pub actors: Option<String>,
    pub director: Option<String>,
    pub genre: Option<String>,
}

/// A rated movie kept in the watch list.
///
/// Field names on disk match the format earlier releases wrote, so existing
/// watch lists keep loading. Those releases wrote `null` for an unknown
/// rating or runtime; such numbers read back as `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedMovie {
    #[serde(rename = "imdbID")]
    pub id: String,
    pub title: String,
    pub year: String,
    #[serde(rename = "poster", default)]
    pub poster_url: Option<String>,
    #[serde(rename = "imdbRating", default, deserialize_with = "number_or_zero")]
    pub external_rating: f32,
    #[serde(rename = "runtime", default, deserialize_with = "number_or_zero")]
    pub runtime_minutes: f32,
    #[serde(rename = "userRating")]
    pub user_rating: u8,
    #[serde(rename = "countRatingDecision", default)]
    pub rating_revisions: u32,
}

impl WatchedMovie {
    /// Snapshot of `detail` stored under `id`, the id the user selected.
    pub fn from_detail(
        id: &str,
        detail: &MovieDetail,
        user_rating: u8,
        rating_revisions: u32,
    ) -> Self {
        Self {
            id: id.to_string(),
            title: detail.title.clone(),
            year: detail.year.clone(),
            poster_url: detail.poster_url.clone(),
            external_rating: detail.external_rating.unwrap_or(0.0),
            runtime_minutes: detail.runtime_minutes.unwrap_or(0.0),
            user_rating,
            rating_revisions,
        }
    }
}

/// Accepts a number, a numeric string, `null` or anything else (as 0).
fn number_or_zero<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().map(|n| n as f32).unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f32>().unwrap_or(0.0),
        _ => 0.0,
    })
}
