use crate::models::WatchedMovie;
use serde::Serialize;

/// Aggregates shown above the watch list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WatchedSummary {
    pub count: usize,
    pub avg_external_rating: f64,
    pub avg_user_rating: f64,
    pub avg_runtime_minutes: f64,
}

impl WatchedSummary {
    pub fn compute(watched: &[WatchedMovie]) -> Self {
        Self {
            count: watched.len(),
            avg_external_rating: average(watched.iter().map(|m| f64::from(m.external_rating))),
            avg_user_rating: average(watched.iter().map(|m| f64::from(m.user_rating))),
            avg_runtime_minutes: average(watched.iter().map(|m| f64::from(m.runtime_minutes))),
        }
    }

    pub fn display(&self) -> SummaryDisplay {
        SummaryDisplay {
            count: self.count,
            avg_external_rating: format!("{:.2}", self.avg_external_rating),
            avg_user_rating: format!("{:.2}", self.avg_user_rating),
            avg_runtime: format!("{} min", self.avg_runtime_minutes),
        }
    }
}

/// Preformatted summary strings: ratings to two places, runtime as computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryDisplay {
    pub count: usize,
    pub avg_external_rating: String,
    pub avg_user_rating: String,
    pub avg_runtime: String,
}

/// Mean accumulated as `sum(v / n)`; an empty input yields 0.
pub fn average<I>(values: I) -> f64
where
    I: ExactSizeIterator<Item = f64>,
{
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    values.fold(0.0, |acc, v| acc + v / n)
}
