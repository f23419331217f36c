//! HTTP endpoint handlers

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use readrec_core::filter::parse_csv_list;
use readrec_core::history::expand_home;
use readrec_core::{
    resolve_history_path, EnabledSources, RecError, RecommendOptions, Recommender,
    RecommenderConfig, WebReport,
};

use crate::AppState;

/// Error body `{error}` with a matching status
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    fn internal(err: impl std::fmt::Display) -> Self {
        ApiError::Internal(format!("Server error: {}", err))
    }
}

impl From<RecError> for ApiError {
    fn from(err: RecError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        if status.is_server_error() {
            tracing::error!("{}", message);
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Request body for `POST /api/recommend`.
///
/// Fields are loosely typed: numbers may arrive as strings and flags as
/// `"1"`, `"yes"`, `"on"` and the like, matching what HTML forms send.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecommendRequest {
    pub history: Option<String>,
    pub profile: Option<String>,
    pub recent_days: Option<Value>,
    pub since: Option<String>,
    pub limit: Option<Value>,
    pub min_visits: Option<Value>,
    pub exclude_hosts: Option<Value>,
    pub exclude_url_pattern: Option<String>,
    pub no_reading_filter: Option<Value>,
    pub use_arxiv: Option<Value>,
    pub use_crossref: Option<Value>,
    pub use_semantic_scholar: Option<Value>,
}

impl RecommendRequest {
    pub fn options(&self, config: &RecommenderConfig) -> Result<RecommendOptions, ApiError> {
        let mut options = RecommendOptions::from_config(config);
        if let Some(days) = loose_int(self.recent_days.as_ref(), "recent_days")? {
            options.recent_days = to_u32(days, "recent_days")?;
        }
        if let Some(limit) = loose_int(self.limit.as_ref(), "limit")? {
            options.limit = usize::try_from(limit)
                .map_err(|_| ApiError::BadRequest("limit must not be negative".to_string()))?;
        }
        if let Some(min_visits) = loose_int(self.min_visits.as_ref(), "min_visits")? {
            options.min_visits = to_u32(min_visits, "min_visits")?;
        }
        options.since = self.since.clone().filter(|s| !s.trim().is_empty());
        options.reading_filter = !loose_bool(self.no_reading_filter.as_ref(), false);
        options.exclude_hosts = match &self.exclude_hosts {
            Some(Value::String(csv)) => parse_csv_list(csv),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect(),
            _ => Vec::new(),
        };
        options.exclude_url_pattern = self.exclude_url_pattern.clone();
        options.sources = EnabledSources {
            arxiv: loose_bool(self.use_arxiv.as_ref(), true),
            crossref: loose_bool(self.use_crossref.as_ref(), true),
            semantic_scholar: loose_bool(self.use_semantic_scholar.as_ref(), true),
        };
        Ok(options)
    }

    /// Explicit `history` path, else the Chrome profile's database
    pub fn history_path(&self) -> PathBuf {
        match self.history.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => expand_home(path),
            _ => resolve_history_path(
                self.profile
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty()),
            ),
        }
    }
}

fn loose_bool(value: Option<&Value>, default: bool) -> bool {
    match value {
        None | Some(Value::Null) => default,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(default),
        Some(Value::String(s)) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
        }
        Some(_) => default,
    }
}

fn loose_int(value: Option<&Value>, field: &str) -> Result<Option<i64>, ApiError> {
    let invalid = || ApiError::BadRequest(format!("{} must be an integer", field));
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(invalid),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn to_u32(value: i64, field: &str) -> Result<u32, ApiError> {
    u32::try_from(value)
        .map_err(|_| ApiError::BadRequest(format!("{} must not be negative", field)))
}

/// Recommend new literature for the user's recent interests
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<WebReport>, ApiError> {
    let request: RecommendRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RecommendRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    let options = request.options(&state.config)?;
    let path = request.history_path();
    tracing::info!("Recommendation request for {}", path.display());

    let reader = state.reader.clone();
    let records = tokio::task::spawn_blocking(move || reader.read(&path))
        .await
        .map_err(ApiError::internal)??;

    let report = Recommender::new(state.config.clone())
        .recommend_new(
            &records,
            &options,
            state.topics.as_ref(),
            &state.sources,
            chrono::Utc::now(),
        )
        .await?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> RecommendRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_loose_flags() {
        let options = request(json!({
            "use_arxiv": "0",
            "use_crossref": "yes",
            "use_semantic_scholar": null,
            "no_reading_filter": 1
        }))
        .options(&RecommenderConfig::default())
        .unwrap();
        assert!(!options.sources.arxiv);
        assert!(options.sources.crossref);
        assert!(options.sources.semantic_scholar);
        assert!(!options.reading_filter);
    }

    #[test]
    fn test_numbers_as_strings() {
        let options = request(json!({"limit": "5", "recent_days": 7, "min_visits": ""}))
            .options(&RecommenderConfig::default())
            .unwrap();
        assert_eq!(options.limit, 5);
        assert_eq!(options.recent_days, 7);
        assert_eq!(options.min_visits, 1);
    }

    #[test]
    fn test_bad_number_rejected() {
        let err = request(json!({"limit": "many"}))
            .options(&RecommenderConfig::default())
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(m) if m.contains("limit")));
        assert!(request(json!({"min_visits": -2}))
            .options(&RecommenderConfig::default())
            .is_err());
    }

    #[test]
    fn test_exclude_hosts_csv_or_list() {
        let config = RecommenderConfig::default();
        let csv = request(json!({"exclude_hosts": "a.com, b.com,"})).options(&config).unwrap();
        assert_eq!(csv.exclude_hosts, vec!["a.com", "b.com"]);
        let list = request(json!({"exclude_hosts": ["c.com", " "]})).options(&config).unwrap();
        assert_eq!(list.exclude_hosts, vec!["c.com"]);
    }

    #[test]
    fn test_history_path_prefers_explicit() {
        let req = request(json!({"history": "/tmp/History", "profile": "Profile 1"}));
        assert_eq!(req.history_path(), PathBuf::from("/tmp/History"));
        let req = request(json!({"profile": "Profile 1"}));
        assert!(req.history_path().ends_with("Profile 1/History"));
    }
}
