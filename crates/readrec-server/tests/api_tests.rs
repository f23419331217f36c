//! Router tests driven through `tower::ServiceExt::oneshot`

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use readrec_core::{
    CandidateDocument, HistoryReader, LiteratureSource, Origin, RecError, RecommenderConfig,
    SourceError, TopicError, TopicInference, TopicSuggestions, VisitRecord,
};
use readrec_server::{create_router, AppState};

/// Serves canned records and remembers the last path it was asked for
struct MemoryReader {
    records: Vec<VisitRecord>,
    last_path: Mutex<Option<PathBuf>>,
}

impl HistoryReader for MemoryReader {
    fn read(&self, path: &Path) -> readrec_core::Result<Vec<VisitRecord>> {
        *self.last_path.lock().unwrap() = Some(path.to_path_buf());
        if path.ends_with("missing") {
            return Err(RecError::HistoryNotFound(path.to_path_buf()));
        }
        Ok(self.records.clone())
    }
}

struct CannedTopics;

#[async_trait]
impl TopicInference for CannedTopics {
    async fn infer(
        &self,
        _interest_terms: &[String],
        _top_hosts: &[String],
    ) -> Result<TopicSuggestions, TopicError> {
        Ok(TopicSuggestions {
            topics: vec!["query planning".to_string()],
            queries: vec!["postgres indexes".to_string()],
        })
    }
}

struct EchoSource(Origin);

#[async_trait]
impl LiteratureSource for EchoSource {
    fn origin(&self) -> Origin {
        self.0
    }

    async fn search(
        &self,
        query: &str,
        _max_results: u32,
    ) -> Result<Vec<CandidateDocument>, SourceError> {
        Ok(vec![CandidateDocument::external(
            self.0,
            format!("https://{}.example/paper", self.0.id()),
            format!("Notes on {}", query),
        )])
    }
}

fn state() -> (Arc<AppState>, Arc<MemoryReader>) {
    let reader = Arc::new(MemoryReader {
        records: vec![VisitRecord::new(
            "https://notes.example/postgres-indexes",
            "Postgres indexes",
            Utc::now() - Duration::days(2),
            3,
        )],
        last_path: Mutex::new(None),
    });
    let sources: Vec<Arc<dyn LiteratureSource>> = Origin::EXTERNAL
        .iter()
        .map(|&o| Arc::new(EchoSource(o)) as Arc<dyn LiteratureSource>)
        .collect();
    let state = AppState::with_parts(
        RecommenderConfig::default(),
        reader.clone(),
        Arc::new(CannedTopics),
        sources,
    );
    (Arc::new(state), reader)
}

async fn post(state: Arc<AppState>, body: Value) -> (StatusCode, Value) {
    let response = create_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/recommend")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_recommend_returns_partitioned_items() {
    let (state, reader) = state();
    let (status, body) = post(state, json!({"history": "/data/History"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        *reader.last_path.lock().unwrap(),
        Some(PathBuf::from("/data/History"))
    );
    assert_eq!(body["queries"], json!(["postgres indexes"]));
    assert_eq!(body["topics"], json!(["query planning"]));
    assert_eq!(body["warnings"], json!([]));
    for key in ["arxiv", "crossref", "semantic_scholar"] {
        let items = body["new_recommendations"][key].as_array().unwrap();
        assert_eq!(items.len(), 1, "{}", key);
        assert!(items[0]["score"].as_f64().unwrap() > 0.0);
        assert!(items[0]["why"].as_str().unwrap().contains("postgres"));
    }
    assert!(body["interest_tokens"]
        .as_array()
        .unwrap()
        .contains(&json!("postgres")));
}

#[tokio::test]
async fn test_disabled_sources_give_empty_lists() {
    let (state, _) = state();
    let (status, body) = post(
        state,
        json!({"use_arxiv": false, "use_crossref": "false", "use_semantic_scholar": 0}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["new_recommendations"],
        json!({"arxiv": [], "crossref": [], "semantic_scholar": []})
    );
    assert_eq!(body["warnings"], json!([]));
}

#[tokio::test]
async fn test_invalid_since_is_bad_request() {
    let (state, _) = state();
    let (status, body) = post(state, json!({"since": "last week"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("YYYY-MM-DD"));
}

#[tokio::test]
async fn test_missing_history_is_bad_request() {
    let (state, _) = state();
    let (status, body) = post(state, json!({"history": "/nowhere/missing"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("History DB not found"));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (state, _) = state();
    let response = create_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/recommend")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_huge_recent_days_is_answered() {
    let (state, _) = state();
    let (status, body) = post(state, json!({"recent_days": 1_000_000_000u64})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["interest_tokens"]
        .as_array()
        .unwrap()
        .contains(&json!("postgres")));
}
