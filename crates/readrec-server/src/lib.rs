//! readrec server
//!
//! JSON API over the recommendation pipeline: `POST /api/recommend` returns
//! new literature grouped by source.

pub mod http;

use std::sync::Arc;

use axum::{routing::post, Router};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use readrec_core::http::HttpError;
use readrec_core::{
    default_sources, ChromeHistoryReader, Credentials, HistoryReader, LiteratureSource,
    OpenAiTopicInference, RecommenderConfig, TopicInference,
};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to set up HTTP clients: {0}")]
    Client(#[from] HttpError),
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state
pub struct AppState {
    pub config: RecommenderConfig,
    pub reader: Arc<dyn HistoryReader>,
    pub topics: Arc<dyn TopicInference>,
    pub sources: Vec<Arc<dyn LiteratureSource>>,
}

impl AppState {
    /// Production wiring: Chrome history, OpenAI topics, all three sources
    pub fn new(config: RecommenderConfig, credentials: &Credentials) -> Result<Self, ServerError> {
        let topics = OpenAiTopicInference::new(
            &config.topics,
            credentials.openai_api_key.clone(),
            &config.sources.user_agent,
        )?;
        let sources = default_sources(&config.sources, credentials)?;
        tracing::debug!("Server credentials: {:?}", credentials);

        Ok(Self {
            config,
            reader: Arc::new(ChromeHistoryReader),
            topics: Arc::new(topics),
            sources,
        })
    }

    /// Wire in explicit collaborators
    pub fn with_parts(
        config: RecommenderConfig,
        reader: Arc<dyn HistoryReader>,
        topics: Arc<dyn TopicInference>,
        sources: Vec<Arc<dyn LiteratureSource>>,
    ) -> Self {
        Self {
            config,
            reader,
            topics,
            sources,
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/recommend", post(http::recommend))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), ServerError> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("readrec server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
