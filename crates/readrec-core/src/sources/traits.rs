//! Common traits for source clients

use async_trait::async_trait;
use thiserror::Error;

use crate::candidate::{CandidateDocument, Origin};
use crate::http::HttpError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("{0}")]
    Http(HttpError),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("rate limit hit")]
    RateLimited,
    #[error("request timed out")]
    Timeout,
    #[error("malformed response: {0}")]
    Parse(String),
}

impl From<HttpError> for SourceError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::RateLimited => SourceError::RateLimited,
            HttpError::Timeout => SourceError::Timeout,
            other => SourceError::Http(other),
        }
    }
}

/// A searchable literature provider
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    fn origin(&self) -> Origin;

    /// Run one query, returning at most `max_results` documents
    async fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<CandidateDocument>, SourceError>;
}
