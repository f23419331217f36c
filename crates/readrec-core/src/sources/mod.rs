//! Literature source clients

pub mod arxiv;
pub mod crossref;
pub mod semantic_scholar;
pub mod traits;

pub use arxiv::ArxivSource;
pub use crossref::CrossrefSource;
pub use semantic_scholar::SemanticScholarSource;
pub use traits::*;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Credentials, SourcesConfig};
use crate::http::{HttpClient, HttpError};

/// All three sources, sharing one HTTP client
pub fn default_sources(
    config: &SourcesConfig,
    credentials: &Credentials,
) -> Result<Vec<Arc<dyn LiteratureSource>>, HttpError> {
    let client = HttpClient::new(&config.user_agent, Duration::from_secs(config.timeout_secs))?;
    Ok(vec![
        Arc::new(ArxivSource::new(client.clone())),
        Arc::new(CrossrefSource::new(
            client.clone(),
            credentials.crossref_mailto.clone(),
        )),
        Arc::new(SemanticScholarSource::new(
            client,
            credentials.semantic_scholar_api_key.clone(),
        )),
    ])
}
