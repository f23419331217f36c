//! Semantic Scholar Graph API source
//!
//! API docs: https://api.semanticscholar.org/api-docs/graph
//! Rate limit: shared unauthenticated pool; an API key raises it

use async_trait::async_trait;
use serde::Deserialize;

use super::traits::{LiteratureSource, SourceError};
use crate::candidate::{CandidateDocument, Origin, PublishedDate};
use crate::http::HttpClient;

const SEMANTIC_SCHOLAR_API_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";

const SEARCH_FIELDS: &str = "title,url,year,abstract,authors,publicationDate,openAccessPdf,venue";

/// The search endpoint rejects larger pages
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paper {
    paper_id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    year: Option<i32>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    authors: Vec<PaperAuthor>,
    publication_date: Option<String>,
    open_access_pdf: Option<OpenAccessPdf>,
}

#[derive(Debug, Deserialize)]
struct PaperAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccessPdf {
    url: Option<String>,
}

pub struct SemanticScholarSource {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl SemanticScholarSource {
    pub fn new(client: HttpClient, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: SEMANTIC_SCHOLAR_API_URL.to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Parse a paper search response
    pub fn parse_search_response(json: &str) -> Result<Vec<CandidateDocument>, SourceError> {
        let response: SearchResponse = serde_json::from_str(json)
            .map_err(|e| SourceError::Parse(format!("Invalid Semantic Scholar JSON: {}", e)))?;
        Ok(response.data.into_iter().filter_map(parse_paper).collect())
    }
}

fn parse_paper(paper: Paper) -> Option<CandidateDocument> {
    let title = paper.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
    let url = paper
        .url
        .filter(|u| !u.is_empty())
        .or_else(|| {
            paper
                .paper_id
                .map(|id| format!("https://www.semanticscholar.org/paper/{}", id))
        })?;

    let published = paper
        .publication_date
        .as_deref()
        .and_then(PublishedDate::parse)
        .or_else(|| paper.year.map(PublishedDate::year));

    let authors = paper
        .authors
        .into_iter()
        .filter_map(|a| a.name.filter(|n| !n.is_empty()))
        .collect();

    Some(
        CandidateDocument::external(Origin::SemanticScholar, url, title)
            .with_summary(paper.abstract_text)
            .with_published(published)
            .with_authors(authors)
            .with_pdf_url(paper.open_access_pdf.and_then(|p| p.url)),
    )
}

#[async_trait]
impl LiteratureSource for SemanticScholarSource {
    fn origin(&self) -> Origin {
        Origin::SemanticScholar
    }

    async fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<CandidateDocument>, SourceError> {
        let limit = max_results.min(MAX_PAGE_SIZE).to_string();
        let params = [
            ("query", query),
            ("limit", limit.as_str()),
            ("fields", SEARCH_FIELDS),
        ];
        let mut headers = Vec::new();
        if let Some(key) = self.api_key.as_deref() {
            headers.push(("x-api-key", key));
        }

        let response = self
            .client
            .get_with_params(&self.base_url, &params, &headers)
            .await?;
        if !response.is_success() {
            return Err(SourceError::Status(response.status));
        }

        Self::parse_search_response(&response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "total": 3,
        "offset": 0,
        "data": [
            {
                "paperId": "abc123",
                "title": "Query Optimization in Practice",
                "url": "https://www.semanticscholar.org/paper/abc123",
                "year": 2022,
                "abstract": "Cost models for planners.",
                "authors": [{"authorId": "1", "name": "Ada Lovelace"}, {"authorId": null, "name": ""}],
                "publicationDate": "2022-05-03",
                "openAccessPdf": {"url": "https://pdfs.example/abc.pdf", "status": "GREEN"},
                "venue": "VLDB"
            },
            {
                "paperId": "def456",
                "title": "Year Only",
                "url": null,
                "year": 2019,
                "abstract": null,
                "authors": [],
                "publicationDate": null,
                "openAccessPdf": null
            },
            {"paperId": "ghi789", "title": null}
        ]
    }"#;

    #[test]
    fn test_parse_search_response() {
        let results = SemanticScholarSource::parse_search_response(SAMPLE_RESPONSE).unwrap();
        assert_eq!(results.len(), 2);

        let first = &results[0];
        assert_eq!(first.origin, Origin::SemanticScholar);
        assert_eq!(first.authors, vec!["Ada Lovelace"]);
        assert_eq!(first.pdf_url(), Some("https://pdfs.example/abc.pdf"));
        assert_eq!(first.published.unwrap().to_string(), "2022-05-03");
        assert_eq!(first.summary.as_deref(), Some("Cost models for planners."));

        let second = &results[1];
        assert_eq!(second.url, "https://www.semanticscholar.org/paper/def456");
        assert_eq!(second.published, Some(PublishedDate::year(2019)));
        assert!(second.summary.is_none());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            SemanticScholarSource::parse_search_response("<html>").unwrap_err(),
            SourceError::Parse(_)
        ));
    }

    #[test]
    fn test_missing_data_is_empty() {
        let results = SemanticScholarSource::parse_search_response(r#"{"total": 0}"#).unwrap();
        assert!(results.is_empty());
    }
}
