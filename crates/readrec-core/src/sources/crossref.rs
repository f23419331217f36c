//! Crossref source for DOI-registered works
//!
//! API docs: https://api.crossref.org/swagger-ui/index.html
//! Rate limit: Polite pool with mailto parameter, ~50 req/sec

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use super::traits::{LiteratureSource, SourceError};
use crate::candidate::{CandidateDocument, Origin, PublishedDate};
use crate::http::HttpClient;

const CROSSREF_API_URL: &str = "https://api.crossref.org/works";

lazy_static! {
    static ref JATS_TAG: Regex = Regex::new(r"</?jats:[^>]+>").unwrap();
}

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: CrossrefWorkList,
}

#[derive(Debug, Deserialize)]
struct CrossrefWorkList {
    #[serde(default)]
    items: Vec<CrossrefWork>,
}

#[derive(Debug, Deserialize)]
struct CrossrefWork {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    title: Option<Vec<String>>,
    author: Option<Vec<CrossrefAuthor>>,
    #[serde(rename = "published-print")]
    published_print: Option<CrossrefDate>,
    #[serde(rename = "published-online")]
    published_online: Option<CrossrefDate>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    link: Option<Vec<CrossrefLink>>,
    #[serde(rename = "URL")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefAuthor {
    given: Option<String>,
    family: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefDate {
    #[serde(rename = "date-parts")]
    date_parts: Option<Vec<Vec<Option<i32>>>>,
}

#[derive(Debug, Deserialize)]
struct CrossrefLink {
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "content-type")]
    content_type: Option<String>,
}

pub struct CrossrefSource {
    client: HttpClient,
    base_url: String,
    mailto: Option<String>,
}

impl CrossrefSource {
    pub fn new(client: HttpClient, mailto: Option<String>) -> Self {
        Self {
            client,
            base_url: CROSSREF_API_URL.to_string(),
            mailto,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Parse a `/works` search response
    pub fn parse_search_response(json: &str) -> Result<Vec<CandidateDocument>, SourceError> {
        let response: CrossrefResponse = serde_json::from_str(json)
            .map_err(|e| SourceError::Parse(format!("Invalid Crossref JSON: {}", e)))?;

        Ok(response
            .message
            .items
            .into_iter()
            .filter_map(Self::parse_work)
            .collect())
    }

    fn parse_work(work: CrossrefWork) -> Option<CandidateDocument> {
        let title = work
            .title
            .and_then(|t| t.into_iter().next())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())?;

        let url = work
            .url
            .or_else(|| work.doi.as_ref().map(|d| format!("https://doi.org/{}", d)))?;

        let authors: Vec<String> = work
            .author
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| {
                let name = [a.given.unwrap_or_default(), a.family.unwrap_or_default()]
                    .join(" ")
                    .trim()
                    .to_string();
                (!name.is_empty()).then_some(name)
            })
            .collect();

        let published = work
            .published_print
            .or(work.published_online)
            .and_then(|d| d.date_parts)
            .and_then(|dp| dp.into_iter().next())
            .and_then(|parts| {
                let parts: Vec<i32> = parts.into_iter().map_while(|p| p).collect();
                PublishedDate::from_parts(&parts)
            });

        let pdf_url = work.link.and_then(|links| {
            links
                .into_iter()
                .find(|l| l.content_type.as_deref() == Some("application/pdf"))
                .map(|l| l.url)
        });

        // Crossref abstracts usually carry JATS markup
        let summary = work.abstract_text.map(|a| strip_jats_markup(&a));

        Some(
            CandidateDocument::external(Origin::Crossref, url, title)
                .with_summary(summary)
                .with_published(published)
                .with_authors(authors)
                .with_pdf_url(pdf_url),
        )
    }
}

#[async_trait]
impl LiteratureSource for CrossrefSource {
    fn origin(&self) -> Origin {
        Origin::Crossref
    }

    async fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<CandidateDocument>, SourceError> {
        let rows = max_results.to_string();
        let mut params = vec![("query", query), ("rows", rows.as_str())];
        if let Some(mailto) = self.mailto.as_deref() {
            params.push(("mailto", mailto));
        }

        let response = self
            .client
            .get_with_params(&self.base_url, &params, &[])
            .await?;
        if !response.is_success() {
            return Err(SourceError::Status(response.status));
        }

        Self::parse_search_response(&response.body)
    }
}

/// Strip JATS XML markup from Crossref abstracts
fn strip_jats_markup(text: &str) -> String {
    JATS_TAG.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "status": "ok",
        "message": {
            "items": [{
                "DOI": "10.1234/test",
                "title": ["Adaptive Index Tuning"],
                "author": [{"given": "John", "family": "Smith"}, {"family": "Doe"}],
                "published-print": {"date-parts": [[2023, 1, 15]]},
                "abstract": "<jats:p>Indexes <jats:italic>matter</jats:italic>.</jats:p>",
                "link": [{"URL": "https://pub.example/x.pdf", "content-type": "application/pdf"}],
                "URL": "http://dx.doi.org/10.1234/test"
            }, {
                "DOI": "10.1234/untitled"
            }, {
                "DOI": "10.1234/no-url",
                "title": ["Only a DOI"],
                "published-online": {"date-parts": [[2021, null]]}
            }]
        }
    }"#;

    #[test]
    fn test_parse_search_response() {
        let results = CrossrefSource::parse_search_response(SAMPLE_RESPONSE).unwrap();
        assert_eq!(results.len(), 2);

        let first = &results[0];
        assert_eq!(first.title, "Adaptive Index Tuning");
        assert_eq!(first.url, "http://dx.doi.org/10.1234/test");
        assert_eq!(first.authors, vec!["John Smith", "Doe"]);
        assert_eq!(first.summary.as_deref(), Some("Indexes matter."));
        assert_eq!(first.pdf_url(), Some("https://pub.example/x.pdf"));
        assert_eq!(first.published.unwrap().to_string(), "2023-01-15");

        let second = &results[1];
        assert_eq!(second.url, "https://doi.org/10.1234/no-url");
        assert_eq!(second.published.unwrap().to_string(), "2021");
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = CrossrefSource::parse_search_response("{\"message\": 3}").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn test_strip_jats_markup() {
        let input = "<jats:p>This is <jats:italic>italic</jats:italic> text.</jats:p>";
        assert_eq!(strip_jats_markup(input), "This is italic text.");
    }
}
