//! arXiv source with Atom feed parsing
//!
//! API docs: https://arxiv.org/help/api/user-manual
//! Rate limit: 1 request per 3 seconds

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::traits::{LiteratureSource, SourceError};
use crate::candidate::{CandidateDocument, Origin, PublishedDate};
use crate::http::HttpClient;

const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

pub struct ArxivSource {
    client: HttpClient,
    base_url: String,
}

impl ArxivSource {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: ARXIV_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl LiteratureSource for ArxivSource {
    fn origin(&self) -> Origin {
        Origin::Arxiv
    }

    async fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<CandidateDocument>, SourceError> {
        let api_query = build_api_query(query);
        let max_results = max_results.to_string();
        let params = [
            ("search_query", api_query.as_str()),
            ("start", "0"),
            ("max_results", max_results.as_str()),
            ("sortBy", "submittedDate"),
            ("sortOrder", "descending"),
        ];

        let response = self
            .client
            .get_with_params(&self.base_url, &params, &[])
            .await?;
        if !response.is_success() {
            return Err(SourceError::Status(response.status));
        }

        parse_atom_feed(&response.body)
    }
}

/// Build an arXiv API query from a free-text query
///
/// Queries that already carry an API field prefix (`ti:`, `cat:` ...) pass
/// through; `AND`/`OR` combinations are rewritten part by part; anything
/// else searches all fields.
pub fn build_api_query(user_query: &str) -> String {
    let query = user_query.trim();

    let api_prefixes = [
        "all:", "ti:", "au:", "abs:", "co:", "jr:", "cat:", "rn:", "id:",
    ];
    if api_prefixes.iter().any(|p| query.starts_with(p)) {
        return query.to_string();
    }

    if query.contains(" AND ") {
        let parts: Vec<String> = query.split(" AND ").map(build_api_query).collect();
        return parts.join(" AND ");
    }

    if query.contains(" OR ") {
        let parts: Vec<String> = query.split(" OR ").map(build_api_query).collect();
        return parts.join(" OR ");
    }

    format!("all:{}", query)
}

#[derive(Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    pdf_url: Option<String>,
    web_url: Option<String>,
}

impl EntryBuilder {
    fn link(&mut self, e: &BytesStart<'_>) {
        let mut href = None;
        let mut rel = None;
        let mut link_type = None;

        for attr in e.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value).to_string();
            match attr.key.as_ref() {
                b"href" => href = Some(value),
                b"rel" => rel = Some(value),
                b"type" => link_type = Some(value),
                _ => {}
            }
        }

        if let Some(h) = href {
            if link_type.as_deref() == Some("application/pdf") {
                self.pdf_url = Some(h);
            } else if rel.as_deref() == Some("alternate") {
                self.web_url = Some(h);
            }
        }
    }

    fn build(self) -> Option<CandidateDocument> {
        let title = clean_whitespace(&self.title);
        if title.is_empty() {
            return None;
        }
        let url = self.web_url.unwrap_or(self.id);
        if url.is_empty() {
            return None;
        }

        Some(
            CandidateDocument::external(Origin::Arxiv, url, title)
                .with_summary(Some(clean_whitespace(&self.summary)))
                .with_published(PublishedDate::parse(&self.published))
                .with_authors(self.authors)
                .with_pdf_url(self.pdf_url),
        )
    }
}

/// Parse an arXiv Atom feed into candidates
pub fn parse_atom_feed(xml: &str) -> Result<Vec<CandidateDocument>, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut results = Vec::new();
    let mut buf = Vec::new();

    let mut entry: Option<EntryBuilder> = None;
    let mut current_element = String::new();
    let mut in_author = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "entry" => entry = Some(EntryBuilder::default()),
                    "author" => in_author = true,
                    "link" => {
                        if let Some(current) = entry.as_mut() {
                            current.link(e);
                        }
                    }
                    _ => {}
                }
                current_element = name;
            }
            Ok(Event::Empty(ref e)) => {
                if e.name().as_ref() == b"link" {
                    if let Some(current) = entry.as_mut() {
                        current.link(e);
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                match e.name().as_ref() {
                    b"entry" => {
                        if let Some(doc) = entry.take().and_then(EntryBuilder::build) {
                            results.push(doc);
                        }
                    }
                    b"author" => in_author = false,
                    _ => {}
                }
                current_element.clear();
            }
            Ok(Event::Text(e)) => {
                if let Some(current) = entry.as_mut() {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match current_element.as_str() {
                        "id" => current.id = text,
                        "title" => current.title.push_str(&text),
                        "summary" => current.summary.push_str(&text),
                        "published" => current.published = text,
                        "name" if in_author => current.authors.push(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(results)
}

fn clean_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
